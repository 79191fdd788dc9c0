use serde_json::Value;
use sophia_api::parser::QuadParser;
use sophia_api::serializer::{QuadSerializer, Stringifier};
use sophia_jsonld::JsonLdParser;
use sophia_turtle::serializer::nq::NqSerializer;

use crate::jsonld::error::{JsonLdError, Result};

/// Serialize a JSON-LD document as N-Quads, one statement per line.
///
/// Remote contexts are never dereferenced; a document that needs one fails
/// to convert.
pub fn to_nquads(document: &Value) -> Result<String> {
    let text = serde_json::to_string(document)?;
    let quads = JsonLdParser::new().parse_str(&text);

    let mut serializer = NqSerializer::new_stringifier();
    serializer
        .serialize_quads(quads)
        .map_err(|e| JsonLdError::Conversion(e.to_string()))?;
    Ok(serializer.as_str().to_string())
}
