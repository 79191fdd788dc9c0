use serde_json::Value;
use thiserror::Error;

use crate::jsonld::{to_nquads, to_plain_json, JsonLdError};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const NQUADS_CONTENT_TYPE: &str = "application/n-quads";

/// Output representations of a template instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    JsonLd,
    Json,
    RdfNQuad,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Unknown output format '{0}'")]
    UnknownFormat(String),

    #[error("Failed to convert document to RDF: {0}")]
    RdfConversion(#[from] JsonLdError),
}

impl OutputFormat {
    /// Detect the format from the optional `format` query parameter.
    ///
    /// Absent or blank selects JSON-LD; any other unrecognised token fails.
    pub fn detect(token: Option<&str>) -> Result<Self, RenderError> {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(OutputFormat::JsonLd);
        };
        match token.to_ascii_lowercase().as_str() {
            "jsonld" | "json-ld" | "application/ld+json" => Ok(OutputFormat::JsonLd),
            "json" | "application/json" => Ok(OutputFormat::Json),
            "rdf" | "nquad" | "nquads" | "rdf-nquad" | "application/n-quads" => {
                Ok(OutputFormat::RdfNQuad)
            }
            _ => Err(RenderError::UnknownFormat(token.to_string())),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::JsonLd | OutputFormat::Json => JSON_CONTENT_TYPE,
            OutputFormat::RdfNQuad => NQUADS_CONTENT_TYPE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderedBody {
    Json(Value),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub body: RenderedBody,
    pub content_type: &'static str,
}

/// Render an instance in the requested format. JSON-LD is the identity.
pub fn render(instance: Value, format: OutputFormat) -> Result<Rendered, RenderError> {
    let body = match format {
        OutputFormat::JsonLd => RenderedBody::Json(instance),
        OutputFormat::Json => RenderedBody::Json(to_plain_json(&instance)),
        OutputFormat::RdfNQuad => RenderedBody::Text(to_nquads(&instance)?),
    };
    Ok(Rendered {
        body,
        content_type: format.content_type(),
    })
}
