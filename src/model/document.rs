//! Helpers over raw JSON-LD documents as they travel between the store and
//! the API. Documents are treated as values: every helper takes ownership
//! and hands back the new document.

use serde_json::{Map, Value};

/// Storage identifier attached by the document store
pub const INTERNAL_ID_FIELD: &str = "_id";
pub const ID_FIELD: &str = "@id";
pub const SCHEMA_NAME_FIELD: &str = "schema:name";

/// Remove the storage identifier; applied to every document leaving the server
pub fn strip_internal_id(document: Value) -> Value {
    match document {
        Value::Object(mut map) => {
            map.remove(INTERNAL_ID_FIELD);
            Value::Object(map)
        }
        other => other,
    }
}

pub fn document_id(document: &Value) -> Option<&str> {
    document.get(ID_FIELD).and_then(Value::as_str)
}

pub fn with_id(document: Value, id: &str) -> Value {
    set_field(document, ID_FIELD, Value::String(id.to_string()))
}

pub fn set_field(document: Value, field: &str, value: Value) -> Value {
    match document {
        Value::Object(mut map) => {
            map.insert(field.to_string(), value);
            Value::Object(map)
        }
        other => other,
    }
}

/// A request body counts as empty when it is missing or an empty object
pub fn is_empty_document(document: &Value) -> bool {
    match document {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// `schema:name` present and non-blank
pub fn has_name(document: &Value) -> bool {
    document
        .get(SCHEMA_NAME_FIELD)
        .and_then(Value::as_str)
        .map(|name| !name.trim().is_empty())
        .unwrap_or(false)
}

/// `@id` absent or explicitly null
pub fn has_null_or_missing_id(document: &Value) -> bool {
    matches!(document.get(ID_FIELD), None | Some(Value::Null))
}

/// Field selection applied to list results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl Projection {
    pub fn apply(&self, document: Value) -> Value {
        let Value::Object(map) = document else {
            return document;
        };

        let projected: Map<String, Value> = match self {
            Projection::Include(fields) => map
                .into_iter()
                .filter(|(key, _)| key == INTERNAL_ID_FIELD || fields.iter().any(|f| f == key))
                .collect(),
            Projection::Exclude(fields) => map
                .into_iter()
                .filter(|(key, _)| !fields.iter().any(|f| f == key))
                .collect(),
        };
        Value::Object(projected)
    }
}
