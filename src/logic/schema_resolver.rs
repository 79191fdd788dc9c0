use serde_json::Value;
use thiserror::Error;

use crate::model::document::strip_internal_id;
use crate::model::ArtifactKind;
use crate::store::traits::ArtifactStore;

/// Instance field naming the template the instance conforms to
pub const SCHEMA_REFERENCE_FIELD: &str = "schema:isBasedOn";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Instance has no usable 'schema:isBasedOn': {0}")]
    MalformedInstance(String),

    #[error("Template '{0}' referenced by the instance does not exist")]
    SchemaNotFound(String),

    #[error("Template lookup failed: {0:#}")]
    Storage(anyhow::Error),
}

/// Template id referenced by an instance
pub fn schema_reference(instance: &Value) -> Result<&str, ResolveError> {
    match instance.get(SCHEMA_REFERENCE_FIELD) {
        Some(Value::String(id)) if !id.trim().is_empty() => Ok(id),
        Some(Value::String(_)) => Err(ResolveError::MalformedInstance("value is blank".to_string())),
        Some(other) => Err(ResolveError::MalformedInstance(format!(
            "expected a string, got {}",
            json_kind(other)
        ))),
        None => Err(ResolveError::MalformedInstance("field is missing".to_string())),
    }
}

/// Fetch the template an instance is based on, without its storage id
pub async fn resolve_schema<S: ArtifactStore + ?Sized>(
    store: &S,
    instance: &Value,
) -> Result<Value, ResolveError> {
    let template_id = schema_reference(instance)?;
    match store.find(ArtifactKind::Template, template_id).await {
        Ok(Some(template)) => Ok(strip_internal_id(template)),
        Ok(None) => Err(ResolveError::SchemaNotFound(template_id.to_string())),
        Err(e) => Err(ResolveError::Storage(e)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
