use jsonschema::{JSONSchema, ValidationError};
use serde_json::Value;
use thiserror::Error;

use crate::model::{ArtifactKind, ValidationMessage, ValidationReport};

const TEMPLATE_MODEL_SCHEMA: &str = include_str!("../schemas/template.schema.json");
const FIELD_MODEL_SCHEMA: &str = include_str!("../schemas/field.schema.json");

#[derive(Debug, Error, PartialEq)]
pub enum ValidatorError {
    /// The schema itself cannot be compiled
    #[error("Schema is malformed: {0}")]
    MalformedSchema(String),
}

/// Structural validation of JSON documents against JSON schemas.
///
/// Violations are reported in the returned [`ValidationReport`], never as
/// errors; only a schema that cannot be compiled fails the call.
pub struct Validator;

impl Validator {
    pub fn validate(instance: &Value, schema: &Value) -> Result<ValidationReport, ValidatorError> {
        let compiled = JSONSchema::compile(schema)
            .map_err(|e| ValidatorError::MalformedSchema(e.to_string()))?;

        let messages = match compiled.validate(instance) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.map(|error| to_message(&error)).collect(),
        };
        Ok(ValidationReport::from_messages(messages))
    }

    /// Validate a template or template field against the built-in artifact model
    pub fn validate_artifact(
        kind: ArtifactKind,
        artifact: &Value,
    ) -> Result<ValidationReport, ValidatorError> {
        let raw = match kind {
            ArtifactKind::Template => TEMPLATE_MODEL_SCHEMA,
            ArtifactKind::TemplateField => FIELD_MODEL_SCHEMA,
            // Instances are validated against their own template
            ArtifactKind::TemplateInstance => {
                return Err(ValidatorError::MalformedSchema(
                    "template instances have no built-in model schema".to_string(),
                ))
            }
        };
        let schema: Value = serde_json::from_str(raw)
            .map_err(|e| ValidatorError::MalformedSchema(e.to_string()))?;
        Self::validate(artifact, &schema)
    }
}

fn to_message(error: &ValidationError<'_>) -> ValidationMessage {
    let schema_path = error.schema_path.to_string();
    let constraint = schema_path
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("schema")
        .to_string();
    ValidationMessage {
        path: error.instance_path.to_string(),
        constraint,
        message: error.to_string(),
    }
}
