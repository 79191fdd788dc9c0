use serde_json::Value;

use crate::error::{ApiError, ErrorKey};
use crate::model::document::{document_id, is_empty_document};
use crate::model::{is_valid_artifact_id, ValidationReport};

/// A persisted document together with the outcome of validating it
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub document: Value,
    pub report: ValidationReport,
}

impl Validated {
    pub fn id(&self) -> &str {
        document_id(&self.document).unwrap_or_default()
    }
}

pub fn require_body(body: &Value) -> Result<(), ApiError> {
    if is_empty_document(body) {
        return Err(ApiError::bad_request(
            ErrorKey::MissingRequestBody,
            "You must supply the request body as a JSON object",
        ));
    }
    Ok(())
}

pub fn require_valid_id(id: &str) -> Result<(), ApiError> {
    if !is_valid_artifact_id(id) {
        return Err(
            ApiError::bad_request(ErrorKey::InvalidId, format!("The id '{}' is not a valid IRI", id))
                .with_id(id),
        );
    }
    Ok(())
}
