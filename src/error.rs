use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::logic::paging::PagingError;
use crate::logic::render::RenderError;
use crate::logic::validate::ValidatorError;
use crate::model::AccessDenied;

/// Machine-readable error keys carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKey {
    AccessDenied,
    MalformedRequest,
    MissingRequestBody,
    InvalidId,
    UnknownOutputFormat,
    PaginationParameterInvalid,
    FieldNamesConflict,
    MissingName,
    IdNotAllowed,
    IdMismatch,
    InstanceNotFound,
    InstanceNotCreated,
    InstanceNotUpdated,
    InstanceNotDeleted,
    InstancesNotListed,
    TemplateNotFound,
    TemplateNotCreated,
    TemplateNotUpdated,
    TemplateNotDeleted,
    TemplatesNotListed,
    TemplateFieldNotFound,
    TemplateFieldNotCreated,
    TemplateFieldNotUpdated,
    TemplateFieldNotDeleted,
    TemplateFieldsNotListed,
    RdfConversionError,
    SchemaMalformed,
    InternalError,
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = serde_json::to_value(self).map_err(|_| fmt::Error)?;
        f.write_str(value.as_str().unwrap_or_default())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_key: ErrorKey,
    pub error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ErrorResponse {
    pub fn new(error_key: ErrorKey, message: &str) -> Self {
        Self {
            error_key,
            error_message: message.to_string(),
            id: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    #[error("{message}")]
    BadRequest {
        key: ErrorKey,
        message: String,
        id: Option<String>,
    },

    #[error("{message}")]
    NotFound {
        key: ErrorKey,
        message: String,
        id: Option<String>,
    },

    /// The cause is logged but never sent to the caller
    #[error("{message}")]
    Internal {
        key: ErrorKey,
        message: String,
        id: Option<String>,
        cause: anyhow::Error,
    },
}

impl ApiError {
    pub fn bad_request(key: ErrorKey, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            key,
            message: message.into(),
            id: None,
        }
    }

    pub fn not_found(key: ErrorKey, message: impl Into<String>, id: &str) -> Self {
        ApiError::NotFound {
            key,
            message: message.into(),
            id: Some(id.to_string()),
        }
    }

    pub fn internal(key: ErrorKey, message: impl Into<String>, cause: anyhow::Error) -> Self {
        ApiError::Internal {
            key,
            message: message.into(),
            id: None,
            cause,
        }
    }

    /// Attach the artifact id the failure refers to
    pub fn with_id(self, artifact_id: &str) -> Self {
        let artifact_id = Some(artifact_id.to_string());
        match self {
            ApiError::BadRequest { key, message, .. } => ApiError::BadRequest {
                key,
                message,
                id: artifact_id,
            },
            ApiError::NotFound { key, message, .. } => ApiError::NotFound {
                key,
                message,
                id: artifact_id,
            },
            ApiError::Internal {
                key, message, cause, ..
            } => ApiError::Internal {
                key,
                message,
                id: artifact_id,
                cause,
            },
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AccessDenied(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn key(&self) -> ErrorKey {
        match self {
            ApiError::AccessDenied(_) => ErrorKey::AccessDenied,
            ApiError::BadRequest { key, .. }
            | ApiError::NotFound { key, .. }
            | ApiError::Internal { key, .. } => *key,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::AccessDenied(denied) => {
                log::warn!("{}", denied);
                ErrorResponse::new(ErrorKey::AccessDenied, &denied.to_string())
            }
            ApiError::BadRequest { key, message, id } | ApiError::NotFound { key, message, id } => {
                ErrorResponse {
                    error_key: key,
                    error_message: message,
                    id,
                }
            }
            ApiError::Internal {
                key,
                message,
                id,
                cause,
            } => {
                log::error!("{} [{}]: {:#}", message, key, cause);
                ErrorResponse {
                    error_key: key,
                    error_message: message,
                    id,
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<PagingError> for ApiError {
    fn from(error: PagingError) -> Self {
        let key = match error {
            PagingError::InvalidParameter(_) => ErrorKey::PaginationParameterInvalid,
            PagingError::FieldNamesConflict => ErrorKey::FieldNamesConflict,
        };
        ApiError::bad_request(key, error.to_string())
    }
}

impl From<RenderError> for ApiError {
    fn from(error: RenderError) -> Self {
        match error {
            RenderError::UnknownFormat(_) => {
                ApiError::bad_request(ErrorKey::UnknownOutputFormat, error.to_string())
            }
            RenderError::RdfConversion(_) => {
                let message = error.to_string();
                ApiError::internal(ErrorKey::RdfConversionError, message, error.into())
            }
        }
    }
}

impl From<ValidatorError> for ApiError {
    fn from(error: ValidatorError) -> Self {
        ApiError::internal(
            ErrorKey::SchemaMalformed,
            "The template cannot be used for validation",
            error.into(),
        )
    }
}
