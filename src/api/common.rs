use axum::{
    body::Bytes,
    http::{header, HeaderMap, HeaderName, HeaderValue},
};
use serde_json::Value;

use crate::error::{ApiError, ErrorKey};
use crate::model::{ArtifactKind, ValidationReport};

pub const VALIDATION_STATUS_HEADER: &str = "x-cedar-validation-status";
pub const VALIDATION_REPORT_HEADER: &str = "x-cedar-validation-report";
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Parse a request body that must be a JSON object
pub fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::bad_request(
            ErrorKey::MissingRequestBody,
            "You must supply the request body as a JSON object",
        ));
    }
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        ApiError::bad_request(
            ErrorKey::MalformedRequest,
            format!("The request body is not valid JSON: {}", e),
        )
    })?;
    if !value.is_object() {
        return Err(ApiError::bad_request(
            ErrorKey::MalformedRequest,
            "The request body must be a JSON object",
        ));
    }
    Ok(value)
}

/// Scheme and authority the caller used to reach us
pub fn request_base(headers: &HeaderMap) -> String {
    let value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(',').next().unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty())
    };
    let scheme = value("x-forwarded-proto").unwrap_or_else(|| "http".to_string());
    let host = value("x-forwarded-host")
        .or_else(|| value(header::HOST.as_str()))
        .unwrap_or_else(|| "localhost".to_string());
    format!("{}://{}", scheme, host)
}

/// Absolute URL of a collection, e.g. `http://host/template-instances`
pub fn collection_url(headers: &HeaderMap, kind: ArtifactKind) -> String {
    format!("{}/{}", request_base(headers), kind.route())
}

/// Absolute URL of one artifact; the id is a full IRI and gets percent-encoded
pub fn artifact_url(headers: &HeaderMap, kind: ArtifactKind, id: &str) -> String {
    format!("{}/{}", collection_url(headers, kind), percent_encode(id))
}

/// Encode everything but RFC 3986 unreserved characters
pub fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

pub fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<(), ApiError> {
    let value = HeaderValue::from_str(value).map_err(|e| {
        ApiError::internal(
            ErrorKey::InternalError,
            "The response can not be assembled",
            anyhow::anyhow!("invalid value for header {}: {}", name, e),
        )
    })?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}

/// Status header, plus the full report when `with_report` is set
pub fn validation_headers(report: &ValidationReport, with_report: bool) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    insert_header(&mut headers, VALIDATION_STATUS_HEADER, report.status.as_str())?;
    if with_report {
        insert_header(&mut headers, VALIDATION_REPORT_HEADER, &report.to_header_value())?;
    }
    Ok(headers)
}
