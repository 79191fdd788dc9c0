use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Valid,
    Invalid,
    /// The validator could not evaluate the document
    Error,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Valid => "VALID",
            ValidationStatus::Invalid => "INVALID",
            ValidationStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMessage {
    /// JSON pointer into the validated document
    pub path: String,
    /// The schema constraint that was violated
    pub constraint: String,
    pub message: String,
}

/// Per-request validation outcome; sent back in response headers, never stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub status: ValidationStatus,
    pub messages: Vec<ValidationMessage>,
}

impl ValidationReport {
    pub fn from_messages(messages: Vec<ValidationMessage>) -> Self {
        let status = if messages.is_empty() {
            ValidationStatus::Valid
        } else {
            ValidationStatus::Invalid
        };
        Self { status, messages }
    }

    pub fn error(path: &str, constraint: &str, message: impl Into<String>) -> Self {
        Self {
            status: ValidationStatus::Error,
            messages: vec![ValidationMessage {
                path: path.to_string(),
                constraint: constraint.to_string(),
                message: message.into(),
            }],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == ValidationStatus::Valid
    }

    /// One info line per validation attempt, messages at debug level
    pub fn log(&self, subject: &str) {
        log::info!(
            "Validation of {}: {} ({} message(s))",
            subject,
            self.status,
            self.messages.len()
        );
        for message in &self.messages {
            log::debug!(
                "  {} [{}] {}",
                message.path,
                message.constraint,
                message.message
            );
        }
    }

    /// Compact JSON restricted to visible ASCII so it can travel in a header
    pub fn to_header_value(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        let mut escaped = String::with_capacity(json.len());
        for c in json.chars() {
            if c.is_ascii() {
                escaped.push(c);
            } else {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    escaped.push_str(&format!("\\u{:04x}", unit));
                }
            }
        }
        escaped
    }
}
