use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::model::document::set_field;
use crate::model::UserContext;

pub const CREATED_ON: &str = "pav:createdOn";
pub const CREATED_BY: &str = "pav:createdBy";
pub const LAST_UPDATED_ON: &str = "pav:lastUpdatedOn";
pub const MODIFIED_BY: &str = "oslc:modifiedBy";

/// Actor and timestamp stamped onto documents at create/update time
#[derive(Debug, Clone, PartialEq)]
pub struct ProvenanceInfo {
    pub actor: String,
    pub timestamp: DateTime<Utc>,
}

impl ProvenanceInfo {
    pub fn build(user: &UserContext, user_prefix: &str) -> Self {
        Self::build_at(user, user_prefix, Utc::now())
    }

    pub fn build_at(user: &UserContext, user_prefix: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            actor: format!("{}{}", user_prefix, user.user_id),
            timestamp,
        }
    }

    fn timestamp_value(&self) -> Value {
        Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false))
    }

    /// Stamp all four provenance fields, as for a newly created document
    pub fn stamp(&self, document: Value) -> Value {
        let document = set_field(document, CREATED_ON, self.timestamp_value());
        let document = set_field(document, CREATED_BY, Value::String(self.actor.clone()));
        self.stamp_update(document)
    }

    /// Stamp the update fields and carry creation fields over from `prior`.
    ///
    /// Creation fields already present on `prior` win over anything the
    /// caller sent; if neither has them they are left absent.
    pub fn patch(&self, document: Value, prior: Option<&Value>) -> Value {
        let mut document = document;
        if let Some(prior) = prior {
            for field in [CREATED_ON, CREATED_BY] {
                if let Some(value) = prior.get(field) {
                    document = set_field(document, field, value.clone());
                }
            }
        }
        self.stamp_update(document)
    }

    /// Stamp only the provenance fields the document does not carry yet
    pub fn fill(&self, document: Value) -> Value {
        let stamped = self.stamp(Value::Object(Default::default()));
        let missing: Vec<&str> = [CREATED_ON, CREATED_BY, LAST_UPDATED_ON, MODIFIED_BY]
            .into_iter()
            .filter(|field| document.get(*field).is_none())
            .collect();
        missing.into_iter().fold(document, |doc, field| {
            let value = stamped.get(field).cloned().unwrap_or(Value::Null);
            set_field(doc, field, value)
        })
    }

    fn stamp_update(&self, document: Value) -> Value {
        let document = set_field(document, LAST_UPDATED_ON, self.timestamp_value());
        set_field(document, MODIFIED_BY, Value::String(self.actor.clone()))
    }
}
