use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorKey;

pub type Id = String;

/// The three document collections served by the template server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Template,
    TemplateField,
    TemplateInstance,
}

impl ArtifactKind {
    /// Path segment used both for routes and for minted ids
    pub fn route(&self) -> &'static str {
        match self {
            ArtifactKind::Template => "templates",
            ArtifactKind::TemplateField => "template-fields",
            ArtifactKind::TemplateInstance => "template-instances",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Template => "template",
            ArtifactKind::TemplateField => "template field",
            ArtifactKind::TemplateInstance => "template instance",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Template => "template",
            ArtifactKind::TemplateField => "template-field",
            ArtifactKind::TemplateInstance => "template-instance",
        }
    }

    pub fn not_found_key(&self) -> ErrorKey {
        match self {
            ArtifactKind::Template => ErrorKey::TemplateNotFound,
            ArtifactKind::TemplateField => ErrorKey::TemplateFieldNotFound,
            ArtifactKind::TemplateInstance => ErrorKey::InstanceNotFound,
        }
    }

    pub fn not_created_key(&self) -> ErrorKey {
        match self {
            ArtifactKind::Template => ErrorKey::TemplateNotCreated,
            ArtifactKind::TemplateField => ErrorKey::TemplateFieldNotCreated,
            ArtifactKind::TemplateInstance => ErrorKey::InstanceNotCreated,
        }
    }

    pub fn not_updated_key(&self) -> ErrorKey {
        match self {
            ArtifactKind::Template => ErrorKey::TemplateNotUpdated,
            ArtifactKind::TemplateField => ErrorKey::TemplateFieldNotUpdated,
            ArtifactKind::TemplateInstance => ErrorKey::InstanceNotUpdated,
        }
    }

    pub fn not_deleted_key(&self) -> ErrorKey {
        match self {
            ArtifactKind::Template => ErrorKey::TemplateNotDeleted,
            ArtifactKind::TemplateField => ErrorKey::TemplateFieldNotDeleted,
            ArtifactKind::TemplateInstance => ErrorKey::InstanceNotDeleted,
        }
    }

    pub fn not_listed_key(&self) -> ErrorKey {
        match self {
            ArtifactKind::Template => ErrorKey::TemplatesNotListed,
            ArtifactKind::TemplateField => ErrorKey::TemplateFieldsNotListed,
            ArtifactKind::TemplateInstance => ErrorKey::InstancesNotListed,
        }
    }
}

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// Mint a linked-data id such as `https://repo.metadatacenter.org/template-instances/<uuid>`
pub fn mint_artifact_id(id_prefix: &str, kind: ArtifactKind) -> Id {
    format!("{}{}/{}", with_trailing_slash(id_prefix), kind.route(), generate_id())
}

/// Whether `id` was minted by this server for the given kind
pub fn is_local_artifact_id(id_prefix: &str, kind: ArtifactKind, id: &str) -> bool {
    let prefix = format!("{}{}/", with_trailing_slash(id_prefix), kind.route());
    id.strip_prefix(&prefix)
        .map(|rest| !rest.is_empty() && !rest.contains('/'))
        .unwrap_or(false)
}

/// Artifact ids are absolute http(s) IRIs
pub fn is_valid_artifact_id(id: &str) -> bool {
    let rest = id
        .strip_prefix("https://")
        .or_else(|| id.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split('/').next().unwrap_or("");
            !host.is_empty() && !id.chars().any(|c| c.is_whitespace() || c.is_control())
        }
        None => false,
    }
}

fn with_trailing_slash(prefix: &str) -> String {
    if prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{}/", prefix)
    }
}
