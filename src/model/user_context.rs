use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::model::ArtifactKind;

/// Capabilities checked before any resource operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    TemplateCreate,
    TemplateRead,
    TemplateUpdate,
    TemplateDelete,
    TemplateFieldCreate,
    TemplateFieldRead,
    TemplateFieldUpdate,
    TemplateFieldDelete,
    TemplateInstanceCreate,
    TemplateInstanceRead,
    TemplateInstanceUpdate,
    TemplateInstanceDelete,
    TemplateInstanceImport,
}

impl Permission {
    pub const ALL: [Permission; 13] = [
        Permission::TemplateCreate,
        Permission::TemplateRead,
        Permission::TemplateUpdate,
        Permission::TemplateDelete,
        Permission::TemplateFieldCreate,
        Permission::TemplateFieldRead,
        Permission::TemplateFieldUpdate,
        Permission::TemplateFieldDelete,
        Permission::TemplateInstanceCreate,
        Permission::TemplateInstanceRead,
        Permission::TemplateInstanceUpdate,
        Permission::TemplateInstanceDelete,
        Permission::TemplateInstanceImport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::TemplateCreate => "template-create",
            Permission::TemplateRead => "template-read",
            Permission::TemplateUpdate => "template-update",
            Permission::TemplateDelete => "template-delete",
            Permission::TemplateFieldCreate => "template-field-create",
            Permission::TemplateFieldRead => "template-field-read",
            Permission::TemplateFieldUpdate => "template-field-update",
            Permission::TemplateFieldDelete => "template-field-delete",
            Permission::TemplateInstanceCreate => "template-instance-create",
            Permission::TemplateInstanceRead => "template-instance-read",
            Permission::TemplateInstanceUpdate => "template-instance-update",
            Permission::TemplateInstanceDelete => "template-instance-delete",
            Permission::TemplateInstanceImport => "template-instance-import",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == token)
    }
}

/// Resource operations guarded by a per-kind capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Permission {
    pub fn for_operation(kind: ArtifactKind, operation: Operation) -> Self {
        use ArtifactKind::*;
        use Operation::*;
        match (kind, operation) {
            (Template, Create) => Permission::TemplateCreate,
            (Template, Read) => Permission::TemplateRead,
            (Template, Update) => Permission::TemplateUpdate,
            (Template, Delete) => Permission::TemplateDelete,
            (TemplateField, Create) => Permission::TemplateFieldCreate,
            (TemplateField, Read) => Permission::TemplateFieldRead,
            (TemplateField, Update) => Permission::TemplateFieldUpdate,
            (TemplateField, Delete) => Permission::TemplateFieldDelete,
            (TemplateInstance, Create) => Permission::TemplateInstanceCreate,
            (TemplateInstance, Read) => Permission::TemplateInstanceRead,
            (TemplateInstance, Update) => Permission::TemplateInstanceUpdate,
            (TemplateInstance, Delete) => Permission::TemplateInstanceDelete,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("user '{user_id}' does not have the '{permission}' permission")]
pub struct AccessDenied {
    pub user_id: String,
    pub permission: Permission,
}

/// User context extracted from request headers for permission checks and provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub permissions: BTreeSet<Permission>,
}

impl UserContext {
    /// Create a UserContext with full user information
    pub fn with_details(
        user_id: String,
        email: Option<String>,
        name: Option<String>,
        permissions: BTreeSet<Permission>,
    ) -> Self {
        Self {
            user_id,
            user_email: email,
            user_name: name,
            permissions,
        }
    }

    /// Caller that did not identify itself; holds no permissions
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            user_email: None,
            user_name: None,
            permissions: BTreeSet::new(),
        }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Guard invoked first by every resource operation
    pub fn require(&self, permission: Permission) -> Result<(), AccessDenied> {
        if self.has(permission) {
            Ok(())
        } else {
            Err(AccessDenied {
                user_id: self.user_id.clone(),
                permission,
            })
        }
    }
}
