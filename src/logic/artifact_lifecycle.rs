use serde_json::Value;

use crate::config::AppConfig;
use crate::error::{ApiError, ErrorKey};
use crate::logic::common::{require_body, require_valid_id, Validated};
use crate::logic::paging::{fetch_page, ListQuery, Page};
use crate::logic::validate::Validator;
use crate::model::document::{
    document_id, has_name, has_null_or_missing_id, strip_internal_id, with_id,
};
use crate::model::{
    is_local_artifact_id, mint_artifact_id, ArtifactKind, Operation, Permission, ProvenanceInfo,
    UserContext, ValidationReport,
};
use crate::store::traits::ArtifactStore;

/// Result of a PUT, which creates the artifact when the id is unknown
#[derive(Debug, Clone, PartialEq)]
pub enum Upserted {
    Updated(Validated),
    Created(Validated),
}

/// CRUD for templates and template fields, validated against the built-in
/// artifact model.
pub struct ArtifactLifecycle<'a, S: ?Sized> {
    store: &'a S,
    config: &'a AppConfig,
    kind: ArtifactKind,
}

impl<'a, S: ArtifactStore + ?Sized> ArtifactLifecycle<'a, S> {
    pub fn new(store: &'a S, config: &'a AppConfig, kind: ArtifactKind) -> Self {
        Self {
            store,
            config,
            kind,
        }
    }

    pub async fn create(&self, user: &UserContext, body: Value) -> Result<Validated, ApiError> {
        user.require(Permission::for_operation(self.kind, Operation::Create))?;
        require_body(&body)?;
        if !has_null_or_missing_id(&body) {
            return Err(ApiError::bad_request(
                ErrorKey::IdNotAllowed,
                format!("The {} must not carry an '@id'; the server assigns it", self.kind.label()),
            ));
        }
        self.require_name(&body)?;

        let id = mint_artifact_id(&self.config.linked_data.id_prefix, self.kind);
        let artifact = self.provenance(user).stamp(with_id(body, &id));
        let report = self.validate(&artifact)?;

        let created = self.store.create(self.kind, artifact).await.map_err(|e| {
            ApiError::internal(
                self.kind.not_created_key(),
                format!("The {} can not be created", self.kind.label()),
                e,
            )
        })?;
        Ok(Validated {
            document: strip_internal_id(created),
            report,
        })
    }

    pub async fn find(&self, user: &UserContext, id: &str) -> Result<Value, ApiError> {
        user.require(Permission::for_operation(self.kind, Operation::Read))?;
        require_valid_id(id)?;
        let artifact = self
            .fetch(id)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        Ok(strip_internal_id(artifact))
    }

    pub async fn find_all(&self, user: &UserContext, query: &ListQuery) -> Result<Page, ApiError> {
        user.require(Permission::for_operation(self.kind, Operation::Read))?;
        fetch_page(self.store, &self.config.rest_api, self.kind, query).await
    }

    pub async fn update(
        &self,
        user: &UserContext,
        id: &str,
        body: Value,
    ) -> Result<Upserted, ApiError> {
        user.require(Permission::for_operation(self.kind, Operation::Update))?;
        require_valid_id(id)?;
        require_body(&body)?;
        if let Some(body_id) = document_id(&body) {
            if body_id != id {
                return Err(ApiError::bad_request(
                    ErrorKey::IdMismatch,
                    format!("The '@id' in the body ({}) does not match the path id", body_id),
                )
                .with_id(id));
            }
        }
        self.require_name(&body)?;

        let provenance = self.provenance(user);
        match self.fetch(id).await? {
            Some(existing) => {
                let artifact = provenance.patch(with_id(body, id), Some(&existing));
                let report = self.validate(&artifact)?;
                let updated = self
                    .store
                    .update(self.kind, id, artifact)
                    .await
                    .map_err(|e| {
                        ApiError::internal(
                            self.kind.not_updated_key(),
                            format!("The {} can not be updated by id: {}", self.kind.label(), id),
                            e,
                        )
                        .with_id(id)
                    })?
                    .ok_or_else(|| self.not_found(id))?;
                Ok(Upserted::Updated(Validated {
                    document: strip_internal_id(updated),
                    report,
                }))
            }
            None => {
                if !is_local_artifact_id(&self.config.linked_data.id_prefix, self.kind, id) {
                    return Err(ApiError::bad_request(
                        ErrorKey::InvalidId,
                        format!("The id '{}' is not a {} id of this server", id, self.kind.label()),
                    )
                    .with_id(id));
                }
                let artifact = provenance.fill(with_id(body, id));
                let report = self.validate(&artifact)?;
                let created = self.store.create(self.kind, artifact).await.map_err(|e| {
                    ApiError::internal(
                        self.kind.not_created_key(),
                        format!("The {} can not be created using id: {}", self.kind.label(), id),
                        e,
                    )
                    .with_id(id)
                })?;
                Ok(Upserted::Created(Validated {
                    document: strip_internal_id(created),
                    report,
                }))
            }
        }
    }

    pub async fn delete(&self, user: &UserContext, id: &str) -> Result<(), ApiError> {
        user.require(Permission::for_operation(self.kind, Operation::Delete))?;
        require_valid_id(id)?;
        let deleted = self.store.delete(self.kind, id).await.map_err(|e| {
            ApiError::internal(
                self.kind.not_deleted_key(),
                format!("The {} can not be deleted by id: {}", self.kind.label(), id),
                e,
            )
            .with_id(id)
        })?;
        if deleted {
            Ok(())
        } else {
            Err(self.not_found(id))
        }
    }

    async fn fetch(&self, id: &str) -> Result<Option<Value>, ApiError> {
        self.store.find(self.kind, id).await.map_err(|e| {
            ApiError::internal(
                self.kind.not_found_key(),
                format!("The {} can not be found by id: {}", self.kind.label(), id),
                e,
            )
            .with_id(id)
        })
    }

    fn provenance(&self, user: &UserContext) -> ProvenanceInfo {
        ProvenanceInfo::build(user, &self.config.linked_data.user_prefix)
    }

    fn require_name(&self, body: &Value) -> Result<(), ApiError> {
        if !has_name(body) {
            return Err(ApiError::bad_request(
                ErrorKey::MissingName,
                format!("The {} must have a non-empty 'schema:name'", self.kind.label()),
            ));
        }
        Ok(())
    }

    fn validate(&self, artifact: &Value) -> Result<ValidationReport, ApiError> {
        let report = Validator::validate_artifact(self.kind, artifact)?;
        report.log(document_id(artifact).unwrap_or("<unidentified artifact>"));
        Ok(report)
    }

    fn not_found(&self, id: &str) -> ApiError {
        ApiError::not_found(
            self.kind.not_found_key(),
            format!("The {} can not be found by id: {}", self.kind.label(), id),
            id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::provenance::{CREATED_BY, MODIFIED_BY};
    use crate::model::ValidationStatus;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn user(id: &str) -> UserContext {
        UserContext::with_details(
            id.to_string(),
            None,
            None,
            Permission::ALL.into_iter().collect::<BTreeSet<_>>(),
        )
    }

    fn field(name: &str) -> Value {
        json!({
            "@type": "https://schema.metadatacenter.org/core/TemplateField",
            "schema:name": name,
            "_valueConstraints": {"requiredValue": false}
        })
    }

    #[tokio::test]
    async fn test_create_field() {
        let store = MemoryStore::new();
        let config = AppConfig::default();
        let fields = ArtifactLifecycle::new(&store, &config, ArtifactKind::TemplateField);

        let created = fields.create(&user("u1"), field("Title")).await.unwrap();
        assert_eq!(created.report.status, ValidationStatus::Valid);
        assert!(is_local_artifact_id(
            &config.linked_data.id_prefix,
            ArtifactKind::TemplateField,
            created.id()
        ));
        assert!(created.document.get("_id").is_none());

        let found = fields.find(&user("u1"), created.id()).await.unwrap();
        assert_eq!(found, created.document);
    }

    #[tokio::test]
    async fn test_create_rejections() {
        let store = MemoryStore::new();
        let config = AppConfig::default();
        let fields = ArtifactLifecycle::new(&store, &config, ArtifactKind::TemplateField);

        let mut with_id = field("Title");
        with_id["@id"] = json!("https://repo.metadatacenter.org/template-fields/x");
        let err = fields.create(&user("u1"), with_id).await.unwrap_err();
        assert_eq!(err.key(), ErrorKey::IdNotAllowed);

        let err = fields.create(&user("u1"), field(" ")).await.unwrap_err();
        assert_eq!(err.key(), ErrorKey::MissingName);

        let err = fields.create(&user("u1"), Value::Null).await.unwrap_err();
        assert_eq!(err.key(), ErrorKey::MissingRequestBody);

        let err = fields
            .create(&UserContext::anonymous(), field("Title"))
            .await
            .unwrap_err();
        assert_eq!(err.key(), ErrorKey::AccessDenied);
    }

    #[tokio::test]
    async fn test_find_requires_valid_id() {
        let store = MemoryStore::new();
        let config = AppConfig::default();
        let templates = ArtifactLifecycle::new(&store, &config, ArtifactKind::Template);

        let err = templates.find(&user("u1"), "not a url").await.unwrap_err();
        assert_eq!(err.key(), ErrorKey::InvalidId);

        let err = templates
            .find(&user("u1"), "https://repo.metadatacenter.org/templates/none")
            .await
            .unwrap_err();
        assert_eq!(err.key(), ErrorKey::TemplateNotFound);
    }

    #[tokio::test]
    async fn test_put_updates_or_creates() {
        let store = MemoryStore::new();
        let config = AppConfig::default();
        let fields = ArtifactLifecycle::new(&store, &config, ArtifactKind::TemplateField);
        let created = fields.create(&user("u1"), field("Title")).await.unwrap();
        let id = created.id().to_string();

        let Upserted::Updated(updated) = fields
            .update(&user("u2"), &id, field("Renamed"))
            .await
            .unwrap()
        else {
            panic!("expected an update");
        };
        assert_eq!(updated.document["schema:name"], "Renamed");
        assert_eq!(updated.document[CREATED_BY], created.document[CREATED_BY]);
        assert_eq!(updated.document[MODIFIED_BY], "https://metadatacenter.org/users/u2");

        let fresh = "https://repo.metadatacenter.org/template-fields/fresh";
        assert!(matches!(
            fields.update(&user("u2"), fresh, field("New")).await.unwrap(),
            Upserted::Created(_)
        ));

        let err = fields
            .update(&user("u2"), "https://elsewhere.org/template-fields/x", field("New"))
            .await
            .unwrap_err();
        assert_eq!(err.key(), ErrorKey::InvalidId);

        let mut mismatched = field("New");
        mismatched["@id"] = json!(fresh);
        let err = fields.update(&user("u2"), &id, mismatched).await.unwrap_err();
        assert_eq!(err.key(), ErrorKey::IdMismatch);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        let config = AppConfig::default();
        let templates = ArtifactLifecycle::new(&store, &config, ArtifactKind::Template);
        let created = templates
            .create(
                &user("u1"),
                json!({"@type": "https://schema.metadatacenter.org/core/Template", "schema:name": "Study", "type": "object"}),
            )
            .await
            .unwrap();
        assert!(created.report.is_valid());

        templates.delete(&user("u1"), created.id()).await.unwrap();
        let err = templates.delete(&user("u1"), created.id()).await.unwrap_err();
        assert_eq!(err.key(), ErrorKey::TemplateNotFound);
    }
}
