use serde_json::Value;

use crate::config::AppConfig;
use crate::error::{ApiError, ErrorKey};
use crate::logic::common::{require_body, require_valid_id, Validated};
use crate::logic::paging::{fetch_page, ListQuery, Page};
use crate::logic::render::{render, OutputFormat, Rendered};
use crate::logic::schema_resolver::{resolve_schema, ResolveError};
use crate::logic::validate::Validator;
use crate::model::document::{document_id, strip_internal_id, with_id};
use crate::model::{
    is_valid_artifact_id, mint_artifact_id, ArtifactKind, Permission, ProvenanceInfo, UserContext,
    ValidationReport,
};
use crate::store::traits::ArtifactStore;

const KIND: ArtifactKind = ArtifactKind::TemplateInstance;

/// Constraint reported when an instance does not name its template
pub const SCHEMA_REFERENCE_CONSTRAINT: &str = "schemaReference";

/// Create, read, list, update and delete of template instances.
///
/// Every operation checks the caller's capability first. Validation never
/// blocks a write: its outcome travels back in the [`ValidationReport`].
pub struct InstanceLifecycle<'a, S: ?Sized> {
    store: &'a S,
    config: &'a AppConfig,
}

impl<'a, S: ArtifactStore + ?Sized> InstanceLifecycle<'a, S> {
    pub fn new(store: &'a S, config: &'a AppConfig) -> Self {
        Self { store, config }
    }

    pub async fn create(
        &self,
        user: &UserContext,
        body: Value,
        import_mode: bool,
    ) -> Result<Validated, ApiError> {
        user.require(Permission::TemplateInstanceCreate)?;
        if import_mode {
            user.require(Permission::TemplateInstanceImport)?;
        }
        require_body(&body)?;

        let provenance = ProvenanceInfo::build(user, &self.config.linked_data.user_prefix);
        let instance = if import_mode {
            let id = match document_id(&body).filter(|id| is_valid_artifact_id(id)) {
                Some(id) => id.to_string(),
                None => {
                    return Err(ApiError::bad_request(
                        ErrorKey::InvalidId,
                        "Import mode requires an http(s) '@id' in the instance",
                    ))
                }
            };
            if self.lookup(&id).await?.is_some() {
                return Err(ApiError::bad_request(
                    ErrorKey::InvalidId,
                    format!("A template instance with id '{}' already exists", id),
                )
                .with_id(&id));
            }
            provenance.fill(body)
        } else {
            let id = mint_artifact_id(&self.config.linked_data.id_prefix, KIND);
            provenance.stamp(with_id(body, &id))
        };

        let report = self.validate(&instance).await?;

        let created = self.store.create(KIND, instance).await.map_err(|e| {
            ApiError::internal(
                KIND.not_created_key(),
                "The template instance can not be created",
                e,
            )
        })?;
        Ok(Validated {
            document: strip_internal_id(created),
            report,
        })
    }

    pub async fn find(
        &self,
        user: &UserContext,
        id: &str,
        format: Option<&str>,
    ) -> Result<Rendered, ApiError> {
        user.require(Permission::TemplateInstanceRead)?;
        let format = OutputFormat::detect(format)?;

        let instance = self.fetch(id).await?;
        render(strip_internal_id(instance), format).map_err(|e| ApiError::from(e).with_id(id))
    }

    pub async fn find_all(&self, user: &UserContext, query: &ListQuery) -> Result<Page, ApiError> {
        user.require(Permission::TemplateInstanceRead)?;
        fetch_page(self.store, &self.config.rest_api, KIND, query).await
    }

    pub async fn update(
        &self,
        user: &UserContext,
        id: &str,
        body: Value,
    ) -> Result<Validated, ApiError> {
        user.require(Permission::TemplateInstanceUpdate)?;
        require_body(&body)?;
        require_valid_id(id)?;

        let existing = self.fetch(id).await?;
        let provenance = ProvenanceInfo::build(user, &self.config.linked_data.user_prefix);
        let instance = provenance.patch(with_id(body, id), Some(&existing));

        // An unknown template is rejected before anything is written
        if let Err(ResolveError::SchemaNotFound(template_id)) =
            resolve_schema(self.store, &instance).await
        {
            return Err(template_not_found(&template_id));
        }

        let updated = self
            .store
            .update(KIND, id, instance)
            .await
            .map_err(|e| {
                ApiError::internal(
                    KIND.not_updated_key(),
                    format!("The template instance can not be updated by id: {}", id),
                    e,
                )
                .with_id(id)
            })?
            .ok_or_else(|| instance_not_found(id))?;

        let report = self.validate(&updated).await?;
        Ok(Validated {
            document: strip_internal_id(updated),
            report,
        })
    }

    pub async fn delete(&self, user: &UserContext, id: &str) -> Result<(), ApiError> {
        user.require(Permission::TemplateInstanceDelete)?;
        let deleted = self.store.delete(KIND, id).await.map_err(|e| {
            ApiError::internal(
                KIND.not_deleted_key(),
                format!("The template instance can not be deleted by id: {}", id),
                e,
            )
            .with_id(id)
        })?;
        if deleted {
            Ok(())
        } else {
            Err(instance_not_found(id))
        }
    }

    async fn lookup(&self, id: &str) -> Result<Option<Value>, ApiError> {
        self.store.find(KIND, id).await.map_err(|e| {
            ApiError::internal(
                KIND.not_found_key(),
                format!("The template instance can not be found by id: {}", id),
                e,
            )
            .with_id(id)
        })
    }

    async fn fetch(&self, id: &str) -> Result<Value, ApiError> {
        self.lookup(id)
            .await?
            .ok_or_else(|| instance_not_found(id))
    }

    /// Validate against the referenced template; every attempt is logged
    async fn validate(&self, instance: &Value) -> Result<ValidationReport, ApiError> {
        let subject = document_id(instance).unwrap_or("<unidentified instance>");
        let report = match resolve_schema(self.store, instance).await {
            Ok(schema) => match Validator::validate(instance, &schema) {
                Ok(report) => report,
                Err(e) => {
                    log::info!("Validation of {}: {}", subject, e);
                    return Err(e.into());
                }
            },
            Err(ResolveError::MalformedInstance(reason)) => ValidationReport::error(
                "",
                SCHEMA_REFERENCE_CONSTRAINT,
                format!("Instance does not reference a template through 'schema:isBasedOn': {}", reason),
            ),
            Err(ResolveError::SchemaNotFound(template_id)) => {
                log::info!("Validation of {}: template {} not found", subject, template_id);
                return Err(template_not_found(&template_id));
            }
            Err(ResolveError::Storage(e)) => {
                return Err(ApiError::internal(
                    ErrorKey::InternalError,
                    "The template of the instance can not be loaded",
                    e,
                ))
            }
        };
        report.log(subject);
        Ok(report)
    }
}

fn instance_not_found(id: &str) -> ApiError {
    ApiError::not_found(
        KIND.not_found_key(),
        format!("The template instance can not be found by id: {}", id),
        id,
    )
}

fn template_not_found(template_id: &str) -> ApiError {
    ApiError::not_found(
        ArtifactKind::Template.not_found_key(),
        format!("The template '{}' referenced by the instance can not be found", template_id),
        template_id,
    )
}
