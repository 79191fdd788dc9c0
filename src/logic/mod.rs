pub mod artifact_lifecycle;
pub mod common;
pub mod instance_lifecycle;
pub mod paging;
pub mod render;
pub mod schema_resolver;
pub mod validate;

pub use artifact_lifecycle::{ArtifactLifecycle, Upserted};
pub use common::Validated;
pub use instance_lifecycle::InstanceLifecycle;
pub use paging::{fetch_page, paging_link_header, ListQuery, Page, PagedQuery, PagingError};
pub use render::{render, OutputFormat, Rendered, RenderedBody, RenderError};
pub use schema_resolver::{resolve_schema, ResolveError, SCHEMA_REFERENCE_FIELD};
pub use validate::{Validator, ValidatorError};
