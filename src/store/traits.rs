use anyhow::Result;
use serde_json::Value;

use crate::model::{ArtifactKind, Projection};

/// Document collections for templates, template fields and template instances.
///
/// Documents are JSON-LD objects keyed by their `@id`. Every document handed
/// back carries the storage identifier `_id`; callers strip it before it
/// leaves the server.
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Insert a new document. Fails if it has no `@id` or the id is taken.
    async fn create(&self, kind: ArtifactKind, document: Value) -> Result<Value>;
    async fn find(&self, kind: ArtifactKind, id: &str) -> Result<Option<Value>>;
    /// One page in insertion order, projected
    async fn find_all(
        &self,
        kind: ArtifactKind,
        limit: usize,
        offset: usize,
        projection: &Projection,
    ) -> Result<Vec<Value>>;
    async fn count(&self, kind: ArtifactKind) -> Result<u64>;
    /// Replace an existing document; `None` when no document has that id
    async fn update(&self, kind: ArtifactKind, id: &str, document: Value) -> Result<Option<Value>>;
    /// `false` when no document has that id
    async fn delete(&self, kind: ArtifactKind, id: &str) -> Result<bool>;
}

pub trait Store: ArtifactStore + Send + Sync {}
impl<T: ArtifactStore + Send + Sync> Store for T {}
