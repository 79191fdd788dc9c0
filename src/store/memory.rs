use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::model::document::{document_id, set_field, strip_internal_id, with_id, INTERNAL_ID_FIELD};
use crate::model::{ArtifactKind, Projection};
use crate::store::traits::ArtifactStore;

#[derive(Debug, Clone)]
struct StoredDocument {
    storage_id: String,
    document: Value,
}

impl StoredDocument {
    fn with_storage_id(&self) -> Value {
        set_field(
            self.document.clone(),
            INTERNAL_ID_FIELD,
            Value::String(self.storage_id.clone()),
        )
    }
}

/// In-process document store; collections keep insertion order
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<ArtifactKind, Vec<StoredDocument>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ArtifactStore for MemoryStore {
    async fn create(&self, kind: ArtifactKind, document: Value) -> Result<Value> {
        let id = document_id(&document)
            .ok_or_else(|| anyhow!("{} has no @id", kind.label()))?
            .to_string();

        let mut collections = self.collections.write();
        let collection = collections.entry(kind).or_default();
        if collection.iter().any(|stored| document_id(&stored.document) == Some(id.as_str())) {
            return Err(anyhow!("{} '{}' already exists", kind.label(), id));
        }

        // The caller's copy of _id, if any, is replaced by ours
        let stored = StoredDocument {
            storage_id: Uuid::new_v4().simple().to_string(),
            document: strip_internal_id(document),
        };
        let created = stored.with_storage_id();
        collection.push(stored);
        Ok(created)
    }

    async fn find(&self, kind: ArtifactKind, id: &str) -> Result<Option<Value>> {
        let collections = self.collections.read();
        Ok(collections.get(&kind).and_then(|collection| {
            collection
                .iter()
                .find(|stored| document_id(&stored.document) == Some(id))
                .map(StoredDocument::with_storage_id)
        }))
    }

    async fn find_all(
        &self,
        kind: ArtifactKind,
        limit: usize,
        offset: usize,
        projection: &Projection,
    ) -> Result<Vec<Value>> {
        let collections = self.collections.read();
        let page = collections
            .get(&kind)
            .map(|collection| {
                collection
                    .iter()
                    .skip(offset)
                    .take(limit)
                    .map(|stored| projection.apply(stored.with_storage_id()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(page)
    }

    async fn count(&self, kind: ArtifactKind) -> Result<u64> {
        let collections = self.collections.read();
        Ok(collections.get(&kind).map(|c| c.len() as u64).unwrap_or(0))
    }

    async fn update(&self, kind: ArtifactKind, id: &str, document: Value) -> Result<Option<Value>> {
        let mut collections = self.collections.write();
        let Some(stored) = collections.get_mut(&kind).and_then(|collection| {
            collection
                .iter_mut()
                .find(|stored| document_id(&stored.document) == Some(id))
        }) else {
            return Ok(None);
        };

        stored.document = with_id(strip_internal_id(document), id);
        Ok(Some(stored.with_storage_id()))
    }

    async fn delete(&self, kind: ArtifactKind, id: &str) -> Result<bool> {
        let mut collections = self.collections.write();
        let Some(collection) = collections.get_mut(&kind) else {
            return Ok(false);
        };
        let before = collection.len();
        collection.retain(|stored| document_id(&stored.document) != Some(id));
        Ok(collection.len() != before)
    }
}
