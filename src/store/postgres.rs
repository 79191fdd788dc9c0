use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use uuid::Uuid;

use crate::model::document::{document_id, set_field, strip_internal_id, with_id, INTERNAL_ID_FIELD};
use crate::model::{ArtifactKind, Projection};
use crate::store::traits::ArtifactStore;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS artifacts (
    storage_id UUID PRIMARY KEY,
    kind TEXT NOT NULL,
    artifact_id TEXT NOT NULL,
    body JSONB NOT NULL,
    seq BIGSERIAL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (kind, artifact_id)
)
"#;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Create the artifacts table if it is missing
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .context("Failed to create artifacts table")?;
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn attach_storage_id(body: Value, storage_id: Uuid) -> Value {
    set_field(
        body,
        INTERNAL_ID_FIELD,
        Value::String(storage_id.simple().to_string()),
    )
}

fn row_to_document(row: &sqlx::postgres::PgRow) -> Result<Value> {
    let storage_id: Uuid = row.try_get("storage_id").context("Missing storage_id column")?;
    let body: Value = row.try_get("body").context("Missing body column")?;
    Ok(attach_storage_id(body, storage_id))
}

#[async_trait::async_trait]
impl ArtifactStore for PostgresStore {
    async fn create(&self, kind: ArtifactKind, document: Value) -> Result<Value> {
        let id = document_id(&document)
            .ok_or_else(|| anyhow!("{} has no @id", kind.label()))?
            .to_string();
        let body = strip_internal_id(document);
        let storage_id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO artifacts (storage_id, kind, artifact_id, body) VALUES ($1, $2, $3, $4)",
        )
        .bind(storage_id)
        .bind(kind.as_str())
        .bind(&id)
        .bind(&body)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to insert {} '{}'", kind.label(), id))?;

        Ok(attach_storage_id(body, storage_id))
    }

    async fn find(&self, kind: ArtifactKind, id: &str) -> Result<Option<Value>> {
        let row = sqlx::query(
            "SELECT storage_id, body FROM artifacts WHERE kind = $1 AND artifact_id = $2",
        )
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to fetch {}", kind.label()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(row_to_document(&row)?))
    }

    async fn find_all(
        &self,
        kind: ArtifactKind,
        limit: usize,
        offset: usize,
        projection: &Projection,
    ) -> Result<Vec<Value>> {
        let rows = sqlx::query(
            "SELECT storage_id, body FROM artifacts WHERE kind = $1 ORDER BY seq LIMIT $2 OFFSET $3",
        )
        .bind(kind.as_str())
        .bind(i64::try_from(limit).context("limit out of range")?)
        .bind(i64::try_from(offset).context("offset out of range")?)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to list {}s", kind.label()))?;

        rows.iter()
            .map(|row| row_to_document(row).map(|doc| projection.apply(doc)))
            .collect()
    }

    async fn count(&self, kind: ArtifactKind) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM artifacts WHERE kind = $1")
            .bind(kind.as_str())
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count {}s", kind.label()))?;
        let total: i64 = row.try_get("total")?;
        Ok(total.max(0) as u64)
    }

    async fn update(&self, kind: ArtifactKind, id: &str, document: Value) -> Result<Option<Value>> {
        let body = with_id(strip_internal_id(document), id);
        let row = sqlx::query(
            "UPDATE artifacts SET body = $3, updated_at = NOW() \
             WHERE kind = $1 AND artifact_id = $2 RETURNING storage_id, body",
        )
        .bind(kind.as_str())
        .bind(id)
        .bind(&body)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to update {} '{}'", kind.label(), id))?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(row_to_document(&row)?))
    }

    async fn delete(&self, kind: ArtifactKind, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM artifacts WHERE kind = $1 AND artifact_id = $2")
            .bind(kind.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete {} '{}'", kind.label(), id))?;

        Ok(result.rows_affected() > 0)
    }
}
