use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use crate::domain::repositories::{EntityKind, EntityStore};

/// PostgreSQL implementation of EntityStore
///
/// Every record lives in a single `entities` table keyed by `(kind, id)`,
/// with the document stored as JSONB.
pub struct PostgresEntityStore {
    pool: PgPool,
}

impl PostgresEntityStore {
    /// Creates a new PostgresEntityStore
    ///
    /// # Arguments
    /// * `pool` - SQLx connection pool for PostgreSQL
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the backing table if it does not exist yet
    pub async fn migrate(&self) -> Result<(), String> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entities (
                kind TEXT NOT NULL,
                id TEXT NOT NULL,
                record JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (kind, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to create entities table: {}", e))?;

        Ok(())
    }
}

#[async_trait]
impl EntityStore for PostgresEntityStore {
    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Value>, String> {
        let row: Option<(Value,)> =
            sqlx::query_as("SELECT record FROM entities WHERE kind = $1 AND id = $2")
                .bind(kind.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| format!("Failed to load {} {}: {}", kind, id, e))?;

        Ok(row.map(|(record,)| record))
    }

    async fn put(&self, kind: EntityKind, id: &str, record: Value) -> Result<(), String> {
        sqlx::query(
            r#"
            INSERT INTO entities (kind, id, record, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (kind, id) DO UPDATE SET
                record = EXCLUDED.record,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(kind.as_str())
        .bind(id)
        .bind(record)
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to save {} {}: {}", kind, id, e))?;

        Ok(())
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<bool, String> {
        let result = sqlx::query("DELETE FROM entities WHERE kind = $1 AND id = $2")
            .bind(kind.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| format!("Failed to delete {} {}: {}", kind, id, e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self, kind: EntityKind) -> Result<Vec<Value>, String> {
        let rows: Vec<(Value,)> =
            sqlx::query_as("SELECT record FROM entities WHERE kind = $1 ORDER BY id")
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| format!("Failed to list {} records: {}", kind, e))?;

        Ok(rows.into_iter().map(|(record,)| record).collect())
    }
}
