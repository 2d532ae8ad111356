//! Append-only store of ingested dataset payloads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::sync::RwLock;

use dmis_common::{DmisError, DmisResult};

/// One ingested dataset payload.
#[derive(Debug, Clone)]
pub struct DatasetRecord {
    pub id: i64,
    pub source_name: String,
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}

/// Append-only access to ingested dataset payloads.
///
/// Records are never updated or deleted; "current data" for a source is
/// whichever record arrived last.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Append a payload under a source name, returning the new record id.
    async fn append(&self, source_name: &str, payload: Value) -> DmisResult<i64>;

    /// Distinct source names with at least one record.
    async fn list_sources(&self) -> DmisResult<Vec<String>>;

    /// The most recently received payload for a source. Ties on arrival
    /// time resolve toward the later insert.
    async fn latest(&self, source_name: &str) -> DmisResult<Value>;
}

/// PostgreSQL-backed dataset store.
pub struct PgDatasetStore {
    pool: PgPool,
}

impl PgDatasetStore {
    /// Create a new store connection from database URL.
    pub async fn connect(database_url: &str) -> DmisResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| DmisError::StorageError(format!("Connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> DmisResult<()> {
        // Split SQL statements and execute them individually
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| DmisError::StorageError(format!("Migration failed: {}", e)))?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl DatasetStore for PgDatasetStore {
    async fn append(&self, source_name: &str, payload: Value) -> DmisResult<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO dmis_data (data_source, json_data, received_at) \
             VALUES ($1, $2, $3) RETURNING data_id",
        )
        .bind(source_name)
        .bind(&payload)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DmisError::StorageError(format!("Insert failed: {}", e)))?;

        Ok(id)
    }

    async fn list_sources(&self) -> DmisResult<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT data_source FROM dmis_data ORDER BY data_source",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DmisError::StorageError(format!("Query failed: {}", e)))?;

        Ok(rows)
    }

    async fn latest(&self, source_name: &str) -> DmisResult<Value> {
        let row = sqlx::query_scalar::<_, Value>(
            "SELECT json_data FROM dmis_data WHERE data_source = $1 \
             ORDER BY received_at DESC, data_id DESC LIMIT 1",
        )
        .bind(source_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DmisError::StorageError(format!("Query failed: {}", e)))?;

        row.ok_or_else(|| DmisError::NotFound(format!("no records for source: {}", source_name)))
    }
}

/// In-memory dataset store for tests and local development.
#[derive(Default)]
pub struct MemoryDatasetStore {
    records: RwLock<Vec<DatasetRecord>>,
}

impl MemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatasetStore for MemoryDatasetStore {
    async fn append(&self, source_name: &str, payload: Value) -> DmisResult<i64> {
        let mut records = self.records.write().await;
        let id = records.len() as i64 + 1;
        records.push(DatasetRecord {
            id,
            source_name: source_name.to_string(),
            payload,
            received_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_sources(&self) -> DmisResult<Vec<String>> {
        let records = self.records.read().await;
        let mut sources: Vec<String> = records.iter().map(|r| r.source_name.clone()).collect();
        sources.sort();
        sources.dedup();
        Ok(sources)
    }

    async fn latest(&self, source_name: &str) -> DmisResult<Value> {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|r| r.source_name == source_name)
            .max_by(|a, b| {
                a.received_at
                    .cmp(&b.received_at)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|r| r.payload.clone())
            .ok_or_else(|| DmisError::NotFound(format!("no records for source: {}", source_name)))
    }
}

/// Database schema SQL.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS dmis_data (
    data_id BIGSERIAL PRIMARY KEY,
    data_source VARCHAR(100) NOT NULL,
    json_data JSONB NOT NULL,
    received_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_dmis_data_source_received
    ON dmis_data(data_source, received_at DESC)
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_append_assigns_increasing_ids() {
        let store = MemoryDatasetStore::new();
        let first = store.append("river-gauge", json!({"n": 1})).await.unwrap();
        let second = store.append("river-gauge", json!({"n": 2})).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_latest_returns_most_recent_append() {
        let store = MemoryDatasetStore::new();
        store.append("hub", json!({"n": 1})).await.unwrap();
        store.append("hub", json!({"n": 2})).await.unwrap();

        let latest = store.latest("hub").await.unwrap();
        assert_eq!(latest, json!({"n": 2}));
    }

    #[tokio::test]
    async fn test_latest_unknown_source_is_not_found() {
        let store = MemoryDatasetStore::new();
        let result = store.latest("nothing-here").await;
        assert!(matches!(result, Err(DmisError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_sources_distinct_and_sorted() {
        let store = MemoryDatasetStore::new();
        store.append("river-gauge", json!({})).await.unwrap();
        store.append("hub", json!({})).await.unwrap();
        store.append("river-gauge", json!({})).await.unwrap();

        let sources = store.list_sources().await.unwrap();
        assert_eq!(sources, vec!["hub", "river-gauge"]);
    }

    #[tokio::test]
    async fn test_sources_isolated_by_name() {
        let store = MemoryDatasetStore::new();
        store.append("hub", json!({"from": "hub"})).await.unwrap();
        store
            .append("river-gauge", json!({"from": "river-gauge"}))
            .await
            .unwrap();

        let latest = store.latest("hub").await.unwrap();
        assert_eq!(latest, json!({"from": "hub"}));
    }
}
