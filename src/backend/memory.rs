use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{BackendError, DataBackend, TableQuery};

/// Table store held in process memory.
///
/// Rows get an `id` and timestamps on insert the way the hosted store's
/// column defaults would assign them.
#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a backend from `{ "table": [rows...] }`.
    pub fn with_tables(seed: HashMap<String, Vec<Value>>) -> Self {
        Self {
            tables: RwLock::new(seed),
        }
    }

    pub async fn from_seed_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let seed: HashMap<String, Vec<Value>> = serde_json::from_str(&raw)?;
        let rows: usize = seed.values().map(Vec::len).sum();
        info!(
            "Seeded in-memory backend from {} ({} tables, {} rows)",
            path.display(),
            seed.len(),
            rows
        );
        Ok(Self::with_tables(seed))
    }

    /// Number of rows currently stored in `table`.
    pub async fn count(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

fn as_object(row: Value) -> Result<Map<String, Value>, BackendError> {
    match row {
        Value::Object(map) => Ok(map),
        other => Err(BackendError::Decode(format!(
            "row must be a JSON object, got {other}"
        ))),
    }
}

#[async_trait]
impl DataBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn select(&self, table: &str, query: &TableQuery) -> Result<Vec<Value>, BackendError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .map(|rows| query.apply(rows))
            .unwrap_or_default())
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, BackendError> {
        let mut row = as_object(row)?;
        let now = Value::String(Utc::now().to_rfc3339());

        if row.get("id").map_or(true, Value::is_null) {
            row.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        }
        row.entry("created_at").or_insert_with(|| now.clone());
        row.entry("updated_at").or_insert(now);

        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();
        if rows.iter().any(|existing| existing.get("id") == row.get("id")) {
            return Err(BackendError::Api {
                status: 409,
                code: Some("23505".into()),
                message: format!("duplicate key value violates unique constraint on {table}.id"),
            });
        }

        let row = Value::Object(row);
        rows.push(row.clone());
        debug!(table, "inserted row");
        Ok(row)
    }

    async fn update(
        &self,
        table: &str,
        query: &TableQuery,
        patch: Value,
    ) -> Result<Vec<Value>, BackendError> {
        let patch = as_object(patch)?;
        let now = Value::String(Utc::now().to_rfc3339());

        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|r| query.matches(r)) {
            if let Value::Object(map) = &mut *row {
                for (key, value) in &patch {
                    map.insert(key.clone(), value.clone());
                }
                if !patch.contains_key("updated_at") {
                    map.insert("updated_at".into(), now.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, query: &TableQuery) -> Result<u64, BackendError> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !query.matches(r));
        Ok((before - rows.len()) as u64)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_assigns_id_and_timestamps() {
        let backend = MemoryBackend::new();
        let row = backend
            .insert("cms_pages", json!({"title": "Home", "locale": "en"}))
            .await
            .unwrap();

        assert!(Uuid::parse_str(row["id"].as_str().unwrap()).is_ok());
        assert!(row["created_at"].is_string());
        assert_eq!(backend.count("cms_pages").await, 1);
    }

    #[tokio::test]
    async fn duplicate_ids_conflict() {
        let backend = MemoryBackend::new();
        backend.insert("t", json!({"id": "x"})).await.unwrap();
        let err = backend.insert("t", json!({"id": "x"})).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn update_and_delete_follow_filters() {
        let backend = MemoryBackend::new();
        backend.insert("t", json!({"id": "1", "locale": "en"})).await.unwrap();
        backend.insert("t", json!({"id": "2", "locale": "ar"})).await.unwrap();

        let updated = backend
            .update("t", &TableQuery::new().eq("locale", "ar"), json!({"title": "مرحبا"}))
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["title"], "مرحبا");

        let removed = backend
            .delete("t", &TableQuery::new().eq("id", "1"))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(backend.count("t").await, 1);
    }

    #[tokio::test]
    async fn rejects_non_object_rows() {
        let backend = MemoryBackend::new();
        assert!(matches!(
            backend.insert("t", json!([1, 2])).await,
            Err(BackendError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn loads_seed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"{"categories": [{"id": "c1", "locale": "en", "slug": "apparel"}]}"#,
        )
        .unwrap();

        let backend = MemoryBackend::from_seed_file(file.path()).await.unwrap();
        assert_eq!(backend.count("categories").await, 1);
        assert!(MemoryBackend::from_seed_file("/nonexistent/seed.json").await.is_err());
    }

    #[tokio::test]
    async fn missing_table_selects_nothing() {
        let backend = MemoryBackend::new();
        let rows = backend.select("nope", &TableQuery::new()).await.unwrap();
        assert!(rows.is_empty());
    }
}
