use async_trait::async_trait;
use serde_json::Value;

use super::{BackendError, DataBackend, TableQuery};

/// Stand-in used when no table API is configured.
///
/// Reads return empty result sets so pages render as empty shells; every
/// write and the health ping fail with [`BackendError::NotConfigured`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl NullBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DataBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn select(&self, _table: &str, _query: &TableQuery) -> Result<Vec<Value>, BackendError> {
        Ok(Vec::new())
    }

    async fn insert(&self, _table: &str, _row: Value) -> Result<Value, BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn update(
        &self,
        _table: &str,
        _query: &TableQuery,
        _patch: Value,
    ) -> Result<Vec<Value>, BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn delete(&self, _table: &str, _query: &TableQuery) -> Result<u64, BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        Err(BackendError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn reads_are_empty_and_writes_fail() {
        let backend = NullBackend::new();
        assert!(backend
            .select("products", &TableQuery::new())
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            backend.insert("products", json!({})).await,
            Err(BackendError::NotConfigured)
        ));
        assert!(backend.ping().await.is_err());
    }
}
