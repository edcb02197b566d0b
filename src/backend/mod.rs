//! Access to the hosted table API.
//!
//! Services talk to a [`DataBackend`] trait object. Three implementations
//! exist: [`RestBackend`] for the hosted PostgREST endpoint, [`MemoryBackend`]
//! for local development and tests, and [`NullBackend`] which is installed
//! when the endpoint or key is missing so the service still starts.

pub mod auth;
pub mod memory;
pub mod null;
pub mod query;
pub mod rest;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

pub use auth::{AuthBackend, AuthSession, AuthUserInfo, MemoryAuth, NullAuth, RestAuth, SignUpOutcome};
pub use memory::MemoryBackend;
pub use null::NullBackend;
pub use query::{Filter, Order, SortDirection, TableQuery};
pub use rest::RestBackend;

use crate::config::AppConfig;

/// Table names in the hosted store.
pub mod tables {
    pub const PRODUCTS: &str = "products";
    pub const PRODUCT_CATEGORIES: &str = "product_categories";
    pub const PRODUCT_IMAGES: &str = "product_images";
    pub const CATEGORIES: &str = "categories";
    pub const COLLECTIONS: &str = "collections";
    pub const COLLECTION_PRODUCTS: &str = "collection_products";
    pub const CMS_PAGES: &str = "cms_pages";
    pub const CMS_SECTIONS: &str = "cms_sections";
    pub const CMS_BLOCKS: &str = "cms_blocks";
    pub const CMS_MENUS: &str = "cms_menus";
    pub const CMS_MENU_ITEMS: &str = "cms_menu_items";
    pub const CMS_AD_ZONES: &str = "cms_ad_zones";
    pub const CMS_ADS: &str = "cms_ads";
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("data backend is not configured")]
    NotConfigured,

    #[error("backend request failed: {0}")]
    Transport(String),

    #[error("backend returned {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("unexpected backend payload: {0}")]
    Decode(String),
}

impl BackendError {
    /// Unique-constraint violations surface as PostgreSQL code 23505 or HTTP 409.
    pub fn is_conflict(&self) -> bool {
        matches!(self, BackendError::Api { status: 409, .. })
            || matches!(self, BackendError::Api { code: Some(code), .. } if code == "23505")
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// Row-level operations against the table API.
#[async_trait]
pub trait DataBackend: Send + Sync {
    /// Short identifier used in logs and health output.
    fn name(&self) -> &'static str;

    async fn select(&self, table: &str, query: &TableQuery) -> Result<Vec<Value>, BackendError>;

    /// Inserts one row and returns it as stored (with generated columns).
    async fn insert(&self, table: &str, row: Value) -> Result<Value, BackendError>;

    /// Applies `patch` to every matching row and returns the updated rows.
    async fn update(
        &self,
        table: &str,
        query: &TableQuery,
        patch: Value,
    ) -> Result<Vec<Value>, BackendError>;

    /// Deletes matching rows and returns how many were removed.
    async fn delete(&self, table: &str, query: &TableQuery) -> Result<u64, BackendError>;

    async fn ping(&self) -> Result<(), BackendError>;
}

pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, BackendError> {
    rows.into_iter().map(decode_row).collect()
}

pub fn decode_row<T: DeserializeOwned>(row: Value) -> Result<T, BackendError> {
    serde_json::from_value(row).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Backend pair selected from configuration.
pub struct Backends {
    pub data: Arc<dyn DataBackend>,
    pub auth: Arc<dyn AuthBackend>,
}

/// Chooses the data and auth backends for the configured mode.
///
/// A `rest` configuration without endpoint or key does not abort startup;
/// it degrades to the null backends and logs why.
pub async fn from_config(cfg: &AppConfig) -> anyhow::Result<Backends> {
    match cfg.data_backend.to_ascii_lowercase().as_str() {
        "memory" => {
            let data = match cfg.seed_file.as_deref() {
                Some(path) => MemoryBackend::from_seed_file(path).await?,
                None => MemoryBackend::new(),
            };
            Ok(Backends {
                data: Arc::new(data),
                auth: Arc::new(MemoryAuth::new()),
            })
        }
        _ => match (cfg.backend_url.as_deref(), cfg.backend_anon_key.as_deref()) {
            (Some(url), Some(key)) if !url.trim().is_empty() && !key.trim().is_empty() => {
                let timeout = std::time::Duration::from_secs(cfg.backend_timeout_secs);
                let data = RestBackend::new(
                    url,
                    key,
                    cfg.backend_service_key.as_deref(),
                    cfg.backend_schema.clone(),
                    timeout,
                )?;
                let auth = RestAuth::new(url, key, timeout)?;
                Ok(Backends {
                    data: Arc::new(data),
                    auth: Arc::new(auth),
                })
            }
            _ => {
                warn!("APP__BACKEND_URL or APP__BACKEND_ANON_KEY is not set; content reads will be empty and writes will fail");
                Ok(Backends {
                    data: Arc::new(NullBackend::new()),
                    auth: Arc::new(NullAuth),
                })
            }
        },
    }
}
