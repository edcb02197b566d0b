use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use url::Url;

use super::{BackendError, DataBackend, TableQuery};
use crate::metrics;

/// PostgREST error body.
#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    message: Option<String>,
    code: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// Client for the hosted table API (`{base}/rest/v1/{table}`).
#[derive(Clone)]
pub struct RestBackend {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    bearer: String,
    schema: Option<String>,
}

impl RestBackend {
    /// `service_key`, when present, is sent as the bearer token so admin
    /// writes bypass row-level policies; reads then use the same identity.
    pub fn new(
        base_url: &str,
        anon_key: &str,
        service_key: Option<&str>,
        schema: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: normalize_base(base_url)?,
            api_key: anon_key.to_string(),
            bearer: service_key.unwrap_or(anon_key).to_string(),
            schema,
        })
    }

    fn table_url(&self, table: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(&format!("rest/v1/{table}"))
            .map_err(|e| BackendError::Transport(e.to_string()))
    }

    fn request(&self, method: Method, url: Url, writes: bool) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.bearer))
            .header(header::ACCEPT, "application/json");
        if writes {
            builder = builder.header("Prefer", "return=representation");
        }
        if let Some(schema) = &self.schema {
            let profile = if writes { "Content-Profile" } else { "Accept-Profile" };
            builder = builder.header(profile, schema);
        }
        builder
    }

    async fn send(&self, table: &str, op: &'static str, builder: RequestBuilder) -> Result<Vec<Value>, BackendError> {
        let started = Instant::now();
        let result = match builder.send().await {
            Ok(response) => read_rows(response).await,
            Err(err) => Err(BackendError::from(err)),
        };
        metrics::record_backend_call(op, started.elapsed(), result.is_ok());
        if let Err(err) = &result {
            warn!(table, op, error = %err, "table API call failed");
        }
        result
    }
}

fn normalize_base(raw: &str) -> anyhow::Result<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Ok(Url::parse(&with_slash)?)
}

async fn read_rows(response: Response) -> Result<Vec<Value>, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let parsed: PostgrestError = serde_json::from_str(&body).unwrap_or_default();
        let mut message = parsed.message.unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("error").to_string()
            } else {
                body.clone()
            }
        });
        if let Some(details) = parsed.details {
            message = format!("{message} ({details})");
        }
        if let Some(hint) = parsed.hint {
            debug!(hint = %hint, "table API hint");
        }
        return Err(BackendError::Api {
            status: status.as_u16(),
            code: parsed.code,
            message,
        });
    }

    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Array(rows)) => Ok(rows),
        Ok(Value::Null) => Ok(Vec::new()),
        Ok(single @ Value::Object(_)) => Ok(vec![single]),
        Ok(other) => Err(BackendError::Decode(format!("expected rows, got {other}"))),
        Err(e) => Err(BackendError::Decode(e.to_string())),
    }
}

#[async_trait]
impl DataBackend for RestBackend {
    fn name(&self) -> &'static str {
        "rest"
    }

    #[instrument(skip(self, query))]
    async fn select(&self, table: &str, query: &TableQuery) -> Result<Vec<Value>, BackendError> {
        let url = self.table_url(table)?;
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(query.to_query_pairs());
        let builder = self.request(Method::GET, url, false).query(&params);
        self.send(table, "select", builder).await
    }

    #[instrument(skip(self, row))]
    async fn insert(&self, table: &str, row: Value) -> Result<Value, BackendError> {
        let url = self.table_url(table)?;
        let builder = self.request(Method::POST, url, true).json(&row);
        self.send(table, "insert", builder)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode(format!("insert into {table} returned no row")))
    }

    #[instrument(skip(self, query, patch))]
    async fn update(
        &self,
        table: &str,
        query: &TableQuery,
        patch: Value,
    ) -> Result<Vec<Value>, BackendError> {
        let url = self.table_url(table)?;
        let builder = self
            .request(Method::PATCH, url, true)
            .query(&query.to_query_pairs())
            .json(&patch);
        self.send(table, "update", builder).await
    }

    #[instrument(skip(self, query))]
    async fn delete(&self, table: &str, query: &TableQuery) -> Result<u64, BackendError> {
        let url = self.table_url(table)?;
        let builder = self
            .request(Method::DELETE, url, true)
            .query(&query.to_query_pairs());
        Ok(self.send(table, "delete", builder).await?.len() as u64)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let url = self
            .base_url
            .join("rest/v1/")
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let response = self.request(Method::GET, url, false).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(BackendError::Api {
                status: response.status().as_u16(),
                code: None,
                message: "table API health probe failed".to_string(),
            })
        }
    }
}
