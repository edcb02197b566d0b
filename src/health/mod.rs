/*!
 * # Health Check Module
 *
 * - Basic health check (`/health`) - process is up
 * - Readiness check (`/health/ready`) - pings the content backend
 * - Version (`/health/version`) - build information
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, error};

use crate::backend::BackendError;
use crate::AppState;

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
    Degraded,
}

/// Health check detail
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthDetail {
    pub status: HealthStatus,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Overall readiness information
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub details: HashMap<String, HealthDetail>,
}

impl HealthInfo {
    fn status_code(&self) -> StatusCode {
        match self.status {
            HealthStatus::Up | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// An unconfigured backend still serves requests (empty reads), so it is
/// reported as degraded rather than down.
async fn check_backend(state: &AppState) -> HealthDetail {
    let started = Instant::now();
    let result = state.backend.ping().await;
    let latency_ms = Some(started.elapsed().as_millis() as u64);
    match result {
        Ok(()) => HealthDetail {
            status: HealthStatus::Up,
            message: Some(state.backend.name().to_string()),
            latency_ms,
        },
        Err(BackendError::NotConfigured) => HealthDetail {
            status: HealthStatus::Degraded,
            message: Some("content backend is not configured".to_string()),
            latency_ms: None,
        },
        Err(err) => {
            error!("Backend health check failed: {}", err);
            HealthDetail {
                status: HealthStatus::Down,
                message: Some(err.to_string()),
                latency_ms,
            }
        }
    }
}

/// Runs every dependency check and folds them into one status
pub async fn collect_health(state: &AppState) -> HealthInfo {
    let mut details = HashMap::new();
    details.insert("backend".to_string(), check_backend(state).await);

    let any_down = details.values().any(|d| d.status == HealthStatus::Down);
    let any_degraded = details.values().any(|d| d.status == HealthStatus::Degraded);
    let status = if any_down {
        HealthStatus::Down
    } else if any_degraded {
        HealthStatus::Degraded
    } else {
        HealthStatus::Up
    };

    HealthInfo {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        details,
    }
}

/// Returns build and version information
pub async fn version_info() -> impl IntoResponse {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "commit": option_env!("GIT_HASH").unwrap_or("unknown"),
        "built": option_env!("BUILD_TIME").unwrap_or("unknown"),
    }))
}

/// Basic health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Health check endpoint called");
    (
        StatusCode::OK,
        Json(json!({
            "status": HealthStatus::Up,
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_seconds": state.started_at.elapsed().as_secs(),
            "timestamp": Utc::now(),
        })),
    )
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Readiness check endpoint called");
    let health = collect_health(&state).await;
    (health.status_code(), Json(health))
}

/// Creates router with health check endpoints
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/version", get(version_info))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_still_reports_ok() {
        let info = HealthInfo {
            status: HealthStatus::Degraded,
            version: "0".into(),
            timestamp: Utc::now(),
            uptime_seconds: 0,
            details: HashMap::new(),
        };
        assert_eq!(info.status_code(), StatusCode::OK);
    }

    #[test]
    fn down_is_unavailable() {
        let info = HealthInfo {
            status: HealthStatus::Down,
            version: "0".into(),
            timestamp: Utc::now(),
            uptime_seconds: 0,
            details: HashMap::new(),
        };
        assert_eq!(info.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
