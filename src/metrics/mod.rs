/*!
 * # Metrics Module
 *
 * In-process metrics for the storefront service.
 *
 * ## Features
 *
 * - HTTP request metrics (count, latency, status classes)
 * - Table API call metrics (count, errors, latency per operation)
 * - Rendering metrics (pages, blocks, unknown block types)
 *
 * ## Metrics Formats
 *
 * - Prometheus text format at `/metrics`
 * - JSON format at `/metrics/json`
 */

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to export metrics: {0}")]
    ExportError(String),
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Counter {
    value: Arc<AtomicU64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Upper bounds in seconds for histogram buckets.
const BUCKETS: [f64; 10] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Latency histogram; the sum is kept in microseconds so sub-second
/// observations are not truncated.
#[derive(Debug, Clone)]
pub struct Histogram {
    buckets: Arc<[AtomicU64; BUCKETS.len()]>,
    sum_micros: Arc<AtomicU64>,
    count: Arc<AtomicU64>,
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            buckets: Arc::new(std::array::from_fn(|_| AtomicU64::new(0))),
            sum_micros: Arc::new(AtomicU64::new(0)),
            count: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, seconds: f64) {
        for (bound, bucket) in BUCKETS.iter().zip(self.buckets.iter()) {
            if seconds <= *bound {
                bucket.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.sum_micros
            .fetch_add((seconds * 1_000_000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn get_sum(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }

    fn bucket_counts(&self) -> Vec<(f64, u64)> {
        BUCKETS
            .iter()
            .zip(self.buckets.iter())
            .map(|(bound, n)| (*bound, n.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Metric name plus an optional single label, e.g. `backend_requests_total{op="select"}`.
fn series(name: &str, label: Option<(&str, &str)>) -> String {
    match label {
        Some((key, value)) => format!("{name}{{{key}=\"{value}\"}}"),
        None => name.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: DashMap<String, Counter>,
    histograms: DashMap<String, Histogram>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create_counter(&self, name: &str) -> Counter {
        self.counters
            .entry(name.to_string())
            .or_insert_with(Counter::new)
            .clone()
    }

    pub fn get_or_create_histogram(&self, name: &str) -> Histogram {
        self.histograms
            .entry(name.to_string())
            .or_insert_with(Histogram::new)
            .clone()
    }

    pub fn counter_value(&self, name: &str) -> u64 {
        self.counters.get(name).map(|c| c.get()).unwrap_or(0)
    }

    /// Prometheus text exposition, series sorted for stable output.
    pub fn export_metrics(&self) -> Result<String, MetricsError> {
        use std::fmt::Write;

        let counters: BTreeMap<String, u64> = self
            .counters
            .iter()
            .map(|e| (e.key().clone(), e.value().get()))
            .collect();
        let histograms: BTreeMap<String, Histogram> = self
            .histograms
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let mut output = String::new();
        let mut last_family = String::new();
        let map_err = |e: std::fmt::Error| MetricsError::ExportError(e.to_string());

        for (name, value) in &counters {
            let family = name.split('{').next().unwrap_or(name);
            if family != last_family {
                writeln!(output, "# TYPE {} counter", family).map_err(map_err)?;
                last_family = family.to_string();
            }
            writeln!(output, "{} {}", name, value).map_err(map_err)?;
        }

        for (name, histogram) in &histograms {
            let (family, labels) = match name.split_once('{') {
                Some((family, rest)) => (family, rest.trim_end_matches('}')),
                None => (name.as_str(), ""),
            };
            writeln!(output, "# TYPE {} histogram", family).map_err(map_err)?;
            let sep = if labels.is_empty() { "" } else { "," };
            for (bound, count) in histogram.bucket_counts() {
                writeln!(output, "{family}_bucket{{{labels}{sep}le=\"{bound}\"}} {count}")
                    .map_err(map_err)?;
            }
            writeln!(
                output,
                "{family}_bucket{{{labels}{sep}le=\"+Inf\"}} {}",
                histogram.get_count()
            )
            .map_err(map_err)?;
            let suffix = if labels.is_empty() {
                String::new()
            } else {
                format!("{{{labels}}}")
            };
            writeln!(output, "{family}_count{suffix} {}", histogram.get_count()).map_err(map_err)?;
            writeln!(output, "{family}_sum{suffix} {}", histogram.get_sum()).map_err(map_err)?;
        }

        Ok(output)
    }

    pub fn export_metrics_json(&self) -> serde_json::Value {
        let counters: BTreeMap<String, u64> = self
            .counters
            .iter()
            .map(|e| (e.key().clone(), e.value().get()))
            .collect();
        let histograms: BTreeMap<String, serde_json::Value> = self
            .histograms
            .iter()
            .map(|e| {
                (
                    e.key().clone(),
                    json!({ "count": e.value().get_count(), "sum": e.value().get_sum() }),
                )
            })
            .collect();

        json!({
            "counters": counters,
            "histograms": histograms,
        })
    }
}

// Global metrics registry
lazy_static::lazy_static! {
    pub static ref METRICS: MetricsRegistry = MetricsRegistry::new();
}

pub fn increment_counter(name: &str) {
    METRICS.get_or_create_counter(name).inc();
}

pub fn observe_histogram(name: &str, value: f64) {
    METRICS.get_or_create_histogram(name).observe(value);
}

/// One table API round trip.
pub fn record_backend_call(op: &str, elapsed: Duration, ok: bool) {
    let label = Some(("op", op));
    increment_counter(&series("backend_requests_total", label));
    if !ok {
        increment_counter(&series("backend_errors_total", label));
    }
    observe_histogram(
        &series("backend_request_duration_seconds", label),
        elapsed.as_secs_f64(),
    );
    crate::tracing::log_slow_operation(op, elapsed, Duration::from_secs(2));
}

pub fn record_page_rendered() {
    increment_counter("pages_rendered_total");
}

pub fn record_block_rendered(block_type: &str, known: bool) {
    increment_counter(&series("blocks_rendered_total", Some(("type", block_type))));
    if !known {
        increment_counter("blocks_unknown_total");
    }
}

pub fn record_http_request(status: StatusCode, elapsed: Duration) {
    let class = match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    };
    increment_counter(&series("http_requests_total", Some(("status", class))));
    observe_histogram("http_request_duration_seconds", elapsed.as_secs_f64());
}

/// Middleware for automatic HTTP metrics collection
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let response = next.run(request).await;
    record_http_request(response.status(), started.elapsed());
    response
}

// HTTP endpoint handler for metrics
pub async fn metrics_handler() -> Result<Response, MetricsError> {
    let body = METRICS.export_metrics()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

pub async fn metrics_json_handler() -> Json<serde_json::Value> {
    Json(METRICS.export_metrics_json())
}
