//! Prometheus metrics endpoint
//!
//! Exposes relay counters and histograms in Prometheus text format.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    let _ = &*PROMETHEUS_HANDLE;
    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "relay_requests_total",
        "Chat completion requests by outcome"
    );
    metrics::describe_counter!(
        "relay_auth_decisions_total",
        "Authentication decisions by result and matched path"
    );
    metrics::describe_counter!(
        "relay_upstream_errors_total",
        "Failed Gemini calls by error kind"
    );
    metrics::describe_counter!(
        "relay_tokens_estimated_total",
        "Estimated tokens processed"
    );
    metrics::describe_histogram!(
        "relay_request_duration_seconds",
        "Chat completion duration in seconds"
    );
}

/// Prometheus metrics endpoint handler
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a finished chat completion request
pub fn record_request(status: &str, model: &str, duration_secs: f64) {
    metrics::counter!(
        "relay_requests_total",
        "status" => status.to_string(),
        "model" => model.to_string()
    )
    .increment(1);
    metrics::histogram!("relay_request_duration_seconds", "model" => model.to_string())
        .record(duration_secs);
}

/// Record an authentication decision
pub fn record_auth_decision(result: &str, path: &str) {
    metrics::counter!(
        "relay_auth_decisions_total",
        "result" => result.to_string(),
        "path" => path.to_string()
    )
    .increment(1);
}

/// Record a failed upstream call
pub fn record_upstream_error(kind: &str) {
    metrics::counter!("relay_upstream_errors_total", "kind" => kind.to_string()).increment(1);
}

/// Record estimated tokens
pub fn record_tokens(token_type: &str, count: u64) {
    metrics::counter!("relay_tokens_estimated_total", "type" => token_type.to_string())
        .increment(count);
}
