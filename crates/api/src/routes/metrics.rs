//! Prometheus exposition for the storefront's business metrics.
//!
//! The checkout and fulfillment paths record counters and histograms
//! (orders created/rejected, transaction retries, checkout outcomes and
//! duration); this route renders whatever the installed recorder holds.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// GET /metrics — renders the Prometheus exposition text.
pub async fn render(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
