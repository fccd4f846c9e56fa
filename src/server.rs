use crate::registry::MetricRegistry;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use log::error;
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

/// Encodes every gathered family in the Prometheus text format.
pub fn encode(registry: &MetricRegistry) -> prometheus::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    // TextEncoder only writes UTF-8.
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

pub fn router(registry: Arc<MetricRegistry>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(metrics))
        .with_state(registry)
}

async fn index() -> &'static str {
    "Nexus exporter. Metrics are served at /metrics\n"
}

async fn metrics(State(registry): State<Arc<MetricRegistry>>) -> Response {
    match encode(&registry) {
        Ok(text) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], text).into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}
