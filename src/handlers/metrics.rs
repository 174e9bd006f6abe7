//! Metrics endpoint handler for Prometheus scraping.
//!
//! The sampling task keeps the gauges current; this handler only encodes
//! the registry in Prometheus text format.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use prometheus::{Encoder, TextEncoder};
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::state::{AppState, SharedState};

/// Buffer capacity for metrics encoding.
const BUFFER_CAP: usize = 64 * 1024;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response()
    }
}

/// Handler for the /metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(State(state): State<SharedState>) -> Result<String, MetricsError> {
    let start = Instant::now();
    debug!("Processing /metrics request");

    state.health_stats.record_http_request();

    let body = render_metrics(&state)?;

    // Exported with the next scrape
    if let Some(telemetry) = &state.telemetry {
        telemetry
            .scrape_duration
            .set(start.elapsed().as_secs_f64());
    }

    Ok(body)
}

/// Encodes the registry in Prometheus text format.
///
/// Gathering happens under the usage read lock, so the output holds either
/// the previous cycle's units or the new cycle's, never a mix.
pub fn render_metrics(state: &AppState) -> Result<String, MetricsError> {
    let families = {
        let _guard = state.usage_metrics.read_lock();
        state.registry.gather()
    };

    let mut buffer = Vec::with_capacity(BUFFER_CAP);
    TextEncoder::new().encode(&families, &mut buffer).map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        MetricsError::EncodingFailed
    })?;

    debug!("Encoded {} metric families", families.len());
    String::from_utf8(buffer).map_err(|e| {
        error!("Metrics output is not valid UTF-8: {}", e);
        MetricsError::EncodingFailed
    })
}
