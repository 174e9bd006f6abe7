//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! exporter health statistics.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

use crate::state::{CycleState, SharedState};

/// Footer text for human-readable HTTP endpoints.
pub const FOOTER_TEXT: &str = "Project: https://github.com/herakles-io/herakles-cpu-usage-exporter — More info: https://www.herakles.io — Support: proc-mem@herakles.io";

/// One-line summary of the last sampling cycle.
fn status_message(cycle: &CycleState) -> String {
    match (cycle.last_updated, cycle.last_success) {
        (None, _) => "No sampling cycle has run yet".to_string(),
        (Some(_), true) if cycle.units_reported == 0 => {
            "OK - No usage values this cycle (baseline or no elapsed CPU time)".to_string()
        }
        (Some(at), true) => format!(
            "OK - {} units reported {}s ago",
            cycle.units_reported,
            at.elapsed().as_secs()
        ),
        (Some(_), false) => "Reading CPU counters failed".to_string(),
    }
}

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    state.health_stats.record_http_request();

    let cycle = state.cycle.read().map(|c| *c).unwrap_or_default();

    // Derive HTTP status from the last sampling cycle
    let status = if cycle.last_success && cycle.last_updated.is_some() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let message = status_message(&cycle);

    // Render plain-text table from HealthStats
    let table = state.health_stats.render_table();

    debug!("Health check: {} - {}", status, message);
    (
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!("{message}\n\n{table}\n{FOOTER_TEXT}"),
    )
}
