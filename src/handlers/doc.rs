//! Documentation endpoint handler.
//!
//! This module provides the `/doc` endpoint handler that displays
//! documentation for the exporter.

use axum::{extract::State, response::IntoResponse};
use tracing::{debug, instrument};

use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the /doc endpoint.
#[instrument(skip(state))]
pub async fn doc_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /doc request");

    state.health_stats.record_http_request();

    let version = env!("CARGO_PKG_VERSION");
    let cfg = &state.config;
    let doc = format!(
        r#"HERAKLES CPU USAGE EXPORTER - DOCUMENTATION
===========================================

VERSION: {}
DESCRIPTION: Prometheus exporter for per-state CPU utilization percentages

HTTP ENDPOINTS
--------------
GET /metrics     - Prometheus metrics endpoint
GET /health      - Health check with sampling statistics (plain text)
GET /doc         - This documentation (plain text)

AVAILABLE METRICS
-----------------
cpu_usage_user        - Time in user mode, guest time excluded (%)
cpu_usage_system      - Time in kernel mode (%)
cpu_usage_idle        - Idle time (%)
cpu_usage_nice        - Time in niced user mode, niced guest time excluded (%)
cpu_usage_iowait      - Idle time with outstanding I/O (%)
cpu_usage_irq         - Time servicing hardware interrupts (%)
cpu_usage_softirq     - Time servicing soft interrupts (%)
cpu_usage_steal       - Time stolen by the hypervisor (%)
cpu_usage_guest       - Time running guest vCPUs (%)
cpu_usage_guest_nice  - Time running niced guest vCPUs (%)
cpu_usage_active      - Everything but idle (%)

Every series carries a "unit" label: "cpu-total" for the whole host,
"cpu0", "cpu1", ... per core when collect_per_cpu is enabled.
Values cover the last sampling interval and are not clamped to 0..100.
The first cycle after start only records a baseline.

herakles_cpu_usage_cycle_duration_seconds  - Duration of the last cycle
herakles_cpu_usage_cycle_success           - Last cycle read counters (1/0)
herakles_cpu_usage_units_reported          - Units reported in last cycle
herakles_cpu_usage_scrape_duration_seconds - Duration of /metrics

CONFIGURATION
-------------
Config file locations (in order):
1. CLI specified: -c /path/to/config.yaml
2. System config: /etc/herakles/cpu-usage-exporter.yaml
3. Current directory: ./herakles-cpu-usage-exporter.yaml

Effective values:
- port: {}
- bind: {}
- interval: {}s
- collect_per_cpu: {}

{}
"#,
        version,
        cfg.port.unwrap_or(crate::config::DEFAULT_PORT),
        cfg.bind.as_deref().unwrap_or(crate::config::DEFAULT_BIND_ADDR),
        cfg.interval_seconds(),
        cfg.collect_per_cpu.unwrap_or(false),
        FOOTER_TEXT
    );

    ([("Content-Type", "text/plain; charset=utf-8")], doc)
}
