//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers and used by the background sampling task.

use herakles_cpu_usage_exporter::Input;
use prometheus::Registry;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use crate::config::Config;
use crate::health_stats::HealthStats;
use crate::metrics::{ExporterMetrics, UsageMetrics};

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Bookkeeping about the most recent sampling cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleState {
    pub last_updated: Option<Instant>,
    pub last_success: bool,
    pub units_reported: usize,
}

/// Global application state shared across requests and background tasks.
pub struct AppState {
    pub registry: Registry,
    pub usage_metrics: UsageMetrics,
    /// `None` when internal telemetry is disabled.
    pub telemetry: Option<ExporterMetrics>,
    /// The CPU input; a whole cycle runs while this lock is held.
    pub input: Mutex<Box<dyn Input>>,
    pub config: Arc<Config>,
    pub health_stats: Arc<HealthStats>,
    pub cycle: RwLock<CycleState>,
}
