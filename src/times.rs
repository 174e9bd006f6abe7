//! Cumulative CPU time observations.
//!
//! A `CpuTimes` value is one reading of the seconds a CPU unit has spent in
//! each scheduler state since boot. Readings only mean something relative to
//! an earlier reading of the same unit.

use serde::{Deserialize, Serialize};

/// Identifier of the aggregate unit covering all cores.
pub const TOTAL_UNIT: &str = "cpu-total";

/// Seconds accounted to each CPU state for one unit, cumulative since boot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuTimes {
    /// Unit identifier, e.g. `cpu-total` or `cpu3`.
    #[serde(alias = "cpu")]
    pub unit: String,
    #[serde(default)]
    pub user: f64,
    #[serde(default)]
    pub system: f64,
    #[serde(default)]
    pub idle: f64,
    #[serde(default)]
    pub nice: f64,
    #[serde(default)]
    pub iowait: f64,
    #[serde(default)]
    pub irq: f64,
    #[serde(default)]
    pub softirq: f64,
    #[serde(default)]
    pub steal: f64,
    /// Already contained in `user`.
    #[serde(default)]
    pub guest: f64,
    /// Already contained in `nice`.
    #[serde(default)]
    pub guest_nice: f64,
}

impl CpuTimes {
    /// Creates an all-zero observation for `unit`.
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            ..Default::default()
        }
    }

    /// Total accounted time. Guest time is left out since the kernel already
    /// counts it in `user` and `nice`.
    pub fn total(&self) -> f64 {
        self.user
            + self.system
            + self.nice
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
            + self.idle
    }

    /// Time spent doing anything but idling.
    pub fn active(&self) -> f64 {
        self.total() - self.idle
    }
}
