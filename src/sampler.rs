//! The stateful CPU usage sampler.
//!
//! `CpuSampler` keeps the observations of the previous cycle and turns each
//! new batch into per-unit percentages. The previous snapshot is replaced as
//! a whole at the end of every cycle whose fetch succeeded, whether or not
//! anything could be computed, so a bad cycle never leaves stale baselines
//! behind.

use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, trace, warn};

use crate::provider::CpuTimesProvider;
use crate::sample::MetricSink;
use crate::times::CpuTimes;
use crate::usage::{compute_usage, CpuUsage, SkipReason};

/// Name the sampler is registered under.
pub const INPUT_NAME: &str = "cpu";

/// Metric group prefix, e.g. `cpu_usage_user`.
pub const METRIC_GROUP: &str = "cpu_usage";

/// Tag carrying the unit identifier.
pub const UNIT_TAG: &str = "unit";

/// Settings shared by every input, independent of what it collects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonSettings {
    /// Gather interval in seconds; `None` lets the host decide.
    #[serde(default)]
    pub interval_seconds: Option<u64>,
    /// Extra labels attached to every emitted sample.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Usage computed for one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitUsage {
    pub unit: String,
    pub usage: CpuUsage,
}

/// A counter regression that ended a cycle early.
#[derive(Debug, Clone, PartialEq)]
pub struct Regression {
    pub unit: String,
    pub delta: f64,
}

/// Result of one sampling cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Computed usages in input order.
    pub usages: Vec<UnitUsage>,
    /// Set when there was no previous snapshot to compare against.
    pub baseline_only: bool,
    /// Set when a regression aborted the remaining units.
    pub regression: Option<Regression>,
}

/// What a gather did, for the host's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatherOutcome {
    /// Observations could not be fetched; nothing changed.
    FetchFailed,
    /// The cycle ran; `emitted` units were pushed to the sink.
    Completed { emitted: usize, aborted: bool },
}

/// Converts cumulative CPU times into utilization percentages.
pub struct CpuSampler {
    provider: Box<dyn CpuTimesProvider>,
    last_stats: HashMap<String, CpuTimes>,
    collect_per_cpu: bool,
    settings: CommonSettings,
}

impl CpuSampler {
    pub fn new(
        provider: Box<dyn CpuTimesProvider>,
        collect_per_cpu: bool,
        settings: CommonSettings,
    ) -> Self {
        Self {
            provider,
            last_stats: HashMap::new(),
            collect_per_cpu,
            settings,
        }
    }

    /// Observations retained from the last cycle, keyed by unit.
    pub fn last_stats(&self) -> &HashMap<String, CpuTimes> {
        &self.last_stats
    }

    /// Forgets the previous snapshot; the next cycle only sets a baseline.
    pub fn reset(&mut self) {
        self.last_stats.clear();
    }

    /// Computes usages for `current` against the stored snapshot, then
    /// replaces the snapshot with `current`.
    pub fn run_cycle(&mut self, current: Vec<CpuTimes>) -> CycleReport {
        let mut report = CycleReport {
            baseline_only: self.last_stats.is_empty(),
            ..Default::default()
        };

        if !report.baseline_only {
            for cts in &current {
                let Some(last) = self.last_stats.get(&cts.unit) else {
                    trace!("No previous sample for {}, skipping", cts.unit);
                    continue;
                };

                match compute_usage(last, cts) {
                    Ok(usage) => report.usages.push(UnitUsage {
                        unit: cts.unit.clone(),
                        usage,
                    }),
                    Err(SkipReason::ZeroElapsed) => {
                        trace!("No CPU time elapsed for {}, skipping", cts.unit);
                    }
                    Err(reason @ SkipReason::CounterRegression { delta }) => {
                        warn!("{} on {}, aborting this cycle", reason, cts.unit);
                        report.regression = Some(Regression {
                            unit: cts.unit.clone(),
                            delta,
                        });
                        break;
                    }
                }
            }
        }

        self.last_stats = current
            .into_iter()
            .map(|cts| (cts.unit.clone(), cts))
            .collect();

        report
    }

    /// Fetches observations, runs a cycle and emits every computed usage.
    pub fn gather(&mut self, sink: &mut dyn MetricSink) -> GatherOutcome {
        let times = match self.provider.cpu_times(self.collect_per_cpu) {
            Ok(times) => times,
            Err(e) => {
                error!("Failed to get cpu metrics: {}", e);
                return GatherOutcome::FetchFailed;
            }
        };

        let report = self.run_cycle(times);

        for entry in &report.usages {
            let mut tags = self.settings.labels.clone();
            tags.insert(UNIT_TAG.to_string(), entry.unit.clone());
            sink.push_samples(METRIC_GROUP, &entry.usage.fields(), &tags);
        }

        GatherOutcome::Completed {
            emitted: report.usages.len(),
            aborted: report.regression.is_some(),
        }
    }
}
