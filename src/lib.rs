//! Core of herakles-cpu-usage-exporter.
//!
//! Turns the monotonically increasing per-state CPU time counters of the
//! operating system into utilization percentages, one interval at a time.
//!
//! - [`times`]: cumulative observations (`CpuTimes`)
//! - [`usage`]: the rate computation between two observations
//! - [`sampler`]: the stateful sampler holding the previous snapshot
//! - [`provider`]: where observations come from (`/proc/stat`, test data)
//! - [`sample`]: where computed metrics go
//! - [`input`]: the explicit input registry used by the exporter

pub mod input;
pub mod provider;
pub mod sample;
pub mod sampler;
pub mod times;
pub mod usage;

pub use input::{register_builtin_inputs, Input, InputConfig, InputRegistry};
pub use provider::{CpuTimesProvider, ProcStatProvider, ProviderError, TestDataProvider};
pub use sample::{MetricSink, Sample, SampleList};
pub use sampler::{CommonSettings, CpuSampler, CycleReport, GatherOutcome, METRIC_GROUP, UNIT_TAG};
pub use times::{CpuTimes, TOTAL_UNIT};
pub use usage::{compute_usage, CpuUsage, SkipReason, USAGE_FIELDS};
