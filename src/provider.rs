//! Sources of cumulative CPU time observations.
//!
//! The sampler only depends on [`CpuTimesProvider`]. Two implementations ship
//! with the crate: [`ProcStatProvider`] reads the Linux `/proc/stat` file and
//! [`TestDataProvider`] replays snapshots recorded in a JSON file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::times::{CpuTimes, TOTAL_UNIT};

/// Default location of the kernel CPU accounting file.
pub const PROC_STAT_PATH: &str = "/proc/stat";

/// USER_HZ on virtually every Linux build; used when sysconf fails.
const FALLBACK_CLOCK_TICKS: f64 = 100.0;

/// Errors raised while fetching observations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed cpu line {line:?}: {reason}")]
    Parse { line: String, reason: String },
    #[error("no cpu lines found in {0}")]
    NoCpuLines(PathBuf),
    #[error("failed to parse test data JSON: {0}")]
    TestData(#[from] serde_json::Error),
    #[error("test data contains no snapshots")]
    EmptyTestData,
    #[error("test data snapshot {0} has no cpu units")]
    EmptySnapshot(usize),
}

/// Capability to fetch the current cumulative CPU times.
///
/// With `per_cpu` unset only the aggregate unit is returned, otherwise the
/// aggregate followed by one entry per core.
pub trait CpuTimesProvider: Send {
    fn cpu_times(&mut self, per_cpu: bool) -> Result<Vec<CpuTimes>, ProviderError>;
}

/// Reads CPU times from `/proc/stat`.
#[derive(Debug, Clone)]
pub struct ProcStatProvider {
    path: PathBuf,
    ticks_per_second: f64,
}

impl ProcStatProvider {
    pub fn new() -> Self {
        Self::with_path(PROC_STAT_PATH, clock_ticks_per_second())
    }

    pub fn with_path(path: impl Into<PathBuf>, ticks_per_second: f64) -> Self {
        Self {
            path: path.into(),
            ticks_per_second,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ticks_per_second(&self) -> f64 {
        self.ticks_per_second
    }
}

impl Default for ProcStatProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuTimesProvider for ProcStatProvider {
    fn cpu_times(&mut self, per_cpu: bool) -> Result<Vec<CpuTimes>, ProviderError> {
        let content = fs::read_to_string(&self.path).map_err(|source| ProviderError::Io {
            path: self.path.clone(),
            source,
        })?;

        let times = parse_proc_stat(&content, per_cpu, self.ticks_per_second)?;
        if times.is_empty() {
            return Err(ProviderError::NoCpuLines(self.path.clone()));
        }
        Ok(times)
    }
}

/// Returns the kernel clock tick rate (USER_HZ).
pub fn clock_ticks_per_second() -> f64 {
    // SAFETY: sysconf has no preconditions and only reads a system constant.
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 {
        ticks as f64
    } else {
        debug!("sysconf(_SC_CLK_TCK) failed, assuming {}", FALLBACK_CLOCK_TICKS);
        FALLBACK_CLOCK_TICKS
    }
}

/// Parses the `cpu` lines of `/proc/stat` content into observations.
///
/// Format: `cpu user nice system idle iowait irq softirq steal guest guest_nice`,
/// values in clock ticks. The aggregate `cpu` line is reported as `cpu-total`.
pub fn parse_proc_stat(
    content: &str,
    per_cpu: bool,
    ticks_per_second: f64,
) -> Result<Vec<CpuTimes>, ProviderError> {
    let mut out = Vec::new();

    for line in content.lines() {
        let Some(rest) = line.strip_prefix("cpu") else {
            continue;
        };

        let mut parts = rest.split_whitespace();
        let core = match rest.chars().next() {
            Some(c) if c.is_ascii_digit() => parts.next(),
            Some(c) if c.is_whitespace() => None,
            _ => continue,
        };

        if core.is_some() && !per_cpu {
            continue;
        }

        let values = parts
            .map(|v| v.parse::<u64>())
            .collect::<Result<Vec<u64>, _>>()
            .map_err(|e| ProviderError::Parse {
                line: line.to_string(),
                reason: e.to_string(),
            })?;

        if values.len() < 4 {
            return Err(ProviderError::Parse {
                line: line.to_string(),
                reason: format!("expected at least 4 fields, got {}", values.len()),
            });
        }

        let field = |idx: usize| values.get(idx).copied().unwrap_or(0) as f64 / ticks_per_second;

        out.push(CpuTimes {
            unit: match core {
                Some(n) => format!("cpu{n}"),
                None => TOTAL_UNIT.to_string(),
            },
            user: field(0),
            nice: field(1),
            system: field(2),
            idle: field(3),
            iowait: field(4),
            irq: field(5),
            softirq: field(6),
            steal: field(7),
            guest: field(8),
            guest_nice: field(9),
        });
    }

    Ok(out)
}

/// Root structure of a recorded test data file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuTestData {
    pub version: String,
    pub generated_at: String,
    /// One entry per cycle, each holding every unit's observation.
    pub snapshots: Vec<Vec<CpuTimes>>,
}

/// Replays recorded snapshots, one per fetch, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct TestDataProvider {
    snapshots: Vec<Vec<CpuTimes>>,
    next: usize,
}

impl TestDataProvider {
    pub fn new(data: CpuTestData) -> Result<Self, ProviderError> {
        if data.snapshots.is_empty() {
            return Err(ProviderError::EmptyTestData);
        }
        if let Some(idx) = data.snapshots.iter().position(Vec::is_empty) {
            return Err(ProviderError::EmptySnapshot(idx));
        }
        Ok(Self {
            snapshots: data.snapshots,
            next: 0,
        })
    }

    /// Loads a JSON test data file.
    pub fn from_file(path: &Path) -> Result<Self, ProviderError> {
        debug!("Loading CPU test data from: {}", path.display());

        let content = fs::read_to_string(path).map_err(|source| ProviderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let data: CpuTestData = serde_json::from_str(&content)?;

        info!(
            "Loaded CPU test data version {} generated at {} ({} snapshots)",
            data.version,
            data.generated_at,
            data.snapshots.len()
        );

        Self::new(data)
    }
}

impl CpuTimesProvider for TestDataProvider {
    fn cpu_times(&mut self, per_cpu: bool) -> Result<Vec<CpuTimes>, ProviderError> {
        let idx = self.next;
        self.next = (self.next + 1) % self.snapshots.len();

        let times: Vec<CpuTimes> = self.snapshots[idx]
            .iter()
            .filter(|t| per_cpu || t.unit == TOTAL_UNIT)
            .cloned()
            .collect();
        if times.is_empty() {
            return Err(ProviderError::EmptySnapshot(idx));
        }
        Ok(times)
    }
}
