//! Running statistics about sampling cycles, rendered by `/health`.

use herakles_cpu_usage_exporter::GatherOutcome;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

#[derive(Clone, Copy, Default)]
struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

#[derive(Default)]
struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// (current, average, max, min, count)
    fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Cycle statistics shared between the sampling task and `/health`.
pub struct HealthStats {
    started: Instant,
    cycle_duration_seconds: Stat,
    units_reported: Stat,
    total_cycles: AtomicU64,
    fetch_failures: AtomicU64,
    counter_regressions: AtomicU64,
    http_requests: AtomicU64,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            started: Instant::now(),
            cycle_duration_seconds: Stat::default(),
            units_reported: Stat::default(),
            total_cycles: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            counter_regressions: AtomicU64::new(0),
            http_requests: AtomicU64::new(0),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_cycle(&self, outcome: GatherOutcome, duration_seconds: f64) {
        self.total_cycles.fetch_add(1, Ordering::Relaxed);
        self.cycle_duration_seconds.add_sample(duration_seconds);

        match outcome {
            GatherOutcome::FetchFailed => {
                self.fetch_failures.fetch_add(1, Ordering::Relaxed);
            }
            GatherOutcome::Completed { emitted, aborted } => {
                self.units_reported.add_sample(emitted as f64);
                if aborted {
                    self.counter_regressions.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    pub fn record_http_request(&self) {
        self.http_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles.load(Ordering::Relaxed)
    }

    pub fn fetch_failures(&self) -> u64 {
        self.fetch_failures.load(Ordering::Relaxed)
    }

    pub fn counter_regressions(&self) -> u64 {
        self.counter_regressions.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn render_table(&self) -> String {
        let (cd_cur, cd_avg, cd_max, cd_min, _cd_count) = self.cycle_duration_seconds.snapshot();
        let (ur_cur, ur_avg, ur_max, ur_min, _ur_count) = self.units_reported.snapshot();

        let left_col = 26usize;
        let col_w = 12usize;

        let mut out = String::new();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "metric",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out, "{}", "-".repeat(left_col + 3 + (col_w + 3) * 4)).ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "cycle duration (s)",
            format!("{:.4}", cd_cur),
            format!("{:.4}", cd_avg),
            format!("{:.4}", cd_max),
            format!("{:.4}", cd_min),
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "units reported",
            format!("{:.0}", ur_cur),
            format!("{:.1}", ur_avg),
            format!("{:.0}", ur_max),
            format!("{:.0}", ur_min),
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "number of cycles:        {}", self.total_cycles()).ok();
        writeln!(out, "fetch failures:          {}", self.fetch_failures()).ok();
        writeln!(out, "counter regressions:     {}", self.counter_regressions()).ok();
        writeln!(
            out,
            "http requests:           {}",
            self.http_requests.load(Ordering::Relaxed)
        )
        .ok();
        writeln!(out, "uptime (s):              {}", self.uptime_seconds()).ok();

        out
    }
}
