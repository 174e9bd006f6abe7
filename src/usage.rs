//! Rate computation between two CPU time observations.
//!
//! Percentages are relative to the total accounted time that elapsed between
//! the two readings. Values are not clamped: the kernel updates the per-state
//! counters at slightly different instants, so a single state can land a bit
//! outside `0..=100`.

use serde::Serialize;
use thiserror::Error;

use crate::times::CpuTimes;

/// Field names of a [`CpuUsage`], in export order.
pub const USAGE_FIELDS: [&str; 11] = [
    "user",
    "system",
    "idle",
    "nice",
    "iowait",
    "irq",
    "softirq",
    "steal",
    "guest",
    "guest_nice",
    "active",
];

/// Utilization percentages of one unit over one sampling interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CpuUsage {
    pub user: f64,
    pub system: f64,
    pub idle: f64,
    pub nice: f64,
    pub iowait: f64,
    pub irq: f64,
    pub softirq: f64,
    pub steal: f64,
    pub guest: f64,
    pub guest_nice: f64,
    pub active: f64,
}

impl CpuUsage {
    /// Returns `(name, percent)` pairs in [`USAGE_FIELDS`] order.
    pub fn fields(&self) -> [(&'static str, f64); 11] {
        [
            ("user", self.user),
            ("system", self.system),
            ("idle", self.idle),
            ("nice", self.nice),
            ("iowait", self.iowait),
            ("irq", self.irq),
            ("softirq", self.softirq),
            ("steal", self.steal),
            ("guest", self.guest),
            ("guest_nice", self.guest_nice),
            ("active", self.active),
        ]
    }
}

/// Why no usage could be derived for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SkipReason {
    /// Total time went backwards; the whole batch of counters is suspect.
    #[error("current total CPU time is less than previous total CPU time (delta {delta:.3}s)")]
    CounterRegression { delta: f64 },
    /// No time elapsed between the two readings.
    #[error("no CPU time elapsed since the previous sample")]
    ZeroElapsed,
}

/// Derives per-state percentages from two readings of the same unit.
pub fn compute_usage(prior: &CpuTimes, current: &CpuTimes) -> Result<CpuUsage, SkipReason> {
    let total_delta = current.total() - prior.total();

    if total_delta < 0.0 {
        return Err(SkipReason::CounterRegression { delta: total_delta });
    }
    if total_delta == 0.0 {
        return Err(SkipReason::ZeroElapsed);
    }

    let pct = |delta: f64| 100.0 * delta / total_delta;
    let guest = current.guest - prior.guest;
    let guest_nice = current.guest_nice - prior.guest_nice;

    Ok(CpuUsage {
        user: pct(current.user - prior.user - guest),
        system: pct(current.system - prior.system),
        idle: pct(current.idle - prior.idle),
        nice: pct(current.nice - prior.nice - guest_nice),
        iowait: pct(current.iowait - prior.iowait),
        irq: pct(current.irq - prior.irq),
        softirq: pct(current.softirq - prior.softirq),
        steal: pct(current.steal - prior.steal),
        guest: pct(guest),
        guest_nice: pct(guest_nice),
        active: pct(current.active() - prior.active()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn times(user: f64, system: f64, idle: f64) -> CpuTimes {
        CpuTimes {
            unit: "cpu-total".into(),
            user,
            system,
            idle,
            ..Default::default()
        }
    }

    #[test]
    fn test_rate_correctness() {
        let prior = times(100.0, 50.0, 800.0);
        let current = times(120.0, 55.0, 850.0);

        let usage = compute_usage(&prior, &current).unwrap();

        assert!((usage.user - 100.0 * 20.0 / 75.0).abs() < EPS);
        assert!((usage.system - 100.0 * 5.0 / 75.0).abs() < EPS);
        assert!((usage.idle - 100.0 * 50.0 / 75.0).abs() < EPS);
        let active_delta = (current.total() - current.idle) - (prior.total() - prior.idle);
        assert!((usage.active - 100.0 * active_delta / 75.0).abs() < EPS);
        assert!((usage.active - 100.0 * 25.0 / 75.0).abs() < EPS);
        assert_eq!(usage.iowait, 0.0);
        assert_eq!(usage.guest, 0.0);
    }

    #[test]
    fn test_guest_time_subtracted_from_user() {
        let mut prior = times(100.0, 0.0, 0.0);
        prior.guest = 10.0;
        let mut current = times(130.0, 0.0, 10.0);
        current.guest = 30.0;

        let usage = compute_usage(&prior, &current).unwrap();

        // total delta = 30 user + 10 idle
        assert!((usage.user - 25.0).abs() < EPS);
        assert!((usage.guest - 50.0).abs() < EPS);
        assert!((usage.idle - 25.0).abs() < EPS);
    }

    #[test]
    fn test_guest_nice_subtracted_from_nice() {
        let mut prior = times(0.0, 0.0, 0.0);
        prior.nice = 10.0;
        prior.guest_nice = 2.0;
        let mut current = times(0.0, 0.0, 10.0);
        current.nice = 20.0;
        current.guest_nice = 6.0;

        let usage = compute_usage(&prior, &current).unwrap();

        assert!((usage.nice - 30.0).abs() < EPS);
        assert!((usage.guest_nice - 20.0).abs() < EPS);
        assert!((usage.active - 50.0).abs() < EPS);
    }

    #[test]
    fn test_regression_is_reported() {
        let prior = times(100.0, 50.0, 800.0);
        let current = times(90.0, 50.0, 800.0);

        let err = compute_usage(&prior, &current).unwrap_err();

        assert_eq!(err, SkipReason::CounterRegression { delta: -10.0 });
    }

    #[test]
    fn test_zero_elapsed_is_skipped() {
        let prior = times(100.0, 50.0, 800.0);

        let err = compute_usage(&prior, &prior.clone()).unwrap_err();

        assert_eq!(err, SkipReason::ZeroElapsed);
    }

    #[test]
    fn test_values_are_not_clamped() {
        // idle counter ran ahead of the others: idle exceeds 100%, user goes negative
        let prior = times(100.0, 0.0, 100.0);
        let current = times(99.0, 0.0, 111.0);

        let usage = compute_usage(&prior, &current).unwrap();

        assert!((usage.idle - 110.0).abs() < EPS);
        assert!((usage.user + 10.0).abs() < EPS);
    }

    #[test]
    fn test_fields_follow_export_order() {
        let usage = CpuUsage {
            steal: 1.5,
            ..Default::default()
        };
        let names: Vec<&str> = usage.fields().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, USAGE_FIELDS);
        assert_eq!(usage.fields()[7], ("steal", 1.5));
    }
}
