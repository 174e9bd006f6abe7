//! Sampling cycle driver.
//!
//! Runs one gather on the CPU input and publishes the result to the
//! Prometheus gauges, the telemetry gauges and the health statistics.

use herakles_cpu_usage_exporter::{GatherOutcome, SampleList};
use std::sync::PoisonError;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::state::{AppState, CycleState};

/// Runs one sampling cycle and publishes its samples.
#[instrument(skip(state))]
pub fn run_cycle(state: &AppState) -> GatherOutcome {
    let start = Instant::now();
    let mut samples = SampleList::new();

    let outcome = {
        let mut input = state.input.lock().unwrap_or_else(PoisonError::into_inner);
        input.gather(&mut samples)
    };
    let duration = start.elapsed().as_secs_f64();

    // Only this cycle's units stay exported
    state.usage_metrics.publish(samples.iter());

    let (success, units) = match outcome {
        GatherOutcome::FetchFailed => (false, 0),
        GatherOutcome::Completed { emitted, .. } => (true, emitted),
    };

    if let Some(telemetry) = &state.telemetry {
        telemetry.cycle_duration.set(duration);
        telemetry.cycle_success.set(if success { 1.0 } else { 0.0 });
        telemetry.units_reported.set(units as f64);
    }

    state.health_stats.record_cycle(outcome, duration);

    if let Ok(mut cycle) = state.cycle.write() {
        *cycle = CycleState {
            last_updated: Some(start),
            last_success: success,
            units_reported: units,
        };
    }

    match outcome {
        GatherOutcome::Completed {
            emitted: 0,
            aborted: false,
        } => debug!("Sampling cycle produced no usage values (baseline or idle counters)"),
        GatherOutcome::Completed { emitted, aborted } => info!(
            "Sampling cycle completed: {} units, {} samples{}, {:.2}ms",
            emitted,
            samples.len(),
            if aborted { " (aborted on counter regression)" } else { "" },
            duration * 1000.0
        ),
        GatherOutcome::FetchFailed => debug!("Sampling cycle skipped: CPU counters unavailable"),
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::handlers::metrics::render_metrics;
    use crate::health_stats::HealthStats;
    use crate::metrics::{ExporterMetrics, UsageMetrics};
    use herakles_cpu_usage_exporter::provider::CpuTestData;
    use herakles_cpu_usage_exporter::{
        CommonSettings, CpuSampler, CpuTimes, CpuTimesProvider, ProviderError, TestDataProvider,
    };
    use prometheus::{Encoder, Registry, TextEncoder};
    use std::sync::{Arc, Mutex, RwLock};

    fn snapshot(user: f64, idle: f64) -> Vec<CpuTimes> {
        vec![CpuTimes {
            user,
            idle,
            ..CpuTimes::new("cpu-total")
        }]
    }

    fn state_with(snapshots: Vec<Vec<CpuTimes>>) -> AppState {
        let provider = TestDataProvider::new(CpuTestData {
            version: "1.0".into(),
            generated_at: "2024-01-01T00:00:00Z".into(),
            snapshots,
        })
        .unwrap();
        let registry = Registry::new();
        let usage_metrics = UsageMetrics::new(&registry, &[]).unwrap();
        let telemetry = Some(ExporterMetrics::new(&registry).unwrap());

        AppState {
            registry,
            usage_metrics,
            telemetry,
            input: Mutex::new(Box::new(CpuSampler::new(
                Box::new(provider),
                false,
                CommonSettings::default(),
            ))),
            config: Arc::new(Config::default()),
            health_stats: Arc::new(HealthStats::new()),
            cycle: RwLock::new(CycleState::default()),
        }
    }

    fn render(state: &AppState) -> String {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&state.registry.gather(), &mut buf)
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_cycles_publish_usage_after_baseline() {
        let state = state_with(vec![
            snapshot(100.0, 100.0),
            snapshot(150.0, 150.0),
            snapshot(150.0, 150.0),
        ]);

        let first = run_cycle(&state);
        assert_eq!(
            first,
            GatherOutcome::Completed {
                emitted: 0,
                aborted: false
            }
        );
        assert!(!render(&state).contains("cpu_usage_user{"));

        run_cycle(&state);
        let out = render(&state);
        assert!(out.contains(r#"cpu_usage_user{unit="cpu-total"} 50"#));
        assert!(out.contains("herakles_cpu_usage_units_reported 1"));

        // Zero elapsed: the previous values must not linger
        run_cycle(&state);
        assert!(!render(&state).contains("cpu_usage_user{"));

        let cycle = *state.cycle.read().unwrap();
        assert!(cycle.last_success);
        assert_eq!(cycle.units_reported, 0);
        assert_eq!(state.health_stats.total_cycles(), 3);
    }

    /// Counters that advance on every fetch, so every cycle after the
    /// baseline reports all units.
    struct Advancing {
        fetches: f64,
        cores: usize,
    }

    impl CpuTimesProvider for Advancing {
        fn cpu_times(&mut self, _per_cpu: bool) -> Result<Vec<CpuTimes>, ProviderError> {
            self.fetches += 1.0;
            let n = self.fetches;
            let mut times = vec![CpuTimes {
                user: n * self.cores as f64,
                idle: n * self.cores as f64,
                ..CpuTimes::new("cpu-total")
            }];
            times.extend((0..self.cores).map(|i| CpuTimes {
                user: n,
                idle: n,
                ..CpuTimes::new(format!("cpu{i}"))
            }));
            Ok(times)
        }
    }

    #[test]
    fn test_scrapes_never_see_partial_cycles() {
        const CORES: usize = 16;
        let mut state = state_with(vec![snapshot(1.0, 1.0)]);
        state.input = Mutex::new(Box::new(CpuSampler::new(
            Box::new(Advancing {
                fetches: 0.0,
                cores: CORES,
            }),
            true,
            CommonSettings::default(),
        )));
        let state = Arc::new(state);

        run_cycle(&state);
        run_cycle(&state);

        let writer = {
            let state = state.clone();
            std::thread::spawn(move || {
                for _ in 0..2000 {
                    run_cycle(&state);
                }
            })
        };

        let mut scrapes = 0;
        while !writer.is_finished() || scrapes == 0 {
            let out = render_metrics(&state).unwrap();
            let units = out
                .lines()
                .filter(|l| l.starts_with("cpu_usage_user{"))
                .count();
            assert_eq!(units, CORES + 1, "scrape {scrapes} saw {units} units");
            scrapes += 1;
        }
        writer.join().unwrap();
    }

    #[test]
    fn test_wraparound_counts_as_regression() {
        let state = state_with(vec![snapshot(100.0, 100.0), snapshot(200.0, 200.0)]);

        run_cycle(&state);
        run_cycle(&state);
        // replay wraps back to the first, smaller snapshot
        let outcome = run_cycle(&state);

        assert_eq!(
            outcome,
            GatherOutcome::Completed {
                emitted: 0,
                aborted: true
            }
        );
        assert_eq!(state.health_stats.counter_regressions(), 1);
    }
}
