//! Prometheus metrics definitions for herakles-cpu-usage-exporter.
//!
//! This module defines the per-state CPU usage gauges and the exporter's
//! own telemetry gauges.

use ahash::AHashMap as HashMap;
use herakles_cpu_usage_exporter::sample::metric_name;
use herakles_cpu_usage_exporter::{Sample, METRIC_GROUP, UNIT_TAG, USAGE_FIELDS};
use prometheus::{Gauge, GaugeVec, Opts, Registry};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use tracing::debug;

/// One gauge vector per usage field, e.g. `cpu_usage_user{unit="cpu0"}`.
///
/// A cycle's samples replace the previous ones under a write lock; scrapes
/// gather the registry under the read lock and never see a half-published
/// cycle.
#[derive(Clone)]
pub struct UsageMetrics {
    gauges: HashMap<String, GaugeVec>,
    label_names: Vec<String>,
    publish_lock: Arc<RwLock<()>>,
}

impl UsageMetrics {
    /// Creates and registers the usage gauges.
    ///
    /// `extra_labels` are the configured label keys; they are fixed for the
    /// lifetime of the process.
    pub fn new(registry: &Registry, extra_labels: &[String]) -> prometheus::Result<Self> {
        let mut label_names = vec![UNIT_TAG.to_string()];
        label_names.extend(extra_labels.iter().cloned());
        let label_refs: Vec<&str> = label_names.iter().map(String::as_str).collect();

        let mut gauges = HashMap::new();
        for field in USAGE_FIELDS {
            let name = metric_name(METRIC_GROUP, field);
            let gauge = GaugeVec::new(
                Opts::new(
                    name.clone(),
                    format!("Percentage of CPU time spent in {field} over the last interval"),
                ),
                &label_refs,
            )?;
            registry.register(Box::new(gauge.clone()))?;
            gauges.insert(name, gauge);
        }

        Ok(Self {
            gauges,
            label_names,
            publish_lock: Arc::new(RwLock::new(())),
        })
    }

    /// Replaces the exported usage values with the samples of one cycle.
    pub fn publish<'a>(&self, samples: impl IntoIterator<Item = &'a Sample>) {
        let _guard = self
            .publish_lock
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        self.reset();
        self.apply(samples);
    }

    /// Held while gathering the registry for a scrape.
    pub fn read_lock(&self) -> RwLockReadGuard<'_, ()> {
        self.publish_lock
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn reset(&self) {
        for gauge in self.gauges.values() {
            gauge.reset();
        }
    }

    fn apply<'a>(&self, samples: impl IntoIterator<Item = &'a Sample>) {
        for sample in samples {
            let Some(gauge) = self.gauges.get(&sample.metric) else {
                debug!("No gauge registered for {}, dropping sample", sample.metric);
                continue;
            };
            let values: Vec<&str> = self
                .label_names
                .iter()
                .map(|name| sample.labels.get(name).map(String::as_str).unwrap_or(""))
                .collect();
            gauge.with_label_values(&values).set(sample.value);
        }
    }
}

/// Internal exporter telemetry gauges.
#[derive(Clone)]
pub struct ExporterMetrics {
    pub scrape_duration: Gauge,
    pub cycle_duration: Gauge,
    pub cycle_success: Gauge,
    pub units_reported: Gauge,
}

impl ExporterMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let scrape_duration = Gauge::new(
            "herakles_cpu_usage_scrape_duration_seconds",
            "Time spent serving /metrics request",
        )?;
        let cycle_duration = Gauge::new(
            "herakles_cpu_usage_cycle_duration_seconds",
            "Time spent in the last sampling cycle",
        )?;
        let cycle_success = Gauge::new(
            "herakles_cpu_usage_cycle_success",
            "Whether the last sampling cycle fetched CPU counters (1) or failed (0)",
        )?;
        let units_reported = Gauge::new(
            "herakles_cpu_usage_units_reported",
            "Number of CPU units with usage values in the last cycle",
        )?;

        registry.register(Box::new(scrape_duration.clone()))?;
        registry.register(Box::new(cycle_duration.clone()))?;
        registry.register(Box::new(cycle_success.clone()))?;
        registry.register(Box::new(units_reported.clone()))?;

        Ok(Self {
            scrape_duration,
            cycle_duration,
            cycle_success,
            units_reported,
        })
    }
}
