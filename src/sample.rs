//! Metric samples and the sink abstraction inputs emit into.

use serde::Serialize;
use std::collections::BTreeMap;

/// A single labelled metric value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub metric: String,
    pub value: f64,
    pub labels: BTreeMap<String, String>,
}

/// Receiver of computed metric groups.
///
/// Implementations combine `group` with each field name to form the final
/// metric identifier, e.g. `cpu_usage` + `user` becomes `cpu_usage_user`.
pub trait MetricSink {
    fn push_samples(&mut self, group: &str, fields: &[(&str, f64)], tags: &BTreeMap<String, String>);
}

/// Joins a metric group and a field into the exported metric name.
pub fn metric_name(group: &str, field: &str) -> String {
    if group.is_empty() {
        field.to_string()
    } else {
        format!("{group}_{field}")
    }
}

/// Ordered collection of samples produced during one gather.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SampleList {
    samples: Vec<Sample>,
}

impl SampleList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Finds the sample for `metric` whose `label` equals `value`.
    pub fn find(&self, metric: &str, label: &str, value: &str) -> Option<&Sample> {
        self.samples.iter().find(|s| {
            s.metric == metric && s.labels.get(label).map(String::as_str) == Some(value)
        })
    }
}

impl MetricSink for SampleList {
    fn push_samples(&mut self, group: &str, fields: &[(&str, f64)], tags: &BTreeMap<String, String>) {
        self.samples.extend(fields.iter().map(|(field, value)| Sample {
            metric: metric_name(group, field),
            value: *value,
            labels: tags.clone(),
        }));
    }
}
