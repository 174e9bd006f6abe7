//! Input abstraction and the registry the host builds at startup.
//!
//! Inputs are not registered implicitly: the host creates an
//! [`InputRegistry`], calls [`register_builtin_inputs`] once and then
//! instantiates the inputs its configuration enables.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::provider::{CpuTimesProvider, ProcStatProvider, ProviderError, TestDataProvider};
use crate::sample::MetricSink;
use crate::sampler::{CommonSettings, CpuSampler, GatherOutcome, INPUT_NAME};

/// A collector the host gathers from on every interval.
pub trait Input: Send {
    fn name(&self) -> &str;
    fn gather(&mut self, sink: &mut dyn MetricSink) -> GatherOutcome;
}

impl Input for CpuSampler {
    fn name(&self) -> &str {
        INPUT_NAME
    }

    fn gather(&mut self, sink: &mut dyn MetricSink) -> GatherOutcome {
        CpuSampler::gather(self, sink)
    }
}

/// Settings handed to an input creator.
#[derive(Debug, Clone, Default)]
pub struct InputConfig {
    pub common: CommonSettings,
    pub collect_per_cpu: bool,
    /// Replay recorded observations instead of reading the live system.
    pub test_data_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to set up input provider: {0}")]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("input '{0}' is already registered")]
    Duplicate(String),
    #[error("unknown input '{0}'")]
    Unknown(String),
    #[error("failed to create input '{name}': {source}")]
    Create {
        name: String,
        #[source]
        source: InputError,
    },
}

/// Builds an input from its configuration.
pub type InputCreator =
    Arc<dyn Fn(&InputConfig) -> Result<Box<dyn Input>, InputError> + Send + Sync>;

/// Name → creator table of the inputs available to the host.
#[derive(Default)]
pub struct InputRegistry {
    creators: BTreeMap<String, InputCreator>,
}

impl InputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, creator: InputCreator) -> Result<(), RegistryError> {
        if self.creators.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        debug!("Registered input '{}'", name);
        self.creators.insert(name.to_string(), creator);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.creators.contains_key(name)
    }

    /// Registered input names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.creators.keys().map(String::as_str).collect()
    }

    /// Instantiates a fresh, independent input.
    pub fn create(&self, name: &str, config: &InputConfig) -> Result<Box<dyn Input>, RegistryError> {
        let creator = self
            .creators
            .get(name)
            .ok_or_else(|| RegistryError::Unknown(name.to_string()))?;
        creator(config).map_err(|source| RegistryError::Create {
            name: name.to_string(),
            source,
        })
    }
}

/// Registers every input shipped with this crate.
pub fn register_builtin_inputs(registry: &mut InputRegistry) -> Result<(), RegistryError> {
    registry.add(INPUT_NAME, Arc::new(create_cpu_input))
}

fn create_cpu_input(config: &InputConfig) -> Result<Box<dyn Input>, InputError> {
    let provider: Box<dyn CpuTimesProvider> = match &config.test_data_file {
        Some(path) => Box::new(TestDataProvider::from_file(path)?),
        None => Box::new(ProcStatProvider::new()),
    };

    Ok(Box::new(CpuSampler::new(
        provider,
        config.collect_per_cpu,
        config.common.clone(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::CpuTestData;
    use crate::sample::SampleList;
    use crate::times::CpuTimes;
    use std::io::Write;

    #[test]
    fn test_builtin_registration() {
        let mut registry = InputRegistry::new();
        register_builtin_inputs(&mut registry).unwrap();

        assert!(registry.contains("cpu"));
        assert_eq!(registry.names(), vec!["cpu"]);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = InputRegistry::new();
        register_builtin_inputs(&mut registry).unwrap();

        let err = register_builtin_inputs(&mut registry).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(name) if name == "cpu"));
    }

    #[test]
    fn test_create_unknown_input() {
        let registry = InputRegistry::new();
        let err = registry.create("mem", &InputConfig::default()).err().unwrap();
        assert!(matches!(err, RegistryError::Unknown(name) if name == "mem"));
    }

    #[test]
    fn test_create_cpu_input_from_test_data() {
        let data = CpuTestData {
            version: "1.0".into(),
            generated_at: "2024-01-01T00:00:00Z".into(),
            snapshots: vec![
                vec![CpuTimes {
                    user: 10.0,
                    idle: 90.0,
                    ..CpuTimes::new("cpu-total")
                }],
                vec![CpuTimes {
                    user: 20.0,
                    idle: 180.0,
                    ..CpuTimes::new("cpu-total")
                }],
            ],
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&data).unwrap().as_bytes())
            .unwrap();

        let mut registry = InputRegistry::new();
        register_builtin_inputs(&mut registry).unwrap();
        let config = InputConfig {
            test_data_file: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let mut input = registry.create("cpu", &config).unwrap();
        assert_eq!(input.name(), "cpu");

        let mut list = SampleList::new();
        input.gather(&mut list);
        input.gather(&mut list);

        let user = list.find("cpu_usage_user", "unit", "cpu-total").unwrap();
        assert!((user.value - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_create_cpu_input_with_missing_test_data() {
        let mut registry = InputRegistry::new();
        register_builtin_inputs(&mut registry).unwrap();
        let config = InputConfig {
            test_data_file: Some(PathBuf::from("/nonexistent/testdata.json")),
            ..Default::default()
        };
        let err = registry.create("cpu", &config).err().unwrap();
        assert!(matches!(err, RegistryError::Create { .. }));
    }
}
