//! Configuration management for the exporter.
//!
//! Configuration is resolved with the precedence CLI > config file > defaults.
//! Config files may be YAML, JSON or TOML, chosen by file extension.

use anyhow::{bail, Context};
use herakles_cpu_usage_exporter::{CommonSettings, InputConfig, UNIT_TAG};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::{Args, ConfigFormat};

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9216;
pub const DEFAULT_INTERVAL: u64 = 15;

/// Locations searched when no config file is given on the command line.
const DEFAULT_CONFIG_PATHS: [&str; 8] = [
    "/etc/herakles/cpu-usage-exporter.yaml",
    "/etc/herakles/cpu-usage-exporter.yml",
    "/etc/herakles/cpu-usage-exporter.json",
    "/etc/herakles/cpu-usage-exporter.toml",
    "./herakles-cpu-usage-exporter.yaml",
    "./herakles-cpu-usage-exporter.yml",
    "./herakles-cpu-usage-exporter.json",
    "./herakles-cpu-usage-exporter.toml",
];

/// Exporter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Sampling
    /// Seconds between sampling cycles
    pub interval: Option<u64>,
    #[serde(alias = "collect-per-cpu")]
    pub collect_per_cpu: Option<bool>,

    // Feature flags
    pub enable_health: Option<bool>,
    pub enable_telemetry: Option<bool>,

    // Logging
    pub log_level: Option<String>,

    // Testing
    pub test_data_file: Option<PathBuf>,

    /// Extra labels attached to every sample (kept last: TOML tables follow values)
    pub labels: Option<BTreeMap<String, String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            interval: Some(DEFAULT_INTERVAL),
            collect_per_cpu: Some(false),
            enable_health: Some(true),
            enable_telemetry: Some(true),
            log_level: Some("info".into()),
            test_data_file: None,
            labels: None,
        }
    }
}

impl Config {
    pub fn interval_seconds(&self) -> u64 {
        self.interval.unwrap_or(DEFAULT_INTERVAL)
    }

    /// Sorted keys of the configured extra labels.
    pub fn label_keys(&self) -> Vec<String> {
        self.labels
            .as_ref()
            .map(|l| l.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Settings for the `cpu` input.
    pub fn input_config(&self) -> InputConfig {
        InputConfig {
            common: CommonSettings {
                interval_seconds: Some(self.interval_seconds()),
                labels: self.labels.clone().unwrap_or_default(),
            },
            collect_per_cpu: self.collect_per_cpu.unwrap_or(false),
            test_data_file: self.test_data_file.clone(),
        }
    }
}

/// Prometheus label name rule: `[a-zA-Z_][a-zA-Z0-9_]*`, `__` prefix reserved.
fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    !name.starts_with("__") && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.interval == Some(0) {
        bail!("interval must be at least 1 second");
    }

    if cfg.port == Some(0) {
        bail!("port must not be 0");
    }

    if let Some(bind) = cfg.bind.as_deref() {
        bind.parse::<std::net::IpAddr>()
            .with_context(|| format!("Invalid bind address '{}'", bind))?;
    }

    if let Some(labels) = &cfg.labels {
        for key in labels.keys() {
            if key == UNIT_TAG {
                bail!("label '{}' is reserved for the CPU unit", UNIT_TAG);
            }
            if !is_valid_label_name(key) {
                bail!("Invalid label name '{}'", key);
            }
        }
    }

    Ok(())
}

/// Parses `key=value` label arguments.
fn parse_label_args(raw: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
    raw.iter()
        .map(|item| {
            let (key, value) = item
                .split_once('=')
                .with_context(|| format!("Invalid label '{}', expected key=value", item))?;
            Ok((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Resolves configuration from CLI args, config file, and defaults
pub fn resolve_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    // Override with CLI args
    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }
    if let Some(interval) = args.interval {
        config.interval = Some(interval);
    }
    if args.per_cpu {
        config.collect_per_cpu = Some(true);
    }
    if !args.labels.is_empty() {
        let mut labels = config.labels.take().unwrap_or_default();
        labels.extend(parse_label_args(&args.labels)?);
        config.labels = Some(labels);
    }
    if args.test_data_file.is_some() {
        config.test_data_file = args.test_data_file.clone();
    }

    // Feature flags
    if args.disable_health {
        config.enable_health = Some(false);
    }
    if args.disable_telemetry {
        config.enable_telemetry = Some(false);
    }

    Ok(config)
}

/// Loads a config file (explicit path or first default location found).
///
/// Keys missing from the file fall back to their defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                bail!("Config file not found: {}", p.display());
            }
            p.to_path_buf()
        }
        None => match DEFAULT_CONFIG_PATHS
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
        {
            Some(p) => p.to_path_buf(),
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let loaded: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON config {}", path.display()))?,
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config {}", path.display()))?,
        _ => serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config {}", path.display()))?,
    };
    info!("Loaded configuration from: {}", path.display());

    Ok(merge_with_defaults(loaded))
}

/// Fills unset fields from `Config::default()`.
fn merge_with_defaults(cfg: Config) -> Config {
    let d = Config::default();
    Config {
        port: cfg.port.or(d.port),
        bind: cfg.bind.or(d.bind),
        interval: cfg.interval.or(d.interval),
        collect_per_cpu: cfg.collect_per_cpu.or(d.collect_per_cpu),
        labels: cfg.labels.or(d.labels),
        enable_health: cfg.enable_health.or(d.enable_health),
        enable_telemetry: cfg.enable_telemetry.or(d.enable_telemetry),
        log_level: cfg.log_level.or(d.log_level),
        test_data_file: cfg.test_data_file.or(d.test_data_file),
    }
}

/// Renders configuration in the requested format
pub fn render_config(config: &Config, format: &ConfigFormat) -> anyhow::Result<String> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: &ConfigFormat) -> anyhow::Result<()> {
    println!("{}", render_config(config, format)?);
    Ok(())
}
