//! CLI arguments and subcommands for herakles-cpu-usage-exporter.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-cpu-usage-exporter",
    about = "Prometheus exporter for per-state CPU utilization percentages",
    long_about = "Prometheus exporter for per-state CPU utilization percentages.\n\n\
                  Samples the cumulative CPU time counters of /proc/stat on a fixed \
                  interval and exports user, system, idle, iowait, steal, guest and \
                  active percentages for the whole host and optionally every core.",
    author = "Michael Moll <proc-mem@herakles.io> - Herakles IO",
    version = "0.1.0",
    propagate_version = true,
    after_help = "Project: https://github.com/herakles-io/herakles-cpu-usage-exporter — More info: https://www.herakles.io — Support: proc-mem@herakles.io"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Sampling interval in seconds
    #[arg(short = 'i', long)]
    pub interval: Option<u64>,

    /// Also export one series per CPU core
    #[arg(long)]
    pub per_cpu: bool,

    /// Extra label attached to every sample (key=value, repeatable)
    #[arg(long = "label", value_name = "KEY=VALUE")]
    pub labels: Vec<String>,

    /// Disable /health endpoint
    #[arg(long)]
    pub disable_health: bool,

    /// Disable internal herakles_cpu_usage_* metrics
    #[arg(long)]
    pub disable_telemetry: bool,

    /// Path to JSON test data file (replays snapshots instead of /proc/stat)
    #[arg(short = 't', long)]
    pub test_data_file: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate that CPU counters can be read on this system
    Check,

    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Run sampling cycles and print the computed samples
    Test {
        /// Number of cycles that produce samples (one extra baseline cycle runs first)
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Pause between cycles in milliseconds
        #[arg(long, default_value_t = 1000)]
        pause_ms: u64,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,
    },

    /// Generate synthetic CPU counter snapshots as a JSON test data file
    GenerateTestdata {
        /// Output file path
        #[arg(short = 'o', long, default_value = "testdata.json")]
        output: PathBuf,

        /// Number of snapshots to generate
        #[arg(long, default_value_t = 20)]
        snapshots: usize,

        /// Number of CPU cores to simulate
        #[arg(long, default_value_t = 4)]
        cores: usize,

        /// Simulated seconds between snapshots
        #[arg(long, default_value_t = 15)]
        step_seconds: u64,
    },
}
