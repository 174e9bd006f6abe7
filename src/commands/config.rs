//! Config command implementation.
//!
//! Writes a configuration file with the default values.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates a configuration file (or prints it when no output is given)
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> anyhow::Result<()> {
    let config = Config::default();
    let mut content = render_config(&config, &format)?;

    if commented {
        content = match format {
            ConfigFormat::Yaml | ConfigFormat::Toml => add_comments(&content),
            // JSON has no comment syntax
            ConfigFormat::Json => content,
        };
    }

    match output {
        Some(path) => {
            fs::write(&path, &content)?;
            println!("✅ Configuration written to {}", path.display());
        }
        None => println!("{content}"),
    }

    Ok(())
}

/// Prefixes the rendered config with a documentation header.
fn add_comments(rendered: &str) -> String {
    let header = [
        "Herakles CPU Usage Exporter - Configuration File",
        "",
        "port:             HTTP listen port",
        "bind:             Bind address",
        "interval:         Seconds between sampling cycles",
        "collect_per_cpu:  Export one series per core in addition to cpu-total",
        "enable_health:    Serve /health",
        "enable_telemetry: Export herakles_cpu_usage_* exporter metrics",
        "log_level:        off | error | warn | info | debug | trace",
        "test_data_file:   Replay snapshots from a JSON file instead of /proc/stat",
        "labels:           Extra labels for every series, e.g. {dc: fra1}",
        "",
    ];

    let mut out = String::new();
    for line in header {
        if line.is_empty() {
            out.push_str("#\n");
        } else {
            out.push_str(&format!("# {line}\n"));
        }
    }
    out.push_str(rendered);
    out
}
