//! Check command implementation.
//!
//! Validates that the CPU counters this exporter depends on can be read.

use herakles_cpu_usage_exporter::provider::{clock_ticks_per_second, PROC_STAT_PATH};
use herakles_cpu_usage_exporter::{CpuTimesProvider, ProcStatProvider, TestDataProvider};
use std::path::Path;

use crate::config::Config;

/// Validates system requirements and configuration
pub fn command_check(config: &Config) -> anyhow::Result<()> {
    println!("🔍 Herakles CPU Usage Exporter - System Check");
    println!("=============================================");

    let mut all_ok = true;
    let per_cpu = config.collect_per_cpu.unwrap_or(false);

    if let Some(path) = &config.test_data_file {
        println!("\n🧪 Checking test data file {}...", path.display());
        match TestDataProvider::from_file(path) {
            Ok(mut provider) => match provider.cpu_times(per_cpu) {
                Ok(times) => println!("   ✅ Test data readable ({} units per snapshot)", times.len()),
                Err(e) => {
                    println!("   ❌ Cannot replay test data: {}", e);
                    all_ok = false;
                }
            },
            Err(e) => {
                println!("   ❌ Cannot load test data: {}", e);
                all_ok = false;
            }
        }
    } else {
        println!("\n📁 Checking {}...", PROC_STAT_PATH);
        if Path::new(PROC_STAT_PATH).exists() {
            println!("   ✅ {} exists", PROC_STAT_PATH);
        } else {
            println!("   ❌ {} not found (Linux only)", PROC_STAT_PATH);
            all_ok = false;
        }

        println!("\n⏱️  Checking clock ticks...");
        println!("   ✅ {} ticks per second", clock_ticks_per_second());

        println!("\n🖥️  Reading CPU counters...");
        let mut provider = ProcStatProvider::new();
        match provider.cpu_times(per_cpu) {
            Ok(times) => {
                println!("   ✅ {} CPU units readable", times.len());
                for t in times.iter().take(4) {
                    println!(
                        "      {:<10} total {:>12.2}s  idle {:>12.2}s",
                        t.unit,
                        t.total(),
                        t.idle
                    );
                }
            }
            Err(e) => {
                println!("   ❌ Cannot read CPU counters: {}", e);
                all_ok = false;
            }
        }
    }

    println!();
    if all_ok {
        println!("✅ All checks passed");
        Ok(())
    } else {
        anyhow::bail!("one or more checks failed")
    }
}
