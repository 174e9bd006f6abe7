//! Generate testdata command implementation.
//!
//! Generates synthetic, monotonically increasing CPU counter snapshots that
//! the exporter can replay with `--test-data-file`.

use chrono::Utc;
use herakles_cpu_usage_exporter::provider::CpuTestData;
use herakles_cpu_usage_exporter::{CpuTimes, TOTAL_UNIT};
use rand::Rng;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Generates a synthetic test data JSON file.
pub fn command_generate_testdata(
    output: PathBuf,
    snapshots: usize,
    cores: usize,
    step_seconds: u64,
) -> anyhow::Result<()> {
    debug!(
        "Generating test data: snapshots={}, cores={}, step={}s, output={}",
        snapshots,
        cores,
        step_seconds,
        output.display()
    );

    let data = generate_test_data(&mut rand::thread_rng(), snapshots, cores, step_seconds as f64);

    let json_content = serde_json::to_string_pretty(&data)?;
    fs::write(&output, &json_content)?;

    println!(
        "✅ Generated test data: {} snapshots of {} cores in {}",
        data.snapshots.len(),
        cores,
        output.display()
    );

    Ok(())
}

/// Builds `snapshots` cycles of counters for `cores` cores plus `cpu-total`.
pub fn generate_test_data(
    rng: &mut impl Rng,
    snapshots: usize,
    cores: usize,
    step_seconds: f64,
) -> CpuTestData {
    let mut current: Vec<CpuTimes> = (0..cores)
        .map(|i| CpuTimes {
            user: rng.gen_range(1000.0..5000.0),
            system: rng.gen_range(500.0..2000.0),
            idle: rng.gen_range(50_000.0..200_000.0),
            nice: rng.gen_range(0.0..100.0),
            iowait: rng.gen_range(0.0..500.0),
            ..CpuTimes::new(format!("cpu{i}"))
        })
        .collect();

    let mut out = Vec::with_capacity(snapshots);
    for _ in 0..snapshots {
        let mut snapshot = Vec::with_capacity(cores + 1);
        snapshot.push(aggregate(&current));
        snapshot.extend(current.iter().cloned());
        out.push(snapshot);

        for core in current.iter_mut() {
            advance_core(rng, core, step_seconds);
        }
    }

    CpuTestData {
        version: "1.0".to_string(),
        generated_at: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        snapshots: out,
    }
}

/// Spreads one step of wall time over the CPU states of a core.
fn advance_core(rng: &mut impl Rng, core: &mut CpuTimes, step: f64) {
    let busy = step * rng.gen_range(0.02..0.95);
    let user = busy * rng.gen_range(0.4..0.6);
    let system = busy * rng.gen_range(0.1..0.3);
    let iowait = busy * rng.gen_range(0.0..0.05);
    let irq = busy * 0.01;
    let softirq = busy * 0.02;
    let steal = busy * rng.gen_range(0.0..0.02);
    let nice = (busy - user - system - iowait - irq - softirq - steal).max(0.0);
    let guest = user * rng.gen_range(0.0..0.2);

    core.user += user;
    core.system += system;
    core.iowait += iowait;
    core.irq += irq;
    core.softirq += softirq;
    core.steal += steal;
    core.nice += nice;
    core.guest += guest;
    core.idle += step - (user + system + iowait + irq + softirq + steal + nice);
}

fn aggregate(cores: &[CpuTimes]) -> CpuTimes {
    cores.iter().fold(CpuTimes::new(TOTAL_UNIT), |mut acc, c| {
        acc.user += c.user;
        acc.system += c.system;
        acc.idle += c.idle;
        acc.nice += c.nice;
        acc.iowait += c.iowait;
        acc.irq += c.irq;
        acc.softirq += c.softirq;
        acc.steal += c.steal;
        acc.guest += c.guest;
        acc.guest_nice += c.guest_nice;
        acc
    })
}
