//! End-to-end sampling against a `/proc/stat` style file rewritten between cycles.

use herakles_cpu_usage_exporter::{
    CommonSettings, CpuSampler, GatherOutcome, ProcStatProvider, SampleList, TOTAL_UNIT,
    UNIT_TAG,
};
use std::fs;
use std::path::Path;

/// Renders `cpu` lines: user nice system idle iowait irq softirq steal guest guest_nice.
fn write_stat(path: &Path, lines: &[(&str, [u64; 10])]) {
    let mut content = String::new();
    for (name, values) in lines {
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        content.push_str(&format!("{} {}\n", name, values.join(" ")));
    }
    content.push_str("ctxt 1990473\nbtime 1062191376\n");
    fs::write(path, content).unwrap();
}

fn sampler_for(path: &Path, per_cpu: bool) -> CpuSampler {
    CpuSampler::new(
        Box::new(ProcStatProvider::with_path(path, 100.0)),
        per_cpu,
        CommonSettings::default(),
    )
}

fn value(list: &SampleList, field: &str, unit: &str) -> f64 {
    list.find(&format!("cpu_usage_{field}"), UNIT_TAG, unit)
        .unwrap_or_else(|| panic!("missing {field} for {unit}"))
        .value
}

#[test]
fn aggregate_usage_from_proc_stat() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stat");
    let mut sampler = sampler_for(&path, false);

    write_stat(&path, &[("cpu ", [10000, 0, 5000, 80000, 0, 0, 0, 0, 0, 0])]);
    let mut baseline = SampleList::new();
    sampler.gather(&mut baseline);
    assert!(baseline.is_empty());

    // +2000 user, +500 system, +5000 idle, +500 iowait ticks
    write_stat(&path, &[("cpu ", [12000, 0, 5500, 85000, 500, 0, 0, 0, 0, 0])]);
    let mut list = SampleList::new();
    let outcome = sampler.gather(&mut list);

    assert_eq!(
        outcome,
        GatherOutcome::Completed {
            emitted: 1,
            aborted: false
        }
    );
    assert_eq!(list.len(), 11);
    assert!((value(&list, "user", TOTAL_UNIT) - 25.0).abs() < 1e-9);
    assert!((value(&list, "system", TOTAL_UNIT) - 6.25).abs() < 1e-9);
    assert!((value(&list, "idle", TOTAL_UNIT) - 62.5).abs() < 1e-9);
    assert!((value(&list, "iowait", TOTAL_UNIT) - 6.25).abs() < 1e-9);
    assert!((value(&list, "active", TOTAL_UNIT) - 37.5).abs() < 1e-9);
}

#[test]
fn core_hot_add_and_guest_accounting() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stat");
    let mut sampler = sampler_for(&path, true);

    write_stat(
        &path,
        &[
            ("cpu ", [1000, 0, 0, 1000, 0, 0, 0, 0, 0, 0]),
            ("cpu0", [1000, 0, 0, 1000, 0, 0, 0, 0, 0, 0]),
        ],
    );
    sampler.gather(&mut SampleList::new());

    write_stat(
        &path,
        &[
            ("cpu ", [1400, 0, 0, 1700, 0, 0, 0, 0, 100, 0]),
            ("cpu0", [1300, 0, 0, 1700, 0, 0, 0, 0, 100, 0]),
            ("cpu1", [100, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
        ],
    );
    let mut list = SampleList::new();
    let outcome = sampler.gather(&mut list);

    assert_eq!(
        outcome,
        GatherOutcome::Completed {
            emitted: 2,
            aborted: false
        }
    );
    // cpu0: +300 user of which 100 guest, +700 idle
    assert!((value(&list, "user", "cpu0") - 20.0).abs() < 1e-9);
    assert!((value(&list, "guest", "cpu0") - 10.0).abs() < 1e-9);
    assert!((value(&list, "idle", "cpu0") - 70.0).abs() < 1e-9);
    assert!(list.find("cpu_usage_user", UNIT_TAG, "cpu1").is_none());
    assert!(sampler.last_stats().contains_key("cpu1"));
}

#[test]
fn regression_aborts_cycle_and_next_cycle_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stat");
    let mut sampler = sampler_for(&path, true);

    write_stat(
        &path,
        &[
            ("cpu ", [2000, 0, 0, 2000, 0, 0, 0, 0, 0, 0]),
            ("cpu0", [1000, 0, 0, 1000, 0, 0, 0, 0, 0, 0]),
            ("cpu1", [1000, 0, 0, 1000, 0, 0, 0, 0, 0, 0]),
        ],
    );
    sampler.gather(&mut SampleList::new());

    // cpu0 went backwards; cpu1 must not be processed in this cycle
    write_stat(
        &path,
        &[
            ("cpu ", [2100, 0, 0, 2100, 0, 0, 0, 0, 0, 0]),
            ("cpu0", [500, 0, 0, 500, 0, 0, 0, 0, 0, 0]),
            ("cpu1", [1100, 0, 0, 1100, 0, 0, 0, 0, 0, 0]),
        ],
    );
    let mut list = SampleList::new();
    let outcome = sampler.gather(&mut list);

    assert_eq!(
        outcome,
        GatherOutcome::Completed {
            emitted: 1,
            aborted: true
        }
    );
    assert!(list.find("cpu_usage_user", UNIT_TAG, TOTAL_UNIT).is_some());
    assert!(list.find("cpu_usage_user", UNIT_TAG, "cpu1").is_none());
    assert_eq!(sampler.last_stats().get("cpu1").unwrap().user, 11.0);

    write_stat(
        &path,
        &[
            ("cpu ", [2200, 0, 0, 2200, 0, 0, 0, 0, 0, 0]),
            ("cpu0", [600, 0, 0, 600, 0, 0, 0, 0, 0, 0]),
            ("cpu1", [1200, 0, 0, 1200, 0, 0, 0, 0, 0, 0]),
        ],
    );
    let mut list = SampleList::new();
    let outcome = sampler.gather(&mut list);

    assert_eq!(
        outcome,
        GatherOutcome::Completed {
            emitted: 3,
            aborted: false
        }
    );
    assert!((value(&list, "user", "cpu0") - 50.0).abs() < 1e-9);
}

#[test]
fn unreadable_file_keeps_previous_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stat");
    let mut sampler = sampler_for(&path, false);

    write_stat(&path, &[("cpu ", [100, 0, 0, 100, 0, 0, 0, 0, 0, 0])]);
    sampler.gather(&mut SampleList::new());

    fs::remove_file(&path).unwrap();
    assert_eq!(
        sampler.gather(&mut SampleList::new()),
        GatherOutcome::FetchFailed
    );
    assert_eq!(sampler.last_stats().get(TOTAL_UNIT).unwrap().user, 1.0);

    write_stat(&path, &[("cpu ", [200, 0, 0, 100, 0, 0, 0, 0, 0, 0])]);
    let mut list = SampleList::new();
    sampler.gather(&mut list);
    assert!((value(&list, "user", TOTAL_UNIT) - 100.0).abs() < 1e-9);
}
