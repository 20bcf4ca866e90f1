// Statistics engine tests

mod common;

use cmonitor_report::statistics::{Mode, StatisticsEngine, StatisticsError};
use common::*;
use serde_json::{Value, json};

fn cgroup_sample(
    second: u32,
    user: f64,
    sys: f64,
    throttled: f64,
    rss: f64,
    failcnt: f64,
) -> Value {
    let mut s = cgroup_memory_v1(rss, 0.0, failcnt);
    s["cgroup_cpuacct_stats"] = json!({
        "cpu_tot": { "user": user, "sys": sys },
        "throttling": { "nr_periods": 10, "nr_throttled": throttled }
    });
    sample(second, s)
}

fn captured() -> cmonitor_report::sample_set::SampleSet {
    load(
        cgroup_header("1", 1.0e9, 2.0),
        vec![
            cgroup_sample(0, 99.0, 99.0, 9.0, 99.0, 99.0),
            cgroup_sample(1, 10.0, 5.0, 0.0, 1000.0, 0.0),
            cgroup_sample(2, 20.0, 10.0, 1.0, 3000.0, 0.0),
            cgroup_sample(3, 10.0, 5.0, 5.0, 2000.0, 4.0),
        ],
    )
}

#[test]
fn too_few_samples_is_an_error() {
    let set = load(header(), vec![sample(0, json!({})), sample(1, json!({}))]);
    let err = StatisticsEngine::new(3).process(&set).unwrap_err();
    assert!(matches!(
        err,
        StatisticsError::TooFewSamples {
            found: 2,
            required: 3
        }
    ));
}

#[test]
fn kpis_skip_the_bootstrap_sample() {
    let report = StatisticsEngine::new(3).process(&captured()).unwrap();
    assert_eq!(report.num_samples_analyzed, 3);

    let cpu = &report.statistics.cpu;
    assert_eq!(cpu.minimum, Some(15.0));
    assert_eq!(cpu.maximum, Some(30.0));
    assert_eq!(cpu.mean, Some(20.0));
    assert_eq!(cpu.median, Some(15.0));
    assert_eq!(cpu.mode, Some(Mode::Unique(15.0)));
    assert_eq!(cpu.unit, Some("%"));

    let throttle = &report.statistics.cpu_throttle;
    assert_eq!(throttle.maximum, Some(50.0));
    assert_eq!(throttle.mode, Some(Mode::NotUnique));

    let memory = &report.statistics.memory;
    assert_eq!(memory.minimum, Some(1000.0));
    assert_eq!(memory.median, Some(2000.0));
    assert_eq!(memory.unit, Some("bytes"));
    assert_eq!(report.statistics.memory_failcnt.maximum, Some(4.0));

    // raw values only in verbose mode
    assert_eq!(cpu.stats, None);
    assert_eq!(cpu.samples, None);
}

#[test]
fn verbose_adds_raw_values() {
    let report = StatisticsEngine::new(3)
        .verbose(true)
        .process(&captured())
        .unwrap();
    assert_eq!(report.statistics.memory.stats, Some(vec![1000.0, 3000.0, 2000.0]));
    assert_eq!(report.statistics.memory.samples, Some(3));
}

#[test]
fn missing_values_are_counted_as_skipped() {
    let mut partial = cgroup_sample(2, 20.0, 10.0, 1.0, 3000.0, 0.0);
    partial["cgroup_memory_stats"] = json!({ "failcnt": 1 });
    partial["cgroup_cpuacct_stats"]
        .as_object_mut()
        .unwrap()
        .remove("throttling");
    let set = load(
        cgroup_header("1", 1.0e9, 2.0),
        vec![
            cgroup_sample(0, 0.0, 0.0, 0.0, 0.0, 0.0),
            cgroup_sample(1, 10.0, 5.0, 0.0, 1000.0, 0.0),
            partial,
        ],
    );
    let report = StatisticsEngine::new(3).process(&set).unwrap();
    assert_eq!(report.skipped_samples.memory, 1);
    assert_eq!(report.skipped_samples.cpu_throttle, 1);
    assert_eq!(report.skipped_samples.cpu, 0);
    assert_eq!(report.skipped_samples.memory_failcnt, 0);
    assert_eq!(report.statistics.memory.mean, Some(1000.0));
}

#[test]
fn uncollected_kpis_serialize_as_empty_objects() {
    let set = load(
        header(),
        vec![sample(0, json!({})), sample(1, disks(1.0, 1.0)), sample(2, disks(1.0, 1.0))],
    );
    let report = StatisticsEngine::new(3).process(&set).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["num_samples_analyzed"], 2);
    assert_eq!(json["statistics"]["cpu"], json!({}));
    assert_eq!(json["statistics"]["memory_failcnt"], json!({}));
    assert_eq!(json["skipped_samples"]["memory"], 0);
}

#[test]
fn cgroup_v2_reads_anon_and_oom_kills() {
    let v2 = |second: u32, anon: f64, oom: f64| {
        sample(
            second,
            json!({ "cgroup_memory_stats": {
                "stat": { "anon": anon, "file": 7.0 },
                "events": { "oom_kill": oom }
            } }),
        )
    };
    let set = load(
        cgroup_header("2", 1.0e9, -1.0),
        vec![v2(0, 0.0, 0.0), v2(1, 500.0, 0.0), v2(2, 700.0, 1.0)],
    );
    let report = StatisticsEngine::new(3).process(&set).unwrap();
    assert_eq!(report.statistics.memory.maximum, Some(700.0));
    assert_eq!(report.statistics.memory_failcnt.maximum, Some(1.0));
    // CPU totals were not collected
    assert_eq!(report.statistics.cpu.mean, None);
}
