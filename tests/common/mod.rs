// Shared test helpers: collector-shaped JSON documents

#![allow(dead_code)]

use cmonitor_report::sample_set::SampleSet;
use serde_json::{Value, json};

/// `timestamp.UTC` of the sample taken `second` seconds into the capture.
pub fn utc(second: u32) -> String {
    format!("2022-01-18T00:02:{:02}.500", second)
}

/// Sample with the given KPI sections plus a timestamp.
pub fn sample(second: u32, sections: Value) -> Value {
    let mut s = sections;
    s["timestamp"] = json!({ "UTC": utc(second), "sample_index": second });
    s
}

pub fn document(header: Value, samples: Vec<Value>) -> Value {
    json!({ "header": header, "samples": samples })
}

pub fn load(header: Value, samples: Vec<Value>) -> SampleSet {
    SampleSet::from_value(document(header, samples), 2).unwrap()
}

pub fn header() -> Value {
    json!({
        "identity": { "hostname": "testhost" },
        "cmonitor": {
            "version": "2.5.0",
            "collecting": "cpu,memory,disk,network,cgroup_cpu,cgroup_memory,cgroup_tasks",
            "sample_interval_seconds": 1.0,
            "sample_num": 0
        },
        "os_release": { "pretty_name": "Ubuntu 22.04 LTS" },
        "cpuinfo": {
            "cpu0": { "model_name": "Intel(R) Xeon(R)" },
            "cpu1": { "model_name": "Intel(R) Xeon(R)" }
        },
        "numa_nodes": { "node0": "0-1" }
    })
}

/// Header of a cgroup capture; -1 means unlimited.
pub fn cgroup_header(version: &str, memory_limit_bytes: f64, cpu_quota_ratio: f64) -> Value {
    let mut h = header();
    h["cgroup_config"] = json!({
        "name": "docker/abc",
        "version": version,
        "cpus": "0,1",
        "memory_limit_bytes": memory_limit_bytes,
        "cpu_quota_perc": cpu_quota_ratio
    });
    h
}

pub fn cgroup_memory_v1(rss: f64, cache: f64, failcnt: f64) -> Value {
    json!({ "cgroup_memory_stats": { "stat.rss": rss, "stat.cache": cache, "failcnt": failcnt } })
}

pub fn disks(rkb: f64, wkb: f64) -> Value {
    json!({ "disks": { "sda": { "rkb": rkb, "wkb": wkb } } })
}

pub struct Task<'a> {
    pub pid: u64,
    pub tgid: u64,
    pub cmd: &'a str,
    pub cpu_tot: f64,
    pub cpu_secs: f64,
    pub io_bytes: f64,
    pub rss: f64,
}

impl Task<'_> {
    pub fn json(&self) -> Value {
        json!({
            "cmd": self.cmd,
            "pid": self.pid,
            "tgid": self.tgid,
            "cpu_tot": self.cpu_tot,
            "cpu_usr_total_secs": self.cpu_secs,
            "cpu_sys_total_secs": 0.0,
            "io_total_read": self.io_bytes,
            "io_total_write": 0.0,
            "mem_rss_bytes": self.rss
        })
    }
}

/// Main task (tgid == pid) with the given cumulative CPU seconds.
pub fn process(pid: u64, cmd: &str, cpu_secs: f64) -> Task<'_> {
    Task {
        pid,
        tgid: pid,
        cmd,
        cpu_tot: 0.0,
        cpu_secs,
        io_bytes: 0.0,
        rss: 0.0,
    }
}

pub fn cgroup_tasks(tasks: &[Task<'_>]) -> Value {
    let map: serde_json::Map<String, Value> = tasks
        .iter()
        .map(|t| (format!("pid_{}", t.pid), t.json()))
        .collect();
    json!({ "cgroup_tasks": map })
}
