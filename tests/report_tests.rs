// Report assembly and document I/O tests

mod common;

use std::io::Write;

use cmonitor_report::config::ReportConfig;
use cmonitor_report::input::{default_report_path, read_document, write_output};
use cmonitor_report::report::{self, ReportBuilder, SummaryEntry};
use cmonitor_report::sample_set::SampleSet;
use cmonitor_report::table::TimeSeriesTable;
use cmonitor_report::version::generated_by;
use common::*;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Value, json};

fn captured() -> SampleSet {
    let tick = |second: u32, rss: f64| {
        let mut s = cgroup_memory_v1(rss, 100.0, 0.0);
        s["disks"] = disks(8.0, 4.0)["disks"].clone();
        sample(second, s)
    };
    load(
        cgroup_header("1", 4096.0, -1.0),
        vec![tick(0, 0.0), tick(1, 1000.0), tick(2, 1500.0)],
    )
}

fn value_of<'a>(entries: &'a [SummaryEntry], name: &str) -> &'a str {
    entries
        .iter()
        .find(|e| e.name == name)
        .map(|e| e.value.as_str())
        .unwrap()
}

#[test]
fn charts_are_numbered_from_one_in_extractor_order() {
    let report = report::generate(&captured(), &ReportConfig::default()).unwrap();
    let ids: Vec<u32> = report.charts.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert!(report.charts[0].spec.title.contains("CGroup"));
    assert_eq!(report.charts[1].spec.title, "Disk I/O (from baremetal stats)");
}

#[test]
fn encoded_table_decodes_to_the_chart_table() {
    let report = report::generate(&captured(), &ReportConfig::default()).unwrap();
    for chart in &report.charts {
        let table = chart.spec.time_series().unwrap();
        let decoded = TimeSeriesTable::decode_compact(chart.encoded_table().unwrap()).unwrap();
        assert_eq!(&decoded, table);
    }
}

#[test]
fn report_json_shape() {
    let report = report::generate(&captured(), &ReportConfig::default()).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    let memory = &json["charts"][0];
    assert_eq!(memory["id"], 1);
    assert_eq!(memory["source"], "cgroup_aggregate");
    assert_eq!(memory["selector"]["kind"], "button");
    assert_eq!(memory["stacked"], true);
    assert_eq!(memory["data"]["kind"], "columnar");
    assert_eq!(memory["data"]["rows"], 2);

    let columns = memory["columns"].as_array().unwrap();
    assert_eq!(columns[0]["name"], "Timestamp");
    assert_eq!(columns[0]["axis"], Value::Null);
    assert!(columns[0].get("unit").is_none());
    assert_eq!(columns[1]["unit"], "bytes");
    assert_eq!(columns[1]["axis"], 0);
    assert_eq!(columns[1]["stacked"], true);
    let failures = columns.last().unwrap();
    assert_eq!(failures["name"], "Alloc Failures");
    assert_eq!(failures["axis"], 1);
    assert_eq!(failures["stacked"], false);

    assert_eq!(json["monitoring_summary"][0]["name"], "Collector version");
    assert_eq!(json["monitoring_summary"][0]["value"], "2.5.0");
}

#[test]
fn summaries_fall_back_to_not_available() {
    let set = load(json!({}), vec![sample(0, json!({})), sample(1, json!({}))]);
    let report = ReportBuilder::new().finish(&set);
    assert!(report.charts.is_empty());

    let monitoring = &report.monitoring_summary;
    assert_eq!(value_of(monitoring, "Collector version"), "N/A");
    assert_eq!(value_of(monitoring, "Sampling interval"), "N/A");
    assert_eq!(value_of(monitoring, "Samples"), "2");
    assert_eq!(value_of(monitoring, "Total time sampled"), "1.0 s");
    assert_eq!(value_of(monitoring, "Report generated by"), generated_by());

    let system = &report.monitored_system_summary;
    assert_eq!(value_of(system, "Hostname"), "N/A");
    assert_eq!(value_of(system, "CPU count"), "N/A");
    assert_eq!(value_of(system, "Disks"), "N/A");
}

#[test]
fn system_summary_reads_header_and_template() {
    let set = captured();
    let system = report::monitored_system_summary(&set);
    assert_eq!(value_of(&system, "Hostname"), "testhost");
    assert_eq!(value_of(&system, "OS"), "Ubuntu 22.04 LTS");
    assert_eq!(value_of(&system, "CPU model"), "Intel(R) Xeon(R)");
    assert_eq!(value_of(&system, "CPU count"), "2");
    assert_eq!(value_of(&system, "Disks"), "1");
    assert_eq!(value_of(&system, "Network interfaces"), "N/A");
    assert_eq!(value_of(&system, "NUMA nodes"), "1");
}

#[test]
fn builder_ids_follow_push_order() {
    let set = captured();
    let ctx = cmonitor_report::extractors::ExtractContext::new(
        &set,
        &ReportConfig::default().chart,
    );
    let mut builder = ReportBuilder::new();
    for spec in cmonitor_report::extractors::disk_io(&ctx).unwrap() {
        assert_eq!(builder.push(spec).unwrap(), builder.len() as u32);
    }
    assert_eq!(builder.len(), 1);
}

#[test]
fn reads_plain_and_gzip_documents() {
    let dir = tempfile::tempdir().unwrap();
    let text = serde_json::to_string(&document(
        header(),
        vec![sample(0, json!({})), sample(1, disks(1.0, 2.0))],
    ))
    .unwrap();

    let plain = dir.path().join("capture.json");
    std::fs::write(&plain, &text).unwrap();
    assert_eq!(read_document(&plain).unwrap(), text);

    let gz = dir.path().join("capture.json.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    std::fs::write(&gz, encoder.finish().unwrap()).unwrap();
    let decoded = read_document(&gz).unwrap();
    let set = SampleSet::from_json_str(&decoded, 2).unwrap();
    assert_eq!(set.len(), 2);

    assert!(read_document(&dir.path().join("absent.json")).is_err());
}

#[test]
fn write_output_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested/out/report.json");
    write_output(Some(&out), "{}").unwrap();
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "{}");
    assert_eq!(
        default_report_path(&dir.path().join("capture.json.gz")),
        dir.path().join("capture.report.json")
    );
}
