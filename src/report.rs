// Report assembly: numbered ChartSpecs plus the two header-derived summary tables.

use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::info;

use crate::chart::{AxisSpec, ChartSpec, ChartTable, Selector, SourceCategory};
use crate::config::ReportConfig;
use crate::extractors::{self, ExtractContext, ExtractError};
use crate::sample_set::SampleSet;
use crate::table::{Cell, CodecError, parse_timestamp};
use crate::version;

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("encoding chart {id}: {source}")]
    Codec {
        id: u32,
        #[source]
        source: CodecError,
    },
}

/// A chart with its report-wide id and, for time series, the compact table encoding.
#[derive(Debug, Clone)]
pub struct ReportChart {
    pub id: u32,
    pub spec: ChartSpec,
    encoded: Option<String>,
}

impl ReportChart {
    pub fn encoded_table(&self) -> Option<&str> {
        self.encoded.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryEntry {
    pub name: String,
    pub value: String,
}

impl SummaryEntry {
    fn new(name: &str, value: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub charts: Vec<ReportChart>,
    pub monitoring_summary: Vec<SummaryEntry>,
    pub monitored_system_summary: Vec<SummaryEntry>,
}

/// Collects ChartSpecs in insertion order and numbers them from 1.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    charts: Vec<ReportChart>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, spec: ChartSpec) -> Result<u32, ReportError> {
        let id = self.charts.len() as u32 + 1;
        let encoded = match &spec.table {
            ChartTable::TimeSeries(t) => Some(
                t.encode_compact()
                    .map_err(|source| ReportError::Codec { id, source })?,
            ),
            ChartTable::Categorical(_) => None,
        };
        self.charts.push(ReportChart { id, spec, encoded });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    pub fn finish(self, samples: &SampleSet) -> Report {
        Report {
            charts: self.charts,
            monitoring_summary: monitoring_summary(samples),
            monitored_system_summary: monitored_system_summary(samples),
        }
    }
}

/// Runs every extractor against `samples` and assembles the report.
pub fn generate(samples: &SampleSet, config: &ReportConfig) -> Result<Report, ReportError> {
    let ctx = ExtractContext::new(samples, &config.chart);
    let mut builder = ReportBuilder::new();
    for spec in extractors::run_all(&ctx)? {
        builder.push(spec)?;
    }
    info!(charts = builder.len(), samples = samples.len(), "report generated");
    Ok(builder.finish(samples))
}

pub fn monitoring_summary(samples: &SampleSet) -> Vec<SummaryEntry> {
    let cmonitor = samples.header().cmonitor.as_ref();
    let interval = cmonitor
        .map(|c| c.sample_interval_seconds)
        .filter(|s| *s > 0.0);
    let first = samples.samples().first().and_then(|s| s.timestamp_utc());
    let last = samples.samples().last().and_then(|s| s.timestamp_utc());
    let sampled_time = first.zip(last).and_then(|(first, last)| {
        let elapsed = parse_timestamp(last).ok()? - parse_timestamp(first).ok()?;
        Some(format!("{:.1} s", elapsed.num_milliseconds() as f64 / 1000.0))
    });

    vec![
        SummaryEntry::new(
            "Collector version",
            cmonitor.map(|c| c.version.clone()).filter(|v| !v.is_empty()),
        ),
        SummaryEntry::new(
            "Collected KPIs",
            cmonitor
                .map(|c| c.collecting.clone())
                .filter(|v| !v.is_empty()),
        ),
        SummaryEntry::new("Started sampling at (UTC)", first.map(str::to_string)),
        SummaryEntry::new("Samples", Some(samples.len().to_string())),
        SummaryEntry::new("Sampling interval", interval.map(|s| format!("{s} s"))),
        SummaryEntry::new("Total time sampled", sampled_time),
        SummaryEntry::new("Report generated by", Some(version::generated_by())),
    ]
}

pub fn monitored_system_summary(samples: &SampleSet) -> Vec<SummaryEntry> {
    let header = samples.header();
    let cpu_count = header.cpu_count().or_else(|| {
        let n = samples.logical_cpus("stat").len();
        (n > 0).then_some(n)
    });
    let count_of = |section: &str| {
        samples
            .has_section(section)
            .then(|| samples.section_keys(section).len().to_string())
    };

    vec![
        SummaryEntry::new("Hostname", header.hostname().map(str::to_string)),
        SummaryEntry::new(
            "OS",
            header
                .os_release
                .as_ref()
                .map(|o| o.pretty_name.clone())
                .filter(|p| !p.is_empty()),
        ),
        SummaryEntry::new("CPU model", header.cpu_model().map(str::to_string)),
        SummaryEntry::new("CPU count", cpu_count.map(|n| n.to_string())),
        SummaryEntry::new("Disks", count_of("disks")),
        SummaryEntry::new("Network interfaces", count_of("network_interfaces")),
        SummaryEntry::new("NUMA nodes", header.numa_node_count().map(|n| n.to_string())),
    ]
}

#[derive(Serialize)]
struct ChartView<'a> {
    id: u32,
    title: &'a str,
    selector: &'a Selector,
    source: SourceCategory,
    stacked: bool,
    axes: &'a [AxisSpec],
    columns: Vec<ColumnView<'a>>,
    data: DataView<'a>,
}

#[derive(Serialize)]
struct ColumnView<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    unit: &'a str,
    /// `None` for the timestamp column.
    axis: Option<usize>,
    stacked: bool,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum DataView<'a> {
    Columnar { rows: usize, encoded: &'a str },
    Categorical { rows: &'a [Vec<Cell>] },
}

impl Serialize for ReportChart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let spec = &self.spec;
        let (columns, data) = match &spec.table {
            ChartTable::TimeSeries(t) => {
                let columns = t
                    .column_names()
                    .iter()
                    .zip(t.column_units())
                    .enumerate()
                    .map(|(i, (name, unit))| {
                        let axis = i.checked_sub(1).and_then(|s| spec.axis_of_series(s));
                        ColumnView {
                            name,
                            unit,
                            axis,
                            stacked: axis.is_some_and(|a| spec.is_axis_stacked(a)),
                        }
                    })
                    .collect();
                let data = DataView::Columnar {
                    rows: t.len(),
                    encoded: self.encoded.as_deref().unwrap_or_default(),
                };
                (columns, data)
            }
            ChartTable::Categorical(t) => {
                let columns = t
                    .column_names()
                    .iter()
                    .map(|name| ColumnView {
                        name,
                        unit: "",
                        axis: None,
                        stacked: false,
                    })
                    .collect();
                (columns, DataView::Categorical { rows: t.rows() })
            }
        };
        ChartView {
            id: self.id,
            title: &spec.title,
            selector: &spec.selector,
            source: spec.source,
            stacked: spec.stacked,
            axes: &spec.axes,
            columns,
            data,
        }
        .serialize(serializer)
    }
}
