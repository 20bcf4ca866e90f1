// Per-KPI metric extractors: each walks the SampleSet once and yields zero or more ChartSpecs.

mod cpu;
mod disk;
mod loadavg;
mod memory;
mod network;

pub use cpu::{baremetal_cpu, cgroup_cpu, throttling_percent};
pub use disk::disk_io;
pub use loadavg::load_average;
pub use memory::{baremetal_memory, cgroup_memory};
pub use network::{baremetal_network, cgroup_network};

use std::cell::Cell;

use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cgroup_metrics::CgroupMetricNames;
use crate::chart::{ChartError, ChartSpec, MarginPolicy};
use crate::config::ChartConfig;
use crate::sample_set::SampleSet;
use crate::table::{TableError, parse_timestamp};
use crate::top_n;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Chart(#[from] ChartError),
}

/// Read-only inputs shared by every extractor of one report run.
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext<'a> {
    pub samples: &'a SampleSet,
    pub metric_names: CgroupMetricNames,
    pub margin: MarginPolicy,
    /// Tasks kept by the top-N ranker; 0 keeps all of them.
    pub top_n: usize,
}

impl<'a> ExtractContext<'a> {
    pub fn new(samples: &'a SampleSet, config: &ChartConfig) -> Self {
        Self {
            samples,
            metric_names: CgroupMetricNames::for_version(samples.header().cgroup_version()),
            margin: MarginPolicy {
                factor: config.secondary_axis_factor,
                margin: config.secondary_axis_margin,
            },
            top_n: config.top_n,
        }
    }

    pub fn hostname(&self) -> &str {
        self.samples.header().hostname().unwrap_or("unknown host")
    }

    /// Capability check done once per extractor: is `section` in the template sample?
    pub(crate) fn require_section(&self, extractor: &str, section: &str) -> bool {
        let present = self.samples.has_section(section);
        if !present {
            info!(extractor, section, "section not collected, no charts");
        }
        present
    }
}

pub type Extractor = fn(&ExtractContext<'_>) -> Result<Vec<ChartSpec>, ExtractError>;

/// Extractors in report order.
pub const EXTRACTORS: &[(&str, Extractor)] = &[
    ("cgroup_cpu", cgroup_cpu),
    ("cgroup_memory", cgroup_memory),
    ("cgroup_network", cgroup_network),
    ("top_tasks", top_n::top_tasks),
    ("baremetal_cpu", baremetal_cpu),
    ("baremetal_memory", baremetal_memory),
    ("baremetal_network", baremetal_network),
    ("disk_io", disk_io),
    ("load_average", load_average),
];

pub fn run_all(ctx: &ExtractContext<'_>) -> Result<Vec<ChartSpec>, ExtractError> {
    let mut charts = Vec::new();
    for (name, extractor) in EXTRACTORS {
        let produced = extractor(ctx)?;
        debug!(extractor = name, charts = produced.len(), "extractor done");
        charts.extend(produced);
    }
    Ok(charts)
}

/// Per-extractor count of samples whose contribution was dropped.
pub(crate) struct SkipCounter {
    extractor: &'static str,
    skipped: Cell<usize>,
}

impl SkipCounter {
    pub(crate) fn new(extractor: &'static str) -> Self {
        Self {
            extractor,
            skipped: Cell::new(0),
        }
    }

    pub(crate) fn skip(&self, index: usize, reason: &str) {
        debug!(extractor = self.extractor, sample = index, reason, "sample skipped");
        self.skipped.set(self.skipped.get() + 1);
    }

    pub(crate) fn finish(self) -> usize {
        let skipped = self.skipped.get();
        if skipped > 0 {
            warn!(extractor = self.extractor, skipped, "samples skipped");
        }
        skipped
    }
}

/// Calls `f` with the index, parsed timestamp and `section` of every data sample.
/// Samples lacking the section or carrying an unparseable timestamp are skipped and counted.
pub(crate) fn for_each_section<'s, F>(
    samples: &'s SampleSet,
    section: &str,
    skips: &SkipCounter,
    mut f: F,
) -> Result<(), ExtractError>
where
    F: FnMut(usize, NaiveDateTime, &'s Map<String, Value>) -> Result<(), ExtractError>,
{
    for (index, sample) in samples.data_samples() {
        let Some(ts) = sample.timestamp_utc() else {
            skips.skip(index, "missing timestamp");
            continue;
        };
        let timestamp = match parse_timestamp(ts) {
            Ok(t) => t,
            Err(e) => {
                skips.skip(index, &e.to_string());
                continue;
            }
        };
        let Some(obj) = sample.section(section) else {
            skips.skip(index, "section missing");
            continue;
        };
        f(index, timestamp, obj)?;
    }
    Ok(())
}

/// Numeric field of a nested object, 0 when the object or field is missing.
pub(crate) fn field_or_zero(obj: &Map<String, Value>, entry: &str, field: &str) -> f64 {
    obj.get(entry)
        .and_then(Value::as_object)
        .and_then(|e| crate::models::number(e, field))
        .unwrap_or(0.0)
}
