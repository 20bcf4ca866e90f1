// Statistics over cgroup KPIs: min/max/mean/median/mode per KPI across the data samples.

use std::collections::HashMap;

use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cgroup_metrics::CgroupMetricNames;
use crate::extractors::throttling_percent;
use crate::models::lookup_number;
use crate::sample_set::SampleSet;

const CGROUP_CPUACCT: &str = "cgroup_cpuacct_stats";
const CGROUP_MEMORY: &str = "cgroup_memory_stats";

#[derive(Debug, Error)]
pub enum StatisticsError {
    #[error("statistics need at least {required} samples, found {found}")]
    TooFewSamples { found: usize, required: usize },
}

/// Most frequent value, when exactly one value has the highest count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Unique(f64),
    NotUnique,
}

impl Serialize for Mode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Mode::Unique(v) => serializer.serialize_f64(*v),
            Mode::NotUnique => serializer.serialize_str("no unique mode"),
        }
    }
}

/// Summary of one KPI. Every field is absent when no value was collected.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    /// Raw values, verbose output only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<usize>,
}

#[derive(Debug, Clone)]
struct KpiCalculator {
    unit: &'static str,
    values: Vec<f64>,
    skipped: usize,
}

impl KpiCalculator {
    fn new(unit: &'static str) -> Self {
        Self {
            unit,
            values: Vec::new(),
            skipped: 0,
        }
    }

    fn insert(&mut self, value: Option<f64>) {
        match value {
            Some(v) => self.values.push(v),
            None => self.skipped += 1,
        }
    }

    fn summary(&self, verbose: bool) -> KpiSummary {
        let values = &self.values;
        if values.is_empty() {
            return KpiSummary::default();
        }
        let n = values.len() as f64;
        KpiSummary {
            minimum: values.iter().copied().reduce(f64::min),
            maximum: values.iter().copied().reduce(f64::max),
            mean: Some(values.iter().sum::<f64>() / n),
            median: median(values),
            mode: Some(mode(values)),
            unit: Some(self.unit),
            stats: verbose.then(|| values.clone()),
            samples: verbose.then_some(values.len()),
        }
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

pub fn mode(values: &[f64]) -> Mode {
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for v in values {
        *counts.entry(v.to_bits()).or_insert(0) += 1;
    }
    let Some(best) = counts.values().copied().max() else {
        return Mode::NotUnique;
    };
    let mut winners = counts.iter().filter(|(_, c)| **c == best);
    match (winners.next(), winners.next()) {
        (Some((bits, _)), None) => Mode::Unique(f64::from_bits(*bits)),
        _ => Mode::NotUnique,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KpiStatistics {
    pub cpu: KpiSummary,
    pub cpu_throttle: KpiSummary,
    pub memory: KpiSummary,
    pub memory_failcnt: KpiSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedSamples {
    pub cpu: usize,
    pub cpu_throttle: usize,
    pub memory: usize,
    pub memory_failcnt: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsReport {
    pub num_samples_analyzed: usize,
    pub statistics: KpiStatistics,
    pub skipped_samples: SkippedSamples,
}

pub struct StatisticsEngine {
    min_samples: usize,
    verbose: bool,
}

impl StatisticsEngine {
    pub fn new(min_samples: usize) -> Self {
        Self {
            min_samples,
            verbose: false,
        }
    }

    /// Also emit the raw values and their count per KPI.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn process(&self, samples: &SampleSet) -> Result<StatisticsReport, StatisticsError> {
        if samples.len() < self.min_samples {
            return Err(StatisticsError::TooFewSamples {
                found: samples.len(),
                required: self.min_samples,
            });
        }
        let names = CgroupMetricNames::for_version(samples.header().cgroup_version());

        let do_cpu = samples
            .template()
            .and_then(|s| s.section(CGROUP_CPUACCT))
            .is_some_and(|s| s.contains_key("cpu_tot"));
        if !do_cpu {
            info!(
                section = CGROUP_CPUACCT,
                "no cgroup CPU totals collected, skipping CPU statistics"
            );
        }
        let do_memory = samples.has_section(CGROUP_MEMORY);
        if !do_memory {
            info!(
                section = CGROUP_MEMORY,
                "no cgroup memory collected, skipping memory statistics"
            );
        }

        let mut cpu = KpiCalculator::new("%");
        let mut cpu_throttle = KpiCalculator::new("%");
        let mut memory = KpiCalculator::new("bytes");
        let mut memory_failcnt = KpiCalculator::new("");

        let mut analyzed = 0;
        for (index, sample) in samples.data_samples() {
            analyzed += 1;
            if do_cpu {
                let stats = sample.section(CGROUP_CPUACCT);
                cpu.insert(stats.and_then(|s| {
                    Some(lookup_number(s, "cpu_tot.user")? + lookup_number(s, "cpu_tot.sys")?)
                }));
                cpu_throttle.insert(
                    stats
                        .filter(|s| s.contains_key("throttling"))
                        .map(throttling_percent),
                );
            }
            if do_memory {
                let stats = sample.section(CGROUP_MEMORY);
                memory.insert(stats.and_then(|s| lookup_number(s, names.memory_used)));
                memory_failcnt.insert(stats.and_then(|s| lookup_number(s, names.alloc_failures)));
            }
            debug!(sample = index, "sample analyzed");
        }

        let skipped_samples = SkippedSamples {
            cpu: cpu.skipped,
            cpu_throttle: cpu_throttle.skipped,
            memory: memory.skipped,
            memory_failcnt: memory_failcnt.skipped,
        };
        let total_skipped = skipped_samples.cpu
            + skipped_samples.cpu_throttle
            + skipped_samples.memory
            + skipped_samples.memory_failcnt;
        if total_skipped > 0 {
            warn!(?skipped_samples, "samples skipped while computing statistics");
        }

        Ok(StatisticsReport {
            num_samples_analyzed: analyzed,
            statistics: KpiStatistics {
                cpu: cpu.summary(self.verbose),
                cpu_throttle: cpu_throttle.summary(self.verbose),
                memory: memory.summary(self.verbose),
                memory_failcnt: memory_failcnt.summary(self.verbose),
            },
            skipped_samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn mode_requires_a_single_winner() {
        assert_eq!(mode(&[1.0, 2.0, 2.0, 3.0]), Mode::Unique(2.0));
        assert_eq!(mode(&[1.0, 1.0, 2.0, 2.0]), Mode::NotUnique);
        assert_eq!(mode(&[5.0]), Mode::Unique(5.0));
    }

    #[test]
    fn empty_kpi_serializes_as_empty_object() {
        let summary = KpiCalculator::new("%").summary(false);
        assert_eq!(serde_json::to_string(&summary).unwrap(), "{}");
    }
}
