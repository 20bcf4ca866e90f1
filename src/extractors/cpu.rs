// Per-logical-CPU usage charts, baremetal (`stat`) and cgroup (`cgroup_cpuacct_stats`).

use serde_json::{Map, Value};

use super::{ExtractContext, ExtractError, SkipCounter, field_or_zero, for_each_section};
use crate::chart::{AxisMax, ChartSpec, SourceCategory};
use crate::models::lookup_number;
use crate::table::TimeSeriesTable;

const STAT: &str = "stat";
const CGROUP_CPUACCT: &str = "cgroup_cpuacct_stats";

/// `stat.cpuN` fields and their column names. Idle is the only non-busy counter.
const BAREMETAL_FIELDS: [(&str, &str); 8] = [
    ("user", "User"),
    ("nice", "Nice"),
    ("sys", "System"),
    ("idle", "Idle"),
    ("iowait", "I/O wait"),
    ("hardirq", "Hard IRQ"),
    ("softirq", "Soft IRQ"),
    ("steal", "Steal"),
];

const CGROUP_FIELDS: [(&str, &str); 2] = [("user", "User"), ("sys", "System")];

pub const QUOTA_COLUMN: &str = "Quota";
pub const THROTTLING_COLUMN: &str = "Throttling";
const TIME_AXIS: &str = "Time (%)";
const BAREMETAL_CPU_GROUP: &str = "Logical CPUs (baremetal)";
const CGROUP_CPU_GROUP: &str = "Logical CPUs (CGroup)";

/// `100 * nr_throttled / nr_periods` from a `cgroup_cpuacct_stats` section; 0 without periods.
pub fn throttling_percent(section: &Map<String, Value>) -> f64 {
    let periods = lookup_number(section, "throttling.nr_periods").unwrap_or(0.0);
    let throttled = lookup_number(section, "throttling.nr_throttled").unwrap_or(0.0);
    if periods > 0.0 {
        100.0 * throttled / periods
    } else {
        0.0
    }
}

pub fn baremetal_cpu(ctx: &ExtractContext<'_>) -> Result<Vec<ChartSpec>, ExtractError> {
    if !ctx.require_section("baremetal_cpu", STAT) {
        return Ok(Vec::new());
    }
    let cpus = ctx.samples.logical_cpus(STAT);
    if cpus.is_empty() {
        return Ok(Vec::new());
    }

    let mut per_cpu = cpus
        .iter()
        .map(|_| TimeSeriesTable::with_series(BAREMETAL_FIELDS.map(|(_, col)| col), "%"))
        .collect::<Result<Vec<_>, _>>()?;
    let mut all = TimeSeriesTable::with_series(cpus.iter().map(|c| format!("CPU{c}")), "%")?;

    let skips = SkipCounter::new("baremetal_cpu");
    for_each_section(ctx.samples, STAT, &skips, |_, ts, stat| {
        let mut totals: Vec<f64> = Vec::with_capacity(cpus.len());
        for (cpu, table) in cpus.iter().zip(per_cpu.iter_mut()) {
            let key = format!("cpu{cpu}");
            let values: Vec<f64> = BAREMETAL_FIELDS
                .iter()
                .map(|(field, _)| field_or_zero(stat, &key, field))
                .collect();
            totals.push(
                BAREMETAL_FIELDS
                    .iter()
                    .zip(&values)
                    .filter(|((field, _), _)| *field != "idle")
                    .map(|(_, v)| v)
                    .sum(),
            );
            table.push_row(ts, values)?;
        }
        all.push_row(ts, totals)?;
        Ok(())
    })?;
    skips.finish();

    let mut charts = Vec::with_capacity(cpus.len() + 1);
    for (cpu, table) in cpus.iter().zip(per_cpu) {
        charts.push(
            ChartSpec::builder(
                format!("Logical CPU {cpu} (from baremetal stats)"),
                SourceCategory::Baremetal,
                table,
            )
            .combo(BAREMETAL_CPU_GROUP, format!("CPU{cpu}"))
            .stacked(true)
            .axis(TIME_AXIS, AxisMax::Auto)
            .margin(ctx.margin)
            .build()?,
        );
    }
    charts.push(
        ChartSpec::builder(
            format!("All logical CPUs of {} (from baremetal stats)", ctx.hostname()),
            SourceCategory::Baremetal,
            all,
        )
        .button("All CPUs")
        .axis(TIME_AXIS, AxisMax::Auto)
        .margin(ctx.margin)
        .build()?,
    );
    Ok(charts)
}

pub fn cgroup_cpu(ctx: &ExtractContext<'_>) -> Result<Vec<ChartSpec>, ExtractError> {
    if !ctx.require_section("cgroup_cpu", CGROUP_CPUACCT) {
        return Ok(Vec::new());
    }
    let cpus = ctx.samples.logical_cpus(CGROUP_CPUACCT);
    if cpus.is_empty() {
        return Ok(Vec::new());
    }
    let quota = ctx.samples.header().cpu_quota_percent().unwrap_or(-1.0);

    let mut per_cpu = cpus
        .iter()
        .map(|_| TimeSeriesTable::with_series(CGROUP_FIELDS.map(|(_, col)| col), "%"))
        .collect::<Result<Vec<_>, _>>()?;
    let mut all_columns: Vec<String> = cpus.iter().map(|c| format!("CPU{c}")).collect();
    all_columns.push(QUOTA_COLUMN.to_string());
    all_columns.push(THROTTLING_COLUMN.to_string());
    let mut all = TimeSeriesTable::with_series(all_columns, "%")?;

    let skips = SkipCounter::new("cgroup_cpu");
    for_each_section(ctx.samples, CGROUP_CPUACCT, &skips, |_, ts, stats| {
        let mut row: Vec<f64> = Vec::with_capacity(cpus.len() + 2);
        for (cpu, table) in cpus.iter().zip(per_cpu.iter_mut()) {
            let key = format!("cpu{cpu}");
            let values: Vec<f64> = CGROUP_FIELDS
                .iter()
                .map(|(field, _)| field_or_zero(stats, &key, field))
                .collect();
            row.push(values.iter().sum());
            table.push_row(ts, values)?;
        }
        row.push(quota);
        row.push(throttling_percent(stats));
        all.push_row(ts, row)?;
        Ok(())
    })?;
    skips.finish();

    let mut charts = Vec::with_capacity(cpus.len() + 1);
    for (cpu, table) in cpus.iter().zip(per_cpu) {
        charts.push(
            ChartSpec::builder(
                format!("Logical CPU {cpu} (from CGroup stats)"),
                SourceCategory::CgroupAggregate,
                table,
            )
            .combo(CGROUP_CPU_GROUP, format!("CPU{cpu}"))
            .stacked(true)
            .axis(TIME_AXIS, AxisMax::Auto)
            .margin(ctx.margin)
            .build()?,
        );
    }
    charts.push(
        ChartSpec::builder(
            "All logical CPUs assigned to the CGroup (from CGroup stats)",
            SourceCategory::CgroupAggregate,
            all,
        )
        .button("All CPUs")
        .axis(TIME_AXIS, AxisMax::Auto)
        .axis("Throttling (%)", AxisMax::AutoWithMargin)
        .secondary_columns([THROTTLING_COLUMN])
        .margin(ctx.margin)
        .build()?,
    );
    Ok(charts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn throttling_without_periods_is_zero() {
        let section = json!({"throttling": {"nr_periods": 0, "nr_throttled": 5}});
        assert_eq!(throttling_percent(section.as_object().unwrap()), 0.0);
        let section = json!({"throttling": {"nr_periods": 200, "nr_throttled": 50}});
        assert_eq!(throttling_percent(section.as_object().unwrap()), 25.0);
        assert_eq!(throttling_percent(&Map::new()), 0.0);
    }
}
