// Memory usage charts: baremetal (`proc_meminfo`) and cgroup (`cgroup_memory_stats`).

use super::{ExtractContext, ExtractError, SkipCounter, for_each_section};
use crate::chart::{AxisMax, ChartSpec, SourceCategory};
use crate::models::{lookup_number, number};
use crate::table::{TIMESTAMP_COLUMN, TimeSeriesTable};

const PROC_MEMINFO: &str = "proc_meminfo";
const CGROUP_MEMORY: &str = "cgroup_memory_stats";
pub const ALLOC_FAILURES_COLUMN: &str = "Alloc Failures";

/// `/proc/meminfo` values are kB.
fn kb_to_bytes(kb: f64) -> f64 {
    kb * 1024.0
}

pub fn baremetal_memory(ctx: &ExtractContext<'_>) -> Result<Vec<ChartSpec>, ExtractError> {
    if !ctx.require_section("baremetal_memory", PROC_MEMINFO) {
        return Ok(Vec::new());
    }
    let Some(total) = ctx
        .samples
        .template()
        .and_then(|s| s.section(PROC_MEMINFO))
        .and_then(|m| number(m, "MemTotal"))
        .map(kb_to_bytes)
    else {
        return Ok(Vec::new());
    };

    let mut table = TimeSeriesTable::with_series(["Used", "Cached", "Free"], "bytes")?;
    let skips = SkipCounter::new("baremetal_memory");
    for_each_section(ctx.samples, PROC_MEMINFO, &skips, |index, ts, meminfo| {
        let sample_total = number(meminfo, "MemTotal").map(kb_to_bytes);
        if sample_total != Some(total) {
            // memory hot-swap is not supported
            skips.skip(index, "MemTotal changed");
            return Ok(());
        }
        let (Some(free), Some(cached)) = (number(meminfo, "MemFree"), number(meminfo, "Cached"))
        else {
            skips.skip(index, "MemFree or Cached missing");
            return Ok(());
        };
        let (free, cached) = (kb_to_bytes(free), kb_to_bytes(cached));
        table.push_row(ts, vec![total - free - cached, cached, free])?;
        Ok(())
    })?;
    skips.finish();

    Ok(vec![
        ChartSpec::builder(
            format!("Memory usage of {} (from baremetal stats)", ctx.hostname()),
            SourceCategory::Baremetal,
            table,
        )
        .button("Memory Usage")
        .stacked(true)
        .axis("bytes", AxisMax::Auto)
        .margin(ctx.margin)
        .build()?,
    ])
}

pub fn cgroup_memory(ctx: &ExtractContext<'_>) -> Result<Vec<ChartSpec>, ExtractError> {
    if !ctx.require_section("cgroup_memory", CGROUP_MEMORY) {
        return Ok(Vec::new());
    }
    let names = ctx.metric_names;
    let limit = ctx.samples.header().memory_limit_bytes();

    let mut columns = vec![TIMESTAMP_COLUMN, "Used", "Cached"];
    let mut units = vec!["", "bytes", "bytes"];
    if limit.is_some() {
        columns.extend(["Free", ALLOC_FAILURES_COLUMN]);
        units.extend(["bytes", ""]);
    }
    let mut table = TimeSeriesTable::new(
        columns.into_iter().map(String::from).collect(),
        Some(units.into_iter().map(String::from).collect()),
    )?;

    let skips = SkipCounter::new("cgroup_memory");
    for_each_section(ctx.samples, CGROUP_MEMORY, &skips, |index, ts, stats| {
        let (Some(used), Some(cached)) = (
            lookup_number(stats, names.memory_used),
            lookup_number(stats, names.memory_cached),
        ) else {
            skips.skip(index, "used or cached counter missing");
            return Ok(());
        };
        let mut row = vec![used, cached];
        if let Some(limit) = limit {
            row.push((limit - used - cached).max(0.0));
            row.push(lookup_number(stats, names.alloc_failures).unwrap_or(0.0));
        }
        table.push_row(ts, row)?;
        Ok(())
    })?;
    skips.finish();

    let builder = ChartSpec::builder(
        "Memory used by the CGroup (from CGroup stats)",
        SourceCategory::CgroupAggregate,
        table,
    )
    .button("Memory Usage")
    .margin(ctx.margin);
    let builder = if limit.is_some() {
        builder
            .stacked(true)
            .axis("bytes", AxisMax::Auto)
            .axis(ALLOC_FAILURES_COLUMN, AxisMax::AutoWithMargin)
            .secondary_columns([ALLOC_FAILURES_COLUMN])
    } else {
        builder.axis("bytes", AxisMax::Auto)
    };
    Ok(vec![builder.build()?])
}
