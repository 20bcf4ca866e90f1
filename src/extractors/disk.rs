// Disk read/write chart, per device, from the baremetal `disks` section.

use super::{ExtractContext, ExtractError, SkipCounter, field_or_zero, for_each_section};
use crate::chart::{AxisMax, ChartSpec, SourceCategory};
use crate::table::TimeSeriesTable;

const DISKS: &str = "disks";
const KB_PER_MB: f64 = 1000.0;

pub fn disk_io(ctx: &ExtractContext<'_>) -> Result<Vec<ChartSpec>, ExtractError> {
    if !ctx.require_section("disk_io", DISKS) {
        return Ok(Vec::new());
    }
    let devices = ctx.samples.section_keys(DISKS);
    if devices.is_empty() {
        return Ok(Vec::new());
    }

    let mut table = TimeSeriesTable::with_series(
        devices
            .iter()
            .flat_map(|d| [format!("{d} Read MB"), format!("{d} Write MB")]),
        "MB",
    )?;
    let skips = SkipCounter::new("disk_io");
    for_each_section(ctx.samples, DISKS, &skips, |_, ts, disks| {
        let mut row = Vec::with_capacity(devices.len() * 2);
        for device in &devices {
            // writes are drawn below zero
            row.push(field_or_zero(disks, device, "rkb") / KB_PER_MB);
            row.push(-field_or_zero(disks, device, "wkb") / KB_PER_MB);
        }
        table.push_row(ts, row)?;
        Ok(())
    })?;
    skips.finish();

    Ok(vec![
        ChartSpec::builder("Disk I/O (from baremetal stats)", SourceCategory::Baremetal, table)
            .button("Disk I/O")
            .axis("MB", AxisMax::Auto)
            .margin(ctx.margin)
            .build()?,
    ])
}
