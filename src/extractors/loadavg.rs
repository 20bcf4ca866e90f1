// Load average (1/5/15 min) rescaled from [0, n_cpus] to percent.

use super::{ExtractContext, ExtractError, SkipCounter, for_each_section};
use crate::chart::{AxisMax, ChartSpec, SourceCategory};
use crate::models::number;
use crate::table::TimeSeriesTable;

const PROC_LOADAVG: &str = "proc_loadavg";
const FIELDS: [(&str, &str); 3] = [
    ("load_avg_1min", "LoadAvg (1min)"),
    ("load_avg_5min", "LoadAvg (5min)"),
    ("load_avg_15min", "LoadAvg (15min)"),
];

pub fn load_average(ctx: &ExtractContext<'_>) -> Result<Vec<ChartSpec>, ExtractError> {
    if !ctx.require_section("load_average", PROC_LOADAVG) {
        return Ok(Vec::new());
    }
    let cpus = ctx
        .samples
        .header()
        .cpu_count()
        .unwrap_or_else(|| ctx.samples.logical_cpus("stat").len())
        .max(1) as f64;

    let mut table = TimeSeriesTable::with_series(FIELDS.map(|(_, col)| col), "%")?;
    let skips = SkipCounter::new("load_average");
    for_each_section(ctx.samples, PROC_LOADAVG, &skips, |index, ts, loadavg| {
        let values: Option<Vec<f64>> = FIELDS
            .iter()
            .map(|(key, _)| number(loadavg, key).map(|v| 100.0 * v / cpus))
            .collect();
        match values {
            Some(values) => table.push_row(ts, values)?,
            None => skips.skip(index, "load average field missing"),
        }
        Ok(())
    })?;
    skips.finish();

    Ok(vec![
        ChartSpec::builder(
            format!("Average Load of {} (from baremetal stats)", ctx.hostname()),
            SourceCategory::Baremetal,
            table,
        )
        .button("Average Load")
        .axis("Load (%)", AxisMax::Auto)
        .margin(ctx.margin)
        .build()?,
    ])
}
