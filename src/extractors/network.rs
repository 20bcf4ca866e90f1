// Network throughput (MB/s) and packet-rate (PPS) charts, per interface.

use serde_json::{Map, Value};
use tracing::debug;

use super::{ExtractContext, ExtractError, SkipCounter, for_each_section};
use crate::chart::{AxisMax, ChartSpec, SourceCategory};
use crate::models::number;
use crate::table::TimeSeriesTable;

const NETWORK_INTERFACES: &str = "network_interfaces";
const CGROUP_NETWORK: &str = "cgroup_network";
const BYTES_PER_MB: f64 = 1_000_000.0;

/// One chart variant: the inbound/outbound keys read per interface and their scaling.
struct Variant {
    in_key: &'static str,
    out_key: &'static str,
    divider: f64,
    unit: &'static str,
    label: &'static str,
}

const VARIANTS: [Variant; 2] = [
    Variant {
        in_key: "ibytes",
        out_key: "obytes",
        divider: BYTES_PER_MB,
        unit: "MB/s",
        label: "Network Traffic (MB/s)",
    },
    Variant {
        in_key: "ipackets",
        out_key: "opackets",
        divider: 1.0,
        unit: "PPS",
        label: "Network Traffic (PPS)",
    },
];

pub fn baremetal_network(ctx: &ExtractContext<'_>) -> Result<Vec<ChartSpec>, ExtractError> {
    network_charts(
        ctx,
        "baremetal_network",
        NETWORK_INTERFACES,
        SourceCategory::Baremetal,
        "from baremetal stats",
    )
}

pub fn cgroup_network(ctx: &ExtractContext<'_>) -> Result<Vec<ChartSpec>, ExtractError> {
    network_charts(
        ctx,
        "cgroup_network",
        CGROUP_NETWORK,
        SourceCategory::CgroupAggregate,
        "from CGroup stats",
    )
}

/// (in, out) of `device` for one sample; out is negated. A device missing either key
/// contributes zeros.
fn in_out(section: &Map<String, Value>, device: &str, variant: &Variant) -> (f64, f64) {
    let stats = section.get(device).and_then(Value::as_object);
    match stats.map(|s| (number(s, variant.in_key), number(s, variant.out_key))) {
        Some((Some(rx), Some(tx))) => (rx / variant.divider, -tx / variant.divider),
        _ => (0.0, 0.0),
    }
}

fn network_charts(
    ctx: &ExtractContext<'_>,
    extractor: &'static str,
    section: &str,
    source: SourceCategory,
    origin: &str,
) -> Result<Vec<ChartSpec>, ExtractError> {
    if !ctx.require_section(extractor, section) {
        return Ok(Vec::new());
    }
    let devices = ctx.samples.section_keys(section);
    if devices.is_empty() {
        return Ok(Vec::new());
    }
    let columns: Vec<String> = devices
        .iter()
        .flat_map(|d| [format!("{d}+in"), format!("{d}-out")])
        .collect();

    let mut charts = Vec::with_capacity(VARIANTS.len());
    for variant in &VARIANTS {
        let mut table = TimeSeriesTable::with_series(columns.iter().cloned(), variant.unit)?;
        let skips = SkipCounter::new(extractor);
        for_each_section(ctx.samples, section, &skips, |index, ts, net| {
            let mut row = Vec::with_capacity(devices.len() * 2);
            for device in &devices {
                if !net.contains_key(device) {
                    debug!(
                        sample = index,
                        device = device.as_str(),
                        "interface missing, zeros used"
                    );
                }
                let (rx, tx) = in_out(net, device, variant);
                row.extend([rx, tx]);
            }
            table.push_row(ts, row)?;
            Ok(())
        })?;
        skips.finish();

        charts.push(
            ChartSpec::builder(
                format!("{} for {} ({origin})", variant.label, ctx.hostname()),
                source,
                table,
            )
            .button(variant.label)
            .axis(variant.unit, AxisMax::Auto)
            .margin(ctx.margin)
            .build()?,
        );
    }
    Ok(charts)
}
