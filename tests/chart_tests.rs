// ChartSpec construction tests: selector exclusivity, axis routing and axis caps

use cmonitor_report::chart::{
    AxisMax, ChartError, ChartSpec, MarginPolicy, Selector, SourceCategory,
};
use cmonitor_report::table::{CategoricalTable, TimeSeriesTable};

fn memory_table() -> TimeSeriesTable {
    let columns = ["Used", "Cached", "Free", "Alloc Failures"];
    let mut t = TimeSeriesTable::with_series(columns, "bytes").unwrap();
    t.add_row("2022-01-18T00:02:48.0", vec![1000.0, 500.0, 500.0, 1.0]).unwrap();
    t.add_row("2022-01-18T00:02:49.0", vec![1200.0, 400.0, 400.0, 3.0]).unwrap();
    t
}

#[test]
fn secondary_column_is_routed_alone_to_axis_one() {
    let spec = ChartSpec::builder("Memory", SourceCategory::CgroupAggregate, memory_table())
        .button("Memory Usage")
        .axis("bytes", AxisMax::Auto)
        .axis("Alloc Failures", AxisMax::Auto)
        .secondary_columns(["Alloc Failures"])
        .build()
        .unwrap();
    assert_eq!(spec.axes.len(), 2);
    assert_eq!(spec.axes[0].series, vec![0, 1, 2]);
    assert_eq!(spec.axes[1].series, vec![3]);
    assert_eq!(spec.axis_of_series(3), Some(1));
}

#[test]
fn unknown_secondary_column_is_an_error() {
    let err = ChartSpec::builder("Memory", SourceCategory::CgroupAggregate, memory_table())
        .button("Memory Usage")
        .axis("bytes", AxisMax::Auto)
        .axis("Throttling", AxisMax::Auto)
        .secondary_columns(["Throttling"])
        .build()
        .unwrap_err();
    assert!(matches!(err, ChartError::UnknownColumn { ref column, .. } if column == "Throttling"));
}

#[test]
fn axis_count_must_match_secondary_usage() {
    let err = ChartSpec::builder("Memory", SourceCategory::CgroupAggregate, memory_table())
        .button("Memory Usage")
        .axis("bytes", AxisMax::Auto)
        .secondary_columns(["Alloc Failures"])
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        ChartError::AxisCount {
            expected: 2,
            found: 1,
            ..
        }
    ));

    let err = ChartSpec::builder("Memory", SourceCategory::CgroupAggregate, memory_table())
        .button("Memory Usage")
        .axis("bytes", AxisMax::Auto)
        .axis("extra", AxisMax::Auto)
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        ChartError::AxisCount {
            expected: 1,
            found: 2,
            ..
        }
    ));
}

#[test]
fn selector_needs_exactly_one_of_button_and_combo() {
    let both = ChartSpec::builder("CPU0", SourceCategory::Baremetal, memory_table())
        .button("CPU0")
        .combo("Logical CPUs", "CPU0")
        .axis("Time (%)", AxisMax::Auto)
        .build();
    assert!(matches!(both, Err(ChartError::Selector { .. })));

    let neither = ChartSpec::builder("CPU0", SourceCategory::Baremetal, memory_table())
        .axis("Time (%)", AxisMax::Auto)
        .build();
    assert!(matches!(neither, Err(ChartError::Selector { .. })));

    let combo = ChartSpec::builder("CPU0", SourceCategory::Baremetal, memory_table())
        .combo("Logical CPUs", "CPU0")
        .axis("Time (%)", AxisMax::Auto)
        .build()
        .unwrap();
    assert_eq!(
        combo.selector,
        Selector::ComboEntry {
            group: "Logical CPUs".into(),
            entry: "CPU0".into()
        }
    );
}

#[test]
fn axis_caps_resolve_from_sentinels() {
    let spec = ChartSpec::builder("Memory", SourceCategory::CgroupAggregate, memory_table())
        .button("Memory Usage")
        .axis("bytes", AxisMax::from_sentinel(Some(4096.0)))
        .axis("Alloc Failures", AxisMax::from_sentinel(Some(0.0)))
        .secondary_columns(["Alloc Failures"])
        .build()
        .unwrap();
    assert_eq!(spec.axes[0].max, Some(4096.0));
    // max(Alloc Failures) = 3 -> 3 * 5 + 10
    assert_eq!(spec.axes[1].max, Some(25.0));

    let spec = ChartSpec::builder("Memory", SourceCategory::CgroupAggregate, memory_table())
        .button("Memory Usage")
        .axis("bytes", AxisMax::from_sentinel(None))
        .axis("Alloc Failures", AxisMax::AutoWithMargin)
        .secondary_columns(["Alloc Failures"])
        .margin(MarginPolicy {
            factor: 2.0,
            margin: 1.0,
        })
        .build()
        .unwrap();
    assert_eq!(spec.axes[0].max, None);
    assert_eq!(spec.axes[1].max, Some(7.0));
}

#[test]
fn only_primary_axis_is_stacked() {
    let spec = ChartSpec::builder("Memory", SourceCategory::CgroupAggregate, memory_table())
        .button("Memory Usage")
        .stacked(true)
        .axis("bytes", AxisMax::Auto)
        .axis("Alloc Failures", AxisMax::AutoWithMargin)
        .secondary_columns(["Alloc Failures"])
        .build()
        .unwrap();
    assert!(spec.is_axis_stacked(0));
    assert!(!spec.is_axis_stacked(1));
}

#[test]
fn empty_table_with_margin_cap_uses_zero_max() {
    let table = TimeSeriesTable::with_series(["CPU0", "Throttling"], "%").unwrap();
    let spec = ChartSpec::builder("All CPUs", SourceCategory::CgroupAggregate, table)
        .button("All CPUs")
        .axis("Time (%)", AxisMax::Auto)
        .axis("Throttling (%)", AxisMax::AutoWithMargin)
        .secondary_columns(["Throttling"])
        .build()
        .unwrap();
    assert_eq!(spec.axes[1].max, Some(10.0));
}

#[test]
fn categorical_chart_takes_one_or_two_axes() {
    let table = CategoricalTable::new(vec!["Command".into(), "CPU time".into()]).unwrap();
    let spec = ChartSpec::builder("Top tasks", SourceCategory::CgroupPerTask, table.clone())
        .button("Top Tasks")
        .axis("CPU time (secs)", AxisMax::Auto)
        .axis("I/O (bytes)", AxisMax::Fixed(100.0))
        .build()
        .unwrap();
    assert_eq!(spec.axes[1].max, Some(100.0));
    assert!(spec.categorical().is_some());

    let err = ChartSpec::builder("Top tasks", SourceCategory::CgroupPerTask, table)
        .button("Top Tasks")
        .build()
        .unwrap_err();
    assert!(matches!(err, ChartError::AxisCount { found: 0, .. }));
}
