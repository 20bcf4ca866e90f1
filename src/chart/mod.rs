// ChartSpec: one table bound to rendering metadata (title, selector, axes, stacking).

use serde::Serialize;
use thiserror::Error;

use crate::table::{CategoricalTable, TimeSeriesTable};

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("chart '{title}' needs {expected} axis title(s), got {found}")]
    AxisCount {
        title: String,
        expected: usize,
        found: usize,
    },
    #[error("chart '{title}': no column named '{column}' to route to the secondary axis")]
    UnknownColumn { title: String, column: String },
    #[error("chart '{title}': {reason}")]
    Selector { title: String, reason: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartTable {
    TimeSeries(TimeSeriesTable),
    Categorical(CategoricalTable),
}

impl From<TimeSeriesTable> for ChartTable {
    fn from(t: TimeSeriesTable) -> Self {
        ChartTable::TimeSeries(t)
    }
}

impl From<CategoricalTable> for ChartTable {
    fn from(t: CategoricalTable) -> Self {
        ChartTable::Categorical(t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    Baremetal,
    CgroupAggregate,
    CgroupPerTask,
}

/// Where a chart shows up: a free-standing button or one entry of a named combo group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selector {
    Button { label: String },
    ComboEntry { group: String, entry: String },
}

/// Requested cap of one Y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisMax {
    /// Left to the renderer.
    Auto,
    /// Computed from the axis's own series through the [`MarginPolicy`].
    AutoWithMargin,
    Fixed(f64),
}

impl AxisMax {
    /// Sentinel form: `None` = autoscale, `0` = autoscale with margin, anything else a cap.
    pub fn from_sentinel(value: Option<f64>) -> Self {
        match value {
            None => AxisMax::Auto,
            Some(v) if v == 0.0 => AxisMax::AutoWithMargin,
            Some(v) => AxisMax::Fixed(v),
        }
    }
}

/// Auto-with-margin cap = max(axis series) * factor + margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginPolicy {
    pub factor: f64,
    pub margin: f64,
}

impl Default for MarginPolicy {
    fn default() -> Self {
        Self {
            factor: 5.0,
            margin: 10.0,
        }
    }
}

impl MarginPolicy {
    pub fn cap(&self, data_max: f64) -> f64 {
        data_max * self.factor + self.margin
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisSpec {
    pub title: String,
    /// Resolved cap; `None` lets the renderer autoscale.
    pub max: Option<f64>,
    /// Data-series indexes (0 = first column after the timestamp) drawn on this axis.
    pub series: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub selector: Selector,
    pub source: SourceCategory,
    /// Stacks axis-0 series; secondary-axis series are never stacked.
    pub stacked: bool,
    pub axes: Vec<AxisSpec>,
    pub table: ChartTable,
}

impl ChartSpec {
    pub fn builder(
        title: impl Into<String>,
        source: SourceCategory,
        table: impl Into<ChartTable>,
    ) -> ChartSpecBuilder {
        ChartSpecBuilder {
            title: title.into(),
            source,
            table: table.into(),
            button: None,
            combo: None,
            stacked: false,
            axes: Vec::new(),
            secondary_columns: Vec::new(),
            margin: MarginPolicy::default(),
        }
    }

    pub fn is_axis_stacked(&self, axis: usize) -> bool {
        self.stacked && axis == 0
    }

    /// Axis drawing data series `series`, if any.
    pub fn axis_of_series(&self, series: usize) -> Option<usize> {
        self.axes.iter().position(|a| a.series.contains(&series))
    }

    pub fn time_series(&self) -> Option<&TimeSeriesTable> {
        match &self.table {
            ChartTable::TimeSeries(t) => Some(t),
            ChartTable::Categorical(_) => None,
        }
    }

    pub fn categorical(&self) -> Option<&CategoricalTable> {
        match &self.table {
            ChartTable::Categorical(t) => Some(t),
            ChartTable::TimeSeries(_) => None,
        }
    }
}

pub struct ChartSpecBuilder {
    title: String,
    source: SourceCategory,
    table: ChartTable,
    button: Option<String>,
    combo: Option<(String, String)>,
    stacked: bool,
    axes: Vec<(String, AxisMax)>,
    secondary_columns: Vec<String>,
    margin: MarginPolicy,
}

impl ChartSpecBuilder {
    pub fn button(mut self, label: impl Into<String>) -> Self {
        self.button = Some(label.into());
        self
    }

    pub fn combo(mut self, group: impl Into<String>, entry: impl Into<String>) -> Self {
        self.combo = Some((group.into(), entry.into()));
        self
    }

    pub fn stacked(mut self, stacked: bool) -> Self {
        self.stacked = stacked;
        self
    }

    /// Adds the next Y axis (first call = primary axis).
    pub fn axis(mut self, title: impl Into<String>, max: AxisMax) -> Self {
        self.axes.push((title.into(), max));
        self
    }

    /// Column names routed to the secondary axis.
    pub fn secondary_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.secondary_columns = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn margin(mut self, margin: MarginPolicy) -> Self {
        self.margin = margin;
        self
    }

    pub fn build(self) -> Result<ChartSpec, ChartError> {
        let selector = match (self.button, self.combo) {
            (Some(label), None) => Selector::Button { label },
            (None, Some((group, entry))) => Selector::ComboEntry { group, entry },
            (Some(_), Some(_)) => {
                return Err(ChartError::Selector {
                    title: self.title,
                    reason: "a chart cannot be both a button and a combo entry",
                });
            }
            (None, None) => {
                return Err(ChartError::Selector {
                    title: self.title,
                    reason: "a chart needs a button label or a combo entry",
                });
            }
        };

        let axes = match &self.table {
            ChartTable::TimeSeries(table) => time_series_axes(
                &self.title,
                table,
                &self.axes,
                &self.secondary_columns,
                self.margin,
            )?,
            ChartTable::Categorical(_) => {
                categorical_axes(&self.title, &self.axes, &self.secondary_columns)?
            }
        };

        Ok(ChartSpec {
            title: self.title,
            selector,
            source: self.source,
            stacked: self.stacked,
            axes,
            table: self.table,
        })
    }
}

fn time_series_axes(
    title: &str,
    table: &TimeSeriesTable,
    axes: &[(String, AxisMax)],
    secondary_columns: &[String],
    margin: MarginPolicy,
) -> Result<Vec<AxisSpec>, ChartError> {
    let mut secondary = secondary_columns
        .iter()
        .map(|name| {
            table
                .index_of_series(name)
                .ok_or_else(|| ChartError::UnknownColumn {
                    title: title.to_string(),
                    column: name.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    secondary.sort_unstable();
    secondary.dedup();

    let expected = if secondary.is_empty() { 1 } else { 2 };
    if axes.len() != expected {
        return Err(ChartError::AxisCount {
            title: title.to_string(),
            expected,
            found: axes.len(),
        });
    }

    let primary: Vec<usize> = (0..table.series_count())
        .filter(|i| !secondary.contains(i))
        .collect();

    let resolve = |max: AxisMax, series: &[usize]| match max {
        AxisMax::Auto => None,
        AxisMax::Fixed(v) => Some(v),
        AxisMax::AutoWithMargin => {
            let data_max = series
                .iter()
                .map(|&i| table.max_of(i))
                .reduce(f64::max)
                .unwrap_or(0.0);
            Some(margin.cap(data_max))
        }
    };

    let mut specs = Vec::with_capacity(expected);
    for ((axis_title, max), series) in axes.iter().zip([primary, secondary]) {
        specs.push(AxisSpec {
            title: axis_title.clone(),
            max: resolve(*max, &series),
            series,
        });
    }
    Ok(specs)
}

fn categorical_axes(
    title: &str,
    axes: &[(String, AxisMax)],
    secondary_columns: &[String],
) -> Result<Vec<AxisSpec>, ChartError> {
    if let Some(column) = secondary_columns.first() {
        return Err(ChartError::UnknownColumn {
            title: title.to_string(),
            column: column.clone(),
        });
    }
    if axes.is_empty() || axes.len() > 2 {
        return Err(ChartError::AxisCount {
            title: title.to_string(),
            expected: 2,
            found: axes.len(),
        });
    }
    Ok(axes
        .iter()
        .map(|(axis_title, max)| AxisSpec {
            title: axis_title.clone(),
            max: match max {
                AxisMax::Fixed(v) => Some(*v),
                AxisMax::Auto | AxisMax::AutoWithMargin => None,
            },
            series: Vec::new(),
        })
        .collect())
}
