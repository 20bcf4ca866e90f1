// Time-series table: "Timestamp" column first, then N numeric series with per-column units.

use std::fmt;

use chrono::{Datelike, NaiveDateTime, Timelike};

use super::TableError;

pub const TIMESTAMP_COLUMN: &str = "Timestamp";

/// Collector timestamp format (`timestamp.UTC`); the fractional part may be omitted.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, TableError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|source| TableError::Format {
        value: value.to_string(),
        source,
    })
}

/// Renderer date literal, e.g. `Date(2022,0,18,0,2,47,897)` (zero-based month).
pub fn renderer_date(ts: &NaiveDateTime) -> String {
    format!(
        "Date({},{},{},{},{},{},{})",
        ts.year(),
        ts.month0(),
        ts.day(),
        ts.hour(),
        ts.minute(),
        ts.second(),
        ts.nanosecond() / 1_000_000
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesRow {
    pub timestamp: NaiveDateTime,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    column_names: Vec<String>,
    column_units: Vec<String>,
    rows: Vec<TimeSeriesRow>,
}

impl TimeSeriesTable {
    /// `column_names` includes the leading "Timestamp" column. `column_units`, when
    /// given, must have the same length (the timestamp's own unit is ignored).
    pub fn new(
        column_names: Vec<String>,
        column_units: Option<Vec<String>>,
    ) -> Result<Self, TableError> {
        if column_names.len() < 2 {
            return Err(TableError::Shape(format!(
                "a time-series table needs a timestamp and at least one series, got {} columns",
                column_names.len()
            )));
        }
        if column_names[0] != TIMESTAMP_COLUMN {
            return Err(TableError::Shape(format!(
                "first column must be '{}', got '{}'",
                TIMESTAMP_COLUMN, column_names[0]
            )));
        }
        let column_units = match column_units {
            Some(units) if units.len() != column_names.len() => {
                return Err(TableError::Shape(format!(
                    "{} units given for {} columns",
                    units.len(),
                    column_names.len()
                )));
            }
            Some(units) => units,
            None => vec![String::new(); column_names.len()],
        };
        Ok(Self {
            column_names,
            column_units,
            rows: Vec::new(),
        })
    }

    /// Table with the given series (timestamp column prepended), all sharing `unit`.
    pub fn with_series<I, S>(series: I, unit: &str) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names = vec![TIMESTAMP_COLUMN.to_string()];
        names.extend(series.into_iter().map(Into::into));
        let mut units = vec![unit.to_string(); names.len()];
        units[0] = String::new();
        Self::new(names, Some(units))
    }

    /// Parse `timestamp` (ISO-8601 with fraction) and append one row.
    pub fn add_row(&mut self, timestamp: &str, values: Vec<f64>) -> Result<(), TableError> {
        self.check_width(values.len())?;
        let ts = parse_timestamp(timestamp)?;
        self.rows.push(TimeSeriesRow {
            timestamp: ts,
            values,
        });
        Ok(())
    }

    /// Append a row whose timestamp was already parsed.
    pub fn push_row(
        &mut self,
        timestamp: NaiveDateTime,
        values: Vec<f64>,
    ) -> Result<(), TableError> {
        self.check_width(values.len())?;
        self.rows.push(TimeSeriesRow { timestamp, values });
        Ok(())
    }

    fn check_width(&self, series_values: usize) -> Result<(), TableError> {
        let cells = series_values + 1;
        if cells != self.column_names.len() {
            return Err(TableError::Shape(format!(
                "row has {} cells, table has {} columns",
                cells,
                self.column_names.len()
            )));
        }
        Ok(())
    }

    pub fn series_count(&self) -> usize {
        self.column_names.len() - 1
    }

    /// Largest value of data series `series` (0 = first column after the timestamp).
    /// 0 for an empty table.
    pub fn max_of(&self, series: usize) -> f64 {
        self.rows
            .iter()
            .filter_map(|r| r.values.get(series).copied())
            .reduce(f64::max)
            .unwrap_or(0.0)
    }

    /// Data-series index of column `name`. The timestamp column is not a series.
    pub fn index_of_series(&self, name: &str) -> Option<usize> {
        self.column_names[1..].iter().position(|c| c == name)
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn column_units(&self) -> &[String] {
        &self.column_units
    }

    pub fn series_names(&self) -> &[String] {
        &self.column_names[1..]
    }

    pub fn rows(&self) -> &[TimeSeriesRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(super) fn from_parts(
        column_names: Vec<String>,
        column_units: Vec<String>,
        rows: Vec<TimeSeriesRow>,
    ) -> Result<Self, TableError> {
        let mut table = Self::new(column_names, Some(column_units))?;
        for row in rows {
            table.push_row(row.timestamp, row.values)?;
        }
        Ok(table)
    }
}

/// Human-readable dump: one renderer row literal per line.
impl fmt::Display for TimeSeriesTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            write!(f, "['{}'", renderer_date(&row.timestamp))?;
            for v in &row.values {
                write!(f, ",{}", v)?;
            }
            writeln!(f, "],")?;
        }
        Ok(())
    }
}
