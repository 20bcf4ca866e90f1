// Chart data tables: time-series (timestamp + N unit-annotated series) and categorical.

mod categorical;
mod codec;
mod timeseries;

pub use categorical::{CategoricalTable, Cell};
pub use codec::{CodecError, ColumnarTable};
pub use timeseries::{
    TIMESTAMP_COLUMN, TIMESTAMP_FORMAT, TimeSeriesRow, TimeSeriesTable, parse_timestamp,
    renderer_date,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    /// Column/unit/row length mismatch: a caller bug, never coerced.
    #[error("shape error: {0}")]
    Shape(String),
    #[error("cannot parse timestamp {value:?}: {source}")]
    Format {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}
