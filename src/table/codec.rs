// Compact columnar transport form of a TimeSeriesTable.
// Encoding: [version: u8][wincode payload] -> zlib/deflate -> base64 (standard alphabet).

use std::io::{Read, Write};

use base64::Engine;
use chrono::DateTime;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use thiserror::Error;
use wincode::{SchemaRead, SchemaWrite};

use super::{TableError, TimeSeriesRow, TimeSeriesTable};

const COLUMNAR_VERSION: u8 = 1;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("deflate: {0}")]
    Io(#[from] std::io::Error),
    #[error("wincode: {0}")]
    Wincode(String),
    #[error("unsupported columnar format version {0}")]
    Version(u8),
    #[error("timestamp {secs}.{nanos} out of range")]
    Timestamp { secs: i64, nanos: u32 },
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Column-major copy of a time-series table. Timestamps are split into seconds and
/// nanoseconds since the epoch so that decoding restores them exactly.
#[derive(Debug, Clone, PartialEq, SchemaRead, SchemaWrite)]
pub struct ColumnarTable {
    pub column_names: Vec<String>,
    pub column_units: Vec<String>,
    pub timestamp_secs: Vec<i64>,
    pub timestamp_nanos: Vec<u32>,
    /// One vector per data series, each `timestamp_secs.len()` long.
    pub series: Vec<Vec<f64>>,
}

impl ColumnarTable {
    pub fn encode(&self) -> Result<String, CodecError> {
        let payload = wincode::serialize(self).map_err(|e| CodecError::Wincode(e.to_string()))?;
        let mut blob = Vec::with_capacity(1 + payload.len());
        blob.push(COLUMNAR_VERSION);
        blob.extend_from_slice(&payload);

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&blob)?;
        let compressed = encoder.finish()?;
        Ok(base64::engine::general_purpose::STANDARD.encode(compressed))
    }

    pub fn decode(encoded: &str) -> Result<Self, CodecError> {
        let compressed = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
        let mut blob = Vec::new();
        ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut blob)?;
        let Some((&version, payload)) = blob.split_first() else {
            return Err(CodecError::Version(0));
        };
        if version != COLUMNAR_VERSION {
            return Err(CodecError::Version(version));
        }
        let table: ColumnarTable =
            wincode::deserialize(payload).map_err(|e| CodecError::Wincode(e.to_string()))?;
        Ok(table)
    }
}

impl TimeSeriesTable {
    pub fn to_columnar(&self) -> ColumnarTable {
        let rows = self.rows();
        let mut series = vec![Vec::with_capacity(rows.len()); self.series_count()];
        for row in rows {
            for (column, v) in series.iter_mut().zip(&row.values) {
                column.push(*v);
            }
        }
        ColumnarTable {
            column_names: self.column_names().to_vec(),
            column_units: self.column_units().to_vec(),
            timestamp_secs: rows
                .iter()
                .map(|r| r.timestamp.and_utc().timestamp())
                .collect(),
            timestamp_nanos: rows
                .iter()
                .map(|r| r.timestamp.and_utc().timestamp_subsec_nanos())
                .collect(),
            series,
        }
    }

    pub fn from_columnar(columnar: ColumnarTable) -> Result<Self, CodecError> {
        let n_rows = columnar.timestamp_secs.len();
        if columnar.timestamp_nanos.len() != n_rows
            || columnar.series.iter().any(|s| s.len() != n_rows)
        {
            return Err(TableError::Shape("columnar vectors have different lengths".into()).into());
        }
        let mut rows = Vec::with_capacity(n_rows);
        for i in 0..n_rows {
            let (secs, nanos) = (columnar.timestamp_secs[i], columnar.timestamp_nanos[i]);
            let timestamp = DateTime::from_timestamp(secs, nanos)
                .ok_or(CodecError::Timestamp { secs, nanos })?
                .naive_utc();
            let values = columnar.series.iter().map(|s| s[i]).collect();
            rows.push(TimeSeriesRow { timestamp, values });
        }
        Ok(TimeSeriesTable::from_parts(
            columnar.column_names,
            columnar.column_units,
            rows,
        )?)
    }

    /// Compact transport form: columnar, compressed, base64-encoded.
    pub fn encode_compact(&self) -> Result<String, CodecError> {
        self.to_columnar().encode()
    }

    pub fn decode_compact(encoded: &str) -> Result<Self, CodecError> {
        Self::from_columnar(ColumnarTable::decode(encoded)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> TimeSeriesTable {
        let mut t = TimeSeriesTable::with_series(["sda Read MB", "sda Write MB"], "MB").unwrap();
        t.add_row("2022-01-18T00:02:47.897", vec![0.1, -0.04]).unwrap();
        t.add_row("2022-01-18T00:02:48.123456", vec![1.5, -2.25]).unwrap();
        t
    }

    #[test]
    fn compact_form_restores_identical_table() {
        let table = sample_table();
        let encoded = table.encode_compact().unwrap();
        let decoded = TimeSeriesTable::decode_compact(&encoded).unwrap();
        assert_eq!(decoded, table);
        assert_eq!(decoded.to_string(), table.to_string());
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&[9, 0, 0]).unwrap();
        let encoded = base64::engine::general_purpose::STANDARD.encode(encoder.finish().unwrap());
        assert!(matches!(
            ColumnarTable::decode(&encoded),
            Err(CodecError::Version(9))
        ));
    }

    #[test]
    fn garbage_input_is_an_error() {
        assert!(ColumnarTable::decode("not base64 !!!").is_err());
    }
}
