// Loaded input document: header + ordered samples, read-only after load.
// Sample 0 is the collector's bootstrap sample; sample 1 is the template for section probing.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::{Header, Sample};

/// Index of the first sample carrying real (differential) data.
pub const FIRST_DATA_SAMPLE: usize = 1;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid JSON document: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("missing required top-level key '{0}'")]
    MissingKey(&'static str),
    #[error("found {found} samples, at least {required} are required")]
    TooFewSamples { found: usize, required: usize },
}

#[derive(Debug, Clone)]
pub struct SampleSet {
    header: Header,
    samples: Vec<Sample>,
}

impl SampleSet {
    pub fn new(header: Header, samples: Vec<Sample>) -> Self {
        Self { header, samples }
    }

    /// Parse a document text. A capture that was interrupted while running ends with
    /// `},` and is closed before parsing.
    pub fn from_json_str(text: &str, min_samples: usize) -> Result<Self, SchemaError> {
        let trimmed = text.trim_end();
        let doc: Value = match trimmed.strip_suffix("},") {
            Some(open) => {
                debug!("closing truncated sample array");
                serde_json::from_str(&format!("{}}}]}}", open))?
            }
            None => serde_json::from_str(trimmed)?,
        };
        Self::from_value(doc, min_samples)
    }

    pub fn from_value(doc: Value, min_samples: usize) -> Result<Self, SchemaError> {
        let Value::Object(mut doc) = doc else {
            return Err(SchemaError::MissingKey("header"));
        };
        let header = doc.remove("header").ok_or(SchemaError::MissingKey("header"))?;
        let samples = doc
            .remove("samples")
            .ok_or(SchemaError::MissingKey("samples"))?;
        let header: Header = serde_json::from_value(header)?;
        let samples: Vec<Sample> = serde_json::from_value(samples)?;
        if samples.len() < min_samples {
            return Err(SchemaError::TooFewSamples {
                found: samples.len(),
                required: min_samples,
            });
        }
        Ok(Self::new(header, samples))
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample used to decide which KPI sections were collected.
    pub fn template(&self) -> Option<&Sample> {
        self.samples.get(FIRST_DATA_SAMPLE)
    }

    /// Whether the template sample carries section `name`.
    pub fn has_section(&self, name: &str) -> bool {
        self.template().is_some_and(|s| s.has_section(name))
    }

    /// All samples after the bootstrap one, with their index in the document.
    pub fn data_samples(&self) -> impl Iterator<Item = (usize, &Sample)> {
        self.samples.iter().enumerate().skip(FIRST_DATA_SAMPLE)
    }

    /// Logical CPU indexes (`cpu<N>` keys) in the template's `section`, ascending.
    /// Aggregate keys (`cpu_total`, `cpu_tot`) are excluded.
    pub fn logical_cpus(&self, section: &str) -> Vec<u32> {
        let Some(obj) = self.template().and_then(|s| s.section(section)) else {
            return Vec::new();
        };
        let mut cpus: Vec<u32> = obj
            .keys()
            .filter(|k| *k != "cpu_total" && *k != "cpu_tot")
            .filter_map(|k| k.strip_prefix("cpu")?.parse().ok())
            .collect();
        cpus.sort_unstable();
        cpus
    }

    /// Keys of the template's `section` (devices, interfaces), in document order.
    pub fn section_keys(&self, section: &str) -> Vec<String> {
        self.template()
            .and_then(|s| s.section(section))
            .map(|obj| obj.keys().cloned().collect())
            .unwrap_or_default()
    }
}
