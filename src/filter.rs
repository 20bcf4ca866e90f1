// Filter engine: drops samples outside a time window and per-task entries by command name.
// Works on the raw document so that every field the collector wrote is preserved.

use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::table::{TableError, parse_timestamp};

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("missing required top-level key '{0}'")]
    MissingKey(&'static str),
    #[error("time filter needs a start or an end timestamp")]
    NoBounds,
    #[error("sample {index}: {source}")]
    Timestamp {
        index: usize,
        #[source]
        source: TableError,
    },
    #[error("sample {0} has no timestamp.UTC")]
    MissingTimestamp(usize),
}

/// Parse a filter bound; the fractional part is optional.
pub fn parse_bound(value: &str) -> Result<NaiveDateTime, TableError> {
    parse_timestamp(value.trim())
}

#[derive(Debug, Clone)]
pub struct FilterEngine {
    doc: Map<String, Value>,
    samples: Vec<Value>,
}

impl FilterEngine {
    pub fn new(doc: Value) -> Result<Self, FilterError> {
        let Value::Object(mut doc) = doc else {
            return Err(FilterError::MissingKey("samples"));
        };
        let Some(Value::Array(samples)) = doc.remove("samples") else {
            return Err(FilterError::MissingKey("samples"));
        };
        Ok(Self { doc, samples })
    }

    pub fn samples(&self) -> &[Value] {
        &self.samples
    }

    /// Keeps samples with `start <= t <= end`; either bound may be omitted, not both.
    /// Returns the number of samples removed.
    pub fn filter_by_time(
        &mut self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<usize, FilterError> {
        if start.is_none() && end.is_none() {
            return Err(FilterError::NoBounds);
        }
        let keep = self
            .samples
            .iter()
            .enumerate()
            .map(|(index, sample)| {
                let ts = sample
                    .pointer("/timestamp/UTC")
                    .and_then(Value::as_str)
                    .ok_or(FilterError::MissingTimestamp(index))?;
                let t = parse_timestamp(ts)
                    .map_err(|source| FilterError::Timestamp { index, source })?;
                Ok(start.is_none_or(|s| s <= t) && end.is_none_or(|e| t <= e))
            })
            .collect::<Result<Vec<bool>, FilterError>>()?;

        let mut keep = keep.into_iter();
        let before = self.samples.len();
        self.samples.retain(|_| keep.next().unwrap_or(true));
        let removed = before - self.samples.len();
        info!(?start, ?end, removed, "filtered samples by time");
        Ok(removed)
    }

    /// Removes per-task entries whose `cmd` does not contain `name`.
    /// Returns the number of task entries removed.
    pub fn filter_by_task_name(&mut self, name: &str) -> usize {
        let mut removed = 0;
        for sample in &mut self.samples {
            let Some(tasks) = sample.get_mut("cgroup_tasks").and_then(Value::as_object_mut) else {
                continue;
            };
            let before = tasks.len();
            tasks.retain(|_, task| {
                task.get("cmd")
                    .and_then(Value::as_str)
                    .is_some_and(|cmd| cmd.contains(name))
            });
            removed += before - tasks.len();
        }
        info!(task_name = name, removed, "filtered tasks by name");
        removed
    }

    pub fn into_document(mut self) -> Value {
        self.doc.insert("samples".to_string(), Value::Array(self.samples));
        Value::Object(self.doc)
    }
}
