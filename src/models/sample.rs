// One collection tick: a timestamp plus zero or more KPI sections, kept as raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sample(Map<String, Value>);

impl Sample {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// `timestamp.UTC`, e.g. "2022-01-18T00:02:47.897".
    pub fn timestamp_utc(&self) -> Option<&str> {
        self.0.get("timestamp")?.get("UTC")?.as_str()
    }

    pub fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.0.get(name)?.as_object()
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Sample {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Numeric value of `obj[key]`. Numeric strings (the collector writes a few) are accepted.
pub fn number(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    as_number(obj.get(key)?)
}

/// Like [`number`] but `path` may also address a nested object: "stat.rss" matches
/// either a flat `"stat.rss"` key or `{"stat": {"rss": ...}}`.
pub fn lookup_number(obj: &Map<String, Value>, path: &str) -> Option<f64> {
    if let Some(v) = obj.get(path) {
        return as_number(v);
    }
    let (head, rest) = path.split_once('.')?;
    lookup_number(obj.get(head)?.as_object()?, rest)
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
