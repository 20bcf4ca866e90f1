// Header document: static description of the monitored entity, read once.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Header sections written by the collector. Every section is optional: a missing
/// section means that subsystem was not collected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Header {
    #[serde(default)]
    pub identity: Option<Identity>,
    #[serde(default)]
    pub cgroup_config: Option<CgroupConfig>,
    #[serde(default)]
    pub cmonitor: Option<CmonitorInfo>,
    #[serde(default)]
    pub cpuinfo: Option<BTreeMap<String, CpuCoreInfo>>,
    #[serde(default)]
    pub proc_meminfo: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub numa_nodes: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub os_release: Option<OsRelease>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
    pub hostname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CgroupConfig {
    pub name: String,
    /// "1" or "2" in collector output; numbers are accepted too.
    #[serde(deserialize_with = "de_version")]
    pub version: Option<u32>,
    /// -1 when unlimited.
    pub memory_limit_bytes: f64,
    /// quota_us / period_us (2.0 = two full CPUs), -1 when unlimited.
    pub cpu_quota_perc: f64,
    /// Comma-separated list of CPUs allowed in the cgroup.
    pub cpus: String,
}

impl Default for CgroupConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: None,
            memory_limit_bytes: -1.0,
            cpu_quota_perc: -1.0,
            cpus: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CmonitorInfo {
    pub version: String,
    pub collecting: String,
    pub username: String,
    pub sample_interval_seconds: f64,
    /// 0 means sampling forever.
    pub sample_num: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuCoreInfo {
    pub model_name: String,
    pub vendor_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OsRelease {
    pub name: String,
    pub pretty_name: String,
    pub version: String,
}

fn de_version<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => parse_version(&s),
        _ => None,
    })
}

/// "2", "v2" and "V2" all mean version 2; anything else is logged and ignored.
fn parse_version(s: &str) -> Option<u32> {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
    let version = digits.parse().ok();
    if version.is_none() {
        warn!(version = s, "unrecognized cgroup version, assuming v1 metric names");
    }
    version
}

impl Header {
    pub fn hostname(&self) -> Option<&str> {
        self.identity
            .as_ref()
            .map(|i| i.hostname.as_str())
            .filter(|h| !h.is_empty())
    }

    /// Cgroup version from `cgroup_config.version`; 1 when not reported.
    pub fn cgroup_version(&self) -> u32 {
        self.cgroup_config
            .as_ref()
            .and_then(|c| c.version)
            .unwrap_or(1)
    }

    /// Configured memory limit in bytes, `None` when unlimited or no cgroup was monitored.
    pub fn memory_limit_bytes(&self) -> Option<f64> {
        self.cgroup_config
            .as_ref()
            .map(|c| c.memory_limit_bytes)
            .filter(|limit| *limit > 0.0)
    }

    /// Configured CPU quota as a percentage (200 = two full CPUs), `None` when unlimited.
    pub fn cpu_quota_percent(&self) -> Option<f64> {
        self.cgroup_config
            .as_ref()
            .map(|c| c.cpu_quota_perc)
            .filter(|quota| *quota > 0.0)
            .map(|ratio| ratio * 100.0)
    }

    /// Number of CPU entries in the `cpuinfo` section, if present.
    pub fn cpu_count(&self) -> Option<usize> {
        self.cpuinfo.as_ref().map(|c| c.len()).filter(|n| *n > 0)
    }

    pub fn cpu_model(&self) -> Option<&str> {
        self.cpuinfo
            .as_ref()?
            .values()
            .map(|c| c.model_name.trim())
            .find(|m| !m.is_empty())
    }

    pub fn numa_node_count(&self) -> Option<usize> {
        self.numa_nodes.as_ref().map(|n| n.len())
    }
}
