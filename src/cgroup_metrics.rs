// Cgroup v1/v2 metric names for the same semantic quantities, resolved once per run.

/// Canonical keys inside `cgroup_memory_stats` for one cgroup version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CgroupMetricNames {
    pub version: u32,
    pub memory_used: &'static str,
    pub memory_cached: &'static str,
    pub alloc_failures: &'static str,
}

const V1: CgroupMetricNames = CgroupMetricNames {
    version: 1,
    memory_used: "stat.rss",
    memory_cached: "stat.cache",
    alloc_failures: "failcnt",
};

const V2: CgroupMetricNames = CgroupMetricNames {
    version: 2,
    memory_used: "stat.anon",
    memory_cached: "stat.file",
    alloc_failures: "events.oom_kill",
};

impl CgroupMetricNames {
    /// Names for `version`; anything other than 2 falls back to v1.
    pub fn for_version(version: u32) -> Self {
        match version {
            2 => V2,
            _ => V1,
        }
    }
}
