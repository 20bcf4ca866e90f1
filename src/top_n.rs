// Per-task ranking over `cgroup_tasks`: top-N by CPU time, one bubble chart and
// CPU / memory / I/O time series per ranked task.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::chart::{AxisMax, ChartSpec, SourceCategory};
use crate::extractors::{
    ExtractContext, ExtractError, SkipCounter, for_each_section, throttling_percent,
};
use crate::models::{lookup_number, number};
use crate::sample_set::SampleSet;
use crate::table::{CategoricalTable, Cell, TIMESTAMP_COLUMN, TimeSeriesTable};

pub const TASKS: &str = "cgroup_tasks";
const CGROUP_CPUACCT: &str = "cgroup_cpuacct_stats";
const CGROUP_MEMORY: &str = "cgroup_memory_stats";

pub const IDLE_COLUMN: &str = "Idle";
pub const THROTTLING_COLUMN: &str = "Throttling";
pub const FREE_COLUMN: &str = "Free";
pub const ALLOC_FAILURES_COLUMN: &str = "Alloc Failures";

/// Last-seen cumulative counters of one task.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedTask {
    pub id: u64,
    /// Owning process: `tgid` for a secondary thread, `id` otherwise.
    pub main_id: u64,
    pub command: String,
    pub cpu_secs: f64,
    pub io_bytes: f64,
    pub rss_bytes: f64,
}

impl RankedTask {
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.command, self.id)
    }

    pub fn is_main(&self) -> bool {
        self.id == self.main_id
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskRanking {
    /// Highest CPU time first; ties keep encounter order.
    pub ranked: Vec<RankedTask>,
    /// Command of every task seen, ranked or not.
    pub commands: HashMap<u64, String>,
    /// Data samples without a `cgroup_tasks` section.
    pub invalid_samples: usize,
}

fn task_id(key: &str, task: &Map<String, Value>) -> Option<u64> {
    match number(task, "pid") {
        Some(pid) if pid >= 0.0 => Some(pid as u64),
        _ => key.strip_prefix("pid_")?.parse().ok(),
    }
}

fn main_id(id: u64, task: &Map<String, Value>) -> u64 {
    match number(task, "tgid") {
        Some(tgid) if tgid > 0.0 => tgid as u64,
        _ => id,
    }
}

/// Tasks of one `cgroup_tasks` section with their id.
fn tasks_of(section: &Map<String, Value>) -> impl Iterator<Item = (u64, &Map<String, Value>)> {
    section.iter().filter_map(|(key, v)| {
        let task = v.as_object()?;
        Some((task_id(key, task)?, task))
    })
}

fn sum_of(task: &Map<String, Value>, a: &str, b: &str) -> f64 {
    number(task, a).unwrap_or(0.0) + number(task, b).unwrap_or(0.0)
}

/// Accumulates last-seen counters over the data samples and keeps the `top_n` tasks
/// with the most CPU time (`top_n == 0` keeps all).
pub fn rank_tasks(samples: &SampleSet, top_n: usize) -> TaskRanking {
    let mut tasks: Vec<RankedTask> = Vec::new();
    let mut slot: HashMap<u64, usize> = HashMap::new();
    let mut invalid_samples = 0;

    for (_, sample) in samples.data_samples() {
        let Some(section) = sample.section(TASKS) else {
            invalid_samples += 1;
            continue;
        };
        for (id, task) in tasks_of(section) {
            let entry = RankedTask {
                id,
                main_id: main_id(id, task),
                command: task
                    .get("cmd")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                cpu_secs: sum_of(task, "cpu_usr_total_secs", "cpu_sys_total_secs"),
                io_bytes: sum_of(task, "io_total_read", "io_total_write"),
                rss_bytes: number(task, "mem_rss_bytes").unwrap_or(0.0),
            };
            match slot.get(&id) {
                Some(&i) => tasks[i] = entry,
                None => {
                    slot.insert(id, tasks.len());
                    tasks.push(entry);
                }
            }
        }
    }

    let commands = tasks.iter().map(|t| (t.id, t.command.clone())).collect();
    tasks.sort_by(|a, b| b.cpu_secs.total_cmp(&a.cpu_secs));
    if top_n > 0 {
        tasks.truncate(top_n);
    }
    TaskRanking {
        ranked: tasks,
        commands,
        invalid_samples,
    }
}

/// Extractor entry point.
pub fn top_tasks(ctx: &ExtractContext<'_>) -> Result<Vec<ChartSpec>, ExtractError> {
    if !ctx
        .samples
        .data_samples()
        .any(|(_, s)| s.has_section(TASKS))
    {
        info!(extractor = "top_tasks", section = TASKS, "section not collected, no charts");
        return Ok(Vec::new());
    }
    let ranking = rank_tasks(ctx.samples, ctx.top_n);
    if ranking.invalid_samples > 0 {
        warn!(
            extractor = "top_tasks",
            skipped = ranking.invalid_samples,
            "samples without per-task data"
        );
    }
    if ranking.ranked.is_empty() {
        return Ok(Vec::new());
    }

    Ok(vec![
        bubble_chart(ctx, &ranking)?,
        cpu_chart(ctx, &ranking)?,
        memory_chart(ctx, &ranking)?,
        io_chart(ctx, &ranking)?,
    ])
}

fn bubble_chart(
    ctx: &ExtractContext<'_>,
    ranking: &TaskRanking,
) -> Result<ChartSpec, ExtractError> {
    let mut table = CategoricalTable::new(
        ["Command", "CPU time", "I/O", "Task", "Memory"]
            .map(String::from)
            .to_vec(),
    )?;
    for task in &ranking.ranked {
        table.add_row(vec![
            task.command.as_str().into(),
            task.cpu_secs.into(),
            task.io_bytes.into(),
            Cell::Text(task.display_name()),
            task.rss_bytes.into(),
        ])?;
    }
    Ok(ChartSpec::builder(
        "CPU time, I/O and memory of the top tasks (from CGroup stats)",
        SourceCategory::CgroupPerTask,
        table,
    )
    .button("Top Tasks")
    .axis("CPU time (secs)", AxisMax::Auto)
    .axis("I/O (bytes)", AxisMax::Auto)
    .margin(ctx.margin)
    .build()?)
}

fn cpu_chart(ctx: &ExtractContext<'_>, ranking: &TaskRanking) -> Result<ChartSpec, ExtractError> {
    let quota = ctx.samples.header().cpu_quota_percent();
    let mut columns: Vec<String> = ranking.ranked.iter().map(RankedTask::display_name).collect();
    if quota.is_some() {
        columns.extend([IDLE_COLUMN.to_string(), THROTTLING_COLUMN.to_string()]);
    }
    let mut table = TimeSeriesTable::with_series(columns, "%")?;

    let skips = SkipCounter::new("top_tasks_cpu");
    for_each_section(ctx.samples, TASKS, &skips, |index, ts, section| {
        let usage: HashMap<u64, f64> = tasks_of(section)
            .map(|(id, task)| (id, number(task, "cpu_tot").unwrap_or(0.0)))
            .collect();
        let mut row: Vec<f64> = ranking
            .ranked
            .iter()
            .map(|t| usage.get(&t.id).copied().unwrap_or(0.0))
            .collect();
        if let Some(quota) = quota {
            let used: f64 = usage.values().sum();
            row.push((quota - used).max(0.0));
            let throttling = ctx.samples.samples()[index]
                .section(CGROUP_CPUACCT)
                .map(throttling_percent)
                .unwrap_or(0.0);
            row.push(throttling);
        }
        table.push_row(ts, row)?;
        Ok(())
    })?;
    skips.finish();

    let builder = ChartSpec::builder(
        "CPU usage by task (from CGroup stats)",
        SourceCategory::CgroupPerTask,
        table,
    )
    .button("CPU by Task")
    .stacked(true)
    .margin(ctx.margin);
    let builder = if quota.is_some() {
        builder
            .axis("Time (%)", AxisMax::Auto)
            .axis("Throttling (%)", AxisMax::AutoWithMargin)
            .secondary_columns([THROTTLING_COLUMN])
    } else {
        builder.axis("Time (%)", AxisMax::Auto)
    };
    Ok(builder.build()?)
}

fn memory_chart(
    ctx: &ExtractContext<'_>,
    ranking: &TaskRanking,
) -> Result<ChartSpec, ExtractError> {
    let limit = ctx.samples.header().memory_limit_bytes();
    let mut mains: Vec<u64> = Vec::new();
    for task in &ranking.ranked {
        if !mains.contains(&task.main_id) {
            mains.push(task.main_id);
        }
    }

    let mut columns = vec![TIMESTAMP_COLUMN.to_string()];
    columns.extend(mains.iter().map(|main| {
        let command = ranking.commands.get(main).map_or("", String::as_str);
        format!("{command} ({main})")
    }));
    let mut units = vec![String::new(); columns.len()];
    units[1..].fill("bytes".to_string());
    if limit.is_some() {
        columns.extend([FREE_COLUMN.to_string(), ALLOC_FAILURES_COLUMN.to_string()]);
        units.extend(["bytes".to_string(), String::new()]);
    }
    let mut table = TimeSeriesTable::new(columns, Some(units))?;

    let skips = SkipCounter::new("top_tasks_memory");
    for_each_section(ctx.samples, TASKS, &skips, |index, ts, section| {
        // threads share their process's address space: keep one RSS per main task
        let mut rss: HashMap<u64, f64> = HashMap::new();
        for (id, task) in tasks_of(section) {
            let value = number(task, "mem_rss_bytes").unwrap_or(0.0);
            let slot = rss.entry(main_id(id, task)).or_insert(0.0);
            *slot = slot.max(value);
        }
        let mut row: Vec<f64> = mains
            .iter()
            .map(|m| rss.get(m).copied().unwrap_or(0.0))
            .collect();
        if let Some(limit) = limit {
            let names = ctx.metric_names;
            let stats = ctx.samples.samples()[index].section(CGROUP_MEMORY);
            // same Free as the cgroup memory chart; task RSS only when the counters are missing
            let charged = stats
                .and_then(|m| {
                    let used = lookup_number(m, names.memory_used)?;
                    Some(used + lookup_number(m, names.memory_cached)?)
                })
                .unwrap_or_else(|| rss.values().sum());
            row.push((limit - charged).max(0.0));
            let failures = stats
                .and_then(|m| lookup_number(m, names.alloc_failures))
                .unwrap_or(0.0);
            row.push(failures);
        }
        table.push_row(ts, row)?;
        Ok(())
    })?;
    skips.finish();

    let builder = ChartSpec::builder(
        "Memory usage by process (from CGroup stats)",
        SourceCategory::CgroupPerTask,
        table,
    )
    .button("Memory by Task")
    .stacked(true)
    .margin(ctx.margin);
    let builder = if limit.is_some() {
        builder
            .axis("bytes", AxisMax::Auto)
            .axis(ALLOC_FAILURES_COLUMN, AxisMax::AutoWithMargin)
            .secondary_columns([ALLOC_FAILURES_COLUMN])
    } else {
        builder.axis("bytes", AxisMax::Auto)
    };
    Ok(builder.build()?)
}

fn io_chart(ctx: &ExtractContext<'_>, ranking: &TaskRanking) -> Result<ChartSpec, ExtractError> {
    let mut table = TimeSeriesTable::with_series(
        ranking.ranked.iter().map(RankedTask::display_name),
        "bytes",
    )?;

    // cumulative read+write of each task at its previous appearance
    let mut previous: HashMap<u64, f64> = HashMap::new();
    let skips = SkipCounter::new("top_tasks_io");
    for_each_section(ctx.samples, TASKS, &skips, |_, ts, section| {
        let mut delta: HashMap<u64, f64> = HashMap::new();
        for (id, task) in tasks_of(section) {
            let total = sum_of(task, "io_total_read", "io_total_write");
            let d = previous.insert(id, total).map_or(0.0, |prev| total - prev);
            delta.insert(id, d);
        }
        let row = ranking
            .ranked
            .iter()
            .map(|t| delta.get(&t.id).copied().unwrap_or(0.0))
            .collect();
        table.push_row(ts, row)?;
        Ok(())
    })?;
    skips.finish();

    Ok(ChartSpec::builder(
        "I/O by task (from CGroup stats)",
        SourceCategory::CgroupPerTask,
        table,
    )
    .button("I/O by Task")
    .stacked(true)
    .axis("bytes", AxisMax::Auto)
    .margin(ctx.margin)
    .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_id_from_field_or_key() {
        let task = json!({"pid": 42});
        assert_eq!(task_id("pid_7", task.as_object().unwrap()), Some(42));
        assert_eq!(task_id("pid_7", &Map::new()), Some(7));
        assert_eq!(task_id("garbage", &Map::new()), None);
    }

    #[test]
    fn thread_resolves_to_tgid() {
        let thread = json!({"pid": 11, "tgid": 10});
        assert_eq!(main_id(11, thread.as_object().unwrap()), 10);
        assert_eq!(main_id(10, &Map::new()), 10);
    }
}
