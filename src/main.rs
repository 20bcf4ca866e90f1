use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cmonitor_report::config::ReportConfig;
use cmonitor_report::filter::{FilterEngine, parse_bound};
use cmonitor_report::input::{default_report_path, read_document, write_output};
use cmonitor_report::report;
use cmonitor_report::sample_set::SampleSet;
use cmonitor_report::statistics::StatisticsEngine;
use cmonitor_report::version::{NAME, VERSION};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[derive(Parser, Debug)]
#[command(name = "cmonitor-report", version)]
#[command(about = "Chart data, statistics and filtering for cmonitor collector captures")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the chart report (chart specs, compact tables, summaries)
    Chart {
        /// Collector JSON capture; "-" reads stdin, ".gz" is decompressed
        input: PathBuf,
        /// Defaults to <input stem>.report.json
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Tasks kept in the per-task charts (0 = all); overrides chart.top_n
        #[arg(short, long)]
        top_n: Option<usize>,
    },
    /// Min/max/mean/median/mode of the cgroup KPIs
    Stats {
        input: PathBuf,
        /// Defaults to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Keep samples inside a time window and/or tasks matching a command name
    Filter {
        input: PathBuf,
        /// Defaults to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Inclusive lower bound, e.g. 2022-01-18T00:02:50
        #[arg(long)]
        start: Option<String>,
        /// Inclusive upper bound
        #[arg(long)]
        end: Option<String>,
        /// Keep only tasks whose command contains this string
        #[arg(long)]
        task_name: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ReportConfig::load(cli.config.as_deref())?;
    tracing::debug!(name = NAME, version = VERSION, ?config, "starting");

    match cli.command {
        Command::Chart {
            input,
            output,
            top_n,
        } => {
            let mut config = config;
            if let Some(n) = top_n {
                config.chart.top_n = n;
            }
            let text = read_document(&input)?;
            let samples = SampleSet::from_json_str(&text, config.loader.min_samples)
                .with_context(|| format!("loading {}", input.display()))?;
            let report = report::generate(&samples, &config)?;
            let output = output.unwrap_or_else(|| default_report_path(&input));
            write_output(Some(&output), &serde_json::to_string(&report)?)?;
            tracing::info!(
                charts = report.charts.len(),
                output = %output.display(),
                "report written"
            );
        }
        Command::Stats { input, output } => {
            let text = read_document(&input)?;
            let samples = SampleSet::from_json_str(&text, config.loader.min_samples)
                .with_context(|| format!("loading {}", input.display()))?;
            let stats = StatisticsEngine::new(config.statistics.min_samples)
                .verbose(cli.verbose)
                .process(&samples)?;
            write_output(output.as_deref(), &serde_json::to_string_pretty(&stats)?)?;
        }
        Command::Filter {
            input,
            output,
            start,
            end,
            task_name,
        } => {
            anyhow::ensure!(
                start.is_some() || end.is_some() || task_name.is_some(),
                "filter needs --start, --end or --task-name"
            );
            let text = read_document(&input)?;
            let doc: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", input.display()))?;
            let mut engine = FilterEngine::new(doc)?;
            if start.is_some() || end.is_some() {
                let start = start.as_deref().map(parse_bound).transpose()?;
                let end = end.as_deref().map(parse_bound).transpose()?;
                engine.filter_by_time(start, end)?;
            }
            if let Some(name) = task_name.as_deref() {
                engine.filter_by_task_name(name);
            }
            let kept = engine.samples().len();
            write_output(output.as_deref(), &serde_json::to_string(&engine.into_document())?)?;
            tracing::info!(samples = kept, "filtered document written");
        }
    }
    Ok(())
}
