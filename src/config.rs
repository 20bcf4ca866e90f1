use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub chart: ChartConfig,
    pub statistics: StatisticsConfig,
    pub loader: LoaderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Tasks kept by the per-task ranking; 0 keeps all of them.
    pub top_n: usize,
    /// Auto-with-margin secondary axis cap = max * factor + margin.
    pub secondary_axis_factor: f64,
    pub secondary_axis_margin: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            top_n: 20,
            secondary_axis_factor: 5.0,
            secondary_axis_margin: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    pub min_samples: usize,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self { min_samples: 3 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Bootstrap sample plus at least one data sample.
    pub min_samples: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { min_samples: 2 }
    }
}

impl ReportConfig {
    /// Reads `path`, else the file named by `CONFIG_FILE`; built-in defaults when neither is set.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match std::env::var_os("CONFIG_FILE") {
                Some(p) => p.into(),
                None => return Ok(Self::default()),
            },
        };
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: ReportConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.chart.secondary_axis_factor.is_finite() && self.chart.secondary_axis_factor > 0.0,
            "chart.secondary_axis_factor must be > 0, got {}",
            self.chart.secondary_axis_factor
        );
        anyhow::ensure!(
            self.chart.secondary_axis_margin.is_finite() && self.chart.secondary_axis_margin >= 0.0,
            "chart.secondary_axis_margin must be >= 0, got {}",
            self.chart.secondary_axis_margin
        );
        anyhow::ensure!(
            self.statistics.min_samples >= 2,
            "statistics.min_samples must be >= 2, got {}",
            self.statistics.min_samples
        );
        anyhow::ensure!(
            self.loader.min_samples >= 2,
            "loader.min_samples must be >= 2, got {}",
            self.loader.min_samples
        );
        Ok(())
    }
}
