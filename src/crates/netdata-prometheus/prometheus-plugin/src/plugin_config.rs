use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::netdata_env::NetdataEnv;
use crate::sort::QUANTILE_LABEL;
use crate::summary_chart::CollectorOptions;

/// Name of the configuration file looked up in Netdata's config directories.
const CONFIG_FILE_NAME: &str = "prometheus.yaml";

/// Parse a duration string for clap (e.g., "1s", "10s", "1m")
fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s).map_err(|e| {
        format!(
            "Invalid duration format: '{}'. Use formats like '1s', '10s', '1m'. Error: {}",
            s, e
        )
    })
}

fn default_update_every() -> Duration {
    Duration::from_secs(1)
}

fn default_chart_type_id() -> String {
    String::from("prometheus_local")
}

fn default_chart_priority() -> i64 {
    70000
}

fn default_quantile_label() -> String {
    String::from(QUANTILE_LABEL)
}

#[derive(Debug, Parser, Clone, Serialize, Deserialize)]
#[command(name = "prometheus-plugin")]
#[command(about = "Prometheus summary metrics plugin.")]
#[command(version = "0.1")]
#[serde(deny_unknown_fields)]
pub struct PluginConfig {
    /// Collection interval (accepts human-readable durations like "1s", "10s", "1m")
    #[arg(long = "update-every", default_value = "1s", value_parser = parse_duration)]
    #[serde(with = "humantime_serde", default = "default_update_every")]
    pub update_every: Duration,

    /// YAML file holding the parsed samples of each scrape
    #[arg(long = "samples-file")]
    pub samples_file: PathBuf,

    /// Type part of every chart's `type.id`
    #[arg(long = "chart-type-id", default_value = "prometheus_local")]
    #[serde(default = "default_chart_type_id")]
    pub chart_type_id: String,

    /// Priority of the first chart
    #[arg(long = "chart-priority", default_value = "70000")]
    #[serde(default = "default_chart_priority")]
    pub chart_priority: i64,

    /// Label that carries the quantile of summary samples
    #[arg(long = "quantile-label", default_value = QUANTILE_LABEL)]
    #[serde(default = "default_quantile_label")]
    pub quantile_label: String,

    /// Collection interval in seconds, as passed by Netdata
    #[arg(hide = true)]
    #[serde(skip)]
    pub _update_frequency: Option<u64>,
}

impl PluginConfig {
    pub fn new(args: Vec<String>) -> Result<Self> {
        let netdata_env = NetdataEnv::from_environment();

        let config = if netdata_env.running_under_netdata() {
            Self::from_netdata_config_dirs(&netdata_env)?
        } else {
            // load from CLI args
            Self::parse_from(args)
        };

        config.resolve(&netdata_env)
    }

    /// Load the user config, falling back to the stock one.
    pub fn from_netdata_config_dirs(netdata_env: &NetdataEnv) -> Result<Self> {
        let user_config = netdata_env
            .user_config_dir
            .as_ref()
            .map(|path| path.join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
            .and_then(|path| match Self::from_yaml_file(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::error!(
                        "failed to load user config from {}: {:#}. Falling back to stock config.",
                        path.display(),
                        e
                    );
                    None
                }
            });

        if let Some(config) = user_config {
            return Ok(config);
        }

        let Some(stock_path) = netdata_env
            .stock_config_dir
            .as_ref()
            .map(|p| p.join(CONFIG_FILE_NAME))
        else {
            anyhow::bail!("no configuration directories available");
        };

        Self::from_yaml_file(&stock_path)
            .with_context(|| format!("loading stock config from {}", stock_path.display()))
    }

    /// Apply the interval Netdata asks for and validate the result.
    pub fn resolve(mut self, netdata_env: &NetdataEnv) -> Result<Self> {
        if let Some(secs) = self._update_frequency {
            self.update_every = Duration::from_secs(secs);
        }
        if let Some(secs) = netdata_env.update_every {
            self.update_every = Duration::from_secs(secs);
        }

        if self.update_every < Duration::from_secs(1) {
            anyhow::bail!(
                "update_every must be at least 1s, got: {}",
                humantime::format_duration(self.update_every)
            );
        }
        if self.update_every.subsec_nanos() != 0 {
            anyhow::bail!(
                "update_every must be a whole number of seconds, got: {}",
                humantime::format_duration(self.update_every)
            );
        }

        if self.chart_type_id.is_empty()
            || !self
                .chart_type_id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            anyhow::bail!(
                "chart type id may only contain letters, digits, '_' and '-', got: '{}'",
                self.chart_type_id
            );
        }

        if self.quantile_label.is_empty() {
            anyhow::bail!("quantile label cannot be empty");
        }

        if self.samples_file.as_os_str().is_empty() {
            anyhow::bail!("samples file path cannot be empty");
        }

        Ok(self)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: PluginConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config file: {}", path.display()))?;
        Ok(config)
    }

    /// Settings handed to the summary collector.
    pub fn collector_options(&self) -> CollectorOptions {
        CollectorOptions {
            quantile_label: self.quantile_label.clone(),
            priority: self.chart_priority,
            update_every: self.update_every.as_secs(),
        }
    }
}
