use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregateSettings, DEFAULT_TOP_N, MIN_LISTEN_MS};
use crate::chart::DEFAULT_CHART_BARS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Default history file, export directory or URL.
    #[serde(default)]
    pub history: Option<String>,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_chart_bars")]
    pub chart_bars: usize,
    #[serde(default = "default_min_ms_played")]
    pub min_ms_played: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history: None,
            top_n: default_top_n(),
            chart_bars: default_chart_bars(),
            min_ms_played: default_min_ms_played(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn aggregate_settings(&self) -> AggregateSettings {
        AggregateSettings {
            min_ms_played: self.min_ms_played,
            top_n: self.top_n,
        }
    }
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_chart_bars() -> usize {
    DEFAULT_CHART_BARS
}

fn default_min_ms_played() -> u64 {
    MIN_LISTEN_MS
}

fn default_log_level() -> String {
    "warn".to_string()
}

pub fn default_config_path() -> PathBuf {
    let fallback = PathBuf::from(".config/toodi/config.json");
    dirs::home_dir().map_or(fallback, |home| home.join(".config/toodi/config.json"))
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed reading config at {}", path.display()))?;
    let config = serde_json::from_str(&raw)
        .with_context(|| format!("Failed parsing config at {}", path.display()))?;
    Ok(config)
}

pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed creating config directory {}", parent.display()))?;
    }
    let serialized =
        serde_json::to_string_pretty(config).context("Failed serializing config to JSON")?;
    fs::write(path, format!("{serialized}\n"))
        .with_context(|| format!("Failed writing config at {}", path.display()))?;
    Ok(())
}
