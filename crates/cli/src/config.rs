//! Config file loading
//!
//! ```toml
//! [watcher]
//! poll_interval_ms = 100
//! dir_poll_interval_ms = 250
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tickwatch::WatcherConfig;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub watcher: WatcherConfig,
}

/// Load the config file, or defaults when none is given
pub fn load(path: Option<&Path>) -> Result<WatcherConfig> {
    let Some(path) = path else {
        return Ok(WatcherConfig::default());
    };

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse(&contents).with_context(|| format!("Invalid config file {}", path.display()))
}

pub fn parse(contents: &str) -> Result<WatcherConfig> {
    let file: FileConfig = toml::from_str(contents).context("Failed to parse TOML")?;
    file.watcher.validate()?;
    Ok(file.watcher)
}

/// Apply command line overrides and re-validate
pub fn with_overrides(
    mut config: WatcherConfig,
    interval_ms: Option<u64>,
    dir_interval_ms: Option<u64>,
) -> Result<WatcherConfig> {
    if let Some(ms) = interval_ms {
        config.poll_interval_ms = ms;
    }
    if let Some(ms) = dir_interval_ms {
        config.dir_poll_interval_ms = ms;
    }
    config.validate().context("Invalid interval")?;
    Ok(config)
}

pub fn to_toml(config: &WatcherConfig) -> Result<String> {
    let file = FileConfig {
        watcher: config.clone(),
    };
    toml::to_string_pretty(&file).context("Failed to serialize config")
}
