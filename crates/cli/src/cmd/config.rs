//! Print the effective configuration

use crate::config;
use anyhow::Result;
use owo_colors::OwoColorize;
use tickwatch::WatcherConfig;

pub fn run(config: &WatcherConfig) -> Result<()> {
    println!("{}", "# Effective configuration".dimmed());
    print!("{}", config::to_toml(config)?);
    Ok(())
}
