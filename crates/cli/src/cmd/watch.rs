//! Watch paths and print events until Ctrl-C

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use tickwatch::{ChangeEvent, ChangeKind, Watcher, WatcherConfig};
use tracing::{info, warn};

pub async fn run(paths: &[PathBuf], recursive: bool, config: WatcherConfig, json: bool) -> Result<()> {
    let watcher = Watcher::new(config).context("Failed to start watcher")?;

    watcher.on_change(move |event| match format_event(event, json) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!("Failed to format event for {}: {}", event.path.display(), e),
    });

    for path in paths {
        watcher
            .add(path, recursive)
            .with_context(|| format!("Failed to watch {}", path.display()))?;
    }

    info!(
        "Watching {} path(s), {} entries registered",
        paths.len(),
        watcher.watched_paths().len()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    watcher.close();
    info!("Stopped");
    Ok(())
}

/// One output line per event
pub fn format_event(event: &ChangeEvent, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string(event).context("Failed to serialize event");
    }

    let label = format!("{:<6}", event.kind);
    let label = match event.kind {
        ChangeKind::New => label.green().to_string(),
        ChangeKind::Change => label.yellow().to_string(),
        ChangeKind::Delete => label.red().to_string(),
    };
    Ok(format!("{} {}", label, event.path.display()))
}
