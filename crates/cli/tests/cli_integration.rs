//! Integration tests for the tw binary

#[allow(dead_code)]
mod common;

use anyhow::Result;
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[test]
fn test_config_prints_defaults() -> Result<()> {
    let dir = TempDir::new()?;

    let result = tw!(dir.path(), "config").assert_success()?;

    assert!(result.contains_stdout("[watcher]"));
    assert!(result.contains_stdout("poll_interval_ms = 100"));
    Ok(())
}

#[test]
fn test_config_file_is_applied() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("tw.toml"), "[watcher]\npoll_interval_ms = 40\n")?;

    let result = tw!(dir.path(), "--config", "tw.toml", "config").assert_success()?;

    assert!(result.contains_stdout("poll_interval_ms = 40"));
    assert!(result.contains_stdout("dir_poll_interval_ms = 100"));
    Ok(())
}

#[test]
fn test_invalid_config_fails() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("tw.toml"), "[watcher]\npoll_interval_ms = 0\n")?;

    let result = tw!(dir.path(), "--config", "tw.toml", "config").assert_failure()?;

    assert!(result.contains_stderr("Invalid config file"));
    Ok(())
}

#[test]
fn test_watch_missing_path_fails() -> Result<()> {
    let dir = TempDir::new()?;

    let result = tw!(dir.path(), "watch", "missing.txt").assert_failure()?;

    assert!(result.contains_stderr("Failed to watch missing.txt"));
    assert!(result.contains_stderr("Path does not exist"));
    Ok(())
}

#[test]
fn test_watch_streams_json_events() -> Result<()> {
    let dir = TempDir::new()?;
    let watched = dir.path().join("watched");
    fs::create_dir(&watched)?;
    let file = watched.join("a.txt");
    fs::write(&file, b"a")?;

    let process = tw!(
        dir.path(),
        "watch",
        "watched",
        "--json",
        "--interval-ms",
        "20",
        "--dir-interval-ms",
        "20"
    )
    .spawn()?;

    // Keep nudging the mtime until the watcher is up and reports it
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut offset = 0;
    let line = loop {
        offset += 5;
        let current = FileTime::from_last_modification_time(&fs::metadata(&file)?);
        set_file_mtime(
            &file,
            FileTime::from_unix_time(current.unix_seconds() + offset, 0),
        )?;

        if let Some(line) = process.next_line(Duration::from_millis(200)) {
            break line;
        }
        assert!(Instant::now() < deadline, "no event from tw watch");
    };

    let event: serde_json::Value = serde_json::from_str(&line)?;
    assert_eq!(event["kind"], "change");
    assert!(event["path"].as_str().unwrap_or_default().ends_with("a.txt"));
    Ok(())
}
