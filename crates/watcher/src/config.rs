//! Watcher configuration

use crate::error::WatchError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default poll interval for files and directories
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Polling configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Interval between stat calls on a watched file
    pub poll_interval_ms: u64,

    /// Interval between stat calls on a watched directory
    pub dir_poll_interval_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            dir_poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WatcherConfig {
    /// Same interval for files and directories
    ///
    /// Intervals have millisecond granularity; anything finer rounds up to
    /// the next whole millisecond.
    pub fn with_interval(interval: Duration) -> Self {
        let ms = u64::try_from(interval.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX);
        Self {
            poll_interval_ms: ms,
            dir_poll_interval_ms: ms,
        }
    }

    pub fn file_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn dir_interval(&self) -> Duration {
        Duration::from_millis(self.dir_poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), WatchError> {
        if self.poll_interval_ms == 0 {
            return Err(WatchError::InvalidArgument {
                reason: "poll_interval_ms must be greater than zero".to_string(),
            });
        }
        if self.dir_poll_interval_ms == 0 {
            return Err(WatchError::InvalidArgument {
                reason: "dir_poll_interval_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
