//! Aggregator configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::DEFAULT_FLUSH_INTERVAL_SECS;

/// Configuration for the diagnostic event service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Human-supplied application name; the destination identifier is
    /// derived from it under the store's naming constraints.
    pub app_name: String,

    /// Base directory for the JSONL sink. `None` uses the XDG data dir.
    pub base_dir: Option<PathBuf>,

    /// Seconds between scheduled flushes.
    pub flush_interval_secs: u64,

    /// Perform one final flush during shutdown.
    pub flush_on_shutdown: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            app_name: String::new(),
            base_dir: None,
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS,
            flush_on_shutdown: true,
        }
    }
}

impl AggregatorConfig {
    /// Create a config with defaults for the given application name.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Self::default()
        }
    }

    /// Set a custom base directory for the sink.
    pub fn with_base_dir(mut self, dir: PathBuf) -> Self {
        self.base_dir = Some(dir);
        self
    }

    /// Set a custom flush interval in seconds.
    pub fn with_flush_interval_secs(mut self, secs: u64) -> Self {
        self.flush_interval_secs = secs;
        self
    }

    /// Disable the final flush during shutdown.
    pub fn without_shutdown_flush(mut self) -> Self {
        self.flush_on_shutdown = false;
        self
    }
}
