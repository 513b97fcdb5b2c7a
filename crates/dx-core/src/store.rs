//! Append-only JSONL sink adapter.
//!
//! One destination, one file: records append as JSON lines keyed by
//! `error_code`, under a base directory partitioned per destination
//! identifier. Durable enough for local diagnostics without a network store.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use dx_common::{DestinationId, DiagnosticEvent};

use crate::sink::{SinkResolver, StorageError, StorageSink};

/// Sink writing each record as one JSON line to an append-only file.
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// Open a sink for an already-created destination directory.
    pub fn new(path: PathBuf) -> Self {
        JsonlSink { path }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageSink for JsonlSink {
    fn insert(&self, event: &DiagnosticEvent) -> Result<(), StorageError> {
        let line = serde_json::to_string(event)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;

        debug!(
            error_code = %event.error_code,
            hit_count = event.hit_count,
            "persisted diagnostic event"
        );
        Ok(())
    }
}

/// Resolver producing a [`JsonlSink`] for a destination derived from the
/// application name.
pub struct JsonlSinkResolver {
    base_dir: PathBuf,
    destination: DestinationId,
}

impl JsonlSinkResolver {
    /// Create a resolver rooted at `base_dir` for the given application.
    pub fn new(base_dir: PathBuf, app_name: &str) -> Self {
        JsonlSinkResolver {
            base_dir,
            destination: DestinationId::derive(app_name),
        }
    }

    /// The destination identifier this resolver targets.
    pub fn destination(&self) -> &DestinationId {
        &self.destination
    }
}

impl SinkResolver for JsonlSinkResolver {
    fn resolve(&self) -> Result<Arc<dyn StorageSink>, StorageError> {
        fs::create_dir_all(&self.base_dir)
            .map_err(|e| StorageError::Unavailable(format!("{}: {e}", self.base_dir.display())))?;

        let path = self.base_dir.join(format!("{}.jsonl", self.destination));
        info!(destination = %self.destination, path = %path.display(), "diagnostic destination resolved");
        Ok(Arc::new(JsonlSink::new(path)))
    }
}

/// Get the default diagnostics base directory from the XDG data dir.
pub fn default_diagnostics_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dx")
        .join("diagnostics")
}
