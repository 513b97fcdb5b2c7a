//! The durable sink seam.
//!
//! The aggregator's only contract toward the store: single-record inserts
//! keyed by error code, success or failure per insert. Idempotency on
//! duplicate keys is the sink's concern, not the aggregator's.

use std::sync::Arc;

use thiserror::Error;

use dx_common::DiagnosticEvent;

/// Errors from sink resolution and insert operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The destination is not reachable or not yet resolvable. Pending
    /// records survive and are retried on the next flush cycle.
    #[error("destination unavailable: {0}")]
    Unavailable(String),

    /// A single-record insert failed; isolated to that record.
    #[error("insert failed for {error_code}: {reason}")]
    Insert { error_code: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A durable keyed store accepting aggregated diagnostic records.
pub trait StorageSink: Send + Sync {
    /// Insert one record, keyed by its error code.
    fn insert(&self, event: &DiagnosticEvent) -> Result<(), StorageError>;
}

impl std::fmt::Debug for dyn StorageSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn StorageSink")
    }
}

/// Lazy, possibly-transient resolution of the destination handle.
///
/// Resolution may fail while the destination is not yet known or reachable;
/// the repository retries on each flush cycle and caches the first success.
pub trait SinkResolver: Send + Sync {
    fn resolve(&self) -> Result<Arc<dyn StorageSink>, StorageError>;
}
