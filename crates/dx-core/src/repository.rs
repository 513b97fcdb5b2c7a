//! Repository facade over the accumulator, scheduler, and sink.
//!
//! Reporting is fire-and-forget: it performs an in-memory upsert and nothing
//! else. Flushing resolves the sink lazily, walks a snapshot, and removes
//! each record only after its insert succeeded, with per-record failure
//! isolation so one bad insert never aborts the rest of the pass.

use std::sync::{Arc, Mutex, OnceLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info, trace, warn};

use dx_common::Severity;

use crate::accumulator::EventAccumulator;
use crate::sink::{SinkResolver, StorageSink};

/// The inbound surface the rest of the application uses to report
/// diagnostics, plus the flush entry point driven by the scheduler.
pub struct DiagnosticEventRepository {
    accumulator: EventAccumulator,
    resolver: Arc<dyn SinkResolver>,
    // Resolved at most once and shared across all subsequent flushes.
    sink: OnceLock<Arc<dyn StorageSink>>,
    // Non-reentrant guard: an overlapping flush is skipped, not queued.
    flush_gate: Mutex<()>,
}

impl DiagnosticEventRepository {
    pub fn new(resolver: Arc<dyn SinkResolver>) -> Self {
        DiagnosticEventRepository {
            accumulator: EventAccumulator::new(),
            resolver,
            sink: OnceLock::new(),
            flush_gate: Mutex::new(()),
        }
    }

    /// Record one diagnostic occurrence.
    ///
    /// Never blocks on the durable store and never fails: downstream
    /// persistence problems are invisible to the reporting call site.
    pub fn add_diagnostic_event(
        &self,
        timestamp: DateTime<Utc>,
        error_code: &str,
        level: Severity,
        message: &str,
        help_link: Option<&str>,
        cause: Option<&(dyn std::error::Error + 'static)>,
    ) {
        let details = cause.map(format_cause);
        self.accumulator
            .report(timestamp, error_code, level, message, help_link, details);
    }

    /// Persist accumulated records to the sink and drop the persisted ones.
    ///
    /// Safe to call concurrently with itself and with reporting: overlapping
    /// invocations are skipped by the gate, and no lock is held across sink
    /// I/O. Failures are absorbed; records that fail to persist (or gain a
    /// new report mid-flush) stay pending for the next cycle.
    pub fn flush_logs(&self) {
        use std::sync::TryLockError;
        let _guard = match self.flush_gate.try_lock() {
            Ok(guard) => guard,
            // A panicking sink poisons the gate; the guard carries no data,
            // so the next flush may still proceed.
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!("flush already in progress, skipping tick");
                return;
            }
        };

        let snapshot = self.accumulator.snapshot();
        if snapshot.is_empty() {
            trace!("no pending diagnostic events");
            return;
        }

        let Some(sink) = self.ensure_sink() else {
            debug!(
                pending = snapshot.len(),
                "destination not resolvable, retaining pending events"
            );
            return;
        };

        let mut persisted = 0usize;
        let mut failed = 0usize;
        let mut retained = 0usize;

        for event in &snapshot {
            match sink.insert(event) {
                Ok(()) => {
                    persisted += 1;
                    if !self
                        .accumulator
                        .remove_if_unchanged(&event.error_code, event.hit_count)
                    {
                        // Re-reported while the flush was in progress; the
                        // updated record rides along to the next cycle.
                        retained += 1;
                        debug!(error_code = %event.error_code, "event updated during flush, retained");
                    }
                }
                Err(err) => {
                    failed += 1;
                    warn!(error_code = %event.error_code, error = %err, "failed to persist diagnostic event");
                }
            }
        }

        info!(persisted, failed, retained, "diagnostic event flush complete");
    }

    /// Number of events currently pending persistence.
    pub fn pending_events(&self) -> usize {
        self.accumulator.len()
    }

    // Resolve-and-cache with a single-initialization guarantee: a racing
    // resolve may run twice, but only one handle is ever published.
    fn ensure_sink(&self) -> Option<Arc<dyn StorageSink>> {
        if let Some(sink) = self.sink.get() {
            return Some(Arc::clone(sink));
        }
        match self.resolver.resolve() {
            Ok(sink) => {
                let _ = self.sink.set(Arc::clone(&sink));
                // Re-read so concurrent initializers agree on one handle.
                self.sink.get().cloned().or(Some(sink))
            }
            Err(err) => {
                warn!(error = %err, "could not resolve diagnostic destination");
                None
            }
        }
    }
}

/// Render an error and its source chain, outermost first.
fn format_cause(cause: &(dyn std::error::Error + 'static)) -> String {
    let mut out = cause.to_string();
    let mut source = cause.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}
