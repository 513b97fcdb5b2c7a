//! Concurrent keyed accumulator for diagnostic events.
//!
//! Upsert-and-drain store: reporters fold occurrences into per-code records,
//! the flush path drains them with snapshot-then-compare-and-remove so a
//! report arriving mid-flush is never silently discarded.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::warn;

use dx_common::{DiagnosticEvent, Severity};

/// Thread-safe mapping from error code to its aggregated record.
///
/// The interior lock is held only for the duration of a single map
/// operation, never across sink I/O.
#[derive(Debug, Default)]
pub struct EventAccumulator {
    events: Mutex<HashMap<String, DiagnosticEvent>>,
}

impl EventAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of an error code.
    ///
    /// Creates the record with a hit count of 1 on first report, otherwise
    /// increments the count and overwrites the content fields with the new
    /// values. The upsert is atomic with respect to concurrent reporters of
    /// the same code: no increment is lost.
    ///
    /// A blank error code is a caller bug; it is logged and dropped rather
    /// than surfaced, since reporting must never destabilize the caller.
    pub fn report(
        &self,
        timestamp: DateTime<Utc>,
        error_code: &str,
        level: Severity,
        message: &str,
        help_link: Option<&str>,
        details: Option<String>,
    ) {
        if error_code.trim().is_empty() {
            warn!("dropping diagnostic event with empty error code");
            return;
        }

        let mut events = self.lock();
        match events.entry(error_code.to_string()) {
            Entry::Occupied(mut entry) => {
                entry
                    .get_mut()
                    .fold_occurrence(timestamp, level, message, help_link, details);
            }
            Entry::Vacant(entry) => {
                entry.insert(DiagnosticEvent::new(
                    timestamp,
                    error_code,
                    level,
                    message,
                    help_link.map(str::to_string),
                    details,
                ));
            }
        }
    }

    /// Point-in-time view of all live records.
    ///
    /// Clones under the lock and releases it before returning, so concurrent
    /// reports proceed while the caller works through the snapshot.
    pub fn snapshot(&self) -> Vec<DiagnosticEvent> {
        self.lock().values().cloned().collect()
    }

    /// Remove a record only if no report has arrived since it was observed.
    ///
    /// Compare-and-remove keyed on the hit count: if a concurrent report
    /// bumped the count between snapshot and removal, the removal is skipped
    /// and the record (with the new data folded in) survives to the next
    /// flush cycle. Returns whether the record was removed.
    pub fn remove_if_unchanged(&self, error_code: &str, observed_hit_count: u64) -> bool {
        let mut events = self.lock();
        match events.get(error_code) {
            Some(event) if event.hit_count == observed_hit_count => {
                events.remove(error_code);
                true
            }
            _ => false,
        }
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A poisoned lock means a reporter panicked mid-upsert; the map itself
    // is still structurally sound and telemetry must not take the host down.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, DiagnosticEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_first_report_creates_with_one_hit() {
        let acc = EventAccumulator::new();
        acc.report(ts(1), "E1", Severity::Error, "boom", None, None);

        let snap = acc.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].hit_count, 1);
        assert_eq!(snap[0].error_code, "E1");
    }

    #[test]
    fn test_repeat_reports_fold_into_one_record() {
        let acc = EventAccumulator::new();
        for i in 0..5 {
            acc.report(ts(i), "E1", Severity::Warning, &format!("msg {i}"), None, None);
        }

        let snap = acc.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].hit_count, 5);
        assert_eq!(snap[0].message, "msg 4");
        assert_eq!(snap[0].last_timestamp, ts(4));
    }

    #[test]
    fn test_distinct_codes_distinct_records() {
        let acc = EventAccumulator::new();
        acc.report(ts(1), "E1", Severity::Error, "a", None, None);
        acc.report(ts(2), "E2", Severity::Error, "b", None, None);
        assert_eq!(acc.len(), 2);
    }

    #[test]
    fn test_empty_error_code_is_dropped() {
        let acc = EventAccumulator::new();
        acc.report(ts(1), "", Severity::Error, "a", None, None);
        acc.report(ts(1), "   ", Severity::Error, "a", None, None);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_remove_if_unchanged_removes_on_match() {
        let acc = EventAccumulator::new();
        acc.report(ts(1), "E1", Severity::Error, "a", None, None);
        assert!(acc.remove_if_unchanged("E1", 1));
        assert!(acc.is_empty());
    }

    #[test]
    fn test_remove_if_unchanged_skips_after_new_report() {
        let acc = EventAccumulator::new();
        acc.report(ts(1), "E1", Severity::Error, "a", None, None);
        let observed = acc.snapshot()[0].hit_count;

        // A report lands between snapshot and removal.
        acc.report(ts(2), "E1", Severity::Error, "b", None, None);

        assert!(!acc.remove_if_unchanged("E1", observed));
        let snap = acc.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].hit_count, 2);
        assert_eq!(snap[0].message, "b");
    }

    #[test]
    fn test_remove_if_unchanged_missing_code_is_noop() {
        let acc = EventAccumulator::new();
        assert!(!acc.remove_if_unchanged("absent", 1));
    }

    #[test]
    fn test_concurrent_reports_lose_no_increments() {
        let acc = Arc::new(EventAccumulator::new());
        let threads = 8;
        let per_thread = 250;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let acc = Arc::clone(&acc);
                thread::spawn(move || {
                    for i in 0..per_thread {
                        acc.report(
                            ts(i),
                            "E.contended",
                            Severity::Error,
                            &format!("t{t} i{i}"),
                            None,
                            None,
                        );
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snap = acc.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].hit_count, (threads * per_thread) as u64);
    }

    #[test]
    fn test_concurrent_creation_of_new_code_happens_once() {
        // Exactly one thread creates the record, the rest fold in as
        // increments; both orders end with hit_count == thread count.
        for _ in 0..20 {
            let acc = Arc::new(EventAccumulator::new());
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let acc = Arc::clone(&acc);
                    thread::spawn(move || {
                        acc.report(ts(1), "E.fresh", Severity::Error, "m", None, None);
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }
            assert_eq!(acc.snapshot()[0].hit_count, 4);
        }
    }
}
