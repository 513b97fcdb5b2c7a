//! Concurrency tests: overlapping flushes, reports racing a flush in
//! progress, and many reporters hammering the repository while it drains.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::{DateTime, Utc};

use dx_common::{DiagnosticEvent, Severity};
use dx_core::{DiagnosticEventRepository, SinkResolver, StorageError, StorageSink};

fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

/// Sink that parks inside `insert` until released, so a test can hold a
/// flush open at a known point.
struct BlockingSink {
    entered_tx: Sender<String>,
    release_rx: Mutex<Receiver<()>>,
    inserted: Mutex<Vec<DiagnosticEvent>>,
}

impl StorageSink for BlockingSink {
    fn insert(&self, event: &DiagnosticEvent) -> Result<(), StorageError> {
        self.entered_tx.send(event.error_code.clone()).ok();
        self.release_rx.lock().unwrap().recv().ok();
        self.inserted.lock().unwrap().push(event.clone());
        Ok(())
    }
}

struct FixedResolver(Arc<dyn StorageSink>);

impl SinkResolver for FixedResolver {
    fn resolve(&self) -> Result<Arc<dyn StorageSink>, StorageError> {
        Ok(Arc::clone(&self.0))
    }
}

fn blocking_repo() -> (Arc<DiagnosticEventRepository>, Arc<BlockingSink>, Receiver<String>, Sender<()>) {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let sink = Arc::new(BlockingSink {
        entered_tx,
        release_rx: Mutex::new(release_rx),
        inserted: Mutex::new(Vec::new()),
    });
    let repo = Arc::new(DiagnosticEventRepository::new(Arc::new(FixedResolver(
        Arc::clone(&sink) as Arc<dyn StorageSink>,
    ))));
    (repo, sink, entered_rx, release_tx)
}

#[test]
fn overlapping_flush_is_skipped_not_queued() {
    let (repo, sink, entered_rx, release_tx) = blocking_repo();
    repo.add_diagnostic_event(ts(1), "E1", Severity::Error, "boom", None, None);

    let flusher = {
        let repo = Arc::clone(&repo);
        thread::spawn(move || repo.flush_logs())
    };

    // Wait until the first flush is parked inside the sink.
    entered_rx.recv().unwrap();

    // A second flush while one is in progress returns without inserting.
    repo.flush_logs();
    assert_eq!(sink.inserted.lock().unwrap().len(), 0);

    release_tx.send(()).unwrap();
    flusher.join().unwrap();

    assert_eq!(sink.inserted.lock().unwrap().len(), 1);
    assert_eq!(repo.pending_events(), 0);
}

#[test]
fn report_arriving_during_flush_survives_removal() {
    let (repo, sink, entered_rx, release_tx) = blocking_repo();
    repo.add_diagnostic_event(ts(1), "E1", Severity::Error, "first", None, None);

    let flusher = {
        let repo = Arc::clone(&repo);
        thread::spawn(move || repo.flush_logs())
    };

    // The flush has snapshotted E1 at hit_count 1 and is parked in insert.
    entered_rx.recv().unwrap();

    // New report lands between snapshot and compare-and-remove.
    repo.add_diagnostic_event(ts(2), "E1", Severity::Error, "second", None, None);

    release_tx.send(()).unwrap();
    flusher.join().unwrap();

    // The updated record survived the removal attempt.
    assert_eq!(repo.pending_events(), 1);

    // Next cycle persists the folded record.
    let next = {
        let repo = Arc::clone(&repo);
        thread::spawn(move || repo.flush_logs())
    };
    entered_rx.recv().unwrap();
    release_tx.send(()).unwrap();
    next.join().unwrap();

    let inserted = sink.inserted.lock().unwrap();
    assert_eq!(inserted.len(), 2);
    assert_eq!(inserted[1].hit_count, 2);
    assert_eq!(inserted[1].message, "second");
    assert_eq!(repo.pending_events(), 0);
}

/// Plain recording sink for the stress test.
#[derive(Default)]
struct CountingSink {
    inserted: Mutex<Vec<DiagnosticEvent>>,
}

impl StorageSink for CountingSink {
    fn insert(&self, event: &DiagnosticEvent) -> Result<(), StorageError> {
        self.inserted.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[test]
fn reporters_and_flusher_race_without_losing_events() {
    let sink = Arc::new(CountingSink::default());
    let repo = Arc::new(DiagnosticEventRepository::new(Arc::new(FixedResolver(
        Arc::clone(&sink) as Arc<dyn StorageSink>,
    ))));

    let reporter_threads = 4;
    let reports_each = 200;
    let codes = ["E.alpha", "E.beta", "E.gamma"];

    let mut handles = Vec::new();
    for t in 0..reporter_threads {
        let repo = Arc::clone(&repo);
        handles.push(thread::spawn(move || {
            for i in 0..reports_each {
                let code = codes[(t + i) % codes.len()];
                repo.add_diagnostic_event(ts(i as i64), code, Severity::Error, "stress", None, None);
            }
        }));
    }

    // Flush concurrently with the reporters.
    let flusher = {
        let repo = Arc::clone(&repo);
        thread::spawn(move || {
            for _ in 0..50 {
                repo.flush_logs();
                thread::yield_now();
            }
        })
    };

    for h in handles {
        h.join().unwrap();
    }
    flusher.join().unwrap();

    // Drain whatever the racing flushes left behind.
    repo.flush_logs();
    assert_eq!(repo.pending_events(), 0);

    // Every code surfaced at least once, and no insert ever carried a hit
    // count beyond what was actually reported.
    let total = reporter_threads * reports_each;
    let inserted = sink.inserted.lock().unwrap();
    let mut seen: HashMap<String, u64> = HashMap::new();
    for event in inserted.iter() {
        assert!(event.hit_count >= 1);
        assert!(event.hit_count <= total as u64);
        let max = seen.entry(event.error_code.clone()).or_default();
        *max = (*max).max(event.hit_count);
    }
    for code in codes {
        assert!(seen.contains_key(code), "code never persisted: {code}");
    }
}
