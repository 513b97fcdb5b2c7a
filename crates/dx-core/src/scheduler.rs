//! Timer-driven flush scheduling.
//!
//! A dedicated background thread fires the repository's flush entry point on
//! a fixed period, independent of reporting volume. The loop reschedules
//! after every tick regardless of the flush outcome; only an explicit stop
//! (or dropping the scheduler) ends it, and an in-flight flush is allowed to
//! complete before the thread exits.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use dx_common::Result;

use crate::repository::DiagnosticEventRepository;

/// Handle to the recurring background flush task.
pub struct FlushScheduler {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl FlushScheduler {
    /// Spawn the scheduler thread, flushing `repository` every `interval`.
    pub fn start(interval: Duration, repository: Arc<DiagnosticEventRepository>) -> Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("dx-flush".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        // A panicking sink must not kill the schedule.
                        let outcome = std::panic::catch_unwind(
                            std::panic::AssertUnwindSafe(|| repository.flush_logs()),
                        );
                        if outcome.is_err() {
                            warn!("flush panicked, scheduler continues");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        debug!("flush scheduler stopping");
                        break;
                    }
                }
            })?;

        Ok(FlushScheduler {
            stop_tx,
            handle: Some(handle),
        })
    }

    /// Stop future ticks and wait for the thread to exit.
    ///
    /// An in-flight flush completes; it is never cancelled mid-write.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.stop_tx.send(());
            if handle.join().is_err() {
                warn!("flush scheduler thread panicked during shutdown");
            }
        }
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
