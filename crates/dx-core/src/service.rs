//! Service lifecycle: explicit construction, injection, teardown.
//!
//! The service owns the repository and the scheduler and is passed to
//! call sites as an explicit dependency. There is no ambient global state:
//! the destination resolves lazily on first flush, and shutdown stops the
//! scheduler before an optional final flush drains what is still pending.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use dx_common::{Error, Result};

use crate::config::AggregatorConfig;
use crate::repository::DiagnosticEventRepository;
use crate::scheduler::FlushScheduler;
use crate::sink::SinkResolver;
use crate::store::{default_diagnostics_dir, JsonlSinkResolver};

/// An aggregator instance: repository plus its recurring flush task.
pub struct DiagnosticEventService {
    repository: Arc<DiagnosticEventRepository>,
    scheduler: Option<FlushScheduler>,
    flush_on_shutdown: bool,
}

impl DiagnosticEventService {
    /// Start a service backed by the JSONL sink adapter.
    pub fn start(config: AggregatorConfig) -> Result<Self> {
        let base_dir = config
            .base_dir
            .clone()
            .unwrap_or_else(default_diagnostics_dir);
        let resolver = Arc::new(JsonlSinkResolver::new(base_dir, &config.app_name));
        Self::start_with_resolver(config, resolver)
    }

    /// Start a service against a caller-provided sink resolver.
    pub fn start_with_resolver(
        config: AggregatorConfig,
        resolver: Arc<dyn SinkResolver>,
    ) -> Result<Self> {
        if config.flush_interval_secs == 0 {
            return Err(Error::Config("flush interval must be non-zero".into()));
        }

        let repository = Arc::new(DiagnosticEventRepository::new(resolver));
        let scheduler = FlushScheduler::start(
            Duration::from_secs(config.flush_interval_secs),
            Arc::clone(&repository),
        )?;

        info!(
            app_name = %config.app_name,
            flush_interval_secs = config.flush_interval_secs,
            "diagnostic event service started"
        );

        Ok(DiagnosticEventService {
            repository,
            scheduler: Some(scheduler),
            flush_on_shutdown: config.flush_on_shutdown,
        })
    }

    /// Handle for reporting call sites.
    pub fn repository(&self) -> Arc<DiagnosticEventRepository> {
        Arc::clone(&self.repository)
    }

    /// Stop the scheduler and, when configured, drain pending events.
    ///
    /// The scheduler is joined first so a scheduled flush cannot overlap the
    /// final one (the repository gate would otherwise skip it).
    pub fn shutdown(mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop();
        }
        if self.flush_on_shutdown {
            self.repository.flush_logs();
        }
        let pending = self.repository.pending_events();
        if pending > 0 {
            warn!(pending, "diagnostic events still pending at shutdown");
        }
        info!("diagnostic event service stopped");
    }
}
