//! Diagnostic event aggregation and flush engine.
//!
//! This crate provides:
//! - A concurrent keyed accumulator that deduplicates repeated reports of
//!   the same error code into one record with a hit counter
//! - A timer-driven flush scheduler on a dedicated background thread
//! - A repository facade with fire-and-forget reporting and a per-record
//!   flush protocol against an abstract durable sink
//! - An append-only JSONL sink adapter and an explicit service lifecycle
//!
//! Reporting never blocks on I/O and never surfaces an error to the caller;
//! this is best-effort telemetry, not a correctness-critical path.

pub mod accumulator;
pub mod config;
pub mod logging;
pub mod repository;
pub mod scheduler;
pub mod service;
pub mod sink;
pub mod store;

pub use accumulator::EventAccumulator;
pub use config::AggregatorConfig;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use repository::DiagnosticEventRepository;
pub use scheduler::FlushScheduler;
pub use service::DiagnosticEventService;
pub use sink::{SinkResolver, StorageError, StorageSink};
pub use store::{JsonlSink, JsonlSinkResolver};

/// Default flush interval in seconds.
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 60;
