//! Shared types for the diagnostic event aggregator.
//!
//! This crate provides:
//! - The aggregated `DiagnosticEvent` record and its `Severity` levels
//! - Destination identifier derivation under store naming constraints
//! - The shared error type for configuration and I/O plumbing

pub mod destination;
pub mod error;
pub mod event;

pub use destination::{DestinationId, DESTINATION_PREFIX, MAX_DESTINATION_LEN};
pub use error::{Error, Result};
pub use event::{DiagnosticEvent, Severity};
