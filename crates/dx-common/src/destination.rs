//! Destination identifier derivation.
//!
//! The durable store imposes naming constraints on its destinations: a fixed
//! character set and a hard maximum length. This module derives a store-legal
//! identifier from a human-supplied application name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed prefix for every derived destination identifier.
pub const DESTINATION_PREFIX: &str = "DiagnosticEvents";

/// Hard maximum length imposed by the destination system.
pub const MAX_DESTINATION_LEN: usize = 63;

/// A store-legal destination identifier.
///
/// Always begins with [`DESTINATION_PREFIX`] and never exceeds
/// [`MAX_DESTINATION_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationId(String);

impl DestinationId {
    /// Derive an identifier from an application name.
    ///
    /// Strips every character outside letters, digits, space, and comma,
    /// prefixes the result with [`DESTINATION_PREFIX`], and truncates to
    /// [`MAX_DESTINATION_LEN`].
    pub fn derive(app_name: &str) -> Self {
        let sanitized: String = app_name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == ',')
            .collect();

        let mut name = format!("{}{}", DESTINATION_PREFIX, sanitized);
        name.truncate(MAX_DESTINATION_LEN);
        DestinationId(name)
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
