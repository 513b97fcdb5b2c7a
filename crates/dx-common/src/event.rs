//! The aggregated diagnostic event record.
//!
//! A `DiagnosticEvent` is the unit of both accumulation and persistence:
//! repeated reports of the same error code fold into a single record with a
//! hit counter and the content of the most recent report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity classification for a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational, no action needed.
    Information,
    /// Degraded but functioning.
    Warning,
    /// A failure occurred.
    Error,
    /// A failure that threatens host stability.
    Critical,
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "information" | "info" => Ok(Severity::Information),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Information => write!(f, "information"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// An aggregated diagnostic record, keyed by `error_code`.
///
/// At most one live record exists per error code at any instant. Content
/// fields carry the values of the most recent report; `hit_count` carries
/// the number of reports folded in since creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    /// Stable identifier classifying the diagnostic condition.
    pub error_code: String,

    /// Severity of the most recent report.
    pub level: Severity,

    /// Human-readable description from the most recent report.
    pub message: String,

    /// Optional reference URL from the most recent report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_link: Option<String>,

    /// Optional formatted cause text from the most recent report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Timestamp of the most recent report.
    pub last_timestamp: DateTime<Utc>,

    /// Number of reports aggregated into this record since creation.
    pub hit_count: u64,
}

impl DiagnosticEvent {
    /// Create a record from the first report of an error code.
    pub fn new(
        timestamp: DateTime<Utc>,
        error_code: impl Into<String>,
        level: Severity,
        message: impl Into<String>,
        help_link: Option<String>,
        details: Option<String>,
    ) -> Self {
        DiagnosticEvent {
            error_code: error_code.into(),
            level,
            message: message.into(),
            help_link,
            details,
            last_timestamp: timestamp,
            hit_count: 1,
        }
    }

    /// Fold a subsequent report of the same error code into this record.
    ///
    /// Increments the hit count and overwrites the content fields with the
    /// new values (last-write-wins on content; the count is additive).
    pub fn fold_occurrence(
        &mut self,
        timestamp: DateTime<Utc>,
        level: Severity,
        message: &str,
        help_link: Option<&str>,
        details: Option<String>,
    ) {
        self.hit_count += 1;
        self.last_timestamp = timestamp;
        self.level = level;
        self.message = message.to_string();
        self.help_link = help_link.map(str::to_string);
        self.details = details;
    }
}
