//! Legacy ticket records.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A ticket row from the legacy store, merged with its custom fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceTicket {
    pub id: u64,
    pub ticket_type: Option<String>,
    /// Creation time, microseconds since the epoch.
    pub time: i64,
    pub component: Option<String>,
    pub priority: Option<String>,
    pub owner: Option<String>,
    pub reporter: Option<String>,
    pub cc: Option<String>,
    pub milestone: Option<String>,
    pub status: Option<String>,
    pub resolution: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    /// `ticket_custom` rows, name to value.
    pub custom: BTreeMap<String, String>,
}

impl SourceTicket {
    /// Returns a custom field value, or `None` when unset or blank.
    #[must_use]
    pub fn custom(&self, name: &str) -> Option<&str> {
        self.custom
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// The free-text cross-reference list.
    #[must_use]
    pub fn xref(&self) -> Option<&str> {
        self.custom("xref")
    }

    /// Whether the ticket must be hidden behind the sensitive security level.
    #[must_use]
    pub fn is_sensitive(&self) -> bool {
        self.custom("sensitive").map(str::trim) == Some("1")
    }

    /// Creation time as a UTC timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        micros_to_datetime(self.time)
    }
}

/// A comment from the ticket change log.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyComment {
    pub ticket: u64,
    /// Microseconds since the epoch.
    pub time: i64,
    pub author: String,
    /// Comment number as recorded by the legacy store (e.g. `3` or `2.3`).
    pub number: String,
    pub text: String,
}

impl LegacyComment {
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        micros_to_datetime(self.time)
    }
}

/// An attachment that should exist on the remote issue.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyAttachment {
    pub filename: String,
}

impl LegacyAttachment {
    #[must_use]
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }
}

/// A component row.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyComponent {
    pub name: String,
    pub description: Option<String>,
}

/// A milestone row.
#[derive(Debug, Clone, PartialEq)]
pub struct Milestone {
    pub name: String,
    /// Due date, microseconds since the epoch, `0` when unset.
    pub due: i64,
    /// Completion date, microseconds since the epoch, `0` when open.
    pub completed: i64,
    pub description: String,
}

/// Converts a legacy microsecond timestamp into a UTC timestamp.
#[must_use]
pub fn micros_to_datetime(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}
