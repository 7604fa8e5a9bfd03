//! Run summary types.

use super::result::{ActionCounts, TicketOutcome, TicketStage};
use std::collections::BTreeMap;

/// Summary of a complete run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Number of tickets returned by the query.
    pub tickets_scanned: usize,

    /// Number of tickets skipped because their issue could not be fetched.
    pub tickets_skipped: usize,

    /// Issue key to the display names of the fields written.
    pub updates: BTreeMap<String, Vec<String>>,

    /// Error key to message, for every recoverable failure.
    pub errors: BTreeMap<String, String>,

    /// Comment, attachment and link writes.
    pub actions: ActionCounts,
}

impl RunSummary {
    /// Creates a new empty summary.
    #[must_use]
    pub fn new(tickets_scanned: usize) -> Self {
        Self {
            tickets_scanned,
            ..Default::default()
        }
    }

    /// Updates the summary with one ticket's outcome.
    pub fn record_outcome(&mut self, outcome: &TicketOutcome) {
        if outcome.stage == TicketStage::SkippedFetchFailed {
            self.tickets_skipped += 1;
        }
        if let Some(fields) = &outcome.updated_fields {
            self.updates.insert(outcome.issue_key.clone(), fields.clone());
        }
        for error in &outcome.errors {
            self.errors.insert(error.key.clone(), error.message.clone());
        }
        self.actions.add(&outcome.actions);
    }

    /// Returns true if any failures occurred.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_updates_and_errors() {
        let mut summary = RunSummary::new(2);

        let mut updated = TicketOutcome::new(1, "ICU-1");
        updated.updated_fields = Some(vec!["Priority".to_string()]);
        updated.actions.comments_created = 1;
        updated.enter(TicketStage::Done);
        summary.record_outcome(&updated);

        let mut skipped = TicketOutcome::new(2, "ICU-2");
        skipped.record_error("2", "not found");
        skipped.enter(TicketStage::SkippedFetchFailed);
        summary.record_outcome(&skipped);

        assert_eq!(summary.updates.len(), 1);
        assert_eq!(summary.tickets_skipped, 1);
        assert_eq!(summary.errors.get("2").map(String::as_str), Some("not found"));
        assert_eq!(summary.actions.comments_created, 1);
        assert!(summary.has_failures());
    }

    #[test]
    fn empty_run_is_successful() {
        let summary = RunSummary::new(0);
        assert!(!summary.has_failures());
    }
}
