//! Per-ticket processing results.

use std::fmt;

/// Pipeline stage of a single ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStage {
    Fetching,
    Diffing,
    Updating,
    CommentSync,
    AttachmentSync,
    /// Every stage has been attempted.
    Done,
    /// The remote issue could not be fetched; nothing else ran.
    SkippedFetchFailed,
}

impl TicketStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Diffing => "diffing",
            Self::Updating => "updating",
            Self::CommentSync => "comment-sync",
            Self::AttachmentSync => "attachment-sync",
            Self::Done => "done",
            Self::SkippedFetchFailed => "skipped-fetch-failed",
        }
    }

    /// Returns true for stages a ticket never leaves.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::SkippedFetchFailed)
    }
}

impl fmt::Display for TicketStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable failure, keyed by the item it concerns.
///
/// Keys are the ticket id (fetch), the issue key (update), `KEY.n`
/// (comment at position n), `KEY.#` (comment count mismatch),
/// `KEY::TARGET` (cross-reference link) or `ticketId.filename`
/// (attachment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub key: String,
    pub message: String,
}

impl ErrorRecord {
    #[must_use]
    pub fn new(key: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            key: key.into(),
            message: message.to_string(),
        }
    }
}

/// Remote writes performed outside the field update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionCounts {
    pub comments_created: usize,
    pub comments_updated: usize,
    pub comments_neutralized: usize,
    pub attachments_uploaded: usize,
    pub attachments_deleted: usize,
    pub links_created: usize,
}

impl ActionCounts {
    pub fn add(&mut self, other: &Self) {
        self.comments_created += other.comments_created;
        self.comments_updated += other.comments_updated;
        self.comments_neutralized += other.comments_neutralized;
        self.attachments_uploaded += other.attachments_uploaded;
        self.attachments_deleted += other.attachments_deleted;
        self.links_created += other.links_created;
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.comments_created
            + self.comments_updated
            + self.comments_neutralized
            + self.attachments_uploaded
            + self.attachments_deleted
            + self.links_created
    }
}

/// Result of reconciling one ticket.
#[derive(Debug, Clone)]
pub struct TicketOutcome {
    pub ticket_id: u64,
    pub issue_key: String,
    /// Last stage reached.
    pub stage: TicketStage,
    /// Display names of the fields written, when an update succeeded.
    pub updated_fields: Option<Vec<String>>,
    pub actions: ActionCounts,
    pub errors: Vec<ErrorRecord>,
}

impl TicketOutcome {
    #[must_use]
    pub fn new(ticket_id: u64, issue_key: impl Into<String>) -> Self {
        Self {
            ticket_id,
            issue_key: issue_key.into(),
            stage: TicketStage::Fetching,
            updated_fields: None,
            actions: ActionCounts::default(),
            errors: Vec::new(),
        }
    }

    pub fn enter(&mut self, stage: TicketStage) {
        self.stage = stage;
    }

    pub fn record_error(&mut self, key: impl Into<String>, message: impl fmt::Display) {
        self.errors.push(ErrorRecord::new(key, message));
    }

    pub fn extend_errors(&mut self, errors: impl IntoIterator<Item = ErrorRecord>) {
        self.errors.extend(errors);
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
