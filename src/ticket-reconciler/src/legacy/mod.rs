//! Read-only access to the legacy ticket store.

mod error;
mod sqlite;
mod types;

pub use error::StoreError;
pub use sqlite::SqliteTicketStore;
pub use types::{
    micros_to_datetime, LegacyAttachment, LegacyComment, LegacyComponent, Milestone, SourceTicket,
};

use std::collections::HashMap;

/// Queries the reconciler runs against the legacy store.
///
/// All queries are read-only; results reflect the store at call time and
/// are never cached across runs.
pub trait TicketStore: Send + Sync {
    /// Tickets matching `filter`, in query order, with custom fields merged in.
    ///
    /// `filter` is a raw SQL clause appended to `SELECT * FROM ticket`.
    fn tickets(&self, filter: &str) -> Result<Vec<SourceTicket>, StoreError>;

    /// Number of tickets in the store.
    fn ticket_count(&self) -> Result<u64, StoreError>;

    /// Highest ticket id, if any ticket exists.
    fn max_ticket_id(&self) -> Result<Option<u64>, StoreError>;

    /// Every component definition.
    fn components(&self) -> Result<Vec<LegacyComponent>, StoreError>;

    /// Distinct priorities used by tickets, excluding blanks.
    fn priorities(&self) -> Result<Vec<String>, StoreError>;

    /// Distinct milestones used by tickets, excluding blanks and `skip`.
    fn milestones(&self, skip: &[String]) -> Result<Vec<String>, StoreError>;

    /// Metadata for one milestone.
    fn milestone(&self, name: &str) -> Result<Option<Milestone>, StoreError>;

    /// Comments of one ticket, oldest first.
    fn comments(&self, ticket_id: u64) -> Result<Vec<LegacyComment>, StoreError>;

    /// Attachments of one ticket, in creation order.
    fn attachments(&self, ticket_id: u64) -> Result<Vec<LegacyAttachment>, StoreError>;

    /// Revision to ticket table used to resolve changeset references.
    fn revision_tickets(&self) -> Result<HashMap<String, u64>, StoreError>;

    /// Latest text of a wiki page.
    fn wiki_page(&self, name: &str) -> Result<Option<String>, StoreError>;
}
