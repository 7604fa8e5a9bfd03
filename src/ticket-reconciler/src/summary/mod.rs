//! Run summary types and helpers.

mod result;
mod run_summary;

pub use result::{ActionCounts, ErrorRecord, TicketOutcome, TicketStage};
pub use run_summary::RunSummary;
