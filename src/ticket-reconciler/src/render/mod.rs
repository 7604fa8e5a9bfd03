//! Markup conversion from legacy wiki text to remote tracker markup.

mod wiki;

pub use wiki::{InterMap, WikiRenderer};

use crate::legacy::SourceTicket;
use std::collections::HashMap;

/// Reference data available while rendering one piece of text.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Ticket the text belongs to, if any.
    pub ticket: Option<&'a SourceTicket>,
    /// Remote project key.
    pub project: &'a str,
    /// Revision to ticket table.
    pub revisions: &'a HashMap<String, u64>,
}

/// Converts legacy markup into the remote tracker's markup.
pub trait MarkupRenderer: Send + Sync {
    fn render(&self, text: &str, context: &RenderContext<'_>) -> String;
}
