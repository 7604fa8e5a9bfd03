//! Generated text written to remote issues.
//!
//! Everything the reconciler writes on its own behalf (comment headers,
//! overflow placeholders, description footnotes) is rendered from the
//! Handlebars templates registered here, so reruns produce byte-identical
//! bodies and the diff stays empty.

mod error;
mod renderer;

pub use error::TemplateError;
pub use renderer::{create_handlebars_registry, FootnoteKind, TextTemplates};

/// Body of a remote comment that no longer has a legacy counterpart.
pub const DELETED_MARKER: &str = "(deleted)\n";
