//! Runner error types.

use crate::config::ConfigError;
use crate::legacy::StoreError;
use crate::overflow::OverflowError;
use crate::resolver::{BootstrapError, ResolverError};
use crate::templates::TemplateError;
use crate::tracker::TrackerError;

/// Errors that abort a reconciliation run.
///
/// Per-ticket failures never surface here; they are collected in the
/// run summary instead.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Configuration loading errors.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Legacy store errors outside a single ticket.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Tracker client initialization errors.
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// Missing or unknown mappings.
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// Reference entities missing or just created.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    /// Generated text templates failed to compile or render.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Oversized text could not be written to the attachment directory.
    #[error(transparent)]
    Overflow(#[from] OverflowError),
}
