//! Remote tracker error types.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the remote tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Transport-level failure.
    #[error("Tracker request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The tracker answered with a non-success status.
    #[error("Tracker returned {status}: {message}")]
    Status { status: u16, message: String },

    /// An endpoint URL could not be built.
    #[error("Invalid tracker URL: {0}")]
    Url(#[from] url::ParseError),

    /// The response body did not have the expected shape.
    #[error("Unexpected tracker response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The call did not finish within the configured limit.
    #[error("Tracker call timed out after {0:?}")]
    Timeout(Duration),
}
