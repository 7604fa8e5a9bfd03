//! Resolver and bootstrap error types.

use super::EntityKind;
use crate::config::MappedField;
use crate::legacy::StoreError;
use crate::templates::TemplateError;
use crate::tracker::TrackerError;
use thiserror::Error;

/// Errors raised while resolving names to remote ids.
///
/// Every variant is a configuration or connectivity problem and aborts
/// the run.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// A remote listing could not be fetched.
    #[error("Failed to list remote {kind}: {source}")]
    Listing {
        kind: EntityKind,
        #[source]
        source: TrackerError,
    },

    /// The remote project could not be fetched.
    #[error("Failed to load project '{key}': {source}")]
    Project {
        key: String,
        #[source]
        source: TrackerError,
    },

    /// A field mapping is needed but not configured.
    #[error("No remote field configured for '{0}' (check map-fields)")]
    UnmappedField(MappedField),

    /// The configured remote field does not exist.
    #[error("Need to create custom field '{name}' for '{field}'")]
    MissingRemoteField { field: MappedField, name: String },

    /// A legacy ticket type has no entry in `map-types`.
    #[error("Unknown legacy ticket type '{0}' (check map-types)")]
    UnknownLegacyType(String),

    /// A mapped issue type does not exist remotely.
    #[error("Unknown remote issue type '{remote}' for legacy type '{legacy}' (check map-types)")]
    UnknownIssueType { legacy: String, remote: String },
}

/// Errors that stop the run before any ticket is processed.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Creating a component or version failed.
    #[error("Failed to create {kind} '{name}': {source}")]
    Create {
        kind: EntityKind,
        name: String,
        #[source]
        source: TrackerError,
    },

    /// Entities were created or must be created by hand; the caches no
    /// longer reflect a settled remote state.
    #[error(
        "Just added or need to add components/priorities/versions, please rerun \
         (created: {created:?}, add manually: {manual:?})"
    )]
    EntitiesPending {
        created: Vec<String>,
        manual: Vec<String>,
    },
}
