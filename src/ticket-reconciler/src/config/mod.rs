//! Run configuration.
//!
//! A single TOML file describes the remote project, the legacy database,
//! the static mapping tables and the identity map. It is loaded once and
//! stays read-only for the whole run.

mod error;
mod mapping;
mod settings;

pub use error::ConfigError;
pub use mapping::MappedField;
pub use settings::{
    issue_key, Config, LegacyConfig, ProjectConfig, ReporterEntry, SecurityConfig, TrackerConfig,
};
