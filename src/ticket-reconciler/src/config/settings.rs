//! Run configuration deserialization and validation.

use super::{ConfigError, MappedField};
use crate::tracker::{LinkType, UserRef};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Complete configuration for a reconciliation run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Remote project the tickets are migrated into.
    pub project: ProjectConfig,

    /// Legacy database and attachment storage.
    pub legacy: LegacyConfig,

    /// Remote tracker endpoint settings.
    pub tracker: TrackerConfig,

    /// Legacy ticket type to remote issue type name.
    ///
    /// When absent, every ticket becomes a `Bug`.
    #[serde(default)]
    pub map_types: Option<BTreeMap<String, String>>,

    /// Legacy field to remote custom field display name.
    #[serde(default)]
    pub map_fields: BTreeMap<MappedField, String>,

    /// Link type used for cross-references between tickets.
    pub xref_link_type: LinkType,

    /// Security levels applied to restricted tickets.
    pub security: SecurityConfig,

    /// Priority used when a ticket has none, or an unknown one.
    #[serde(default = "default_priority")]
    pub default_priority: String,

    /// Legacy identity used for users missing from [`Config::reporters`].
    #[serde(default = "default_reporter_fallback")]
    pub reporter_fallback: String,

    /// Legacy identity to remote user.
    #[serde(default)]
    pub reporters: BTreeMap<String, ReporterEntry>,
}

/// Remote project settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    /// Project key; issue keys are `{name}-{ticket id}`.
    pub name: String,
}

/// Legacy store settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LegacyConfig {
    /// Path to the legacy SQLite database.
    pub db_path: PathBuf,

    /// Root of the per-ticket attachment directories.
    pub attachment_path: PathBuf,

    /// Milestones that never become versions.
    #[serde(default = "default_skip_milestones")]
    pub skip_milestones: Vec<String>,

    /// Wiki page holding the InterMap prefix table.
    #[serde(default = "default_intermap_page")]
    pub intermap_page: String,
}

/// Remote tracker settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TrackerConfig {
    /// Base URL of the tracker, e.g. `https://example.atlassian.net`.
    pub base_url: String,

    /// Upper bound for any single remote call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

/// Security level settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SecurityConfig {
    /// Security level id for tickets flagged as sensitive.
    pub sensitive: String,
}

/// A remote user as written in the configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReporterEntry {
    pub account_id: Option<String>,
    pub name: Option<String>,
}

impl ReporterEntry {
    /// Converts the entry into the wire representation of a user.
    #[must_use]
    pub fn to_user(&self) -> UserRef {
        UserRef {
            account_id: self.account_id.clone(),
            name: self.name.clone(),
        }
    }
}

pub(crate) fn default_priority() -> String {
    "assess".to_string()
}

pub(crate) fn default_reporter_fallback() -> String {
    "nobody".to_string()
}

pub(crate) fn default_skip_milestones() -> Vec<String> {
    vec!["UNSCH".to_string()]
}

pub(crate) fn default_intermap_page() -> String {
    "InterMapTxt".to_string()
}

pub(crate) fn default_call_timeout_secs() -> u64 {
    60
}

impl Config {
    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is missing, unreadable, not valid
    /// TOML, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Loading configuration");

        if !path.exists() {
            return Err(ConfigError::MissingFile {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parses and validates configuration text.
    ///
    /// `origin` is only used for error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the text is not valid TOML or fails validation.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::TomlError {
            path: origin.display().to_string(),
            source: e,
        })?;
        config.validate(origin)?;
        Ok(config)
    }

    /// Validates values that cannot be expressed through the type system.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] on the first invalid value.
    pub fn validate(&self, origin: &Path) -> Result<(), ConfigError> {
        let fail = |message: String| ConfigError::ValidationError {
            path: origin.display().to_string(),
            message,
        };

        if self.project.name.trim().is_empty() {
            return Err(fail("project.name cannot be empty".to_string()));
        }

        if url::Url::parse(&self.tracker.base_url).is_err() {
            return Err(fail(format!(
                "tracker.base-url is not a valid URL: {}",
                self.tracker.base_url
            )));
        }

        if self.tracker.call_timeout_secs == 0 {
            return Err(fail("tracker.call-timeout-secs must be positive".to_string()));
        }

        if self.xref_link_type.id.is_none() && self.xref_link_type.name.is_none() {
            return Err(fail("xref-link-type needs an id or a name".to_string()));
        }

        let Some(fallback) = self.reporters.get(&self.reporter_fallback) else {
            return Err(fail(format!(
                "reporter-fallback '{}' has no entry in [reporters]",
                self.reporter_fallback
            )));
        };
        if fallback.account_id.is_none() && fallback.name.is_none() {
            return Err(fail(format!(
                "No name or account id for reporter-fallback '{}'",
                self.reporter_fallback
            )));
        }

        if let Some((legacy, _)) = self
            .reporters
            .iter()
            .find(|(_, entry)| entry.account_id.is_none() && entry.name.is_none())
        {
            return Err(fail(format!("No name or account id for reporter '{legacy}'")));
        }

        Ok(())
    }

    /// Returns the per-call timeout for remote requests.
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.tracker.call_timeout_secs)
    }

    /// Derives the remote issue key for a legacy ticket id.
    #[must_use]
    pub fn issue_key(&self, ticket_id: u64) -> String {
        issue_key(&self.project.name, ticket_id)
    }
}

/// Derives the remote issue key for a legacy ticket id.
#[must_use]
pub fn issue_key(project: &str, ticket_id: u64) -> String {
    format!("{project}-{ticket_id}")
}
