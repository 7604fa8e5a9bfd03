//! Runner configuration.

use std::path::{Path, PathBuf};

/// Inputs for a reconciliation run that do not come from the config file.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Path to the TOML configuration.
    config_path: PathBuf,
    /// Tracker user for basic authentication.
    user: String,
    /// Tracker API token.
    token: String,
    /// SQL clause appended to the ticket query.
    filter: Option<String>,
}

impl RunnerConfig {
    /// Creates a new configuration for a run.
    pub fn new(config_path: PathBuf, user: String, token: String) -> Self {
        Self {
            config_path,
            user,
            token,
            filter: None,
        }
    }

    /// Restricts the run to tickets matching `filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter.filter(|f| !f.trim().is_empty());
        self
    }

    /// Returns the configuration file path.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Returns the tracker user.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Returns the tracker API token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the ticket filter clause.
    pub fn filter(&self) -> &str {
        self.filter.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_filters_are_ignored() {
        let config = RunnerConfig::new("c.toml".into(), "u".into(), "t".into())
            .with_filter(Some("  ".to_string()));
        assert_eq!(config.filter(), "");

        let config = config.with_filter(Some("WHERE id = 1".to_string()));
        assert_eq!(config.filter(), "WHERE id = 1");
    }
}
