//! Legacy identity to remote user resolution.

mod obfuscate;

pub use obfuscate::{EmailObfuscator, Obfuscator};

use crate::config::Config;
use crate::tracker::{with_timeout, IssueTracker, UserRef};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Maps legacy identities to remote users.
///
/// Field identities always resolve (falling back to the configured
/// default user). Comment authors only resolve when explicitly mapped.
#[derive(Debug)]
pub struct IdentityDirectory {
    users: BTreeMap<String, UserRef>,
    fallback: UserRef,
    /// Display names fetched from the tracker, keyed by account id.
    names: Mutex<HashMap<String, Option<String>>>,
}

impl IdentityDirectory {
    #[must_use]
    pub fn new(users: BTreeMap<String, UserRef>, fallback: UserRef) -> Self {
        Self {
            users,
            fallback,
            names: Mutex::new(HashMap::new()),
        }
    }

    /// Builds the directory from the `[reporters]` table.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let users = config
            .reporters
            .iter()
            .map(|(legacy, entry)| (legacy.clone(), entry.to_user()))
            .collect::<BTreeMap<_, _>>();

        let fallback = users
            .get(&config.reporter_fallback)
            .cloned()
            .unwrap_or_else(|| UserRef {
                account_id: None,
                name: Some(config.reporter_fallback.clone()),
            });

        Self::new(users, fallback)
    }

    /// Resolves a user-valued field. Blank identities stay unset.
    #[must_use]
    pub fn resolve(&self, legacy: Option<&str>) -> Option<UserRef> {
        let legacy = legacy.map(str::trim).filter(|s| !s.is_empty())?;
        Some(self.users.get(legacy).unwrap_or(&self.fallback).clone())
    }

    /// Resolves the display name used to mention a comment author.
    ///
    /// Entries that only carry an account id get their name from the
    /// tracker, once per run. Lookup failures are logged and treated as
    /// unmapped.
    pub async fn comment_author(
        &self,
        legacy: &str,
        tracker: &dyn IssueTracker,
        timeout: Duration,
    ) -> Option<String> {
        let entry = self.users.get(legacy.trim())?;
        if let Some(name) = &entry.name {
            return Some(name.clone());
        }
        let account_id = entry.account_id.as_deref()?;

        let mut names = self.names.lock().await;
        if let Some(cached) = names.get(account_id) {
            return cached.clone();
        }

        let name = match with_timeout(timeout, tracker.user_by_account_id(account_id)).await {
            Ok(user) => {
                debug!(account_id, name = ?user.name, "Resolved comment author");
                user.name
            }
            Err(e) => {
                warn!(account_id, error = %e, "Failed to look up comment author");
                None
            }
        };
        names.insert(account_id.to_string(), name.clone());
        name
    }
}
