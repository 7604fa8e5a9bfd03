//! Orchestrates a reconciliation run.

mod config;
mod context;
mod error;
mod pipeline;

pub use config::RunnerConfig;
pub use context::RunContext;
pub use error::RunnerError;
pub use pipeline::process_ticket;

use crate::config::Config;
use crate::files::LocalAttachmentFiles;
use crate::legacy::SqliteTicketStore;
use crate::resolver::bootstrap;
use crate::summary::RunSummary;
use crate::tracker::JiraClient;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Runs the reconciliation of every selected ticket, one at a time.
pub struct Runner {
    context: RunContext,
    filter: String,
}

impl Runner {
    /// Builds a runner from the configuration file and credentials.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if the configuration is invalid, the legacy
    /// database cannot be opened or the tracker client cannot be built.
    pub fn new(config: RunnerConfig) -> Result<Self, RunnerError> {
        info!(path = %config.config_path().display(), "Loading configuration");
        let settings = Config::load(config.config_path())?;

        let store = SqliteTicketStore::open(&settings.legacy.db_path)?;
        let tracker = JiraClient::new(
            &settings.tracker.base_url,
            config.user(),
            config.token(),
            settings.call_timeout(),
        )?;
        let files = LocalAttachmentFiles::new(&settings.legacy.attachment_path);

        let context = RunContext::new(
            settings,
            Arc::new(tracker),
            Arc::new(store),
            Arc::new(files),
        )?;
        Ok(Self::with_context(context, config.filter()))
    }

    /// Builds a runner around an existing context.
    #[must_use]
    pub fn with_context(context: RunContext, filter: impl Into<String>) -> Self {
        Self {
            context,
            filter: filter.into(),
        }
    }

    #[must_use]
    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Executes the full run.
    ///
    /// Reference data is loaded and validated first; missing components,
    /// priorities or versions abort the run before any ticket is touched.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] for failures that invalidate the whole run.
    /// Per-ticket failures are collected in the returned [`RunSummary`].
    pub async fn run(&self) -> Result<RunSummary, RunnerError> {
        let ctx = &self.context;
        info!(
            count = ctx.store.ticket_count()?,
            max_id = ?ctx.store.max_ticket_id()?,
            project = %ctx.config.project.name,
            "Legacy store opened"
        );

        ctx.resolver.warm_up().await?;
        ctx.resolver.validate_field_mappings().await?;
        bootstrap(ctx).await?;

        let tickets = ctx.store.tickets(&self.filter)?;
        if tickets.is_empty() {
            warn!(filter = %self.filter, "No tickets matched");
        }
        info!(count = tickets.len(), "Reconciling tickets");

        let mut summary = RunSummary::new(tickets.len());
        for ticket in &tickets {
            let outcome = process_ticket(ctx, ticket).await?;
            if outcome.has_errors() {
                error!(
                    ticket = outcome.ticket_id,
                    errors = outcome.errors.len(),
                    stage = %outcome.stage,
                    "Ticket finished with errors"
                );
            }
            summary.record_outcome(&outcome);
        }

        info!(
            "Updated {}/{} tickets",
            summary.updates.len(),
            summary.tickets_scanned
        );
        if summary.has_failures() {
            warn!("Error in {} tickets", summary.errors.len());
        }

        Ok(summary)
    }
}
