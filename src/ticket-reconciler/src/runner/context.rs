//! State shared by every stage of a run.

use super::RunnerError;
use crate::config::Config;
use crate::files::AttachmentFiles;
use crate::identity::{EmailObfuscator, IdentityDirectory, Obfuscator};
use crate::legacy::{SourceTicket, TicketStore};
use crate::render::{InterMap, MarkupRenderer, RenderContext, WikiRenderer};
use crate::resolver::MappingResolver;
use crate::templates::TextTemplates;
use crate::tracker::{with_timeout, IssueTracker, TrackerError};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Everything a run needs, built once and passed to every stage.
///
/// Lookup caches live here and are dropped with the context at the end of
/// the run.
pub struct RunContext {
    pub config: Config,
    pub tracker: Arc<dyn IssueTracker>,
    pub store: Arc<dyn TicketStore>,
    pub files: Arc<dyn AttachmentFiles>,
    pub resolver: MappingResolver,
    pub identities: IdentityDirectory,
    pub renderer: Arc<dyn MarkupRenderer>,
    pub obfuscator: Arc<dyn Obfuscator>,
    pub templates: TextTemplates,
    /// Revision to ticket table for changeset references.
    pub revisions: HashMap<String, u64>,
}

impl RunContext {
    /// Builds a context with the wiki renderer and e-mail obfuscator.
    ///
    /// Reads the revision table and the InterMap page from the store.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if the store cannot be read or the text
    /// templates fail to compile.
    pub fn new(
        config: Config,
        tracker: Arc<dyn IssueTracker>,
        store: Arc<dyn TicketStore>,
        files: Arc<dyn AttachmentFiles>,
    ) -> Result<Self, RunnerError> {
        let revisions = store.revision_tickets()?;
        let intermap = match store.wiki_page(&config.legacy.intermap_page)? {
            Some(text) => InterMap::parse(&text),
            None => {
                warn!(page = %config.legacy.intermap_page, "InterMap page not found");
                InterMap::default()
            }
        };
        debug!(
            revisions = revisions.len(),
            prefixes = intermap.len(),
            "Loaded rendering tables"
        );

        let resolver = MappingResolver::new(
            Arc::clone(&tracker),
            config.project.name.clone(),
            config.map_fields.clone(),
            config.call_timeout(),
        );
        let identities = IdentityDirectory::from_config(&config);

        Ok(Self {
            resolver,
            identities,
            renderer: Arc::new(WikiRenderer::new(intermap)),
            obfuscator: Arc::new(EmailObfuscator),
            templates: TextTemplates::new()?,
            revisions,
            config,
            tracker,
            store,
            files,
        })
    }

    /// Replaces the markup renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn MarkupRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Replaces the identity obfuscator.
    #[must_use]
    pub fn with_obfuscator(mut self, obfuscator: Arc<dyn Obfuscator>) -> Self {
        self.obfuscator = obfuscator;
        self
    }

    /// Per-call limit for remote requests.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.config.call_timeout()
    }

    /// Runs a tracker call under the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns the call's error or [`TrackerError::Timeout`].
    pub async fn call<T, F>(&self, call: F) -> Result<T, TrackerError>
    where
        F: Future<Output = Result<T, TrackerError>>,
    {
        with_timeout(self.timeout(), call).await
    }

    /// Derives the remote issue key for a ticket id.
    #[must_use]
    pub fn issue_key(&self, ticket_id: u64) -> String {
        self.config.issue_key(ticket_id)
    }

    /// Renders legacy markup, optionally in the context of a ticket.
    #[must_use]
    pub fn render(&self, text: &str, ticket: Option<&SourceTicket>) -> String {
        self.renderer.render(
            text,
            &RenderContext {
                ticket,
                project: &self.config.project.name,
                revisions: &self.revisions,
            },
        )
    }

    #[must_use]
    pub fn obfuscate(&self, identifier: &str) -> String {
        self.obfuscator.obfuscate(identifier)
    }
}
