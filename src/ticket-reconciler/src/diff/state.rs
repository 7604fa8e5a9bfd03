//! Projection of a legacy ticket onto the remote field bag.

use super::Desired;
use crate::config::MappedField;
use crate::legacy::SourceTicket;
use crate::resolver::{EntityKind, ResolverError};
use crate::runner::RunContext;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("static regex"));
static COMMAS_OR_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[, ]+").expect("static regex"));

/// Summary used for tickets without one.
pub const DEFAULT_SUMMARY: &str = "(no summary)";

/// Legacy custom field holding the reviewer.
const REVIEWER_FIELD: &str = "revw";

/// Remote ids the legacy names of one ticket resolve to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRefs {
    pub issue_type: String,
    pub component: Option<String>,
    pub version: Option<String>,
    pub priority: Option<String>,
}

impl ResolvedRefs {
    /// Resolves the ticket's type, component, milestone and priority.
    ///
    /// The priority falls back to the configured default when the ticket
    /// has none or an unknown one.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError`] for unknown issue types or failed listings.
    pub async fn resolve(ctx: &RunContext, ticket: &SourceTicket) -> Result<Self, ResolverError> {
        let resolver = &ctx.resolver;
        let issue_type = resolver
            .issue_type_for(ticket.ticket_type.as_deref(), ctx.config.map_types.as_ref())
            .await?;
        let component = resolver
            .resolve_opt(EntityKind::Component, ticket.component.as_deref())
            .await?;
        let version = resolver
            .resolve_opt(EntityKind::Version, ticket.milestone.as_deref())
            .await?;

        let default_priority = ctx.config.default_priority.as_str();
        let wanted = ticket
            .priority
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(default_priority);
        let priority = match resolver.resolve(EntityKind::Priority, wanted).await? {
            Some(id) => Some(id),
            None => resolver.resolve(EntityKind::Priority, default_priority).await?,
        };

        Ok(Self {
            issue_type,
            component,
            version,
            priority,
        })
    }
}

/// Desired value per remote field id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesiredState {
    fields: BTreeMap<String, Desired>,
}

impl DesiredState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field_id: impl Into<String>, value: Desired) {
        self.fields.insert(field_id.into(), value);
    }

    #[must_use]
    pub fn get(&self, field_id: &str) -> Option<&Desired> {
        self.fields.get(field_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Desired)> {
        self.fields.iter().map(|(id, value)| (id.as_str(), value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Computes the desired state of a ticket.
    ///
    /// `description` is the final (rendered, footnoted and possibly
    /// externalized) body and `keywords` the keyword list including any
    /// overflow label.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError`] when a required custom field mapping is
    /// missing or unknown to the tracker.
    pub async fn build(
        ctx: &RunContext,
        ticket: &SourceTicket,
        refs: &ResolvedRefs,
        description: String,
        keywords: Option<&str>,
    ) -> Result<Self, ResolverError> {
        let mut state = Self::new();
        let resolver = &ctx.resolver;

        state.set("issuetype", Desired::Reference(Some(refs.issue_type.clone())));
        state.set(
            "summary",
            Desired::Text(Some(
                ticket
                    .summary
                    .clone()
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
            )),
        );
        state.set("description", Desired::text(Some(description)));
        state.set("components", Desired::ReferenceArray(refs.component.clone()));
        state.set("fixVersions", Desired::ReferenceArray(refs.version.clone()));
        state.set("priority", Desired::Reference(refs.priority.clone()));
        state.set(
            "security",
            Desired::Reference(
                ticket
                    .is_sensitive()
                    .then(|| ctx.config.security.sensitive.clone()),
            ),
        );
        state.set("labels", Desired::labels(keywords));
        state.set(
            "reporter",
            Desired::Identity(ctx.identities.resolve(ticket.reporter.as_deref())),
        );
        state.set(
            "assignee",
            Desired::Identity(ctx.identities.resolve(ticket.owner.as_deref())),
        );

        for field in MappedField::ALL {
            let field_id = if MappedField::REQUIRED.contains(&field) {
                Some(resolver.field_id(field).await?)
            } else {
                resolver.mapped_field_id(field).await?
            };
            if let Some(field_id) = field_id {
                state.set(field_id, custom_value(ctx, ticket, field));
            }
        }

        Ok(state)
    }
}

/// Desired value of a mapped custom field.
fn custom_value(ctx: &RunContext, ticket: &SourceTicket, field: MappedField) -> Desired {
    let trimmed = |value: Option<&str>| value.map(|v| v.trim().to_string());

    match field {
        MappedField::Status => Desired::text(trimmed(ticket.status.as_deref())),
        MappedField::Resolution => Desired::text(trimmed(ticket.resolution.as_deref())),
        MappedField::Project => Desired::text(ticket.custom("project").map(str::to_string)),
        MappedField::Weeks => Desired::Number(
            ticket
                .custom("weeks")
                .and_then(|w| w.trim().parse::<f64>().ok())
                .filter(|w| w.is_finite() && *w != 0.0),
        ),
        MappedField::Cc => {
            let mut cc: Vec<String> = COMMAS_OR_SPACES
                .split(ticket.cc.as_deref().unwrap_or(""))
                .filter(|e| !e.is_empty())
                .map(|e| ctx.obfuscate(e))
                .collect();
            cc.sort();
            Desired::text(Some(cc.join(",")))
        }
        MappedField::Xpath => Desired::text(
            ticket
                .custom("xpath")
                .map(|x| SPACES.replace_all(x, "\n").trim().to_string()),
        ),
        MappedField::Locale => Desired::text(
            ticket
                .custom("locale")
                .map(|l| COMMAS_OR_SPACES.replace_all(l, "\n").trim().to_string()),
        ),
        MappedField::Phase => Desired::choice(ticket.custom("phase")),
        MappedField::Reporter => Desired::text(
            ticket
                .reporter
                .as_deref()
                .filter(|r| !r.is_empty())
                .map(|r| ctx.obfuscate(r)),
        ),
        MappedField::Owner => Desired::text(ticket.owner.clone()),
        MappedField::Review => {
            Desired::Identity(ctx.identities.resolve(ticket.custom(REVIEWER_FIELD)))
        }
        MappedField::Time => Desired::Date(Some(ticket.created_at())),
    }
}
