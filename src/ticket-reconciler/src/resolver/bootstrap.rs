//! Creation of missing components and versions before the ticket loop.

use super::{BootstrapError, EntityKind};
use crate::legacy::Milestone;
use crate::runner::RunContext;
use crate::tracker::{NewComponent, NewVersion, Project};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{info, warn};

static MILESTONE_TICKET_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(#|ticket:)([0-9]+)").expect("static regex"));

/// Ensures every component, priority and milestone used by legacy tickets
/// exists remotely.
///
/// Missing components and versions are created; missing priorities cannot
/// be created through the API and are reported for manual creation.
///
/// # Errors
///
/// Returns [`BootstrapError::EntitiesPending`] if anything was created or
/// must be created by hand; the run has to be restarted in that case.
/// Other variants report lookup or creation failures.
pub async fn bootstrap(ctx: &RunContext) -> Result<(), BootstrapError> {
    let mut created = Vec::new();
    let mut manual = Vec::new();

    for component in ctx.store.components()? {
        if ctx.resolver.resolve(EntityKind::Component, &component.name).await?.is_some() {
            continue;
        }
        let project = ctx.resolver.project().await?;
        info!(component = %component.name, "Adding component");
        let body = NewComponent {
            name: component.name.clone(),
            description: component.description.clone().filter(|d| !d.is_empty()),
            project: project.key.clone(),
            project_id: project.id.clone(),
        };
        let entity = ctx
            .call(ctx.tracker.create_component(&body))
            .await
            .map_err(|source| BootstrapError::Create {
                kind: EntityKind::Component,
                name: component.name.clone(),
                source,
            })?;
        ctx.resolver
            .insert(EntityKind::Component, &entity.name, &entity.id)
            .await?;
        created.push(format!("component {}", component.name));
    }

    for priority in ctx.store.priorities()? {
        if ctx.resolver.resolve(EntityKind::Priority, &priority).await?.is_none() {
            warn!(priority = %priority, "Priority must be added manually");
            manual.push(format!("priority {priority}"));
        }
    }

    for name in ctx.store.milestones(&ctx.config.legacy.skip_milestones)? {
        if ctx.resolver.resolve(EntityKind::Version, &name).await?.is_some() {
            continue;
        }
        let project = ctx.resolver.project().await?;
        let milestone = match ctx.store.milestone(&name)? {
            Some(milestone) => milestone,
            None => Milestone {
                name: name.clone(),
                due: 0,
                completed: 0,
                description: ctx.templates.milestone_missing(&name)?,
            },
        };

        let description = ctx.render(
            &MILESTONE_TICKET_REF.replace_all(
                &milestone.description,
                format!("[{}-$2]", ctx.config.project.name).as_str(),
            ),
            None,
        );

        info!(version = %name, "Adding version");
        let body = version_body(&milestone, description, project, Utc::now());
        let entity = ctx
            .call(ctx.tracker.create_version(&body))
            .await
            .map_err(|source| BootstrapError::Create {
                kind: EntityKind::Version,
                name: name.clone(),
                source,
            })?;
        ctx.resolver
            .insert(EntityKind::Version, &entity.name, &entity.id)
            .await?;
        created.push(format!("version {name}"));
    }

    if created.is_empty() && manual.is_empty() {
        Ok(())
    } else {
        Err(BootstrapError::EntitiesPending { created, manual })
    }
}

/// Builds the request body for a version mirroring `milestone`.
///
/// A milestone is released once it has a completion date; a released
/// milestone is overdue when its due date is not in the future.
#[must_use]
pub fn version_body(
    milestone: &Milestone,
    description: String,
    project: &Project,
    now: DateTime<Utc>,
) -> NewVersion {
    let released = milestone.completed != 0;
    let due = crate::legacy::micros_to_datetime(milestone.due);
    let release_date = released.then(|| {
        crate::legacy::micros_to_datetime(milestone.completed)
            .format("%Y-%m-%d")
            .to_string()
    });

    NewVersion {
        name: milestone.name.clone(),
        description,
        project: project.key.clone(),
        project_id: project.id.clone(),
        released,
        release_date,
        overdue: released && due <= now,
    }
}
