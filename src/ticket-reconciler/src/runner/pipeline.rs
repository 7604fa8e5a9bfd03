//! Reconciliation of a single ticket.

use super::{RunContext, RunnerError};
use crate::attachments::sync_attachments;
use crate::comments::{prepare_comments, sync_comments};
use crate::diff::{compute_diff, DesiredState, FieldDiff, ResolvedRefs};
use crate::legacy::SourceTicket;
use crate::overflow::{fit_body, with_overflow_keyword, BodyKind};
use crate::summary::{TicketOutcome, TicketStage};
use crate::templates::FootnoteKind;
use crate::xref::link_xrefs;
use tracing::{debug, info, info_span, warn, Instrument};

/// Drives one ticket through every stage.
///
/// Recoverable failures end up in the returned outcome. An error is only
/// returned for failures that invalidate the whole run, such as a missing
/// mapping.
///
/// # Errors
///
/// Returns [`RunnerError`] for unmapped issue types or fields, legacy store
/// failures and overflow files that cannot be written.
pub async fn process_ticket(
    ctx: &RunContext,
    ticket: &SourceTicket,
) -> Result<TicketOutcome, RunnerError> {
    let issue_key = ctx.issue_key(ticket.id);
    let span = info_span!("ticket", id = ticket.id, issue_key = %issue_key);
    reconcile(ctx, ticket, issue_key).instrument(span).await
}

async fn reconcile(
    ctx: &RunContext,
    ticket: &SourceTicket,
    issue_key: String,
) -> Result<TicketOutcome, RunnerError> {
    let mut outcome = TicketOutcome::new(ticket.id, issue_key.as_str());

    let issue = match ctx.call(ctx.tracker.find_issue(&issue_key)).await {
        Ok(issue) => issue,
        Err(e) => {
            warn!(error = %e, "Could not fetch issue, skipping ticket");
            outcome.record_error(ticket.id.to_string(), e);
            outcome.enter(TicketStage::SkippedFetchFailed);
            return Ok(outcome);
        }
    };
    let current = &issue.fields;

    outcome.enter(TicketStage::Diffing);
    let xrefs = link_xrefs(ctx, &issue_key, ticket.xref(), current.links()).await?;
    outcome.actions.links_created += xrefs.links_created;
    outcome.extend_errors(xrefs.errors);

    let refs = ResolvedRefs::resolve(ctx, ticket).await?;
    let mut footnotes = xrefs.footnotes;
    if let Some(component) = ticket.component.as_deref().filter(|c| !c.trim().is_empty()) {
        if refs.component.is_none() {
            footnotes.push_str(&ctx.templates.footnote(FootnoteKind::DeletedComponent, component)?);
        }
    }

    let original = format!("{footnotes}{}", ticket.description.as_deref().unwrap_or(""));
    let description = fit_body(
        ctx.render(&original, Some(ticket)),
        &original,
        BodyKind::Description,
        ticket.id,
        &issue_key,
        ctx.files.as_ref(),
        &ctx.templates,
    )
    .await?;

    let legacy_comments = ctx.store.comments(ticket.id)?;
    let comments = prepare_comments(ctx, ticket, &issue_key, &legacy_comments).await?;

    let keywords = if description.overflowed() || comments.overflowed() {
        Some(with_overflow_keyword(ticket.keywords.as_deref()))
    } else {
        ticket.keywords.clone()
    };
    let desired =
        DesiredState::build(ctx, ticket, &refs, description.body, keywords.as_deref()).await?;
    let diff = compute_diff(&desired, current);

    outcome.enter(TicketStage::Updating);
    update_fields(ctx, &issue_key, &diff, &mut outcome).await;

    outcome.enter(TicketStage::CommentSync);
    sync_comments(
        ctx,
        &issue_key,
        &comments.bodies,
        current.comments(),
        &mut outcome,
    )
    .await;

    outcome.enter(TicketStage::AttachmentSync);
    let mut attachments = ctx.store.attachments(ticket.id)?;
    attachments.extend(description.attachment);
    attachments.extend(comments.attachments);
    sync_attachments(
        ctx,
        ticket.id,
        &issue_key,
        &attachments,
        current.attachments(),
        &mut outcome,
    )
    .await;

    outcome.enter(TicketStage::Done);
    Ok(outcome)
}

/// Writes the field diff in one request without notifying watchers.
async fn update_fields(
    ctx: &RunContext,
    issue_key: &str,
    diff: &FieldDiff,
    outcome: &mut TicketOutcome,
) {
    if diff.is_empty() {
        debug!("No field changes");
        return;
    }

    let mut changed = Vec::with_capacity(diff.len());
    for field_id in diff.field_ids() {
        changed.push(ctx.resolver.field_display_name(field_id).await);
    }
    info!(fields = %changed.join(","), "Updating issue");

    match ctx
        .call(ctx.tracker.update_issue(issue_key, &diff.to_request_fields(), false))
        .await
    {
        Ok(()) => outcome.updated_fields = Some(changed),
        Err(e) => {
            warn!(error = %e, "Issue update failed");
            outcome.record_error(issue_key, e);
        }
    }
}
