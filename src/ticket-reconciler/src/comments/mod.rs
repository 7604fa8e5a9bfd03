//! Comment reconciliation.
//!
//! Legacy comments correspond to remote comments by position: the n-th
//! legacy comment (oldest first) is the n-th remote comment. Missing remote
//! comments are created, differing ones are rewritten, and surplus remote
//! comments are blanked out with [`DELETED_MARKER`].

use crate::legacy::{LegacyAttachment, LegacyComment, SourceTicket};
use crate::overflow::{fit_body, BodyKind, OverflowError};
use crate::runner::RunContext;
use crate::summary::TicketOutcome;
use crate::templates::DELETED_MARKER;
use crate::tracker::RemoteComment;
use tracing::{debug, warn};

/// Comment bodies ready to be compared against the remote issue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedComments {
    /// One body per legacy comment, in order.
    pub bodies: Vec<String>,
    /// Overflow files created for oversized comments.
    pub attachments: Vec<LegacyAttachment>,
}

impl PreparedComments {
    /// Returns true if any comment was moved into an attachment.
    #[must_use]
    pub fn overflowed(&self) -> bool {
        !self.attachments.is_empty()
    }
}

/// Renders every legacy comment of a ticket into its remote body.
///
/// Each body starts with a header naming the comment number, the author
/// (mentioned when mapped, obfuscated otherwise) and the time.
///
/// # Errors
///
/// Returns [`OverflowError`] if an oversized comment cannot be written out
/// or a template fails to render.
pub async fn prepare_comments(
    ctx: &RunContext,
    ticket: &SourceTicket,
    issue_key: &str,
    comments: &[LegacyComment],
) -> Result<PreparedComments, OverflowError> {
    let mut prepared = PreparedComments::default();

    for (index, comment) in comments.iter().enumerate() {
        let position = (index + 1).to_string();
        let mention = ctx
            .identities
            .comment_author(&comment.author, ctx.tracker.as_ref(), ctx.timeout())
            .await;
        let author = match &mention {
            Some(name) => format!("[~{name}]"),
            None => ctx.obfuscate(&comment.author),
        };

        let header = ctx.templates.comment_header(
            &comment.number,
            mention.as_deref(),
            &author,
            comment.created_at(),
        )?;
        let rendered = format!("{header}{}", ctx.render(&comment.text, Some(ticket)));

        let suffix = if comment.number.is_empty() {
            position.as_str()
        } else {
            comment.number.as_str()
        };
        let fitted = fit_body(
            rendered,
            &comment.text,
            BodyKind::Comment {
                author: &author,
                suffix,
            },
            ticket.id,
            issue_key,
            ctx.files.as_ref(),
            &ctx.templates,
        )
        .await?;

        prepared.attachments.extend(fitted.attachment);
        prepared.bodies.push(fitted.body);
    }

    Ok(prepared)
}

/// One remote comment write. Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentAction {
    Create {
        position: usize,
        body: String,
    },
    Update {
        position: usize,
        comment_id: String,
        body: String,
    },
    /// Blank out a surplus remote comment.
    Neutralize {
        position: usize,
        comment_id: String,
    },
}

impl CommentAction {
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            Self::Create { position, .. }
            | Self::Update { position, .. }
            | Self::Neutralize { position, .. } => *position,
        }
    }
}

/// Writes needed to bring the remote comments in line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentPlan {
    pub actions: Vec<CommentAction>,
    /// `(legacy, remote)` counts when the remote issue has more comments.
    pub count_mismatch: Option<(usize, usize)>,
}

/// Plans the comment writes for one issue.
///
/// Surplus remote comments come first, then legacy comments in order.
/// Comments whose body already matches are left alone.
#[must_use]
pub fn plan_comments(bodies: &[String], remote: &[RemoteComment]) -> CommentPlan {
    let mut plan = CommentPlan::default();

    if remote.len() > bodies.len() {
        plan.count_mismatch = Some((bodies.len(), remote.len()));
        for (index, comment) in remote.iter().enumerate().skip(bodies.len()) {
            if comment.body != DELETED_MARKER {
                plan.actions.push(CommentAction::Neutralize {
                    position: index + 1,
                    comment_id: comment.id.clone(),
                });
            }
        }
    }

    for (index, body) in bodies.iter().enumerate() {
        let position = index + 1;
        match remote.get(index) {
            None => plan.actions.push(CommentAction::Create {
                position,
                body: body.clone(),
            }),
            Some(existing) if existing.body != *body => plan.actions.push(CommentAction::Update {
                position,
                comment_id: existing.id.clone(),
                body: body.clone(),
            }),
            Some(_) => {}
        }
    }

    plan
}

/// Applies the comment plan for one issue.
///
/// Failures are recorded under `KEY.position` and never stop the remaining
/// comments. A count mismatch is recorded once under `KEY.#`.
pub async fn sync_comments(
    ctx: &RunContext,
    issue_key: &str,
    bodies: &[String],
    remote: &[RemoteComment],
    outcome: &mut TicketOutcome,
) {
    let plan = plan_comments(bodies, remote);

    if let Some((legacy, remote)) = plan.count_mismatch {
        warn!(issue_key, legacy, remote, "Remote issue has surplus comments");
        outcome.record_error(
            format!("{issue_key}.#"),
            format!("Trac has {legacy} comments but {remote} in Jira"),
        );
    }

    for action in plan.actions {
        let position = action.position();
        let result = match &action {
            CommentAction::Create { body, .. } => ctx
                .call(ctx.tracker.add_comment(issue_key, body))
                .await
                .map(|created| {
                    debug!(issue_key, position, comment_id = %created.id, "Added comment");
                    outcome.actions.comments_created += 1;
                }),
            CommentAction::Update {
                comment_id, body, ..
            } => ctx
                .call(ctx.tracker.update_comment(issue_key, comment_id, body))
                .await
                .map(|()| {
                    debug!(issue_key, position, comment_id = %comment_id, "Updated comment");
                    outcome.actions.comments_updated += 1;
                }),
            CommentAction::Neutralize { comment_id, .. } => ctx
                .call(ctx.tracker.update_comment(issue_key, comment_id, DELETED_MARKER))
                .await
                .map(|()| {
                    debug!(issue_key, position, comment_id = %comment_id, "Neutralized surplus comment");
                    outcome.actions.comments_neutralized += 1;
                }),
        };

        if let Err(e) = result {
            warn!(issue_key, position, error = %e, "Comment write failed");
            outcome.record_error(format!("{issue_key}.{position}"), e);
        }
    }
}
