//! Attachment reconciliation.
//!
//! Remote attachments are matched to legacy ones by filename. Missing files
//! are uploaded from the attachment directory and duplicates are deleted.
//! Attachments with no legacy counterpart are left alone.

use crate::legacy::LegacyAttachment;
use crate::runner::RunContext;
use crate::summary::TicketOutcome;
use crate::tracker::RemoteAttachment;
use std::collections::HashSet;
use tracing::{info, warn};

/// Escapes the characters the legacy store escapes in attachment paths.
#[must_use]
pub fn escape_filename(filename: &str) -> String {
    let mut escaped = String::with_capacity(filename.len());
    for c in filename.chars() {
        match c {
            ' ' => escaped.push_str("%20"),
            '[' => escaped.push_str("%5B"),
            ']' => escaped.push_str("%5D"),
            '$' => escaped.push_str("%24"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// One remote attachment write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentAction {
    /// Upload `filename`, read from disk under its escaped name.
    Upload { filename: String, escaped: String },
    /// Delete a duplicate of `filename`.
    Delete {
        filename: String,
        attachment_id: String,
    },
}

impl AttachmentAction {
    #[must_use]
    pub fn filename(&self) -> &str {
        match self {
            Self::Upload { filename, .. } | Self::Delete { filename, .. } => filename,
        }
    }
}

/// Plans the attachment writes for one issue.
///
/// A remote attachment matches a legacy one when its name equals the
/// legacy filename or its escaped form. The first match is kept and every
/// further match deleted; a legacy file without match is uploaded.
#[must_use]
pub fn plan_attachments(
    legacy: &[LegacyAttachment],
    remote: &[RemoteAttachment],
) -> Vec<AttachmentAction> {
    let mut actions = Vec::new();
    let mut seen = HashSet::new();

    for attachment in legacy {
        let filename = attachment.filename.as_str();
        if !seen.insert(filename) {
            continue;
        }
        let escaped = escape_filename(filename);

        let matches: Vec<&RemoteAttachment> = remote
            .iter()
            .filter(|r| r.filename == filename || r.filename == escaped)
            .collect();
        if matches.is_empty() {
            actions.push(AttachmentAction::Upload {
                filename: filename.to_string(),
                escaped,
            });
            continue;
        }
        actions.extend(matches[1..].iter().map(|duplicate| AttachmentAction::Delete {
            filename: filename.to_string(),
            attachment_id: duplicate.id.clone(),
        }));
    }

    actions
}

/// Applies the attachment plan for one issue.
///
/// Failures are recorded under `ticketId.filename` and never stop the
/// remaining attachments.
pub async fn sync_attachments(
    ctx: &RunContext,
    ticket_id: u64,
    issue_key: &str,
    legacy: &[LegacyAttachment],
    remote: &[RemoteAttachment],
    outcome: &mut TicketOutcome,
) {
    for action in plan_attachments(legacy, remote) {
        let error_key = format!("{ticket_id}.{}", action.filename());
        match action {
            AttachmentAction::Delete {
                filename,
                attachment_id,
            } => match ctx.call(ctx.tracker.delete_attachment(&attachment_id)).await {
                Ok(()) => {
                    info!(
                        issue_key,
                        filename = %filename,
                        attachment_id = %attachment_id,
                        "Deleted duplicate attachment"
                    );
                    outcome.actions.attachments_deleted += 1;
                }
                Err(e) => {
                    warn!(issue_key, filename = %filename, error = %e, "Could not delete attachment");
                    outcome.record_error(error_key, e);
                }
            },
            AttachmentAction::Upload { filename, escaped } => {
                let content = match ctx.files.read(ticket_id, &escaped).await {
                    Ok(content) => content,
                    Err(e) => {
                        warn!(issue_key, filename = %filename, error = %e, "Could not read attachment");
                        outcome.record_error(error_key, e);
                        continue;
                    }
                };

                match ctx
                    .call(ctx.tracker.add_attachment(issue_key, &filename, content))
                    .await
                {
                    Ok(created) => {
                        outcome.actions.attachments_uploaded += 1;
                        log_upload(issue_key, &filename, &created);
                    }
                    Err(e) => {
                        warn!(issue_key, filename = %filename, error = %e, "Could not upload attachment");
                        outcome.record_error(error_key, e);
                    }
                }
            }
        }
    }
}

fn log_upload(issue_key: &str, filename: &str, created: &[RemoteAttachment]) {
    match created {
        [attachment] => info!(
            issue_key,
            attachment_id = %attachment.id,
            filename = %attachment.filename,
            size = attachment.size,
            mime_type = attachment.mime_type.as_deref().unwrap_or("unknown"),
            "Uploaded attachment"
        ),
        _ => warn!(
            issue_key,
            filename,
            count = created.len(),
            "Unexpected upload response"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(id: &str, filename: &str) -> RemoteAttachment {
        RemoteAttachment {
            id: id.to_string(),
            filename: filename.to_string(),
            size: 0,
            mime_type: None,
        }
    }

    #[test]
    fn escapes_the_fixed_character_set() {
        assert_eq!(escape_filename("a b[1]$.txt"), "a%20b%5B1%5D%24.txt");
        assert_eq!(escape_filename("plain.txt"), "plain.txt");
    }

    #[test]
    fn duplicate_remote_attachments_are_deleted_keeping_the_first() {
        let legacy = [LegacyAttachment::new("log.txt")];
        let actions = plan_attachments(&legacy, &[remote("1", "log.txt"), remote("2", "log.txt")]);

        assert_eq!(
            actions,
            vec![AttachmentAction::Delete {
                filename: "log.txt".to_string(),
                attachment_id: "2".to_string(),
            }]
        );
    }

    #[test]
    fn missing_attachments_are_uploaded() {
        let legacy = [LegacyAttachment::new("crash dump.txt")];
        let actions = plan_attachments(&legacy, &[remote("1", "other.txt")]);

        assert_eq!(
            actions,
            vec![AttachmentAction::Upload {
                filename: "crash dump.txt".to_string(),
                escaped: "crash%20dump.txt".to_string(),
            }]
        );
    }

    #[test]
    fn escaped_remote_names_count_as_matches() {
        let legacy = [LegacyAttachment::new("crash dump.txt")];
        let actions = plan_attachments(&legacy, &[remote("1", "crash%20dump.txt")]);
        assert!(actions.is_empty());
    }

    #[test]
    fn unrelated_remote_attachments_are_kept() {
        let actions = plan_attachments(&[], &[remote("1", "screenshot.png")]);
        assert!(actions.is_empty());
    }
}
