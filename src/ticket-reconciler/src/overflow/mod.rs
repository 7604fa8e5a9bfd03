//! Oversized text bodies.
//!
//! The tracker rejects bodies above [`MAX_BODY_CHARS`]. Such text is written
//! next to the ticket's other attachment files, uploaded by the attachment
//! stage, and replaced with a short placeholder.

use crate::files::AttachmentFiles;
use crate::legacy::LegacyAttachment;
use crate::templates::{TemplateError, TextTemplates};
use thiserror::Error;
use tracing::info;

/// Largest body, in characters, the tracker accepts.
pub const MAX_BODY_CHARS: usize = 32_000;

/// Label added to tickets that had text moved into an attachment.
pub const OVERFLOW_KEYWORD: &str = "jira-overlong-description";

/// Errors raised while moving text into an attachment.
#[derive(Debug, Error)]
pub enum OverflowError {
    #[error("Failed to write overflow file '{filename}': {source}")]
    Write {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Which body is being fitted.
#[derive(Debug, Clone, Copy)]
pub enum BodyKind<'a> {
    Description,
    /// A comment; `suffix` is its legacy number, or its position when unnumbered.
    Comment { author: &'a str, suffix: &'a str },
}

/// A body that fits the tracker, plus the attachment created to make it fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedBody {
    pub body: String,
    pub attachment: Option<LegacyAttachment>,
}

impl FittedBody {
    #[must_use]
    pub fn overflowed(&self) -> bool {
        self.attachment.is_some()
    }
}

/// Returns true if `text` is too long for the tracker.
#[must_use]
pub fn exceeds_limit(text: &str) -> bool {
    text.chars().count() > MAX_BODY_CHARS
}

/// Name of the attachment holding an oversized body.
#[must_use]
pub fn overflow_filename(issue_key: &str, kind: BodyKind<'_>) -> String {
    match kind {
        BodyKind::Description => format!("{issue_key}.txt"),
        BodyKind::Comment { suffix, .. } => format!("{issue_key}.{suffix}.txt"),
    }
}

/// Appends the overflow label to a keyword string, once.
#[must_use]
pub fn with_overflow_keyword(keywords: Option<&str>) -> String {
    let keywords = keywords.unwrap_or("").trim();
    if keywords.split([',', ' ']).any(|k| k == OVERFLOW_KEYWORD) {
        keywords.to_string()
    } else if keywords.is_empty() {
        OVERFLOW_KEYWORD.to_string()
    } else {
        format!("{keywords} {OVERFLOW_KEYWORD}")
    }
}

/// Returns `rendered` unchanged when it fits; otherwise writes `original`
/// to the ticket's attachment directory and returns a placeholder.
///
/// Writing is idempotent: rerunning overwrites the same file.
///
/// # Errors
///
/// Returns [`OverflowError`] if the file cannot be written or the
/// placeholder cannot be rendered.
pub async fn fit_body(
    rendered: String,
    original: &str,
    kind: BodyKind<'_>,
    ticket_id: u64,
    issue_key: &str,
    files: &dyn AttachmentFiles,
    templates: &TextTemplates,
) -> Result<FittedBody, OverflowError> {
    if !exceeds_limit(&rendered) {
        return Ok(FittedBody {
            body: rendered,
            attachment: None,
        });
    }

    let filename = overflow_filename(issue_key, kind);
    let length = rendered.chars().count();
    files
        .write_text(ticket_id, &filename, original)
        .await
        .map_err(|source| OverflowError::Write {
            filename: filename.clone(),
            source,
        })?;
    info!(ticket = ticket_id, filename, length, "Moved oversized text into attachment");

    let body = match kind {
        BodyKind::Description => templates.description_overflow(length, &filename)?,
        BodyKind::Comment { author, .. } => templates.comment_overflow(author, length, &filename)?,
    };

    Ok(FittedBody {
        body,
        attachment: Some(LegacyAttachment::new(filename)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::LocalAttachmentFiles;
    use tempfile::TempDir;

    async fn fit(text: &str, kind: BodyKind<'_>, files: &LocalAttachmentFiles) -> FittedBody {
        let templates = TextTemplates::new().unwrap();
        fit_body(text.to_string(), text, kind, 5, "ICU-5", files, &templates)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn exactly_at_limit_does_not_overflow() {
        let temp = TempDir::new().unwrap();
        let files = LocalAttachmentFiles::new(temp.path());
        let text = "x".repeat(MAX_BODY_CHARS);

        let fitted = fit(&text, BodyKind::Description, &files).await;

        assert!(!fitted.overflowed());
        assert_eq!(fitted.body, text);
        assert!(!temp.path().join("5").exists());
    }

    #[tokio::test]
    async fn one_past_limit_moves_text_into_attachment() {
        let temp = TempDir::new().unwrap();
        let files = LocalAttachmentFiles::new(temp.path());
        let text = "x".repeat(MAX_BODY_CHARS + 1);

        let fitted = fit(&text, BodyKind::Description, &files).await;

        assert_eq!(
            fitted.attachment,
            Some(LegacyAttachment::new("ICU-5.txt"))
        );
        assert!(fitted.body.contains("(32001, >32k)"));
        assert!(fitted.body.contains("ICU-5.txt"));
        let written = std::fs::read_to_string(temp.path().join("5").join("ICU-5.txt")).unwrap();
        assert_eq!(written, text);
    }

    #[tokio::test]
    async fn placeholder_states_the_rendered_length() {
        let temp = TempDir::new().unwrap();
        let files = LocalAttachmentFiles::new(temp.path());
        let templates = TextTemplates::new().unwrap();
        let original = "x".repeat(31_990);
        let rendered = format!("{original}{}", "y".repeat(20));

        let fitted = fit_body(
            rendered,
            &original,
            BodyKind::Description,
            5,
            "ICU-5",
            &files,
            &templates,
        )
        .await
        .unwrap();

        assert!(fitted.body.contains("(32010, >32k)"), "{}", fitted.body);
        let written = std::fs::read_to_string(temp.path().join("5").join("ICU-5.txt")).unwrap();
        assert_eq!(written, original);
    }

    #[tokio::test]
    async fn comment_overflow_uses_suffix_and_author() {
        let temp = TempDir::new().unwrap();
        let files = LocalAttachmentFiles::new(temp.path());
        let text = "é".repeat(MAX_BODY_CHARS + 10);

        let fitted = fit(
            &text,
            BodyKind::Comment {
                author: "bob",
                suffix: "3",
            },
            &files,
        )
        .await;

        assert!(fitted.body.starts_with("h1. Text from bob was too large"));
        assert!(temp.path().join("5").join("ICU-5.3.txt").exists());
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert!(!exceeds_limit(&"é".repeat(MAX_BODY_CHARS)));
    }

    #[test]
    fn adds_overflow_keyword_once() {
        assert_eq!(with_overflow_keyword(None), OVERFLOW_KEYWORD);
        assert_eq!(
            with_overflow_keyword(Some("crash")),
            format!("crash {OVERFLOW_KEYWORD}")
        );
        let already = with_overflow_keyword(Some("crash"));
        assert_eq!(with_overflow_keyword(Some(&already)), already);
    }
}
