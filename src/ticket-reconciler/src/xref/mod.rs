//! Cross-references between tickets.
//!
//! The free-text `xref` field lists related tickets. Ticket numbers become
//! remote issue links; references into other bug trackers and anything
//! unparseable become description footnotes instead. Links are only ever
//! added, never removed.

use crate::config::issue_key;
use crate::runner::RunContext;
use crate::summary::ErrorRecord;
use crate::templates::{FootnoteKind, TemplateError};
use crate::tracker::{IssueLink, IssueRef, LinkType, NewIssueLink};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, warn};

static FOREIGN_TRACKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*:[0-9]+$").expect("static regex"));

/// One classified cross-reference token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XrefToken {
    /// A ticket in the same legacy store.
    Ticket(u64),
    /// A bug in another tracker, e.g. `otherTracker:55`.
    Foreign(String),
    /// Anything else.
    Malformed(String),
}

/// Strips the `ticket:`, `#` and `p` prefixes people used in front of
/// ticket numbers.
#[must_use]
pub fn strip_prefixes(token: &str) -> &str {
    let token = token.trim();
    let token = token
        .strip_prefix("ticket:")
        .map_or(token, str::trim_start);
    let token = token.strip_prefix('#').map_or(token, str::trim_start);
    match token.strip_prefix('p').map(str::trim_start) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => token,
    }
}

/// Classifies one token; `None` for tokens that are empty once stripped.
#[must_use]
pub fn classify(token: &str) -> Option<XrefToken> {
    let token = strip_prefixes(token);
    if token.is_empty() {
        return None;
    }
    if FOREIGN_TRACKER.is_match(token) {
        return Some(XrefToken::Foreign(token.to_string()));
    }

    let digits: String = token.chars().filter(char::is_ascii_digit).collect();
    match digits.parse::<u64>() {
        Ok(id) if !digits.is_empty() => Some(XrefToken::Ticket(id)),
        _ => Some(XrefToken::Malformed(token.to_string())),
    }
}

/// Splits an `xref` field on commas and whitespace and classifies each token.
#[must_use]
pub fn parse_xrefs(text: &str) -> Vec<XrefToken> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(classify)
        .collect()
}

/// Keys of issues already linked with `link_type`.
#[must_use]
pub fn linked_keys<'a>(links: &'a [IssueLink], link_type: &LinkType) -> HashSet<&'a str> {
    links
        .iter()
        .filter(|link| link.link_type.matches(link_type))
        .filter_map(IssueLink::other_key)
        .collect()
}

/// Footnotes and failures produced while linking one ticket.
#[derive(Debug, Default)]
pub struct XrefOutcome {
    /// Footnote lines to prepend to the description.
    pub footnotes: String,
    pub errors: Vec<ErrorRecord>,
    pub links_created: usize,
}

/// Links `source_key` to every ticket its `xref` field names.
///
/// Targets already linked with the configured link type, and the issue
/// itself, are skipped. A failed link is recorded and footnoted as an
/// orphan; it does not stop the remaining tokens.
///
/// # Errors
///
/// Returns [`TemplateError`] if a footnote cannot be rendered.
pub async fn link_xrefs(
    ctx: &RunContext,
    source_key: &str,
    xref: Option<&str>,
    existing: &[IssueLink],
) -> Result<XrefOutcome, TemplateError> {
    let mut outcome = XrefOutcome::default();
    let Some(xref) = xref else {
        return Ok(outcome);
    };

    let link_type = &ctx.config.xref_link_type;
    let linked = linked_keys(existing, link_type);
    let mut attempted = HashSet::new();

    for token in parse_xrefs(xref) {
        match token {
            XrefToken::Foreign(reference) => {
                outcome
                    .footnotes
                    .push_str(&ctx.templates.footnote(FootnoteKind::SeeAlso, &reference)?);
            }
            XrefToken::Malformed(reference) => {
                outcome
                    .footnotes
                    .push_str(&ctx.templates.footnote(FootnoteKind::MalformedXref, &reference)?);
            }
            XrefToken::Ticket(id) => {
                let target = issue_key(&ctx.config.project.name, id);
                if target == source_key
                    || linked.contains(target.as_str())
                    || !attempted.insert(target.clone())
                {
                    continue;
                }

                let body = NewIssueLink {
                    link_type: link_type.clone(),
                    inward_issue: IssueRef {
                        key: source_key.to_string(),
                    },
                    outward_issue: IssueRef {
                        key: target.clone(),
                    },
                };
                match ctx.call(ctx.tracker.create_link(&body)).await {
                    Ok(()) => {
                        debug!(issue_key = source_key, target = %target, "Linked cross-reference");
                        outcome.links_created += 1;
                    }
                    Err(e) => {
                        warn!(
                            issue_key = source_key,
                            target = %target,
                            error = %e,
                            "Could not link cross-reference"
                        );
                        let footnote =
                            ctx.templates.footnote(FootnoteKind::OrphanXref, &id.to_string())?;
                        outcome.footnotes.push_str(&footnote);
                        outcome
                            .errors
                            .push(ErrorRecord::new(format!("{source_key}::{target}"), e));
                    }
                }
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_forms_normalize_to_the_same_ticket() {
        for token in ["ticket:123", "#123", "p123", " 123 ", "ticket: 123"] {
            assert_eq!(classify(token), Some(XrefToken::Ticket(123)), "{token:?}");
        }
    }

    #[test]
    fn foreign_and_malformed_tokens_never_link() {
        assert_eq!(
            classify("otherTracker:55"),
            Some(XrefToken::Foreign("otherTracker:55".to_string()))
        );
        assert_eq!(classify("abc"), Some(XrefToken::Malformed("abc".to_string())));
        assert_eq!(classify("pabc"), Some(XrefToken::Malformed("pabc".to_string())));
    }

    #[test]
    fn prefix_only_tokens_are_dropped() {
        assert_eq!(classify("ticket:"), None);
        assert_eq!(classify("#"), None);
        assert_eq!(classify(""), None);
    }

    #[test]
    fn splits_on_commas_and_whitespace() {
        assert_eq!(
            parse_xrefs("#1, ticket:2  cldrbug:9,,x"),
            vec![
                XrefToken::Ticket(1),
                XrefToken::Ticket(2),
                XrefToken::Foreign("cldrbug:9".to_string()),
                XrefToken::Malformed("x".to_string()),
            ]
        );
    }

    #[test]
    fn collects_links_of_the_configured_type_only() {
        let links: Vec<IssueLink> = serde_json::from_value(serde_json::json!([
            { "type": { "id": "3" }, "outwardIssue": { "key": "ICU-2" } },
            { "type": { "id": "3" }, "inwardIssue": { "key": "ICU-5" } },
            { "type": { "id": "9" }, "outwardIssue": { "key": "ICU-7" } }
        ]))
        .unwrap();
        let link_type = LinkType {
            id: Some("3".to_string()),
            name: None,
        };

        let keys = linked_keys(&links, &link_type);
        assert_eq!(keys, HashSet::from(["ICU-2", "ICU-5"]));
    }
}
