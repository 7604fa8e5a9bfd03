//! Template renderer.

use super::TemplateError;
use chrono::{DateTime, SecondsFormat, Utc};
use handlebars::{no_escape, Handlebars};
use serde_json::{json, Value};

const COMMENT_HEADER: &str = "comment-header";
const DESCRIPTION_OVERFLOW: &str = "description-overflow";
const COMMENT_OVERFLOW: &str = "comment-overflow";
const FOOTNOTE: &str = "footnote";
const MILESTONE_MISSING: &str = "milestone-missing";

const TEMPLATES: &[(&str, &str)] = &[
    (
        COMMENT_HEADER,
        "h6. Trac Comment {{number}} by {{#if mention}}[~{{mention}}]{{else}}{{author}}{{/if}}—{{time}}\n",
    ),
    (
        DESCRIPTION_OVERFLOW,
        "h1. Text was too large\n\nLimit is about ({{length}}, >32k)\nSee attached {{filename}} for original text.\n",
    ),
    (
        COMMENT_OVERFLOW,
        "h1. Text from {{author}} was too large\n\nLimit is about ({{length}}, >32k)\nSee attached {{filename}} for original text.\n",
    ),
    (FOOTNOTE, "h6. {{label}}: {{value}}\n\n"),
    (MILESTONE_MISSING, "Milestone {{name}} missing in legacy store"),
];

/// Creates a configured Handlebars registry.
///
/// The registry is configured with:
/// - No HTML escaping (output is tracker wiki markup)
/// - Strict mode (catches missing variables)
#[must_use]
pub fn create_handlebars_registry() -> Handlebars<'static> {
    let mut hbs = Handlebars::new();
    hbs.register_escape_fn(no_escape);
    hbs.set_strict_mode(true);
    hbs
}

/// Kinds of footnote lines prepended to a description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FootnoteKind {
    /// Reference to another bug tracker.
    SeeAlso,
    /// Cross-reference that is not a ticket number.
    MalformedXref,
    /// Cross-reference whose link could not be created.
    OrphanXref,
    /// Component that no longer exists remotely.
    DeletedComponent,
}

impl FootnoteKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SeeAlso => "Also see",
            Self::MalformedXref => "Malformed Xref",
            Self::OrphanXref => "Orphan Xref",
            Self::DeletedComponent => "Deleted Component",
        }
    }
}

/// Renderer for generated remote text.
pub struct TextTemplates {
    handlebars: Handlebars<'static>,
}

impl TextTemplates {
    /// Creates the renderer with every template registered.
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to compile.
    pub fn new() -> Result<Self, TemplateError> {
        let mut handlebars = create_handlebars_registry();
        for (name, source) in TEMPLATES {
            handlebars.register_template_string(name, source)?;
        }
        Ok(Self { handlebars })
    }

    /// Header line written above every migrated comment.
    ///
    /// `mention` is the remote user name when the author is mapped;
    /// otherwise `author` (already obfuscated) is shown verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn comment_header(
        &self,
        number: &str,
        mention: Option<&str>,
        author: &str,
        time: DateTime<Utc>,
    ) -> Result<String, TemplateError> {
        self.render(
            COMMENT_HEADER,
            &json!({
                "number": number,
                "mention": mention.unwrap_or(""),
                "author": author,
                "time": time.to_rfc3339_opts(SecondsFormat::Millis, true),
            }),
        )
    }

    /// Placeholder for a description moved to an attachment.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn description_overflow(
        &self,
        length: usize,
        filename: &str,
    ) -> Result<String, TemplateError> {
        self.render(
            DESCRIPTION_OVERFLOW,
            &json!({ "length": length, "filename": filename }),
        )
    }

    /// Placeholder for a comment moved to an attachment.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn comment_overflow(
        &self,
        author: &str,
        length: usize,
        filename: &str,
    ) -> Result<String, TemplateError> {
        self.render(
            COMMENT_OVERFLOW,
            &json!({ "author": author, "length": length, "filename": filename }),
        )
    }

    /// One footnote line, including the trailing blank line.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn footnote(&self, kind: FootnoteKind, value: &str) -> Result<String, TemplateError> {
        self.render(FOOTNOTE, &json!({ "label": kind.label(), "value": value }))
    }

    /// Version description used when the milestone row is gone.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn milestone_missing(&self, name: &str) -> Result<String, TemplateError> {
        self.render(MILESTONE_MISSING, &json!({ "name": name }))
    }

    fn render(&self, name: &str, data: &Value) -> Result<String, TemplateError> {
        Ok(self.handlebars.render(name, data)?)
    }
}
