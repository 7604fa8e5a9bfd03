//! Default renderer from Trac wiki markup to Jira wiki markup.

use super::{MarkupRenderer, RenderContext};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static INTERMAP_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][\w.-]*)\s+(\S+)(?:\s+#\s*(.*))?$").expect("static regex")
});
static CODE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{\{(.*?)\}\}\}").expect("static regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(={1,6})\s*(.*?)\s*=*\s*$").expect("static regex"));
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'''(.+?)'''").expect("static regex"));
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"''(.+?)''").expect("static regex"));
static CHANGESET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^\w\[])(?:changeset:|r|\[)([0-9]+)\]?").expect("static regex")
});
static TICKET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|[^\w&/])(?:#|ticket:)([0-9]+)\b").expect("static regex")
});
static ATTACHMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[attachment:([^\s\]]+)[^\]]*\]|attachment:([^\s\]]+)").expect("static regex")
});
static INTERWIKI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[\s(])([A-Za-z][\w.-]*):([^\s\]|,;)]+)").expect("static regex")
});

/// InterMap table: prefix (lowercase) to URL pattern.
///
/// Patterns may reference the link target with `$1`; otherwise the target
/// is appended.
#[derive(Debug, Clone, Default)]
pub struct InterMap {
    prefixes: HashMap<String, String>,
}

impl InterMap {
    /// Parses the `InterMapTxt` wiki page. Lines that do not look like
    /// `PREFIX URL [# comment]` are ignored.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let prefixes = text
            .lines()
            .filter_map(|line| INTERMAP_LINE.captures(line))
            .filter(|caps| caps[2].starts_with("http://") || caps[2].starts_with("https://"))
            .map(|caps| (caps[1].to_lowercase(), caps[2].to_string()))
            .collect();
        Self { prefixes }
    }

    /// Builds the target URL for `prefix:target`, if the prefix is known.
    #[must_use]
    pub fn url(&self, prefix: &str, target: &str) -> Option<String> {
        let pattern = self.prefixes.get(&prefix.to_lowercase())?;
        if pattern.contains("$1") {
            Some(pattern.replace("$1", target))
        } else {
            Some(format!("{pattern}{target}"))
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

/// Trac wiki to Jira wiki renderer backed by an [`InterMap`].
#[derive(Debug, Clone, Default)]
pub struct WikiRenderer {
    intermap: InterMap,
}

impl WikiRenderer {
    #[must_use]
    pub fn new(intermap: InterMap) -> Self {
        Self { intermap }
    }

    fn render_prose(&self, text: &str, context: &RenderContext<'_>) -> String {
        let text = HEADING.replace_all(text, |caps: &Captures<'_>| {
            format!("h{}. {}", caps[1].len(), &caps[2])
        });
        let text = BOLD.replace_all(&text, "*$1*");
        let text = ITALIC.replace_all(&text, "_${1}_");

        let text = CHANGESET.replace_all(&text, |caps: &Captures<'_>| {
            let rev = &caps[2];
            match context.revisions.get(rev) {
                Some(ticket) => format!("{}r{rev} ([{}-{ticket}])", &caps[1], context.project),
                None => format!("{}r{rev}", &caps[1]),
            }
        });

        let text = TICKET.replace_all(&text, |caps: &Captures<'_>| {
            format!("{}[{}-{}]", &caps[1], context.project, &caps[2])
        });

        let text = if context.ticket.is_some() {
            ATTACHMENT.replace_all(&text, |caps: &Captures<'_>| {
                let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
                format!("[^{name}]")
            })
        } else {
            text
        };

        INTERWIKI
            .replace_all(&text, |caps: &Captures<'_>| {
                let (lead, prefix, target) = (&caps[1], &caps[2], &caps[3]);
                match self.intermap.url(prefix, target) {
                    Some(url) => format!("{lead}[{prefix}:{target}|{url}]"),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

impl MarkupRenderer for WikiRenderer {
    fn render(&self, text: &str, context: &RenderContext<'_>) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for caps in CODE_BLOCK.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&self.render_prose(&text[last..whole.start()], context));

            let code = &caps[1];
            if code.contains('\n') {
                out.push_str(&format!("{{noformat}}{}{{noformat}}", code.trim_matches('\n')));
            } else {
                out.push_str(&format!("{{{{{code}}}}}"));
            }
            last = whole.end();
        }

        out.push_str(&self.render_prose(&text[last..], context));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legacy::SourceTicket;

    const INTERMAP: &str = "= InterMapTxt =\n\
        ----\n\
        {{{\n\
        cldrbug https://tracker.example.com/browse/CLDR-$1 # CLDR bugs\n\
        PEP     https://peps.python.org/pep- # Python\n\
        notalink something\n\
        }}}\n";

    fn render(text: &str, ticket: Option<&SourceTicket>) -> String {
        let revisions = HashMap::from([("1234".to_string(), 100_u64)]);
        let renderer = WikiRenderer::new(InterMap::parse(INTERMAP));
        renderer.render(
            text,
            &RenderContext {
                ticket,
                project: "ICU",
                revisions: &revisions,
            },
        )
    }

    #[test]
    fn parses_intermap_prefixes() {
        let map = InterMap::parse(INTERMAP);
        assert_eq!(map.len(), 2);
        assert_eq!(
            map.url("CLDRBUG", "55").as_deref(),
            Some("https://tracker.example.com/browse/CLDR-55")
        );
        assert_eq!(map.url("pep", "8").as_deref(), Some("https://peps.python.org/pep-8"));
        assert_eq!(map.url("notalink", "x"), None);
    }

    #[test]
    fn links_ticket_references() {
        assert_eq!(render("see #12 and ticket:34", None), "see [ICU-12] and [ICU-34]");
        assert_eq!(render("&#12; stays", None), "&#12; stays");
    }

    #[test]
    fn resolves_changesets_through_revision_table() {
        assert_eq!(render("fixed in r1234", None), "fixed in r1234 ([ICU-100])");
        assert_eq!(render("see [999]", None), "see r999");
    }

    #[test]
    fn converts_interwiki_links() {
        assert_eq!(
            render("dup of cldrbug:55", None),
            "dup of [cldrbug:55|https://tracker.example.com/browse/CLDR-55]"
        );
        assert_eq!(render("unknown:55", None), "unknown:55");
    }

    #[test]
    fn converts_code_blocks_without_touching_their_content() {
        assert_eq!(
            render("before\n{{{\n#12 '''x'''\n}}}\nafter #13", None),
            "before\n{noformat}#12 '''x'''{noformat}\nafter [ICU-13]"
        );
        assert_eq!(render("inline {{{#1}}}", None), "inline {{#1}}");
    }

    #[test]
    fn converts_headings_and_emphasis() {
        assert_eq!(render("== Title ==", None), "h2. Title");
        assert_eq!(render("'''bold''' and ''it''", None), "*bold* and _it_");
    }

    #[test]
    fn links_attachments_only_inside_a_ticket() {
        let ticket = SourceTicket::default();
        assert_eq!(render("attachment:log.txt", Some(&ticket)), "[^log.txt]");
        assert_eq!(render("attachment:log.txt", None), "attachment:log.txt");
    }
}
