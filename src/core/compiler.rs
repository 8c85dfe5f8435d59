//! WF-002: Delimiter/directive compiler.
//!
//! Turns the configured tag pairs and the registered data keys into the three
//! matchers used while resolving a document:
//!
//! - **transform**: `include(<arg>)`, `slot`, `layout(<arg>)` and `!layout`
//!   in directive tags, or a registered data key in data tags. Drives the
//!   main scan.
//! - **layout**: `layout(<arg>)` or `!layout`, consulted once at bootstrap.
//! - **skip**: bare `skip`, consulted once at bootstrap.
//!
//! Every matcher is case-insensitive and `\s` spans line breaks, so a
//! directive may be split across lines inside its delimiters.

use super::types::{ComposeError, Tags};
use regex::{Captures, Regex};
use std::ops::Range;

/// Directive keywords. Never treated as data keys when both tag pairs coincide.
pub const DIRECTIVE_KEYWORDS: [&str; 5] = ["skip", "slot", "layout", "include", "!layout"];

/// A directive decided once per match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// A registered data key, as written in the source.
    Data(String),
    /// `include(<path>)`, argument unquoted.
    Include(String),
    /// `layout(<path>)`, argument unquoted.
    Layout(String),
    /// `!layout`
    NonLayout,
    /// `slot`
    Slot,
    /// `skip`
    Skip,
}

/// A directive located in a source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    pub range: Range<usize>,
    pub directive: Directive,
}

impl Found {
    /// The literal directive text, delimiters included.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.range.clone()]
    }
}

/// The compiled matchers for one tag/data-key configuration.
#[derive(Debug, Clone)]
pub struct Matchers {
    transform: Regex,
    layout: Regex,
    skip: Regex,
}

const INCLUDE: &str = "include";
const LAYOUT: &str = "layout";
const NONLAYOUT: &str = "nonlayout";
const SLOT: &str = "slot";
const DATA: &str = "data";

impl Matchers {
    /// Compile the matchers. Data keys are deduplicated case-insensitively;
    /// when the tag pairs coincide, directive keywords are dropped from them.
    pub fn compile<'a, I>(tags: &Tags, keys: I) -> Result<Self, ComposeError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        validate_tags(tags)?;

        let open = regex::escape(&tags.directive[0]);
        let close = regex::escape(&tags.directive[1]);
        let arg = r"\s*\(\s*(?P<{name}>[^()]+?)\s*\)";
        let include_arg = arg.replace("{name}", INCLUDE);
        let layout_arg = arg.replace("{name}", LAYOUT);

        let mut transform = format!(
            r"(?i){open}\s*(?:include{include_arg}|(?P<{SLOT}>slot)|layout{layout_arg}|(?P<{NONLAYOUT}>!layout))\s*{close}"
        );

        let keys = data_keys(tags, keys);
        if !keys.is_empty() {
            let alternation = keys
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            transform.push_str(&format!(
                r"|{}\s*(?P<{DATA}>{alternation})\s*{}",
                regex::escape(&tags.data[0]),
                regex::escape(&tags.data[1]),
            ));
        }

        let layout =
            format!(r"(?i){open}\s*(?:layout{layout_arg}|(?P<{NONLAYOUT}>!layout))\s*{close}");
        let skip = format!(r"(?i){open}\s*skip\s*{close}");

        Ok(Self {
            transform: Regex::new(&transform)?,
            layout: Regex::new(&layout)?,
            skip: Regex::new(&skip)?,
        })
    }

    /// Find the next transform directive at or after byte offset `from`.
    pub fn next_directive(&self, source: &str, from: usize) -> Option<Found> {
        let mut start = from;
        while let Some(caps) = self.transform.captures_at(source, start) {
            if let Some(hit) = found(&caps) {
                return Some(hit);
            }
            start = caps.get(0).map_or(source.len(), |m| m.end());
        }
        None
    }

    /// The layout directive in effect for `source`: the last one wins.
    pub fn layout_directive(&self, source: &str) -> Option<Found> {
        self.layout
            .captures_iter(source)
            .filter_map(|caps| found(&caps))
            .last()
    }

    /// Whether `source` opts out of all processing.
    pub fn has_skip(&self, source: &str) -> bool {
        self.skip.is_match(source)
    }
}

fn validate_tags(tags: &Tags) -> Result<(), ComposeError> {
    for (name, pair) in [("data", &tags.data), ("directive", &tags.directive)] {
        if pair.iter().any(|t| t.is_empty()) {
            return Err(ComposeError::Tags(format!(
                "{name} delimiters must not be empty"
            )));
        }
    }
    Ok(())
}

/// Normalize the data keys: lower-case, drop empties and duplicates, drop
/// directive keywords when tags coincide, longest first.
fn data_keys<'a, I>(tags: &Tags, keys: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let coincide = tags.coincide();
    let mut out: Vec<String> = Vec::new();
    for key in keys {
        let key = key.trim().to_lowercase();
        if key.is_empty() || out.contains(&key) {
            continue;
        }
        if coincide && DIRECTIVE_KEYWORDS.contains(&key.as_str()) {
            continue;
        }
        out.push(key);
    }
    out.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    out
}

/// Decide the directive for a match. An argument that is empty once
/// unquoted makes the match plain text.
fn found(caps: &Captures<'_>) -> Option<Found> {
    let whole = caps.get(0).map(|m| m.range()).unwrap_or_default();
    let directive = if let Some(m) = caps.name(INCLUDE) {
        Directive::Include(argument(m.as_str())?)
    } else if let Some(m) = caps.name(LAYOUT) {
        Directive::Layout(argument(m.as_str())?)
    } else if caps.name(NONLAYOUT).is_some() {
        Directive::NonLayout
    } else if caps.name(SLOT).is_some() {
        Directive::Slot
    } else if let Some(m) = caps.name(DATA) {
        Directive::Data(m.as_str().to_string())
    } else {
        Directive::Skip
    };
    Some(Found {
        range: whole,
        directive,
    })
}

fn argument(raw: &str) -> Option<String> {
    let arg = unquote(raw.trim()).trim();
    (!arg.is_empty()).then(|| arg.to_string())
}

/// Strip one pair of matching quotes.
fn unquote(arg: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = arg
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    arg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matchers(keys: &[&str]) -> Matchers {
        Matchers::compile(&Tags::default(), keys.iter().copied()).unwrap()
    }

    #[test]
    fn test_wf002_include() {
        let m = matchers(&[]);
        let src = "a<!-- include(part.html) -->b";
        let found = m.next_directive(src, 0).unwrap();
        assert_eq!(found.directive, Directive::Include("part.html".into()));
        assert_eq!(found.text(src), "<!-- include(part.html) -->");
        assert_eq!(found.range, 1..28);
    }

    #[test]
    fn test_wf002_include_compact_and_quoted() {
        let m = matchers(&[]);
        let found = m.next_directive("<!--include('a b.html')-->", 0).unwrap();
        assert_eq!(found.directive, Directive::Include("a b.html".into()));
        let found = m.next_directive("<!--INCLUDE( \"x.html\" )-->", 0).unwrap();
        assert_eq!(found.directive, Directive::Include("x.html".into()));
    }

    #[test]
    fn test_wf002_include_empty_arg_is_not_a_directive() {
        let m = matchers(&[]);
        assert!(m.next_directive("<!-- include() -->", 0).is_none());
        assert!(m.next_directive(r#"a<!-- include("") -->b"#, 0).is_none());
        assert!(m.next_directive("a<!-- include('  ') -->b", 0).is_none());
        assert!(m.next_directive("a<!-- include( ) -->b", 0).is_none());
        assert!(m.layout_directive(r#"<!-- layout("") -->"#).is_none());
        assert!(m.layout_directive("<!-- layout( ) -->").is_none());

        // Scanning continues past the empty one
        let found = m
            .next_directive("<!-- include( ) --><!-- include(a.html) -->", 0)
            .unwrap();
        assert_eq!(found.directive, Directive::Include("a.html".into()));
        assert_eq!(found.range.start, 19);

        // An empty layout does not shadow an earlier real one
        let found = m
            .layout_directive(r#"<!-- layout(base.html) --><!-- layout("") -->"#)
            .unwrap();
        assert_eq!(found.directive, Directive::Layout("base.html".into()));
    }

    #[test]
    fn test_wf002_slot_case_insensitive_multiline() {
        let m = matchers(&[]);
        let found = m.next_directive("x<!--\n  SLOT\n-->", 0).unwrap();
        assert_eq!(found.directive, Directive::Slot);
    }

    #[test]
    fn test_wf002_plain_comment_ignored() {
        let m = matchers(&["name"]);
        assert!(m.next_directive("<!-- slotted -->", 0).is_none());
        assert!(m.next_directive("<!-- a comment -->", 0).is_none());
    }

    #[test]
    fn test_wf002_data_key() {
        let m = matchers(&["Name", "title"]);
        let found = m.next_directive("hi {{ NAME }}!", 0).unwrap();
        assert_eq!(found.directive, Directive::Data("NAME".into()));
        assert_eq!(found.range, 3..13);
    }

    #[test]
    fn test_wf002_unknown_key_not_matched() {
        let m = matchers(&["name"]);
        assert!(m.next_directive("{{ other }}", 0).is_none());
    }

    #[test]
    fn test_wf002_prefix_keys() {
        let m = matchers(&["a", "ab"]);
        let found = m.next_directive("{{ab}}", 0).unwrap();
        assert_eq!(found.directive, Directive::Data("ab".into()));
    }

    #[test]
    fn test_wf002_keys_escaped() {
        let m = matchers(&["a.b"]);
        assert!(m.next_directive("{{a.b}}", 0).is_some());
        assert!(m.next_directive("{{axb}}", 0).is_none());
    }

    #[test]
    fn test_wf002_next_from_offset() {
        let m = matchers(&["x"]);
        let src = "{{x}}--{{x}}";
        let first = m.next_directive(src, 0).unwrap();
        let second = m.next_directive(src, first.range.end).unwrap();
        assert_eq!(second.range, 7..12);
        assert!(m.next_directive(src, second.range.end).is_none());
    }

    #[test]
    fn test_wf002_layout_last_wins() {
        let m = matchers(&[]);
        let src = "<!-- layout(a.html) --><!-- layout(b.html) -->";
        let found = m.layout_directive(src).unwrap();
        assert_eq!(found.directive, Directive::Layout("b.html".into()));
        let src = "<!-- layout(a.html) --><!-- !layout -->";
        assert_eq!(m.layout_directive(src).unwrap().directive, Directive::NonLayout);
    }

    #[test]
    fn test_wf002_transform_matches_layout_for_stripping() {
        let m = matchers(&[]);
        let found = m.next_directive("<!-- !layout -->", 0).unwrap();
        assert_eq!(found.directive, Directive::NonLayout);
        let found = m.next_directive("<!-- layout(x.html) -->", 0).unwrap();
        assert_eq!(found.directive, Directive::Layout("x.html".into()));
    }

    #[test]
    fn test_wf002_skip() {
        let m = matchers(&[]);
        assert!(m.has_skip("head <!-- SKIP --> tail"));
        assert!(!m.has_skip("<!-- skipped -->"));
        assert!(m.has_skip("ab<!--\nskip\n-->"));
        assert!(m.next_directive("<!-- skip -->", 0).is_none());
    }

    #[test]
    fn test_wf002_coinciding_tags_exclude_keywords() {
        let tags = Tags::new(("{{", "}}"), ("{{", "}}"));
        let m = Matchers::compile(&tags, ["slot", "include", "name"]).unwrap();
        assert_eq!(m.next_directive("{{ slot }}", 0).unwrap().directive, Directive::Slot);
        assert_eq!(
            m.next_directive("{{ name }}", 0).unwrap().directive,
            Directive::Data("name".into())
        );
        assert_eq!(
            m.next_directive("{{ include(a.html) }}", 0).unwrap().directive,
            Directive::Include("a.html".into())
        );
    }

    #[test]
    fn test_wf002_custom_tags_escaped() {
        let tags = Tags::new(("[[", "]]"), ("<%", "%>"));
        let m = Matchers::compile(&tags, ["v"]).unwrap();
        assert_eq!(
            m.next_directive("<% include(a) %>", 0).unwrap().directive,
            Directive::Include("a".into())
        );
        assert_eq!(
            m.next_directive("[[v]]", 0).unwrap().directive,
            Directive::Data("v".into())
        );
        assert!(m.next_directive("{{v}}", 0).is_none());
    }

    #[test]
    fn test_wf002_empty_tags_rejected() {
        let tags = Tags::new(("", "}}"), ("<!--", "-->"));
        let err = Matchers::compile(&tags, ["x"]).unwrap_err();
        assert!(matches!(err, ComposeError::Tags(_)));
    }

    #[test]
    fn test_wf002_data_keys_normalized() {
        let keys = data_keys(&Tags::default(), ["b", "B", "", "abc", "slot"]);
        assert_eq!(keys, vec!["slot", "abc", "b"]);
    }
}
