//! Syntactic extraction of `define` and `template` tags.
//!
//! The composition pass only needs to see two tag shapes:
//!
//! - `{{ define "name" }}` - declares a named sub-template block
//! - `{{ template "target" }}` - references another template by name or by
//!   root-relative file path
//!
//! Matching is regex-based and tolerant of optional whitespace inside the
//! delimiters, with an optional trailing token after the quoted name
//! (historically a context expression; ignored here). This is a lightweight
//! lexer, not a grammar parser: tag-shaped text inside strings or comments
//! will be matched too. The full grammar is handled later by
//! [`unit`](crate::unit) when the composed sources are compiled.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static DEFINE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\{\{ ?define "([^"]*)" ?"?([a-zA-Z0-9]*)?"? ?\}\}"#).unwrap());

static TEMPLATE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\{\{ ?template "([^"]*)" ?([^ ]*)? ?\}\}"#).unwrap());

/// A single matched tag: the captured name and the ignored trailing token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    /// The quoted name captured from the tag.
    pub name: &'a str,
    /// Optional trailing token (context/pipeline expression). Unused by
    /// composition, surfaced for completeness.
    pub arg: Option<&'a str>,
}

fn tag_from_captures<'a>(caps: Captures<'a>) -> Tag<'a> {
    Tag {
        name: caps.get(1).map_or("", |m| m.as_str()),
        arg: caps.get(2).map(|m| m.as_str()).filter(|s| !s.is_empty()),
    }
}

/// Lazily yields every `define` tag in the source, in match order.
pub fn define_tags(src: &str) -> impl Iterator<Item = Tag<'_>> {
    DEFINE_TAG.captures_iter(src).map(tag_from_captures)
}

/// Lazily yields every `template` tag in the source, in match order.
pub fn template_tags(src: &str) -> impl Iterator<Item = Tag<'_>> {
    TEMPLATE_TAG.captures_iter(src).map(tag_from_captures)
}

/// Rewrites `define` tags in the source.
///
/// `rename` is called with each captured define name in match order; when
/// it returns `Some(new_name)` the whole tag is replaced with
/// `{{ define "new_name" }}`, otherwise the tag is left untouched.
pub fn rewrite_defines(src: &str, mut rename: impl FnMut(&str) -> Option<String>) -> String {
    DEFINE_TAG
        .replace_all(src, |caps: &Captures| {
            let name = caps.get(1).map_or("", |m| m.as_str());
            match rename(name) {
                Some(new_name) => format!("{{{{ define \"{}\" }}}}", new_name),
                None => caps.get(0).map_or("", |m| m.as_str()).to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_tag_basic() {
        let tags: Vec<_> = define_tags(r#"{{ define "title" }}Hi{{ end }}"#).collect();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "title");
        assert!(tags[0].arg.is_none());
    }

    #[test]
    fn test_define_tag_whitespace_tolerance() {
        let tags: Vec<_> = define_tags(r#"{{define "title"}}"#).collect();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "title");
    }

    #[test]
    fn test_template_tag_with_path_target() {
        let tags: Vec<_> = template_tags(r#"{{ template "partials/nav.html" }}"#).collect();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "partials/nav.html");
    }

    #[test]
    fn test_template_tag_trailing_token_captured_but_separate() {
        let tags: Vec<_> = template_tags(r#"{{ template "row" .item }}"#).collect();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "row");
        assert_eq!(tags[0].arg, Some(".item"));
    }

    #[test]
    fn test_multiple_tags_in_match_order() {
        let src = r#"{{ template "a.html" }}mid{{ template "b" }}"#;
        let names: Vec<_> = template_tags(src).map(|t| t.name).collect();
        assert_eq!(names, vec!["a.html", "b"]);
    }

    #[test]
    fn test_non_tag_braces_ignored() {
        assert_eq!(template_tags("{{ .title }} plain {{ end }}").count(), 0);
        assert_eq!(define_tags("{{ .title }}").count(), 0);
    }

    #[test]
    fn test_rewrite_keeps_unselected_tags() {
        let src = r#"{{ define "a" }}x{{ end }}{{ define "b" }}y{{ end }}"#;
        let out = rewrite_defines(src, |name| {
            (name == "b").then(|| "b__shadowed_1".to_string())
        });
        assert!(out.contains(r#"{{ define "a" }}"#));
        assert!(out.contains(r#"{{ define "b__shadowed_1" }}"#));
        assert!(!out.contains(r#"{{ define "b" }}"#));
    }

    #[test]
    fn test_rewrite_preserves_surrounding_text() {
        let src = r#"before {{ define "x" }}body{{ end }} after"#;
        let out = rewrite_defines(src, |_| Some("y".to_string()));
        assert_eq!(out, r#"before {{ define "y" }}body{{ end }} after"#);
    }
}
