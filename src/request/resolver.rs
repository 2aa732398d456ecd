//! Ordered parameter resolution and tolerant typed parsing.
//!
//! Parsers never reject a request: anything malformed degrades to the
//! neutral value for its type.

use crate::request::raw::{RawRequest, RawValue};
use crate::request::source::{
    FormBodySource, NestedPayloadSource, ParamSource, QueryStringSource,
};
use regex::Regex;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static LIST_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s,]+").unwrap());

/// Resolves parameters across every transport the host forwards.
pub struct ParamResolver<'r> {
    request: &'r RawRequest,
    sources: Vec<Box<dyn ParamSource>>,
}

impl<'r> ParamResolver<'r> {
    pub fn new(request: &'r RawRequest) -> Self {
        Self {
            request,
            sources: vec![
                Box::new(QueryStringSource),
                Box::new(FormBodySource),
                Box::new(NestedPayloadSource),
            ],
        }
    }

    /// First source hit for `key`, in priority order.
    pub fn raw(&self, key: &str) -> Option<RawValue> {
        self.sources
            .iter()
            .find_map(|source| source.fetch(self.request, key))
    }

    /// Sanitized free text (tags stripped, whitespace collapsed).
    pub fn text(&self, key: &str) -> Option<String> {
        let value = self.raw(key)?;
        let text = sanitize_text(value.first()?);
        (!text.is_empty()).then_some(text)
    }

    /// Positive integer id list. Accepts comma or whitespace separated
    /// scalars and list values; junk entries drop out, order-preserving
    /// dedupe.
    pub fn ids(&self, key: &str) -> Vec<u64> {
        let Some(value) = self.raw(key) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for item in value.items() {
            for piece in LIST_SPLIT_RE.split(item) {
                if let Ok(id) = piece.trim().parse::<u64>() {
                    if id > 0 && !out.contains(&id) {
                        out.push(id);
                    }
                }
            }
        }
        out
    }

    /// Slug list, sanitized and deduped.
    pub fn slugs(&self, key: &str) -> Vec<String> {
        let Some(value) = self.raw(key) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for item in value.items() {
            for piece in LIST_SPLIT_RE.split(item) {
                let slug = sanitize_slug(piece);
                if !slug.is_empty() && !out.contains(&slug) {
                    out.push(slug);
                }
            }
        }
        out
    }

    /// A single sanitized key name (lowercase `[a-z0-9_-]`).
    pub fn key_name(&self, key: &str) -> Option<String> {
        let value = self.raw(key)?;
        let name = sanitize_key(value.first()?);
        (!name.is_empty()).then_some(name)
    }

    /// A list of sanitized key names.
    pub fn key_names(&self, key: &str) -> Vec<String> {
        let Some(value) = self.raw(key) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for item in value.items() {
            let name = sanitize_key(item);
            if !name.is_empty() && !out.contains(&name) {
                out.push(name);
            }
        }
        out
    }

    /// A positive integer, first scalar form.
    pub fn number(&self, key: &str) -> Option<u64> {
        let value = self.raw(key)?;
        value
            .first()?
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
    }
}

/// Strip tags and control characters, collapse whitespace runs, trim.
pub fn sanitize_text(value: &str) -> String {
    let stripped = TAG_RE.replace_all(value, "");
    let mut out = String::with_capacity(stripped.len());
    let mut last_was_space = false;
    for c in stripped.chars() {
        if c.is_control() || c.is_whitespace() {
            if !last_was_space && !out.is_empty() {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out.trim_end().to_string()
}

/// Lowercase, keep only `[a-z0-9_-]`.
pub fn sanitize_key(value: &str) -> String {
    value
        .chars()
        .filter_map(|c| {
            let c = c.to_ascii_lowercase();
            (c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-').then_some(c)
        })
        .collect()
}

/// Slug form: tags stripped, lowercase, whitespace to dashes,
/// `[a-z0-9_-]` only, dash runs collapsed.
pub fn sanitize_slug(value: &str) -> String {
    let stripped = TAG_RE.replace_all(value, "");
    let mut out = String::with_capacity(stripped.len());
    for c in stripped.trim().chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
            out.push(c);
        } else if c.is_whitespace() || c == '-' {
            if !out.ends_with('-') && !out.is_empty() {
                out.push('-');
            }
        }
    }
    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_for(raw: &RawRequest) -> ParamResolver<'_> {
        ParamResolver::new(raw)
    }

    #[test]
    fn test_source_priority_query_wins() {
        let raw = RawRequest::new()
            .query_pair("gm2_orderby", "title")
            .body_pair("gm2_orderby", "price");
        let resolver = resolver_for(&raw);
        assert_eq!(resolver.key_name("gm2_orderby"), Some("title".to_string()));
    }

    #[test]
    fn test_body_beats_nested_payload() {
        let raw = RawRequest::new()
            .body_pair("gm2_orderby", "date")
            .body_pair("settings", r#"{"gm2_orderby":"price"}"#);
        let resolver = resolver_for(&raw);
        assert_eq!(resolver.key_name("gm2_orderby"), Some("date".to_string()));
    }

    #[test]
    fn test_nested_payload_is_last_resort() {
        let raw = RawRequest::new().body_pair("settings", r#"{"gm2_orderby":"price"}"#);
        let resolver = resolver_for(&raw);
        assert_eq!(resolver.key_name("gm2_orderby"), Some("price".to_string()));
    }

    #[test]
    fn test_ids_tolerate_junk() {
        let raw = RawRequest::new().query_pair("gm2_include_posts", "3, 7 x 3 0 -2 9,9");
        let resolver = resolver_for(&raw);
        assert_eq!(resolver.ids("gm2_include_posts"), vec![3, 7, 9]);
    }

    #[test]
    fn test_ids_from_list_value() {
        let raw = RawRequest::new()
            .query_pair("gm2_exclude_posts[]", "5")
            .query_pair("gm2_exclude_posts[]", "8,5");
        let resolver = resolver_for(&raw);
        assert_eq!(resolver.ids("gm2_exclude_posts"), vec![5, 8]);
    }

    #[test]
    fn test_missing_key_yields_empty() {
        let raw = RawRequest::new();
        let resolver = resolver_for(&raw);
        assert!(resolver.ids("gm2_include_posts").is_empty());
        assert!(resolver.slugs("gm2_category_filter").is_empty());
        assert_eq!(resolver.text("s"), None);
        assert_eq!(resolver.number("paged"), None);
    }

    #[test]
    fn test_slugs_sanitize_and_dedupe() {
        let raw = RawRequest::new()
            .query_pair("gm2_category_filter", "Hoodies, blue shirts,hoodies,<b>Caps</b>");
        let resolver = resolver_for(&raw);
        assert_eq!(
            resolver.slugs("gm2_category_filter"),
            vec!["hoodies", "blue", "shirts", "caps"]
        );
    }

    #[test]
    fn test_sanitize_text_strips_markup() {
        assert_eq!(sanitize_text("<script>x</script>blue  shirt "), "xblue shirt");
        assert_eq!(sanitize_text("a\tb\r\nc"), "a b c");
        assert_eq!(sanitize_text("<p></p>"), "");
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("Past_Week"), "past_week");
        assert_eq!(sanitize_key("DROP TABLE;"), "droptable");
        assert_eq!(sanitize_key("price!"), "price");
    }

    #[test]
    fn test_sanitize_slug() {
        assert_eq!(sanitize_slug("Blue Shirts"), "blue-shirts");
        assert_eq!(sanitize_slug("  -- weird -- "), "weird");
        assert_eq!(sanitize_slug("café"), "caf");
    }

    #[test]
    fn test_number_rejects_zero_and_junk() {
        let raw = RawRequest::new()
            .query_pair("paged", "0")
            .query_pair("page", "2nd")
            .query_pair("e-search-page", " 4 ");
        let resolver = resolver_for(&raw);
        assert_eq!(resolver.number("paged"), None);
        assert_eq!(resolver.number("page"), None);
        assert_eq!(resolver.number("e-search-page"), Some(4));
    }
}
