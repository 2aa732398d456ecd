//! Keep the active search state on pagination links, whichever mechanism
//! the host renders them through.
//!
//! Three entry points share one strip-then-append core:
//! structured argument maps ([`merge_args`]), rendered markup
//! ([`rewrite_markup`]), and placeholder-bearing base templates
//! ([`rewrite_template_base`]). Stripping first makes every rewrite
//! idempotent: stale copies of plugin keys never survive.

use crate::query::spec::{keys, QuerySpec};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::debug;
use url::form_urlencoded;

static LINK_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(href|data-[a-z0-9-]*(?:href|url|link))\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .unwrap()
});

// Group numbering matches LINK_ATTR_RE (1 name, 2 double, 3 single) so
// `quoted_value` serves both passes.
static DATA_SETTINGS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(data-settings)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// Markers that protect the host's pagination placeholders while the URL
/// goes through a parse/rebuild cycle.
const PAGE_PLACEHOLDER: &str = "%#%";
const BASE_PLACEHOLDER: &str = "%_%";
const PAGE_TOKEN: &str = "gm2-page-token-9f4e";
const BASE_TOKEN: &str = "gm2-base-token-9f4e";

/// Whether a key (including `key[]` and `key[0]` forms) belongs to the
/// persisted plugin namespace.
pub fn is_plugin_key(key: &str) -> bool {
    let base = key.split('[').next().unwrap_or(key);
    keys::PERSISTED.contains(&base)
}

/// Strip the plugin key namespace from a URL's query, then append
/// `args`. Everything else, including the host's own paging parameters
/// and any fragment, survives.
pub fn upsert_query_args(url: &str, args: &[(String, String)]) -> String {
    let (without_fragment, fragment) = match url.split_once('#') {
        Some((head, frag)) => (head, Some(frag)),
        None => (url, None),
    };
    let (base, query) = match without_fragment.split_once('?') {
        Some((base, query)) => (base, query),
        None => (without_fragment, ""),
    };

    let mut pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .filter(|(key, _)| !is_plugin_key(key))
        .collect();
    pairs.extend(args.iter().cloned());

    let mut out = base.to_string();
    if !pairs.is_empty() {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        out.push('?');
        out.push_str(&serializer.finish());
    }
    if let Some(frag) = fragment {
        out.push('#');
        out.push_str(frag);
    }
    out
}

/// Carry the spec's wire args onto a plain URL. No-op without args.
pub fn append_current_args(url: &str, spec: &QuerySpec) -> String {
    let args = spec.wire_args();
    if args.is_empty() {
        return url.to_string();
    }
    upsert_query_args(url, &args)
}

/// Merge the spec's wire args into a host-provided add-on argument map.
/// Plugin keys are always replaced with current state; foreign keys are
/// preserved.
pub fn merge_args(existing: Vec<(String, String)>, spec: &QuerySpec) -> Vec<(String, String)> {
    let ours = spec.wire_args();
    if ours.is_empty() {
        return existing;
    }
    let mut merged: Vec<(String, String)> = existing
        .into_iter()
        .filter(|(key, _)| !is_plugin_key(key))
        .collect();
    merged.extend(ours);
    merged
}

/// Rewrite every link-bearing attribute in rendered pagination markup,
/// plus URL values inside `data-settings` JSON blobs.
pub fn rewrite_markup(html: &str, spec: &QuerySpec) -> String {
    let args = spec.wire_args();
    if args.is_empty() {
        return html.to_string();
    }

    let pass1 = LINK_ATTR_RE.replace_all(html, |caps: &Captures<'_>| {
        let name = &caps[1];
        let (quote, value) = quoted_value(caps);
        if value.is_empty() || value.starts_with('#') {
            return caps[0].to_string();
        }
        let rewritten = upsert_query_args(&decode_entities(value), &args);
        format!("{name}={quote}{}{quote}", encode_entities(&rewritten))
    });

    DATA_SETTINGS_RE
        .replace_all(&pass1, |caps: &Captures<'_>| {
            let name = &caps[1];
            let (quote, value) = quoted_value(caps);
            match rewrite_settings_json(&decode_entities(value), &args) {
                Some(rewritten) => {
                    format!("{name}={quote}{}{quote}", encode_entities(&rewritten))
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Rewrite a pagination base template, protecting the host's page-number
/// and format placeholders through the parse/rebuild cycle.
pub fn rewrite_template_base(base: &str, spec: &QuerySpec) -> String {
    let args = spec.wire_args();
    if args.is_empty() {
        return base.to_string();
    }
    let masked = base
        .replace(PAGE_PLACEHOLDER, PAGE_TOKEN)
        .replace(BASE_PLACEHOLDER, BASE_TOKEN);
    upsert_query_args(&decode_entities(&masked), &args)
        .replace(PAGE_TOKEN, PAGE_PLACEHOLDER)
        .replace(BASE_TOKEN, BASE_PLACEHOLDER)
}

fn quoted_value<'c>(caps: &'c Captures<'_>) -> (char, &'c str) {
    match caps.get(2) {
        Some(m) => ('"', m.as_str()),
        None => ('\'', caps.get(3).map(|m| m.as_str()).unwrap_or("")),
    }
}

/// Parse a settings blob and rewrite its URL-shaped string values.
/// Returns `None` when the blob is not JSON, leaving it untouched.
fn rewrite_settings_json(raw: &str, args: &[(String, String)]) -> Option<String> {
    let mut value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            debug!(%err, "data-settings blob is not JSON, leaving as-is");
            return None;
        }
    };
    rewrite_json_urls(&mut value, args);
    serde_json::to_string(&value).ok()
}

fn rewrite_json_urls(value: &mut serde_json::Value, args: &[(String, String)]) {
    match value {
        serde_json::Value::String(s) => {
            if looks_like_url(s) {
                *s = upsert_query_args(s, args);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                rewrite_json_urls(item, args);
            }
        }
        serde_json::Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                rewrite_json_urls(item, args);
            }
        }
        _ => {}
    }
}

/// URL-shaped settings value: carries a scheme, path, or query marker
/// anywhere in the string. Relative forms like `index.php?paged=2`
/// count.
fn looks_like_url(s: &str) -> bool {
    s.contains(':') || s.contains('/') || s.contains('?')
}

/// Decode the HTML entities that appear in attribute values. Single
/// left-to-right scan, so already-decoded text never double-decodes.
fn decode_entities(value: &str) -> String {
    const ENTITIES: [(&str, char); 9] = [
        ("&quot;", '"'),
        ("&apos;", '\''),
        ("&#034;", '"'),
        ("&#039;", '\''),
        ("&#038;", '&'),
        ("&#38;", '&'),
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
    ];
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match ENTITIES
            .iter()
            .find(|(entity, _)| rest.starts_with(entity))
        {
            Some((entity, replacement)) => {
                out.push(*replacement);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Encode a value for an HTML attribute, either quote style.
fn encode_entities(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
