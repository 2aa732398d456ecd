//! Parameter sources, probed in priority order.
//!
//! A key can arrive as a URL query parameter, a flat form-body field, or
//! buried inside a serialized payload field that the host's async bridge
//! forwards verbatim. Each transport gets one adapter; the resolver walks
//! them in order and the first hit wins.

use crate::request::raw::{unslash, RawRequest, RawValue};
use serde_json::Value;
use tracing::{debug, warn};
use url::form_urlencoded;

/// Body fields that may carry a nested payload of forwarded parameters.
pub const NESTED_PAYLOAD_FIELDS: [&str; 4] = ["settings", "data", "actions", "payload"];

/// How deep a nested payload is probed. Each decoded container or
/// embedded string counts one level.
pub const MAX_NESTED_DEPTH: usize = 6;

/// Payloads larger than this many bytes are skipped outright.
pub const MAX_NESTED_BYTES: usize = 20_000;

/// One transport-specific view over the raw request.
pub trait ParamSource: Send + Sync {
    fn fetch(&self, request: &RawRequest, key: &str) -> Option<RawValue>;
}

/// URL query string parameters.
pub struct QueryStringSource;

impl ParamSource for QueryStringSource {
    fn fetch(&self, request: &RawRequest, key: &str) -> Option<RawValue> {
        lookup_pairs(request.query_pairs(), key)
    }
}

/// Flat form-encoded body fields.
pub struct FormBodySource;

impl ParamSource for FormBodySource {
    fn fetch(&self, request: &RawRequest, key: &str) -> Option<RawValue> {
        lookup_pairs(request.body_pairs(), key)
    }
}

/// Serialized payload fields inside the body.
pub struct NestedPayloadSource;

impl ParamSource for NestedPayloadSource {
    fn fetch(&self, request: &RawRequest, key: &str) -> Option<RawValue> {
        for field in NESTED_PAYLOAD_FIELDS {
            let Some((_, payload)) = request
                .body_pairs()
                .iter()
                .find(|(k, _)| k == field)
            else {
                continue;
            };
            if payload.len() > MAX_NESTED_BYTES {
                warn!(field, bytes = payload.len(), "skipping oversized nested payload");
                continue;
            }
            let payload = unslash(payload);
            if let Some(value) = probe_text(&payload, key, 0) {
                return Some(value);
            }
        }
        None
    }
}

/// Match pairs by `key` or `key[]`. Bracket form and repetition both
/// produce a list.
fn lookup_pairs(pairs: &[(String, String)], key: &str) -> Option<RawValue> {
    let bracket = format!("{key}[]");
    let mut values = Vec::new();
    let mut listy = false;
    for (k, v) in pairs {
        if k == key {
            values.push(unslash(v));
        } else if *k == bracket {
            listy = true;
            values.push(unslash(v));
        }
    }
    match (values.len(), listy) {
        (0, _) => None,
        (1, false) => values.pop().map(RawValue::Text),
        _ => Some(RawValue::List(values)),
    }
}

/// Probe a serialized fragment for `key`: JSON object/array, or a
/// query-string fragment whose values may nest further.
fn probe_text(text: &str, key: &str, depth: usize) -> Option<RawValue> {
    if depth >= MAX_NESTED_DEPTH {
        return None;
    }
    let trimmed = text.trim();
    if looks_like_json(trimmed) {
        return match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => probe_value(&value, key, depth + 1),
            Err(err) => {
                debug!(%err, "nested payload is not valid JSON");
                None
            }
        };
    }
    if trimmed.contains('=') {
        let pairs: Vec<(String, String)> = form_urlencoded::parse(trimmed.as_bytes())
            .into_owned()
            .collect();
        if let Some(hit) = lookup_pairs(&pairs, key) {
            return Some(hit);
        }
        for (_, value) in &pairs {
            if let Some(hit) = probe_text(value, key, depth + 1) {
                return Some(hit);
            }
        }
    }
    None
}

fn looks_like_json(text: &str) -> bool {
    (text.starts_with('{') && text.ends_with('}'))
        || (text.starts_with('[') && text.ends_with(']'))
}

/// Depth-first search through a decoded JSON value. A direct key hit on
/// an object wins; otherwise descend, re-probing embedded strings.
fn probe_value(value: &Value, key: &str, depth: usize) -> Option<RawValue> {
    if depth >= MAX_NESTED_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => {
            if let Some(hit) = map.get(key).and_then(scalarize) {
                return Some(hit);
            }
            for child in map.values() {
                if let Some(hit) = descend(child, key, depth) {
                    return Some(hit);
                }
            }
            None
        }
        Value::Array(items) => {
            for child in items {
                if let Some(hit) = descend(child, key, depth) {
                    return Some(hit);
                }
            }
            None
        }
        _ => None,
    }
}

fn descend(child: &Value, key: &str, depth: usize) -> Option<RawValue> {
    match child {
        Value::String(s) => probe_text(s, key, depth + 1),
        Value::Object(_) | Value::Array(_) => probe_value(child, key, depth + 1),
        _ => None,
    }
}

/// Convert a JSON leaf (or array of leaves) into a parameter value.
fn scalarize(value: &Value) -> Option<RawValue> {
    match value {
        Value::String(s) => Some(RawValue::Text(unslash(s))),
        Value::Number(n) => Some(RawValue::Text(n.to_string())),
        Value::Bool(b) => Some(RawValue::Text(b.to_string())),
        Value::Array(items) => {
            let scalars: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(unslash(s)),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                })
                .collect();
            if scalars.is_empty() {
                None
            } else {
                Some(RawValue::List(scalars))
            }
        }
        _ => None,
    }
}
