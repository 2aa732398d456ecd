//! Raw transport data: decoded query and body pairs, slash normalization.

use url::form_urlencoded;

/// A resolved parameter value: scalar text or a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Text(String),
    List(Vec<String>),
}

impl RawValue {
    /// First scalar form of the value.
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::List(items) => items.first().map(String::as_str),
        }
    }

    /// All scalar forms of the value.
    pub fn items(&self) -> Vec<&str> {
        match self {
            Self::Text(s) => vec![s.as_str()],
            Self::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

/// Decoded request surface handed to parameter sources.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    query_pairs: Vec<(String, String)>,
    body_pairs: Vec<(String, String)>,
}

impl RawRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a URL query string and an optional form-encoded body.
    pub fn from_parts(query_string: &str, form_body: Option<&str>) -> Self {
        Self {
            query_pairs: decode_pairs(query_string),
            body_pairs: form_body.map(decode_pairs).unwrap_or_default(),
        }
    }

    /// Append an already-decoded URL query pair.
    pub fn query_pair(mut self, key: &str, value: &str) -> Self {
        self.query_pairs.push((key.to_string(), value.to_string()));
        self
    }

    /// Append an already-decoded body pair.
    pub fn body_pair(mut self, key: &str, value: &str) -> Self {
        self.body_pairs.push((key.to_string(), value.to_string()));
        self
    }

    pub(crate) fn query_pairs(&self) -> &[(String, String)] {
        &self.query_pairs
    }

    pub(crate) fn body_pairs(&self) -> &[(String, String)] {
        &self.body_pairs
    }
}

fn decode_pairs(encoded: &str) -> Vec<(String, String)> {
    let trimmed = encoded.trim_start_matches('?');
    form_urlencoded::parse(trimmed.as_bytes())
        .into_owned()
        .collect()
}

/// Remove one level of backslash escaping, as transports that quote
/// forwarded parameters add it.
pub fn unslash(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
