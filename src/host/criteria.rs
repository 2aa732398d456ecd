//! The live query object hosts hand to each injection phase, plus paging.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Sort dimension for catalog queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Relevance,
    Date,
    Title,
    Price,
    Rand,
}

impl SortField {
    /// Parse a wire value. Unknown values are rejected, not coerced.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "relevance" => Some(Self::Relevance),
            "date" => Some(Self::Date),
            "title" => Some(Self::Title),
            "price" => Some(Self::Price),
            "rand" => Some(Self::Rand),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::Date => "date",
            Self::Title => "title",
            Self::Price => "price",
            Self::Rand => "rand",
        }
    }
}

/// Sort direction, uppercase on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Whether a term constraint keeps or removes matching records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermOperator {
    In,
    NotIn,
}

/// One taxonomy constraint on a query.
#[derive(Debug, Clone, PartialEq)]
pub struct TermFilter {
    pub taxonomy: String,
    pub term_ids: Vec<u64>,
    pub operator: TermOperator,
}

/// A host query in flight.
///
/// Hosts construct one of these per catalog query and give the injection
/// layer a chance to mutate it before execution. `is_main` marks the
/// request's designated primary listing query.
#[derive(Debug, Clone)]
pub struct QueryCriteria {
    pub record_types: Vec<String>,
    pub search_term: Option<String>,
    pub include_ids: Vec<u64>,
    pub exclude_ids: Vec<u64>,
    pub term_filters: Vec<TermFilter>,
    /// Keep only records published on or after this instant.
    pub published_after: Option<DateTime<Utc>>,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub page: u32,
    pub per_page: u32,
    pub is_main: bool,
    pub is_search: bool,
    pub correlation_id: Option<String>,
}

impl Default for QueryCriteria {
    fn default() -> Self {
        Self {
            record_types: Vec::new(),
            search_term: None,
            include_ids: Vec::new(),
            exclude_ids: Vec::new(),
            term_filters: Vec::new(),
            published_after: None,
            sort_field: SortField::Date,
            sort_direction: SortDirection::Desc,
            page: 1,
            per_page: 10,
            is_main: false,
            is_search: false,
            correlation_id: None,
        }
    }
}

impl QueryCriteria {
    /// A main search query, as a host builds one from a search request.
    pub fn main_search(term: &str) -> Self {
        Self {
            search_term: Some(term.to_string()),
            is_main: true,
            is_search: true,
            ..Self::default()
        }
    }

    pub fn targets_record_type(&self, record_type: &str) -> bool {
        self.record_types.iter().any(|t| t == record_type)
    }
}

/// One page of results with totals.
#[derive(Debug, Clone)]
pub struct ResultPage<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub total_pages: u32,
    pub page: u32,
    pub per_page: u32,
}

impl<T> ResultPage<T> {
    pub fn empty(page: u32, per_page: u32) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            total_pages: 0,
            page,
            per_page,
        }
    }
}
