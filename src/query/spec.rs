//! The normalized query specification and its wire representation.

use crate::host::criteria::{SortDirection, SortField};
use chrono::{DateTime, Duration, Months, Utc};
use serde::Serialize;

/// Wire keys owned by this layer.
pub mod keys {
    /// Free-text search term (host convention).
    pub const SEARCH: &str = "s";
    /// Record type filter (host convention).
    pub const RECORD_TYPE: &str = "post_type";
    pub const INCLUDE_RECORDS: &str = "gm2_include_posts";
    pub const EXCLUDE_RECORDS: &str = "gm2_exclude_posts";
    pub const INCLUDE_CATEGORIES: &str = "gm2_include_categories";
    pub const EXCLUDE_CATEGORIES: &str = "gm2_exclude_categories";
    pub const CATEGORY_FILTER: &str = "gm2_category_filter";
    pub const CATEGORY_TAXONOMY: &str = "gm2_category_taxonomy";
    pub const DATE_RANGE: &str = "gm2_date_range";
    pub const ORDERBY: &str = "gm2_orderby";
    pub const ORDER: &str = "gm2_order";
    pub const QUERY_ID: &str = "gm2_query_id";
    pub const RESULTS_TEMPLATE: &str = "gm2_results_template_id";
    /// Page number overrides, highest priority first.
    pub const PAGE_OVERRIDE: &str = "e-search-page";
    pub const PAGED: &str = "paged";
    pub const PAGE: &str = "page";
    pub const PER_PAGE: &str = "per_page";

    /// Keys the pagination rewriter strips and re-appends on every link.
    pub const PERSISTED: [&str; 13] = [
        SEARCH,
        RECORD_TYPE,
        INCLUDE_RECORDS,
        EXCLUDE_RECORDS,
        INCLUDE_CATEGORIES,
        EXCLUDE_CATEGORIES,
        CATEGORY_FILTER,
        CATEGORY_TAXONOMY,
        DATE_RANGE,
        ORDERBY,
        ORDER,
        QUERY_ID,
        RESULTS_TEMPLATE,
    ];
}

/// Relative publication window, on-or-after semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRange {
    #[default]
    Any,
    PastDay,
    PastWeek,
    PastMonth,
    PastYear,
}

impl DateRange {
    /// Parse a wire value; anything unknown means no constraint.
    pub fn parse(value: &str) -> Self {
        match value {
            "past_day" => Self::PastDay,
            "past_week" => Self::PastWeek,
            "past_month" => Self::PastMonth,
            "past_year" => Self::PastYear,
            _ => Self::Any,
        }
    }

    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Self::Any => None,
            Self::PastDay => Some("past_day"),
            Self::PastWeek => Some("past_week"),
            Self::PastMonth => Some("past_month"),
            Self::PastYear => Some("past_year"),
        }
    }

    /// Cutoff instant for this window. Day and week are fixed offsets,
    /// month and year are calendar-aware.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Any => None,
            Self::PastDay => Some(now - Duration::days(1)),
            Self::PastWeek => Some(now - Duration::weeks(1)),
            Self::PastMonth => now.checked_sub_months(Months::new(1)),
            Self::PastYear => now.checked_sub_months(Months::new(12)),
        }
    }
}

/// Which optional fields were explicitly present on the wire. Wire echo
/// and injection must not invent arguments the request never carried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExplicitArgs {
    pub record_types: bool,
    pub sort: bool,
    pub taxonomy: bool,
    pub page: bool,
    pub page_size: bool,
}

/// Normalized description of one search/filter request.
///
/// Built once per request by `query::builder`, then shared by injection,
/// pagination rewriting, and rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySpec {
    pub search_term: String,
    /// Ordered, deduplicated. Never empty after building: defaults to
    /// the host catalog type.
    pub record_types: Vec<String>,
    pub include_ids: Vec<u64>,
    pub exclude_ids: Vec<u64>,
    pub include_category_ids: Vec<u64>,
    pub exclude_category_ids: Vec<u64>,
    pub category_filter_slugs: Vec<String>,
    /// Always resolved to an existing taxonomy.
    pub category_taxonomy: String,
    pub date_range: DateRange,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    /// 0 means none.
    pub results_template_id: u64,
    /// Empty means none.
    pub correlation_id: String,
    pub page: u32,
    pub page_size: u32,
    pub explicit: ExplicitArgs,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            record_types: Vec::new(),
            include_ids: Vec::new(),
            exclude_ids: Vec::new(),
            include_category_ids: Vec::new(),
            exclude_category_ids: Vec::new(),
            category_filter_slugs: Vec::new(),
            category_taxonomy: "category".to_string(),
            date_range: DateRange::Any,
            sort_field: SortField::Relevance,
            sort_direction: SortDirection::Desc,
            results_template_id: 0,
            correlation_id: String::new(),
            page: 1,
            page_size: 12,
            explicit: ExplicitArgs::default(),
        }
    }
}

impl QuerySpec {
    /// Whether the request constrains results at all: term, id lists,
    /// category constraints, date window, or an explicit sort.
    pub fn has_filter_signal(&self) -> bool {
        !self.search_term.is_empty()
            || !self.include_ids.is_empty()
            || !self.exclude_ids.is_empty()
            || !self.include_category_ids.is_empty()
            || !self.exclude_category_ids.is_empty()
            || !self.category_filter_slugs.is_empty()
            || self.date_range != DateRange::Any
            || self.explicit.sort
    }

    /// Active arguments in canonical wire form, ready to append to links.
    /// Only values the request actually carried (or that constrain
    /// results) are echoed.
    pub fn wire_args(&self) -> Vec<(String, String)> {
        let mut args: Vec<(String, String)> = Vec::new();
        if !self.search_term.is_empty() {
            args.push((keys::SEARCH.into(), self.search_term.clone()));
        }
        if self.explicit.record_types {
            if self.record_types.len() == 1 {
                args.push((keys::RECORD_TYPE.into(), self.record_types[0].clone()));
            } else {
                for record_type in &self.record_types {
                    args.push((format!("{}[]", keys::RECORD_TYPE), record_type.clone()));
                }
            }
        }
        push_ids(&mut args, keys::INCLUDE_RECORDS, &self.include_ids);
        push_ids(&mut args, keys::EXCLUDE_RECORDS, &self.exclude_ids);
        push_ids(&mut args, keys::INCLUDE_CATEGORIES, &self.include_category_ids);
        push_ids(&mut args, keys::EXCLUDE_CATEGORIES, &self.exclude_category_ids);
        if !self.category_filter_slugs.is_empty() {
            args.push((
                keys::CATEGORY_FILTER.into(),
                self.category_filter_slugs.join(","),
            ));
        }
        if self.explicit.taxonomy {
            args.push((keys::CATEGORY_TAXONOMY.into(), self.category_taxonomy.clone()));
        }
        if let Some(range) = self.date_range.as_str() {
            args.push((keys::DATE_RANGE.into(), range.to_string()));
        }
        if self.explicit.sort {
            args.push((keys::ORDERBY.into(), self.sort_field.as_str().to_string()));
            args.push((keys::ORDER.into(), self.sort_direction.as_str().to_string()));
        }
        if !self.correlation_id.is_empty() {
            args.push((keys::QUERY_ID.into(), self.correlation_id.clone()));
        }
        if self.results_template_id > 0 {
            args.push((
                keys::RESULTS_TEMPLATE.into(),
                self.results_template_id.to_string(),
            ));
        }
        args
    }
}

fn push_ids(args: &mut Vec<(String, String)>, key: &str, ids: &[u64]) {
    if !ids.is_empty() {
        let joined = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        args.push((key.to_string(), joined));
    }
}
