//! Weighted relevance SQL fragments for catalog search queries.
//!
//! The scorer never executes anything. It emits joins, a match
//! predicate, a computed score column, and grouping that a query
//! executor merges into its own generated statement. When the query has
//! no usable term, or does not target the catalog record type, the
//! scorer stays inert and the executor's statement is untouched.

use crate::host::criteria::{QueryCriteria, SortField};

/// Field weights, title first.
pub const WEIGHT_TITLE: u32 = 100;
pub const WEIGHT_PRICE: u32 = 90;
pub const WEIGHT_DESCRIPTION: u32 = 80;
pub const WEIGHT_ATTRIBUTES: u32 = 70;
pub const WEIGHT_SKU: u32 = 60;

/// Leading symbols stripped for the secondary price match.
const CURRENCY_SYMBOLS: [char; 4] = ['$', '€', '£', '¥'];

/// SQL fragments a query executor merges into its generated statement.
#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceSql {
    /// LEFT JOINs for price meta, SKU meta, and aggregated attributes.
    pub joins: Vec<String>,
    /// OR-of-fields match predicate, to be OR-combined with the
    /// executor's own search predicate inside its outer AND.
    pub predicate: String,
    /// Weighted score expression aliased `relevance`.
    pub select: String,
    /// Forced grouping that keeps one row per record.
    pub group_by: String,
}

/// Build relevance fragments for `criteria`, or `None` when inert.
pub fn relevance_sql(criteria: &QueryCriteria, catalog_type: &str, attribute_prefix: &str) -> Option<RelevanceSql> {
    let term = criteria.search_term.as_deref().unwrap_or("").trim();
    if term.is_empty() || !criteria.targets_record_type(catalog_type) {
        return None;
    }

    let like = format!("%{}%", escape_like(term));
    let stripped = strip_currency(term);
    let price_match = if stripped == term {
        format!("gm2_price.meta_value LIKE '{like}' ESCAPE '\\'")
    } else {
        let price_like = format!("%{}%", escape_like(stripped));
        format!(
            "(gm2_price.meta_value LIKE '{like}' ESCAPE '\\' OR gm2_price.meta_value LIKE '{price_like}' ESCAPE '\\')"
        )
    };

    let prefix_like = format!("{}%", escape_like(attribute_prefix));
    let joins = vec![
        "LEFT JOIN record_meta AS gm2_price ON gm2_price.record_id = records.id AND gm2_price.meta_key = '_price'".to_string(),
        "LEFT JOIN record_meta AS gm2_sku ON gm2_sku.record_id = records.id AND gm2_sku.meta_key = '_sku'".to_string(),
        format!(
            "LEFT JOIN (SELECT tr.record_id AS record_id, GROUP_CONCAT(t.name, ' ') AS attrs \
             FROM term_relationships tr INNER JOIN terms t ON t.id = tr.term_id \
             WHERE t.taxonomy LIKE '{prefix_like}' ESCAPE '\\' GROUP BY tr.record_id) AS gm2_attr \
             ON gm2_attr.record_id = records.id"
        ),
    ];

    let predicate = format!(
        "(records.title LIKE '{like}' ESCAPE '\\' \
         OR {price_match} \
         OR records.description LIKE '{like}' ESCAPE '\\' \
         OR gm2_attr.attrs LIKE '{like}' ESCAPE '\\' \
         OR gm2_sku.meta_value LIKE '{like}' ESCAPE '\\')"
    );

    let select = format!(
        "(CASE WHEN records.title LIKE '{like}' ESCAPE '\\' THEN {WEIGHT_TITLE} ELSE 0 END + \
         CASE WHEN {price_match} THEN {WEIGHT_PRICE} ELSE 0 END + \
         CASE WHEN records.description LIKE '{like}' ESCAPE '\\' THEN {WEIGHT_DESCRIPTION} ELSE 0 END + \
         CASE WHEN gm2_attr.attrs LIKE '{like}' ESCAPE '\\' THEN {WEIGHT_ATTRIBUTES} ELSE 0 END + \
         CASE WHEN gm2_sku.meta_value LIKE '{like}' ESCAPE '\\' THEN {WEIGHT_SKU} ELSE 0 END) AS relevance"
    );

    Some(RelevanceSql {
        joins,
        predicate,
        select,
        group_by: "records.id".to_string(),
    })
}

/// ORDER BY clause for a criteria sort.
///
/// Relevance ordering needs the computed column; without it the fallback
/// is recency. Price ordering needs the `gm2_price` join, which the
/// executor adds when the relevance joins are absent.
pub fn order_clause(criteria: &QueryCriteria, relevance_selected: bool) -> String {
    let dir = criteria.sort_direction.as_str();
    match criteria.sort_field {
        SortField::Rand => "RANDOM()".to_string(),
        SortField::Date => format!("records.published_at {dir}"),
        SortField::Title => format!("records.title {dir}"),
        SortField::Price => {
            format!("CAST(gm2_price.meta_value AS DECIMAL(10,4)) {dir}")
        }
        SortField::Relevance if relevance_selected => {
            format!("relevance {dir}, records.title ASC")
        }
        SortField::Relevance => "records.published_at DESC".to_string(),
    }
}

/// Escape a term for use inside a quoted LIKE literal: backslash, the
/// LIKE wildcards, and the quote itself.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '%' => out.push_str("\\%"),
            '_' => out.push_str("\\_"),
            '\'' => out.push_str("''"),
            _ => out.push(c),
        }
    }
    out
}

/// Drop one leading currency symbol, if present.
pub fn strip_currency(term: &str) -> &str {
    term.trim_start()
        .strip_prefix(CURRENCY_SYMBOLS.as_slice())
        .map(str::trim_start)
        .unwrap_or(term)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::criteria::SortDirection;

    fn catalog_search(term: &str) -> QueryCriteria {
        QueryCriteria {
            record_types: vec!["product".to_string()],
            search_term: Some(term.to_string()),
            is_search: true,
            ..QueryCriteria::default()
        }
    }

    #[test]
    fn test_inert_without_term() {
        let mut criteria = catalog_search("");
        assert!(relevance_sql(&criteria, "product", "pa_").is_none());
        criteria.search_term = Some("   ".to_string());
        assert!(relevance_sql(&criteria, "product", "pa_").is_none());
        criteria.search_term = None;
        assert!(relevance_sql(&criteria, "product", "pa_").is_none());
    }

    #[test]
    fn test_inert_for_non_catalog_queries() {
        let mut criteria = catalog_search("mug");
        criteria.record_types = vec!["post".to_string()];
        assert!(relevance_sql(&criteria, "product", "pa_").is_none());
        criteria.record_types.push("product".to_string());
        assert!(relevance_sql(&criteria, "product", "pa_").is_some());
    }

    #[test]
    fn test_fragment_shapes() {
        let sql = relevance_sql(&catalog_search("mug"), "product", "pa_").unwrap();
        assert_eq!(sql.joins.len(), 3);
        assert!(sql.joins[0].contains("meta_key = '_price'"));
        assert!(sql.joins[1].contains("meta_key = '_sku'"));
        assert!(sql.joins[2].contains("GROUP_CONCAT(t.name, ' ')"));
        assert!(sql.joins[2].contains("t.taxonomy LIKE 'pa\\_%'"));
        assert!(sql.predicate.starts_with('('));
        assert!(sql.predicate.contains("records.title LIKE '%mug%' ESCAPE '\\'"));
        assert!(sql.select.contains("THEN 100"));
        assert!(sql.select.contains("THEN 90"));
        assert!(sql.select.contains("THEN 80"));
        assert!(sql.select.contains("THEN 70"));
        assert!(sql.select.contains("THEN 60"));
        assert!(sql.select.ends_with("AS relevance"));
        assert_eq!(sql.group_by, "records.id");
    }

    #[test]
    fn test_currency_term_gets_secondary_price_match() {
        let sql = relevance_sql(&catalog_search("$19.99"), "product", "pa_").unwrap();
        assert!(sql.predicate.contains("LIKE '%$19.99%'"));
        assert!(sql.predicate.contains("LIKE '%19.99%'"));

        // Plain terms do not duplicate the price clause.
        let sql = relevance_sql(&catalog_search("19.99"), "product", "pa_").unwrap();
        assert_eq!(sql.predicate.matches("gm2_price.meta_value").count(), 1);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like(r"back\slash"), r"back\\slash");
        assert_eq!(escape_like("it's"), "it''s");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_strip_currency() {
        assert_eq!(strip_currency("$19.99"), "19.99");
        assert_eq!(strip_currency("€ 30"), "30");
        assert_eq!(strip_currency("£5"), "5");
        assert_eq!(strip_currency("19.99"), "19.99");
        assert_eq!(strip_currency("19.99$"), "19.99$");
    }

    #[test]
    fn test_injection_attempt_is_neutralized() {
        let criteria = catalog_search("'; DROP TABLE records; --");
        let sql = relevance_sql(&criteria, "product", "pa_").unwrap();
        assert!(sql.predicate.contains("''; DROP TABLE records; --"));
        assert!(!sql.predicate.contains("%'; DROP"));
    }

    #[test]
    fn test_order_clause_variants() {
        let mut criteria = catalog_search("mug");
        criteria.sort_field = SortField::Relevance;
        assert_eq!(
            order_clause(&criteria, true),
            "relevance DESC, records.title ASC"
        );
        assert_eq!(order_clause(&criteria, false), "records.published_at DESC");

        criteria.sort_field = SortField::Price;
        criteria.sort_direction = SortDirection::Asc;
        // Price carries no title tiebreak; only relevance does.
        assert_eq!(
            order_clause(&criteria, true),
            "CAST(gm2_price.meta_value AS DECIMAL(10,4)) ASC"
        );

        criteria.sort_field = SortField::Rand;
        assert_eq!(order_clause(&criteria, false), "RANDOM()");

        criteria.sort_field = SortField::Date;
        assert_eq!(order_clause(&criteria, false), "records.published_at ASC");
    }
}
