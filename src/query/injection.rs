//! Apply a query specification to host queries, one phase per query kind.
//!
//! Primary: the request's designated main listing query. Secondary: any
//! other catalog-eligible query on the page. Fresh: a complete criteria
//! built from the spec alone, used by the refresh endpoint.

use crate::host::catalog::CatalogHost;
use crate::host::criteria::{QueryCriteria, TermFilter, TermOperator};
use crate::host::hooks::ExtensionPoints;
use crate::query::spec::QuerySpec;
use tracing::debug;

/// Mutate the main listing query. Returns whether anything was applied.
pub fn apply_to_main(
    criteria: &mut QueryCriteria,
    spec: &QuerySpec,
    host: &dyn CatalogHost,
    hooks: &ExtensionPoints,
) -> bool {
    if !criteria.is_main {
        return false;
    }
    if !criteria.is_search && !spec.has_filter_signal() {
        return false;
    }
    apply_spec(criteria, spec, host, hooks);
    true
}

/// Mutate a secondary catalog query. Filters must not leak into
/// unrelated queries: the query has to carry a filter signal match, and
/// either declare the catalog record type or be an untyped search.
pub fn apply_to_secondary(
    criteria: &mut QueryCriteria,
    spec: &QuerySpec,
    host: &dyn CatalogHost,
    hooks: &ExtensionPoints,
) -> bool {
    if criteria.is_main || !spec.has_filter_signal() {
        return false;
    }
    let eligible = criteria.targets_record_type(host.catalog_record_type())
        || (criteria.record_types.is_empty() && criteria.is_search);
    if !eligible {
        return false;
    }
    apply_spec(criteria, spec, host, hooks);
    true
}

/// Build a complete criteria from the spec alone.
pub fn fresh_criteria(
    spec: &QuerySpec,
    host: &dyn CatalogHost,
    hooks: &ExtensionPoints,
) -> QueryCriteria {
    let mut criteria = QueryCriteria {
        record_types: if spec.record_types.is_empty() {
            vec![host.catalog_record_type().to_string()]
        } else {
            spec.record_types.clone()
        },
        is_search: !spec.search_term.is_empty(),
        sort_field: spec.sort_field,
        sort_direction: spec.sort_direction,
        page: spec.page,
        per_page: spec.page_size.max(1),
        ..QueryCriteria::default()
    };
    apply_spec(&mut criteria, spec, host, hooks);
    criteria
}

/// Shared field application, followed by the correlation event.
fn apply_spec(
    criteria: &mut QueryCriteria,
    spec: &QuerySpec,
    host: &dyn CatalogHost,
    hooks: &ExtensionPoints,
) {
    if !spec.search_term.is_empty() {
        criteria.search_term = Some(spec.search_term.clone());
        criteria.is_search = true;
    }
    if spec.explicit.record_types {
        criteria.record_types = spec.record_types.clone();
    }
    if !spec.include_ids.is_empty() {
        criteria.include_ids = spec.include_ids.clone();
    }
    if !spec.exclude_ids.is_empty() {
        criteria.exclude_ids = spec.exclude_ids.clone();
    }

    if !spec.include_category_ids.is_empty() {
        criteria.term_filters.push(TermFilter {
            taxonomy: spec.category_taxonomy.clone(),
            term_ids: spec.include_category_ids.clone(),
            operator: TermOperator::In,
        });
    }
    if !spec.exclude_category_ids.is_empty() {
        criteria.term_filters.push(TermFilter {
            taxonomy: spec.category_taxonomy.clone(),
            term_ids: spec.exclude_category_ids.clone(),
            operator: TermOperator::NotIn,
        });
    }
    if !spec.category_filter_slugs.is_empty() {
        let term_ids =
            host.term_ids_for_slugs(&spec.category_taxonomy, &spec.category_filter_slugs);
        if term_ids.is_empty() {
            debug!(
                taxonomy = %spec.category_taxonomy,
                slugs = ?spec.category_filter_slugs,
                "category filter matched no terms"
            );
        } else {
            criteria.term_filters.push(TermFilter {
                taxonomy: spec.category_taxonomy.clone(),
                term_ids,
                operator: TermOperator::In,
            });
        }
    }

    if let Some(cutoff) = spec.date_range.cutoff(host.now()) {
        criteria.published_after = Some(cutoff);
    }

    if spec.explicit.sort {
        criteria.sort_field = spec.sort_field;
        criteria.sort_direction = spec.sort_direction;
    }
    if spec.explicit.page {
        criteria.page = spec.page;
    }
    if spec.explicit.page_size {
        criteria.per_page = spec.page_size.max(1);
    }

    if !spec.correlation_id.is_empty() {
        criteria.correlation_id = Some(spec.correlation_id.clone());
        hooks.dispatch_query(&spec.correlation_id, criteria);
    }
}
