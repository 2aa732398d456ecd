//! Compose a `QuerySpec` from resolved request parameters.

use crate::host::catalog::CatalogHost;
use crate::host::criteria::{SortDirection, SortField};
use crate::host::hooks::ExtensionPoints;
use crate::query::spec::{keys, DateRange, QuerySpec};
use crate::request::resolver::ParamResolver;
use tracing::debug;

/// Build the specification for the current request. Never fails:
/// malformed input degrades field by field.
pub fn build_spec(
    resolver: &ParamResolver<'_>,
    host: &dyn CatalogHost,
    hooks: &ExtensionPoints,
) -> QuerySpec {
    let mut spec = QuerySpec::default();

    spec.search_term = resolver.text(keys::SEARCH).unwrap_or_default();

    let requested_types = resolver.key_names(keys::RECORD_TYPE);
    spec.explicit.record_types = !requested_types.is_empty();
    spec.record_types = if requested_types.is_empty() {
        vec![host.catalog_record_type().to_string()]
    } else {
        requested_types
    };

    spec.include_ids = resolver.ids(keys::INCLUDE_RECORDS);
    spec.exclude_ids = resolver.ids(keys::EXCLUDE_RECORDS);
    spec.include_category_ids = resolver.ids(keys::INCLUDE_CATEGORIES);
    spec.exclude_category_ids = resolver.ids(keys::EXCLUDE_CATEGORIES);
    spec.category_filter_slugs = resolver.slugs(keys::CATEGORY_FILTER);

    let requested_taxonomy = resolver.key_name(keys::CATEGORY_TAXONOMY);
    spec.explicit.taxonomy = requested_taxonomy.is_some();
    spec.category_taxonomy =
        resolve_taxonomy(requested_taxonomy, &spec.record_types, host, hooks);

    if let Some(range) = resolver.key_name(keys::DATE_RANGE) {
        spec.date_range = DateRange::parse(&range);
    }

    let requested_field = resolver
        .key_name(keys::ORDERBY)
        .as_deref()
        .and_then(SortField::parse);
    let requested_direction = resolver
        .text(keys::ORDER)
        .as_deref()
        .and_then(SortDirection::parse);
    spec.explicit.sort = requested_field.is_some() || requested_direction.is_some();
    spec.sort_field = requested_field.unwrap_or(SortField::Relevance);
    spec.sort_direction = requested_direction.unwrap_or(SortDirection::Desc);

    spec.results_template_id = resolver.number(keys::RESULTS_TEMPLATE).unwrap_or(0);
    spec.correlation_id = resolver.key_name(keys::QUERY_ID).unwrap_or_default();

    if let Some(page) = requested_page(resolver) {
        spec.explicit.page = true;
        spec.page = page;
    }

    if let Some(size) = resolver.number(keys::PER_PAGE) {
        spec.explicit.page_size = true;
        spec.page_size = (size as u32).clamp(1, host.max_page_size());
    } else {
        spec.page_size = host.default_page_size().max(1);
    }

    debug!(
        term = %spec.search_term,
        types = ?spec.record_types,
        taxonomy = %spec.category_taxonomy,
        page = spec.page,
        "built query spec"
    );
    spec
}

/// First page override present on the request, in priority order.
fn requested_page(resolver: &ParamResolver<'_>) -> Option<u32> {
    [keys::PAGE_OVERRIDE, keys::PAGED, keys::PAGE]
        .iter()
        .find_map(|key| resolver.number(key))
        .map(|page| page.min(u32::MAX as u64) as u32)
}

/// Resolve the taxonomy category constraints apply to.
///
/// An explicit, existing taxonomy wins. Otherwise the first record type
/// picks a convention (content posts use the default taxonomy, catalog
/// items their own when it exists), caller overrides get a say, and the
/// final choice is re-validated.
fn resolve_taxonomy(
    requested: Option<String>,
    record_types: &[String],
    host: &dyn CatalogHost,
    hooks: &ExtensionPoints,
) -> String {
    if let Some(taxonomy) = requested {
        if host.taxonomy_exists(&taxonomy) {
            return taxonomy;
        }
    }

    let mut choice = match record_types.first().map(String::as_str) {
        Some("post") => host.default_taxonomy().to_string(),
        Some(t) if t == host.catalog_record_type() && host.taxonomy_exists(host.catalog_taxonomy()) => {
            host.catalog_taxonomy().to_string()
        }
        _ => {
            if host.taxonomy_exists(host.catalog_taxonomy()) {
                host.catalog_taxonomy().to_string()
            } else {
                host.default_taxonomy().to_string()
            }
        }
    };

    choice = hooks.filter_taxonomy(&choice, record_types);
    if host.taxonomy_exists(&choice) {
        choice
    } else {
        host.default_taxonomy().to_string()
    }
}
