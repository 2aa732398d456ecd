//! `gm2-search search <term>` — one search against the demo catalog.

use crate::config::PluginConfig;
use crate::host::catalog::CatalogHost;
use crate::host::hooks::ExtensionPoints;
use crate::query::builder::build_spec;
use crate::query::injection::fresh_criteria;
use crate::query::spec::keys;
use crate::request::raw::RawRequest;
use crate::request::resolver::ParamResolver;
use crate::store::sqlite::SqliteCatalog;
use anyhow::{Context, Result};

/// Run the search command: seed an in-memory catalog, push the flags
/// through the same wire path the endpoint uses, print matches.
pub fn run(
    term: &str,
    orderby: Option<&str>,
    order: Option<&str>,
    categories: Option<&str>,
    page: Option<u32>,
    per_page: Option<u32>,
) -> Result<()> {
    let store = SqliteCatalog::open_in_memory(PluginConfig::default())?;
    store.seed_demo().context("failed to seed demo catalog")?;

    let mut raw = RawRequest::new().query_pair(keys::SEARCH, term);
    if let Some(orderby) = orderby {
        raw = raw.query_pair(keys::ORDERBY, orderby);
    }
    if let Some(order) = order {
        raw = raw.query_pair(keys::ORDER, order);
    }
    if let Some(categories) = categories {
        raw = raw.query_pair(keys::CATEGORY_FILTER, categories);
    }
    if let Some(page) = page {
        raw = raw.query_pair(keys::PAGED, &page.to_string());
    }
    if let Some(per_page) = per_page {
        raw = raw.query_pair(keys::PER_PAGE, &per_page.to_string());
    }

    let hooks = ExtensionPoints::new();
    let resolver = ParamResolver::new(&raw);
    let spec = build_spec(&resolver, &store, &hooks);
    let criteria = fresh_criteria(&spec, &store, &hooks);
    let results = store.execute(&criteria)?;

    if results.total == 0 {
        println!("no results for \"{}\"", spec.search_term);
        return Ok(());
    }
    println!(
        "{} result(s) for \"{}\", page {} of {}",
        results.total, spec.search_term, results.page, results.total_pages
    );
    for record in &results.items {
        println!(
            "  #{:<4} {:<40} {}",
            record.id,
            record.title,
            record.price.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
