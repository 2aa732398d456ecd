//! Typed extension points for callers, keyed by correlation id where the
//! extension targets one query.

use crate::host::criteria::QueryCriteria;
use dashmap::DashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Callback fired against a query after spec application.
pub type QueryHook = Arc<dyn Fn(&mut QueryCriteria) + Send + Sync>;

/// Override consulted during taxonomy resolution. Returning `None` keeps
/// the current choice.
pub type TaxonomyFilter = Arc<dyn Fn(&str, &[String]) -> Option<String> + Send + Sync>;

/// Registry of caller extensions.
#[derive(Default)]
pub struct ExtensionPoints {
    query_hooks: DashMap<String, Vec<QueryHook>>,
    taxonomy_filters: RwLock<Vec<TaxonomyFilter>>,
}

impl ExtensionPoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook for queries carrying this correlation id.
    pub fn on_query<F>(&self, correlation_id: &str, hook: F)
    where
        F: Fn(&mut QueryCriteria) + Send + Sync + 'static,
    {
        self.query_hooks
            .entry(correlation_id.to_string())
            .or_default()
            .push(Arc::new(hook));
    }

    /// Fire the hooks registered for `correlation_id`. Returns how many ran.
    pub fn dispatch_query(&self, correlation_id: &str, criteria: &mut QueryCriteria) -> usize {
        let hooks: Vec<QueryHook> = self
            .query_hooks
            .get(correlation_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        for hook in &hooks {
            hook(criteria);
        }
        if !hooks.is_empty() {
            debug!(correlation_id, count = hooks.len(), "dispatched query hooks");
        }
        hooks.len()
    }

    /// Register a taxonomy resolution override.
    pub fn on_taxonomy<F>(&self, filter: F)
    where
        F: Fn(&str, &[String]) -> Option<String> + Send + Sync + 'static,
    {
        self.write_filters().push(Arc::new(filter));
    }

    /// Fold the current taxonomy choice through every registered override.
    pub fn filter_taxonomy(&self, current: &str, record_types: &[String]) -> String {
        let filters = self.read_filters();
        let mut choice = current.to_string();
        for filter in filters.iter() {
            if let Some(replacement) = filter(&choice, record_types) {
                choice = replacement;
            }
        }
        choice
    }

    fn read_filters(&self) -> std::sync::RwLockReadGuard<'_, Vec<TaxonomyFilter>> {
        self.taxonomy_filters
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_filters(&self) -> std::sync::RwLockWriteGuard<'_, Vec<TaxonomyFilter>> {
        self.taxonomy_filters
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
