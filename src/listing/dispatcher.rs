//! Render-mode decision, memoized per request.

use crate::host::catalog::CatalogHost;
use crate::listing::template;
use crate::query::spec::QuerySpec;
use std::sync::OnceLock;
use tracing::debug;

/// How search results render for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Built-in product card per item.
    DefaultCard,
    /// Apply this template to each item.
    ItemTemplate(u64),
    /// The template renders the whole listing itself.
    ListingTemplate(u64),
}

/// Per-request memo. Spec building and template inspection run once no
/// matter how many render passes the request goes through.
#[derive(Debug, Default)]
pub struct RequestState {
    spec: OnceLock<QuerySpec>,
    render_mode: OnceLock<RenderMode>,
}

impl RequestState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The request's spec, building it on first use.
    pub fn spec(&self, build: impl FnOnce() -> QuerySpec) -> &QuerySpec {
        self.spec.get_or_init(build)
    }

    /// The request's render mode, deciding it on first use.
    pub fn render_mode(&self, decide: impl FnOnce() -> RenderMode) -> RenderMode {
        *self.render_mode.get_or_init(decide)
    }
}

/// Inspect the requested results template and pick a mode. Missing or
/// unidentified templates fall back to the default card per item.
pub fn decide_render_mode(spec: &QuerySpec, host: &dyn CatalogHost) -> RenderMode {
    if spec.results_template_id == 0 {
        return RenderMode::DefaultCard;
    }
    let Some(doc) = host.template(spec.results_template_id) else {
        debug!(
            template_id = spec.results_template_id,
            "requested results template is not registered"
        );
        return RenderMode::DefaultCard;
    };
    if template::renders_whole_listing(&doc, host.catalog_record_type()) {
        RenderMode::ListingTemplate(doc.id)
    } else {
        RenderMode::ItemTemplate(doc.id)
    }
}
