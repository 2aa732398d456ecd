//! Assemble listing markup for one page of results.
//!
//! Rendering never comes back empty-handed: a listing template that
//! fails or renders nothing falls back to per-item application, and a
//! per-item template that fails falls back to the default card.

use crate::host::catalog::{CatalogHost, Record};
use crate::host::criteria::ResultPage;
use crate::listing::card;
use crate::listing::dispatcher::{decide_render_mode, RenderMode, RequestState};
use crate::query::spec::QuerySpec;
use tracing::{debug, warn};

const LOOP_OPEN: &str = "<ul class=\"products gm2-search-results\">";
const LOOP_CLOSE: &str = "</ul>";
const NO_RESULTS: &str =
    "<p class=\"gm2-no-results\">No results found matching your selection.</p>";

/// Render a result page according to the request's render mode.
pub fn render_listing(
    results: &ResultPage<Record>,
    spec: &QuerySpec,
    host: &dyn CatalogHost,
    state: &RequestState,
) -> String {
    let mode = state.render_mode(|| decide_render_mode(spec, host));

    let item_template = match mode {
        RenderMode::ListingTemplate(id) => match host.render_template(id, None) {
            Ok(html) if !html.trim().is_empty() => return html,
            Ok(_) => {
                warn!(template_id = id, "listing template rendered empty, using items");
                Some(id)
            }
            Err(err) => {
                warn!(template_id = id, %err, "listing template failed, using items");
                Some(id)
            }
        },
        RenderMode::ItemTemplate(id) => Some(id),
        RenderMode::DefaultCard => None,
    };

    let visible: Vec<&Record> = results
        .items
        .iter()
        .filter(|record| host.is_visible(record))
        .collect();
    if visible.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut out = String::with_capacity(visible.len() * 512);
    out.push_str(LOOP_OPEN);
    for record in visible {
        out.push_str(&render_item(record, item_template, host));
    }
    out.push_str(LOOP_CLOSE);
    out
}

fn render_item(record: &Record, template_id: Option<u64>, host: &dyn CatalogHost) -> String {
    if let Some(id) = template_id {
        match host.render_template(id, Some(record)) {
            Ok(html) if !html.trim().is_empty() => return html,
            Ok(_) => debug!(record_id = record.id, "item template rendered empty"),
            Err(err) => debug!(record_id = record.id, %err, "item template failed"),
        }
    }
    card::render_card(record, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::catalog::{
        HostError, ProductClass, ProductInfo, RecordStatus, TemplateDocument, TemplateNode,
    };
    use crate::host::criteria::QueryCriteria;
    use chrono::Utc;
    use serde_json::json;

    /// Host double whose template behavior is scripted per test.
    struct ScriptedHost {
        doc: Option<TemplateDocument>,
        listing_render: Result<String, ()>,
        item_render: Result<String, ()>,
    }

    impl ScriptedHost {
        fn cards_only() -> Self {
            Self {
                doc: None,
                listing_render: Err(()),
                item_render: Err(()),
            }
        }

        fn with_item_template(doc: TemplateDocument) -> Self {
            Self {
                doc: Some(doc),
                listing_render: Err(()),
                item_render: Ok("<li class=\"templated\">item</li>".to_string()),
            }
        }
    }

    impl CatalogHost for ScriptedHost {
        fn catalog_record_type(&self) -> &str {
            "product"
        }
        fn taxonomy_exists(&self, _taxonomy: &str) -> bool {
            false
        }
        fn term_ids_for_slugs(&self, _taxonomy: &str, _slugs: &[String]) -> Vec<u64> {
            Vec::new()
        }
        fn execute(
            &self,
            criteria: &QueryCriteria,
        ) -> Result<ResultPage<Record>, HostError> {
            Ok(ResultPage::empty(criteria.page, criteria.per_page))
        }
        fn template(&self, template_id: u64) -> Option<TemplateDocument> {
            self.doc
                .as_ref()
                .filter(|doc| doc.id == template_id)
                .cloned()
        }
        fn render_template(
            &self,
            template_id: u64,
            item: Option<&Record>,
        ) -> Result<String, HostError> {
            let scripted = if item.is_some() {
                &self.item_render
            } else {
                &self.listing_render
            };
            scripted
                .clone()
                .map_err(|_| HostError::Render(format!("template {template_id} scripted to fail")))
        }
        fn render_default_action(&self, _record: &Record) -> String {
            "<a class=\"gm2-action\">View</a>".to_string()
        }
        fn render_pagination(&self, _page: u32, _total_pages: u32) -> String {
            String::new()
        }
    }

    fn record(id: u64, visible: bool) -> Record {
        Record {
            id,
            record_type: "product".to_string(),
            title: format!("Item {id}"),
            description: String::new(),
            url: format!("/p/{id}"),
            image_url: None,
            price: Some("10.00".to_string()),
            sku: None,
            rating: None,
            on_sale: false,
            published_at: Utc::now(),
            status: RecordStatus::Published,
            product: Some(ProductInfo {
                class: ProductClass::Simple,
                purchasable: true,
                in_stock: true,
                sold_individually: false,
                visible,
            }),
        }
    }

    fn page(items: Vec<Record>) -> ResultPage<Record> {
        let total = items.len() as u64;
        ResultPage {
            items,
            total,
            total_pages: 1,
            page: 1,
            per_page: 12,
        }
    }

    fn listing_doc(id: u64) -> TemplateDocument {
        TemplateDocument {
            id,
            nodes: vec![TemplateNode::Widget {
                widget: "products-grid".to_string(),
                settings: json!({}),
            }],
            markup: None,
        }
    }

    fn item_doc(id: u64) -> TemplateDocument {
        TemplateDocument {
            id,
            nodes: vec![TemplateNode::Widget {
                widget: "title".to_string(),
                settings: json!({}),
            }],
            markup: None,
        }
    }

    #[test]
    fn test_default_cards_in_loop_wrapper() {
        let host = ScriptedHost::cards_only();
        let html = render_listing(
            &page(vec![record(1, true), record(2, true)]),
            &QuerySpec::default(),
            &host,
            &RequestState::new(),
        );
        assert!(html.starts_with(LOOP_OPEN));
        assert!(html.ends_with(LOOP_CLOSE));
        assert_eq!(html.matches("gm2-search-result\"").count(), 2);
    }

    #[test]
    fn test_invisible_records_are_dropped() {
        let host = ScriptedHost::cards_only();
        let html = render_listing(
            &page(vec![record(1, true), record(2, false)]),
            &QuerySpec::default(),
            &host,
            &RequestState::new(),
        );
        assert_eq!(html.matches("gm2-search-result\"").count(), 1);
        assert!(html.contains("Item 1"));
        assert!(!html.contains("Item 2"));
    }

    #[test]
    fn test_no_results_notice() {
        let host = ScriptedHost::cards_only();
        let html = render_listing(
            &page(Vec::new()),
            &QuerySpec::default(),
            &host,
            &RequestState::new(),
        );
        assert_eq!(html, NO_RESULTS);

        // All-invisible pages read as no results too.
        let html = render_listing(
            &page(vec![record(1, false)]),
            &QuerySpec::default(),
            &host,
            &RequestState::new(),
        );
        assert_eq!(html, NO_RESULTS);
    }

    #[test]
    fn test_item_template_renders_each_item() {
        let host = ScriptedHost::with_item_template(item_doc(9));
        let spec = QuerySpec {
            results_template_id: 9,
            ..QuerySpec::default()
        };
        let html = render_listing(
            &page(vec![record(1, true), record(2, true)]),
            &spec,
            &host,
            &RequestState::new(),
        );
        assert_eq!(html.matches("class=\"templated\"").count(), 2);
        assert!(!html.contains("gm2-search-result\""));
    }

    #[test]
    fn test_whole_listing_template_short_circuits() {
        let mut host = ScriptedHost::with_item_template(listing_doc(9));
        host.listing_render = Ok("<section class=\"custom-listing\">all</section>".to_string());
        let spec = QuerySpec {
            results_template_id: 9,
            ..QuerySpec::default()
        };
        let html = render_listing(
            &page(vec![record(1, true)]),
            &spec,
            &host,
            &RequestState::new(),
        );
        assert_eq!(html, "<section class=\"custom-listing\">all</section>");
    }

    #[test]
    fn test_failed_listing_template_falls_back_to_items() {
        // Listing render is scripted to fail; per-item succeeds.
        let host = ScriptedHost::with_item_template(listing_doc(9));
        let spec = QuerySpec {
            results_template_id: 9,
            ..QuerySpec::default()
        };
        let html = render_listing(
            &page(vec![record(1, true)]),
            &spec,
            &host,
            &RequestState::new(),
        );
        assert!(html.starts_with(LOOP_OPEN));
        assert!(html.contains("class=\"templated\""));
    }

    #[test]
    fn test_failed_item_template_falls_back_to_card() {
        let mut host = ScriptedHost::with_item_template(item_doc(9));
        host.item_render = Err(());
        let spec = QuerySpec {
            results_template_id: 9,
            ..QuerySpec::default()
        };
        let html = render_listing(
            &page(vec![record(1, true)]),
            &spec,
            &host,
            &RequestState::new(),
        );
        assert!(html.contains("gm2-search-result\""));
        assert!(html.contains("Item 1"));
    }

    #[test]
    fn test_empty_listing_render_falls_back_to_items() {
        let mut host = ScriptedHost::with_item_template(listing_doc(9));
        host.listing_render = Ok("   ".to_string());
        let spec = QuerySpec {
            results_template_id: 9,
            ..QuerySpec::default()
        };
        let html = render_listing(
            &page(vec![record(1, true)]),
            &spec,
            &host,
            &RequestState::new(),
        );
        assert!(html.starts_with(LOOP_OPEN));
    }
}
