//! Results-template inspection: does a template render the whole catalog
//! listing itself, or should it be applied per item?

use crate::host::catalog::{TemplateDocument, TemplateNode};
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// Widget kinds that always render a catalog listing.
pub const LISTING_WIDGET_KINDS: [&str; 3] =
    ["products-grid", "archive-products", "search-results-grid"];

/// Generic repeater kind: renders a listing only when its settings
/// target the catalog record type.
pub const GENERIC_LOOP_KIND: &str = "loop-grid";

static LISTING_MARKUP_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "ul.products, .gm2-search-results, [data-widget-kind=\"products-grid\"], \
         [data-widget-kind=\"archive-products\"], [data-widget-kind=\"search-results-grid\"]",
    )
    .unwrap()
});

/// Depth-first walk over a component tree. Returns the first node the
/// predicate accepts.
pub fn find_node<'a, F>(nodes: &'a [TemplateNode], pred: &F) -> Option<&'a TemplateNode>
where
    F: Fn(&TemplateNode) -> bool,
{
    for node in nodes {
        if pred(node) {
            return Some(node);
        }
        if let TemplateNode::Container { children } = node {
            if let Some(hit) = find_node(children, pred) {
                return Some(hit);
            }
        }
    }
    None
}

/// Whether this template renders the whole listing. Structural detection
/// over the component tree first; when the tree is silent, a signature
/// scan over the template's rendered markup.
pub fn renders_whole_listing(doc: &TemplateDocument, catalog_type: &str) -> bool {
    let structural = find_node(&doc.nodes, &|node| match node {
        TemplateNode::Widget { widget, settings } => {
            is_listing_widget(widget, settings, catalog_type)
        }
        _ => false,
    })
    .is_some();
    if structural {
        return true;
    }
    doc.markup
        .as_deref()
        .map_or(false, markup_has_listing_signature)
}

/// A dedicated listing widget, or a generic loop targeted at the catalog.
pub fn is_listing_widget(widget: &str, settings: &serde_json::Value, catalog_type: &str) -> bool {
    if LISTING_WIDGET_KINDS.contains(&widget) {
        return true;
    }
    widget == GENERIC_LOOP_KIND && loop_targets_catalog(settings, catalog_type)
}

/// The loop's target record type lives either at `record_type` or under
/// `query.record_type`, as a string or an array of strings.
fn loop_targets_catalog(settings: &serde_json::Value, catalog_type: &str) -> bool {
    let target = settings
        .get("record_type")
        .or_else(|| settings.get("query").and_then(|q| q.get("record_type")));
    match target {
        Some(serde_json::Value::String(s)) => s == catalog_type,
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .any(|item| item.as_str() == Some(catalog_type)),
        _ => false,
    }
}

fn markup_has_listing_signature(markup: &str) -> bool {
    let fragment = Html::parse_fragment(markup);
    fragment.select(&LISTING_MARKUP_SELECTOR).next().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn widget(kind: &str, settings: serde_json::Value) -> TemplateNode {
        TemplateNode::Widget {
            widget: kind.to_string(),
            settings,
        }
    }

    fn doc(nodes: Vec<TemplateNode>, markup: Option<&str>) -> TemplateDocument {
        TemplateDocument {
            id: 1,
            nodes,
            markup: markup.map(str::to_string),
        }
    }

    #[test]
    fn test_finds_widget_nested_in_containers() {
        let nodes = vec![TemplateNode::Container {
            children: vec![
                widget("heading", json!({})),
                TemplateNode::Container {
                    children: vec![widget("products-grid", json!({}))],
                },
            ],
        }];
        assert!(renders_whole_listing(&doc(nodes, None), "product"));
    }

    #[test]
    fn test_item_template_is_not_a_listing() {
        let nodes = vec![TemplateNode::Container {
            children: vec![
                widget("featured-image", json!({})),
                widget("title", json!({})),
                widget("price", json!({})),
            ],
        }];
        assert!(!renders_whole_listing(&doc(nodes, None), "product"));
    }

    #[test]
    fn test_generic_loop_requires_catalog_target() {
        let untargeted = vec![widget("loop-grid", json!({}))];
        assert!(!renders_whole_listing(&doc(untargeted, None), "product"));

        let wrong_target = vec![widget("loop-grid", json!({"record_type": "post"}))];
        assert!(!renders_whole_listing(&doc(wrong_target, None), "product"));

        let targeted = vec![widget("loop-grid", json!({"record_type": "product"}))];
        assert!(renders_whole_listing(&doc(targeted, None), "product"));

        let nested_target =
            vec![widget("loop-grid", json!({"query": {"record_type": ["page", "product"]}}))];
        assert!(renders_whole_listing(&doc(nested_target, None), "product"));
    }

    #[test]
    fn test_markup_fallback_detects_listing_classes() {
        let markup = r#"<div><ul class="products columns-4"><li>x</li></ul></div>"#;
        assert!(renders_whole_listing(&doc(Vec::new(), Some(markup)), "product"));

        let markup = r#"<section data-widget-kind="products-grid"></section>"#;
        assert!(renders_whole_listing(&doc(Vec::new(), Some(markup)), "product"));

        let markup = r#"<div class="hero"><h1>Welcome</h1></div>"#;
        assert!(!renders_whole_listing(&doc(Vec::new(), Some(markup)), "product"));
    }

    #[test]
    fn test_markup_decides_when_tree_is_silent() {
        let nodes = vec![widget("title", json!({}))];
        let markup = r#"<ul class="products"></ul>"#;
        assert!(renders_whole_listing(&doc(nodes, Some(markup)), "product"));
    }
}
