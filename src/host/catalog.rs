//! Catalog host trait, record model, and results-template documents.

use crate::host::criteria::{QueryCriteria, ResultPage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures surfaced by host collaborators.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("template {0} is not registered")]
    TemplateMissing(u64),
    #[error("template render failed: {0}")]
    Render(String),
}

/// Publication state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Published,
    Draft,
}

impl RecordStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "published" => Self::Published,
            _ => Self::Draft,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Draft => "draft",
        }
    }
}

/// Commerce shape of a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductClass {
    Simple,
    Variable,
    Grouped,
    External,
}

impl ProductClass {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "simple" => Some(Self::Simple),
            "variable" => Some(Self::Variable),
            "grouped" => Some(Self::Grouped),
            "external" => Some(Self::External),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Variable => "variable",
            Self::Grouped => "grouped",
            Self::External => "external",
        }
    }
}

/// Commerce fields present on catalog items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductInfo {
    pub class: ProductClass,
    pub purchasable: bool,
    pub in_stock: bool,
    /// Quantity locked to one per order.
    pub sold_individually: bool,
    pub visible: bool,
}

/// One content record as the host stores it.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub id: u64,
    pub record_type: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub image_url: Option<String>,
    /// Raw price meta value, unparsed.
    pub price: Option<String>,
    pub sku: Option<String>,
    pub rating: Option<f32>,
    pub on_sale: bool,
    pub published_at: DateTime<Utc>,
    pub status: RecordStatus,
    /// Present only on catalog items.
    pub product: Option<ProductInfo>,
}

/// One node of a results-template component tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateNode {
    Container {
        #[serde(default)]
        children: Vec<TemplateNode>,
    },
    Widget {
        widget: String,
        #[serde(default)]
        settings: serde_json::Value,
    },
}

/// A results template: its component tree plus optional rendered markup
/// for hosts that only expose the latter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDocument {
    pub id: u64,
    #[serde(default)]
    pub nodes: Vec<TemplateNode>,
    #[serde(default)]
    pub markup: Option<String>,
}

/// Everything the host platform provides to this layer.
///
/// The reference implementation lives in `crate::store`; tests substitute
/// lighter doubles.
pub trait CatalogHost: Send + Sync {
    /// Record type of catalog items ("product" on a stock install).
    fn catalog_record_type(&self) -> &str;

    /// Taxonomy that categorizes catalog items.
    fn catalog_taxonomy(&self) -> &str {
        "product_cat"
    }

    /// Taxonomy used when nothing better matches the record type.
    fn default_taxonomy(&self) -> &str {
        "category"
    }

    fn taxonomy_exists(&self, taxonomy: &str) -> bool;

    /// Resolve term slugs to ids within one taxonomy. Unknown slugs are
    /// dropped, not errors.
    fn term_ids_for_slugs(&self, taxonomy: &str, slugs: &[String]) -> Vec<u64>;

    /// Run a query and return one page of records.
    fn execute(&self, criteria: &QueryCriteria) -> Result<ResultPage<Record>, HostError>;

    /// Fetch a registered results template.
    fn template(&self, template_id: u64) -> Option<TemplateDocument>;

    /// Render a template, either per item or for the whole listing
    /// (`item` absent).
    fn render_template(&self, template_id: u64, item: Option<&Record>)
        -> Result<String, HostError>;

    /// The host's default per-item action markup.
    fn render_default_action(&self, record: &Record) -> String;

    /// The host's own pagination markup for a listing.
    fn render_pagination(&self, page: u32, total_pages: u32) -> String;

    /// Host catalog visibility policy.
    fn is_visible(&self, record: &Record) -> bool {
        record.status == RecordStatus::Published
            && record.product.as_ref().map_or(true, |p| p.visible)
    }

    fn default_page_size(&self) -> u32 {
        12
    }

    fn max_page_size(&self) -> u32 {
        100
    }

    /// Whether the commerce rendering layer is available.
    fn commerce_active(&self) -> bool {
        true
    }

    /// Current time, injectable for tests.
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(status: RecordStatus, visible: bool) -> Record {
        Record {
            id: 1,
            record_type: "product".to_string(),
            title: "Test".to_string(),
            description: String::new(),
            url: "/p/test".to_string(),
            image_url: None,
            price: None,
            sku: None,
            rating: None,
            on_sale: false,
            published_at: Utc::now(),
            status,
            product: Some(ProductInfo {
                class: ProductClass::Simple,
                purchasable: true,
                in_stock: true,
                sold_individually: false,
                visible,
            }),
        }
    }

    struct BareHost;

    impl CatalogHost for BareHost {
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
        fn template(&self, _template_id: u64) -> Option<TemplateDocument> {
            None
        }
        fn render_template(
            &self,
            template_id: u64,
            _item: Option<&Record>,
        ) -> Result<String, HostError> {
            Err(HostError::TemplateMissing(template_id))
        }
        fn render_default_action(&self, _record: &Record) -> String {
            String::new()
        }
        fn render_pagination(&self, _page: u32, _total_pages: u32) -> String {
            String::new()
        }
    }

    #[test]
    fn test_default_visibility_policy() {
        let host = BareHost;
        assert!(host.is_visible(&product(RecordStatus::Published, true)));
        assert!(!host.is_visible(&product(RecordStatus::Draft, true)));
        assert!(!host.is_visible(&product(RecordStatus::Published, false)));

        let mut plain = product(RecordStatus::Published, false);
        plain.product = None;
        assert!(host.is_visible(&plain));
    }

    #[test]
    fn test_template_node_deserializes_tagged() {
        let raw = r#"{
            "id": 7,
            "nodes": [
                {"kind": "container", "children": [
                    {"kind": "widget", "widget": "heading", "settings": {"size": "xl"}}
                ]}
            ]
        }"#;
        let doc: TemplateDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.id, 7);
        match &doc.nodes[0] {
            TemplateNode::Container { children } => {
                assert!(matches!(&children[0], TemplateNode::Widget { widget, .. } if widget == "heading"));
            }
            _ => panic!("expected container"),
        }
    }
}
