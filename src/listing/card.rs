//! Built-in result card, used when no results template applies.

use crate::host::catalog::{CatalogHost, ProductClass, ProductInfo, Record};

/// Render one result as the default card.
pub fn render_card(record: &Record, host: &dyn CatalogHost) -> String {
    let url = escape_html(&record.url);
    let title = escape_html(&record.title);

    let mut out = String::with_capacity(512);
    out.push_str("<li class=\"product gm2-search-result\">");

    out.push_str(&format!("<a class=\"gm2-result-media\" href=\"{url}\">"));
    if record.on_sale {
        out.push_str("<span class=\"onsale\">Sale!</span>");
    }
    match &record.image_url {
        Some(image) => out.push_str(&format!(
            "<img src=\"{}\" alt=\"{title}\" loading=\"lazy\">",
            escape_html(image)
        )),
        None => out.push_str("<div class=\"gm2-result-media-placeholder\"></div>"),
    }
    out.push_str("</a>");

    out.push_str(&format!(
        "<a class=\"gm2-result-link\" href=\"{url}\"><h2 class=\"gm2-result-title\">{title}</h2></a>"
    ));

    if let Some(rating) = record.rating {
        out.push_str(&format!(
            "<div class=\"gm2-result-rating\" aria-label=\"Rated {rating:.1} out of 5\">{rating:.1}</div>"
        ));
    }

    if let Some(price) = &record.price {
        out.push_str(&format!(
            "<span class=\"gm2-result-price\">{}</span>",
            escape_html(price)
        ));
    }

    out.push_str("<div class=\"gm2-result-actions\">");
    out.push_str(&render_actions(record, host));
    out.push_str("</div>");

    out.push_str("</li>");
    out
}

/// Quantity stepper plus add-to-cart for items that support choosing a
/// quantity in place; everything else defers to the host's default
/// action control.
fn render_actions(record: &Record, host: &dyn CatalogHost) -> String {
    match &record.product {
        Some(product) if stepper_applies(product) => render_stepper(record),
        _ => host.render_default_action(record),
    }
}

/// The stepper only makes sense for simple, purchasable, in-stock items
/// whose quantity is not locked to one.
pub(crate) fn stepper_applies(product: &ProductInfo) -> bool {
    matches!(product.class, ProductClass::Simple)
        && product.purchasable
        && product.in_stock
        && !product.sold_individually
}

fn render_stepper(record: &Record) -> String {
    format!(
        "<div class=\"gm2-quantity-add\" data-record-id=\"{id}\">\
         <button type=\"button\" class=\"gm2-qty-minus\" aria-label=\"Decrease quantity\">&minus;</button>\
         <input class=\"gm2-qty\" type=\"number\" min=\"1\" value=\"1\" aria-label=\"Quantity\">\
         <button type=\"button\" class=\"gm2-qty-plus\" aria-label=\"Increase quantity\">+</button>\
         <button type=\"button\" class=\"gm2-add-to-cart\" data-record-id=\"{id}\">Add to cart</button>\
         </div>",
        id = record.id
    )
}

/// Minimal HTML escaping for text and attribute positions.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::catalog::{HostError, RecordStatus, TemplateDocument};
    use crate::host::criteria::{QueryCriteria, ResultPage};
    use chrono::Utc;

    struct ActionHost;

    impl CatalogHost for ActionHost {
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
        fn render_default_action(&self, record: &Record) -> String {
            format!("<a class=\"gm2-action\" href=\"{}\">View</a>", escape_html(&record.url))
        }
        fn render_pagination(&self, _page: u32, _total_pages: u32) -> String {
            String::new()
        }
    }

    fn product(class: ProductClass) -> Record {
        Record {
            id: 7,
            record_type: "product".to_string(),
            title: "Enamel Mug".to_string(),
            description: String::new(),
            url: "/p/enamel-mug".to_string(),
            image_url: Some("/img/mug.jpg".to_string()),
            price: Some("19.99".to_string()),
            sku: None,
            rating: Some(4.5),
            on_sale: true,
            published_at: Utc::now(),
            status: RecordStatus::Published,
            product: Some(ProductInfo {
                class,
                purchasable: true,
                in_stock: true,
                sold_individually: false,
                visible: true,
            }),
        }
    }

    #[test]
    fn test_card_structure() {
        let html = render_card(&product(ProductClass::Simple), &ActionHost);
        assert!(html.starts_with("<li class=\"product gm2-search-result\">"));
        assert!(html.contains("<span class=\"onsale\">Sale!</span>"));
        assert!(html.contains("gm2-result-title\">Enamel Mug</h2>"));
        assert!(html.contains("gm2-result-price\">19.99</span>"));
        assert!(html.contains("Rated 4.5 out of 5"));
        assert!(html.ends_with("</li>"));
    }

    #[test]
    fn test_simple_purchasable_gets_stepper() {
        let html = render_card(&product(ProductClass::Simple), &ActionHost);
        assert!(html.contains("gm2-quantity-add"));
        assert!(html.contains("gm2-add-to-cart"));
        assert!(!html.contains("gm2-action\""));
    }

    #[test]
    fn test_non_simple_classes_use_host_action() {
        for class in [
            ProductClass::Variable,
            ProductClass::Grouped,
            ProductClass::External,
        ] {
            let html = render_card(&product(class), &ActionHost);
            assert!(!html.contains("gm2-quantity-add"));
            assert!(html.contains("gm2-action\""));
        }
    }

    #[test]
    fn test_stepper_gating() {
        let base = ProductInfo {
            class: ProductClass::Simple,
            purchasable: true,
            in_stock: true,
            sold_individually: false,
            visible: true,
        };
        assert!(stepper_applies(&base));

        let mut locked = base.clone();
        locked.sold_individually = true;
        assert!(!stepper_applies(&locked));

        let mut out_of_stock = base.clone();
        out_of_stock.in_stock = false;
        assert!(!stepper_applies(&out_of_stock));

        let mut unpurchasable = base.clone();
        unpurchasable.purchasable = false;
        assert!(!stepper_applies(&unpurchasable));
    }

    #[test]
    fn test_titles_are_escaped() {
        let mut record = product(ProductClass::Simple);
        record.title = "A <b>\"bold\"</b> & plan".to_string();
        let html = render_card(&record, &ActionHost);
        assert!(html.contains("A &lt;b&gt;&quot;bold&quot;&lt;/b&gt; &amp; plan"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_missing_image_gets_placeholder() {
        let mut record = product(ProductClass::Simple);
        record.image_url = None;
        let html = render_card(&record, &ActionHost);
        assert!(html.contains("gm2-result-media-placeholder"));
        assert!(!html.contains("<img"));
    }
}
