//! `CatalogHost` implemented over a SQLite database.
//!
//! Criteria become one generated SELECT with inline, escaped literals.
//! Relevance fragments from `query::scorer` are merged verbatim: its
//! joins and score column are added, and its predicate is OR-combined
//! with the base search predicate inside the outer AND.

use crate::config::PluginConfig;
use crate::host::catalog::{
    CatalogHost, HostError, ProductClass, ProductInfo, Record, RecordStatus, TemplateDocument,
};
use crate::host::criteria::{QueryCriteria, ResultPage, SortField, TermOperator};
use crate::listing::card::escape_html;
use crate::query::scorer;
use crate::store::schema;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, warn};

const SELECT_COLUMNS: &str = "SELECT records.id, records.record_type, records.title, \
    records.description, records.url, records.image_url, records.rating, records.on_sale, \
    records.status, records.published_at, records.product_class, records.purchasable, \
    records.in_stock, records.sold_individually, records.visible, \
    (SELECT meta_value FROM record_meta WHERE record_id = records.id AND meta_key = '_price') AS price, \
    (SELECT meta_value FROM record_meta WHERE record_id = records.id AND meta_key = '_sku') AS sku";

/// Price join for price-ordered queries that carry no relevance joins.
const PRICE_JOIN: &str = "LEFT JOIN record_meta AS gm2_price \
    ON gm2_price.record_id = records.id AND gm2_price.meta_key = '_price'";

/// Insert arguments for one catalog item.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub url: String,
    pub image_url: Option<String>,
    pub price: Option<String>,
    pub sku: Option<String>,
    pub rating: Option<f32>,
    pub on_sale: bool,
    pub published_at: DateTime<Utc>,
    pub status: RecordStatus,
    pub class: ProductClass,
    pub purchasable: bool,
    pub in_stock: bool,
    pub sold_individually: bool,
    pub visible: bool,
}

impl Default for NewProduct {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            url: String::new(),
            image_url: None,
            price: None,
            sku: None,
            rating: None,
            on_sale: false,
            published_at: Utc::now(),
            status: RecordStatus::Published,
            class: ProductClass::Simple,
            purchasable: true,
            in_stock: true,
            sold_individually: false,
            visible: true,
        }
    }
}

impl NewProduct {
    /// Shorthand for the common title + price case.
    pub fn titled(title: &str, price: &str) -> Self {
        Self {
            title: title.to_string(),
            price: Some(price.to_string()),
            ..Self::default()
        }
    }
}

/// SQLite-backed catalog host.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
    config: PluginConfig,
    templates: RwLock<HashMap<u64, TemplateDocument>>,
    commerce: bool,
}

impl SqliteCatalog {
    /// Open an in-memory catalog, used by tests and the search command.
    pub fn open_in_memory(config: PluginConfig) -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory catalog")?;
        Self::init(conn, config)
    }

    /// Open or create a catalog database file.
    pub fn open(path: &Path, config: PluginConfig) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open catalog database {}", path.display()))?;
        Self::init(conn, config)
    }

    fn init(conn: Connection, config: PluginConfig) -> Result<Self> {
        conn.execute_batch(schema::SCHEMA)
            .context("failed to create catalog schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
            config,
            templates: RwLock::new(HashMap::new()),
            commerce: true,
        })
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn set_commerce_active(&mut self, active: bool) {
        self.commerce = active;
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a catalog item and its price/SKU meta rows.
    pub fn add_product(&self, product: &NewProduct) -> Result<u64> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO records (record_type, title, description, url, image_url, rating, \
             on_sale, status, published_at, product_class, purchasable, in_stock, \
             sold_individually, visible) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                self.config.catalog_record_type,
                product.title,
                product.description,
                product.url,
                product.image_url,
                product.rating.map(f64::from),
                product.on_sale,
                product.status.as_str(),
                product.published_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                product.class.as_str(),
                product.purchasable,
                product.in_stock,
                product.sold_individually,
                product.visible,
            ],
        )?;
        let id = conn.last_insert_rowid() as u64;
        if let Some(price) = &product.price {
            conn.execute(
                "INSERT INTO record_meta (record_id, meta_key, meta_value) VALUES (?1, '_price', ?2)",
                params![id as i64, price],
            )?;
        }
        if let Some(sku) = &product.sku {
            conn.execute(
                "INSERT INTO record_meta (record_id, meta_key, meta_value) VALUES (?1, '_sku', ?2)",
                params![id as i64, sku],
            )?;
        }
        Ok(id)
    }

    /// Insert a plain content record.
    pub fn add_post(
        &self,
        title: &str,
        description: &str,
        published_at: DateTime<Utc>,
    ) -> Result<u64> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO records (record_type, title, description, published_at) \
             VALUES ('post', ?1, ?2, ?3)",
            params![
                title,
                description,
                published_at.to_rfc3339_opts(SecondsFormat::Secs, true)
            ],
        )?;
        Ok(conn.last_insert_rowid() as u64)
    }

    pub fn add_term(&self, taxonomy: &str, name: &str, slug: &str) -> Result<u64> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO terms (taxonomy, name, slug) VALUES (?1, ?2, ?3)",
            params![taxonomy, name, slug],
        )?;
        Ok(conn.last_insert_rowid() as u64)
    }

    pub fn link_term(&self, record_id: u64, term_id: u64) -> Result<()> {
        self.lock().execute(
            "INSERT OR IGNORE INTO term_relationships (record_id, term_id) VALUES (?1, ?2)",
            params![record_id as i64, term_id as i64],
        )?;
        Ok(())
    }

    pub fn register_template(&self, template: TemplateDocument) {
        self.templates
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(template.id, template);
    }

    /// Load a small demo catalog. No-op when records already exist.
    pub fn seed_demo(&self) -> Result<()> {
        let existing: i64 =
            self.lock()
                .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(());
        }

        let catalog_tax = self.config.catalog_taxonomy.clone();
        let color_tax = format!("{}color", self.config.attribute_taxonomy_prefix);
        let drinkware = self.add_term(&catalog_tax, "Drinkware", "drinkware")?;
        let apparel = self.add_term(&catalog_tax, "Apparel", "apparel")?;
        let blue = self.add_term(&color_tax, "Blue", "blue")?;
        let green = self.add_term(&color_tax, "Green", "green")?;
        self.add_term(&self.config.default_taxonomy, "News", "news")?;

        let now = Utc::now();
        let mug = self.add_product(&NewProduct {
            description: "Speckled enamel mug that shrugs off campfire duty.".to_string(),
            url: "/product/enamel-camping-mug".to_string(),
            image_url: Some("/img/enamel-camping-mug.jpg".to_string()),
            sku: Some("MUG-001".to_string()),
            rating: Some(4.5),
            published_at: now - Duration::days(1),
            ..NewProduct::titled("Enamel Camping Mug", "19.99")
        })?;
        self.link_term(mug, drinkware)?;
        self.link_term(mug, blue)?;

        let cup = self.add_product(&NewProduct {
            description: "Stoneware cup sized for a double shot.".to_string(),
            url: "/product/ceramic-espresso-cup".to_string(),
            sku: Some("CUP-010".to_string()),
            rating: Some(4.0),
            on_sale: true,
            published_at: now - Duration::days(2),
            ..NewProduct::titled("Ceramic Espresso Cup", "12.50")
        })?;
        self.link_term(cup, drinkware)?;

        let flask = self.add_product(&NewProduct {
            description: "Vacuum flask that keeps coffee hot through a long shift.".to_string(),
            url: "/product/thermal-travel-flask".to_string(),
            sku: Some("FLASK-002".to_string()),
            class: ProductClass::Variable,
            published_at: now - Duration::days(4),
            ..NewProduct::titled("Thermal Travel Flask", "29.00")
        })?;
        self.link_term(flask, drinkware)?;

        let tote = self.add_product(&NewProduct {
            description: "Heavy canvas tote with riveted handles.".to_string(),
            url: "/product/canvas-tote-bag".to_string(),
            sku: Some("BAG-001".to_string()),
            published_at: now - Duration::days(6),
            ..NewProduct::titled("Canvas Tote Bag", "15.00")
        })?;
        self.link_term(tote, apparel)?;

        let hoodie = self.add_product(&NewProduct {
            description: "Midweight fleece hoodie for trail mornings.".to_string(),
            url: "/product/trail-hoodie".to_string(),
            sku: Some("HOOD-001".to_string()),
            rating: Some(4.8),
            published_at: now - Duration::days(8),
            ..NewProduct::titled("Trail Hoodie", "49.99")
        })?;
        self.link_term(hoodie, apparel)?;
        self.link_term(hoodie, green)?;

        let socks = self.add_product(&NewProduct {
            description: "Merino hiking socks, cushioned heel.".to_string(),
            url: "/product/wool-hiking-socks".to_string(),
            sku: Some("SOCK-001".to_string()),
            published_at: now - Duration::days(10),
            ..NewProduct::titled("Wool Hiking Socks", "9.99")
        })?;
        self.link_term(socks, apparel)?;

        self.add_post(
            "Caring for enamelware",
            "How to keep an enamel mug chip free.",
            now - Duration::days(3),
        )?;
        Ok(())
    }

    fn lookup_term_ids(&self, taxonomy: &str, slugs: &[String]) -> rusqlite::Result<Vec<u64>> {
        let placeholders = (2..slugs.len() + 2)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql =
            format!("SELECT id FROM terms WHERE taxonomy = ?1 AND slug IN ({placeholders}) ORDER BY id");
        let conn = self.lock();
        let mut stmt = conn.prepare(&sql)?;
        let bind = std::iter::once(taxonomy).chain(slugs.iter().map(String::as_str));
        let ids = stmt
            .query_map(rusqlite::params_from_iter(bind), |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids.into_iter().map(|id| id as u64).collect())
    }
}

impl CatalogHost for SqliteCatalog {
    fn catalog_record_type(&self) -> &str {
        &self.config.catalog_record_type
    }

    fn catalog_taxonomy(&self) -> &str {
        &self.config.catalog_taxonomy
    }

    fn default_taxonomy(&self) -> &str {
        &self.config.default_taxonomy
    }

    fn taxonomy_exists(&self, taxonomy: &str) -> bool {
        self.lock()
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM terms WHERE taxonomy = ?1)",
                params![taxonomy],
                |row| row.get(0),
            )
            .unwrap_or(false)
    }

    fn term_ids_for_slugs(&self, taxonomy: &str, slugs: &[String]) -> Vec<u64> {
        if slugs.is_empty() {
            return Vec::new();
        }
        self.lookup_term_ids(taxonomy, slugs).unwrap_or_else(|err| {
            warn!(%err, taxonomy, "term lookup failed");
            Vec::new()
        })
    }

    fn execute(&self, criteria: &QueryCriteria) -> Result<ResultPage<Record>, HostError> {
        let rel = scorer::relevance_sql(
            criteria,
            &self.config.catalog_record_type,
            &self.config.attribute_taxonomy_prefix,
        );

        let mut from_sql = String::from("FROM records");
        if let Some(rel) = &rel {
            for join in &rel.joins {
                from_sql.push(' ');
                from_sql.push_str(join);
            }
        } else if criteria.sort_field == SortField::Price {
            from_sql.push(' ');
            from_sql.push_str(PRICE_JOIN);
        }

        let mut conditions = vec!["records.status = 'published'".to_string()];
        if !criteria.record_types.is_empty() {
            let types = criteria
                .record_types
                .iter()
                .map(|t| quote(t))
                .collect::<Vec<_>>()
                .join(", ");
            conditions.push(format!("records.record_type IN ({types})"));
        }
        let term = criteria.search_term.as_deref().unwrap_or("").trim();
        if !term.is_empty() {
            let like = format!("%{}%", scorer::escape_like(term));
            let base = format!(
                "(records.title LIKE '{like}' ESCAPE '\\' \
                 OR records.description LIKE '{like}' ESCAPE '\\')"
            );
            conditions.push(match &rel {
                Some(rel) => format!("({base} OR {})", rel.predicate),
                None => base,
            });
        }
        if !criteria.include_ids.is_empty() {
            conditions.push(format!("records.id IN ({})", id_list(&criteria.include_ids)));
        }
        if !criteria.exclude_ids.is_empty() {
            conditions.push(format!(
                "records.id NOT IN ({})",
                id_list(&criteria.exclude_ids)
            ));
        }
        for filter in &criteria.term_filters {
            if filter.term_ids.is_empty() {
                continue;
            }
            let negate = match filter.operator {
                TermOperator::In => "",
                TermOperator::NotIn => "NOT ",
            };
            conditions.push(format!(
                "{negate}EXISTS (SELECT 1 FROM term_relationships tr \
                 INNER JOIN terms t ON t.id = tr.term_id \
                 WHERE tr.record_id = records.id AND t.taxonomy = {} AND tr.term_id IN ({}))",
                quote(&filter.taxonomy),
                id_list(&filter.term_ids),
            ));
        }
        if let Some(cutoff) = criteria.published_after {
            conditions.push(format!(
                "records.published_at >= {}",
                quote(&cutoff.to_rfc3339_opts(SecondsFormat::Secs, true))
            ));
        }
        let where_sql = conditions.join(" AND ");

        let conn = self.lock();
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(DISTINCT records.id) {from_sql} WHERE {where_sql}"),
            [],
            |row| row.get(0),
        )?;

        let page = criteria.page.max(1);
        let per_page = criteria.per_page.max(1);
        let offset = (page as u64 - 1) * per_page as u64;

        let mut sql = String::from(SELECT_COLUMNS);
        if let Some(rel) = &rel {
            sql.push_str(", ");
            sql.push_str(&rel.select);
        }
        sql.push(' ');
        sql.push_str(&from_sql);
        sql.push_str(" WHERE ");
        sql.push_str(&where_sql);
        if let Some(rel) = &rel {
            sql.push_str(" GROUP BY ");
            sql.push_str(&rel.group_by);
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&scorer::order_clause(criteria, rel.is_some()));
        sql.push_str(&format!(" LIMIT {per_page} OFFSET {offset}"));

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map([], row_to_record)?
            .collect::<rusqlite::Result<Vec<Record>>>()?;

        let total = total.max(0) as u64;
        let total_pages = if total == 0 {
            0
        } else {
            ((total + per_page as u64 - 1) / per_page as u64) as u32
        };
        debug!(total, page, returned = items.len(), "catalog query");

        Ok(ResultPage {
            items,
            total,
            total_pages,
            page,
            per_page,
        })
    }

    fn template(&self, template_id: u64) -> Option<TemplateDocument> {
        self.templates
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&template_id)
            .cloned()
    }

    fn render_template(
        &self,
        template_id: u64,
        item: Option<&Record>,
    ) -> Result<String, HostError> {
        let doc = self
            .template(template_id)
            .ok_or(HostError::TemplateMissing(template_id))?;
        let markup = doc
            .markup
            .as_deref()
            .ok_or_else(|| HostError::Render(format!("template {template_id} has no markup")))?;
        Ok(match item {
            Some(record) => substitute_tokens(markup, record),
            None => markup.to_string(),
        })
    }

    fn render_default_action(&self, record: &Record) -> String {
        format!(
            "<a href=\"{}\" class=\"button product-link\" data-record-id=\"{}\">View product</a>",
            escape_html(&record.url),
            record.id
        )
    }

    fn render_pagination(&self, page: u32, total_pages: u32) -> String {
        if total_pages <= 1 {
            return String::new();
        }
        let mut out = String::from("<nav class=\"gm2-pagination\">");
        for p in 1..=total_pages {
            if p == page {
                out.push_str(&format!("<span class=\"page-number current\">{p}</span>"));
            } else {
                out.push_str(&format!("<a class=\"page-number\" href=\"?paged={p}\">{p}</a>"));
            }
        }
        out.push_str("</nav>");
        out
    }

    fn default_page_size(&self) -> u32 {
        self.config.default_page_size
    }

    fn max_page_size(&self) -> u32 {
        self.config.max_page_size
    }

    fn commerce_active(&self) -> bool {
        self.commerce
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let status: String = row.get(8)?;
    let published_at: String = row.get(9)?;
    let class: Option<String> = row.get(10)?;
    let product = match class.as_deref().and_then(ProductClass::parse) {
        Some(class) => Some(ProductInfo {
            class,
            purchasable: row.get(11)?,
            in_stock: row.get(12)?,
            sold_individually: row.get(13)?,
            visible: row.get(14)?,
        }),
        None => None,
    };
    Ok(Record {
        id: row.get::<_, i64>(0)? as u64,
        record_type: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        url: row.get(4)?,
        image_url: row.get(5)?,
        price: row.get(15)?,
        sku: row.get(16)?,
        rating: row.get::<_, Option<f64>>(6)?.map(|r| r as f32),
        on_sale: row.get(7)?,
        published_at: DateTime::parse_from_rfc3339(&published_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::MIN_UTC),
        status: RecordStatus::parse(&status),
        product,
    })
}

/// Fill a template's item tokens from one record. Every substituted
/// value is HTML-escaped.
fn substitute_tokens(markup: &str, record: &Record) -> String {
    markup
        .replace("{{title}}", &escape_html(&record.title))
        .replace("{{excerpt}}", &escape_html(&record.description))
        .replace("{{url}}", &escape_html(&record.url))
        .replace(
            "{{price}}",
            &escape_html(record.price.as_deref().unwrap_or("")),
        )
        .replace(
            "{{image}}",
            &escape_html(record.image_url.as_deref().unwrap_or("")),
        )
}

/// Single-quoted SQL string literal.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn id_list(ids: &[u64]) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
