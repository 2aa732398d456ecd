//! Catalog schema for the SQLite reference host.

/// Create-if-missing DDL, safe to run on every open.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY,
    record_type TEXT NOT NULL DEFAULT 'product',
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL DEFAULT '',
    image_url TEXT,
    rating REAL,
    on_sale INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'published',
    published_at TEXT NOT NULL,
    product_class TEXT,
    purchasable INTEGER NOT NULL DEFAULT 1,
    in_stock INTEGER NOT NULL DEFAULT 1,
    sold_individually INTEGER NOT NULL DEFAULT 0,
    visible INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS record_meta (
    record_id INTEGER NOT NULL REFERENCES records(id),
    meta_key TEXT NOT NULL,
    meta_value TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_record_meta_lookup ON record_meta(record_id, meta_key);

CREATE TABLE IF NOT EXISTS terms (
    id INTEGER PRIMARY KEY,
    taxonomy TEXT NOT NULL,
    name TEXT NOT NULL,
    slug TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_terms_taxonomy_slug ON terms(taxonomy, slug);

CREATE TABLE IF NOT EXISTS term_relationships (
    record_id INTEGER NOT NULL REFERENCES records(id),
    term_id INTEGER NOT NULL REFERENCES terms(id),
    PRIMARY KEY (record_id, term_id)
);
";
