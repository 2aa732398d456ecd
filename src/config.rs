//! Plugin configuration: catalog identity, taxonomy names, paging bounds.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for the search augmentation layer.
///
/// Every field has a default matching a stock storefront install, so an
/// absent or partial config file is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Record type of catalog items.
    #[serde(default = "default_catalog_record_type")]
    pub catalog_record_type: String,
    /// Taxonomy used when no better match exists for the record type.
    #[serde(default = "default_default_taxonomy")]
    pub default_taxonomy: String,
    /// Taxonomy that categorizes catalog items.
    #[serde(default = "default_catalog_taxonomy")]
    pub catalog_taxonomy: String,
    /// Taxonomy name prefix marking item attributes (color, size, ...).
    #[serde(default = "default_attribute_prefix")]
    pub attribute_taxonomy_prefix: String,
    /// Results per page when the request does not say.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    /// Upper bound for an explicit per-page request value.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    /// SQLite database path. In-memory when absent.
    #[serde(default)]
    pub database: Option<PathBuf>,
    /// Address the refresh endpoint binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_catalog_record_type() -> String {
    "product".to_string()
}

fn default_default_taxonomy() -> String {
    "category".to_string()
}

fn default_catalog_taxonomy() -> String {
    "product_cat".to_string()
}

fn default_attribute_prefix() -> String {
    "pa_".to_string()
}

fn default_page_size() -> u32 {
    12
}

fn default_max_page_size() -> u32 {
    100
}

fn default_bind() -> String {
    "127.0.0.1:8109".to_string()
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            catalog_record_type: default_catalog_record_type(),
            default_taxonomy: default_default_taxonomy(),
            catalog_taxonomy: default_catalog_taxonomy(),
            attribute_taxonomy_prefix: default_attribute_prefix(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            database: None,
            bind: default_bind(),
        }
    }
}

impl PluginConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Default config file location (`~/.gm2-search/config.json`).
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".gm2-search/config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PluginConfig::default();
        assert_eq!(config.catalog_record_type, "product");
        assert_eq!(config.catalog_taxonomy, "product_cat");
        assert_eq!(config.attribute_taxonomy_prefix, "pa_");
        assert_eq!(config.default_page_size, 12);
        assert!(config.database.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"default_page_size": 24}"#).unwrap();

        let config = PluginConfig::load(&path).unwrap();
        assert_eq!(config.default_page_size, 24);
        assert_eq!(config.catalog_record_type, "product");
        assert_eq!(config.bind, "127.0.0.1:8109");
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = PluginConfig::load_or_default(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config.default_page_size, 12);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(PluginConfig::load(&path).is_err());
    }
}
