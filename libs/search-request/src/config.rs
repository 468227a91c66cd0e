//! Compiler configuration
//!
//! Settings are read from an optional file (YAML, TOML or JSON, chosen by
//! extension) and then overridden by environment variables such as
//! `SIEVE_SEARCH__INDEX_PREFIX=staging_`.

use crate::container::SortOverride;
use crate::error::{Error, Result};
use crate::field::FieldDefinition;
use crate::query::QueryNode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub const ENV_PREFIX: &str = "SIEVE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub search: SearchConfig,
    pub catalogs: Vec<CatalogConfig>,
    pub containers: Vec<ContainerDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub index_prefix: String,
    /// Document identifier used as the secondary tie-break.
    pub identifier_field: String,
    /// Catch-all text field used when a container has no searchable field.
    pub fulltext_field: String,
    pub default_facet_size: u32,
    pub default_histogram_interval: f64,
    pub facet_filter_mode: FacetFilterMode,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_prefix: String::new(),
            identifier_field: "id".to_string(),
            fulltext_field: "search".to_string(),
            default_facet_size: 10,
            default_histogram_interval: 1.0,
            facet_filter_mode: FacetFilterMode::default(),
        }
    }
}

/// How criteria on faceted fields interact with facet counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetFilterMode {
    /// Faceted criteria move to the post filter; each facet is counted
    /// against every other facet's criteria but not its own.
    #[default]
    ExcludeSelf,
    /// Every criterion restricts the main query and every facet.
    ApplyAll,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub id: u64,
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A named search container, available in every catalog unless `catalogs`
/// restricts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    pub name: String,
    /// Entity suffix of the index name (`product`, `category`).
    pub entity: String,
    /// Catalog codes this container is defined for. Empty means all.
    #[serde(default)]
    pub catalogs: Vec<String>,
    #[serde(default)]
    pub default_filters: Vec<QueryNode>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub sort_overrides: Vec<SortOverride>,
}

impl ContainerDefinition {
    pub fn is_available_in(&self, catalog_code: &str) -> bool {
        self.catalogs.is_empty() || self.catalogs.iter().any(|code| code == catalog_code)
    }
}

impl Config {
    /// Load settings from `path` (if any) layered under `SIEVE_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        tracing::debug!(
            catalogs = config.catalogs.len(),
            containers = config.containers.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        let mut codes = HashSet::new();
        for catalog in &self.catalogs {
            if catalog.code.trim().is_empty() {
                return Err(invalid(format!("catalog {} has an empty code", catalog.id)));
            }
            if !ids.insert(catalog.id) {
                return Err(invalid(format!("duplicate catalog id {}", catalog.id)));
            }
            if !codes.insert(catalog.code.as_str()) {
                return Err(invalid(format!("duplicate catalog code '{}'", catalog.code)));
            }
        }

        let mut names = HashSet::new();
        for container in &self.containers {
            if container.name.trim().is_empty() || container.entity.trim().is_empty() {
                return Err(invalid("containers need a name and an entity"));
            }
            if !names.insert(container.name.as_str()) {
                return Err(invalid(format!("duplicate container '{}'", container.name)));
            }
            if let Some(unknown) = container
                .catalogs
                .iter()
                .find(|code| !codes.contains(code.as_str()))
            {
                return Err(invalid(format!(
                    "container '{}' references unknown catalog '{unknown}'",
                    container.name
                )));
            }

            let mut fields = HashSet::new();
            for field in &container.fields {
                if field.code.trim().is_empty() {
                    return Err(invalid(format!(
                        "container '{}' has a field with an empty code",
                        container.name
                    )));
                }
                if !fields.insert(field.code.as_str()) {
                    return Err(invalid(format!(
                        "container '{}' declares field '{}' twice",
                        container.name, field.code
                    )));
                }
            }

            for filter in &container.default_filters {
                filter.validate().map_err(|e| {
                    invalid(format!(
                        "container '{}' has an invalid default filter: {e}",
                        container.name
                    ))
                })?;
            }
        }

        if self.search.default_histogram_interval <= 0.0 {
            return Err(invalid("search.default_histogram_interval must be positive"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::Config(config::ConfigError::Message(message.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn catalog(id: u64, code: &str) -> CatalogConfig {
        CatalogConfig {
            id,
            code: code.to_string(),
            name: None,
        }
    }

    fn container(name: &str) -> ContainerDefinition {
        ContainerDefinition {
            name: name.to_string(),
            entity: "product".to_string(),
            catalogs: vec![],
            default_filters: vec![],
            fields: vec![],
            sort_overrides: vec![],
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert_eq!(config.search.identifier_field, "id");
        assert_eq!(config.search.fulltext_field, "search");
        assert_eq!(config.search.default_facet_size, 10);
        assert_eq!(config.search.default_histogram_interval, 1.0);
        assert_eq!(config.search.facet_filter_mode, FacetFilterMode::ExcludeSelf);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn duplicate_catalogs_are_rejected() {
        let mut config = Config::default();
        config.catalogs = vec![catalog(1, "b2c_fr"), catalog(1, "b2c_en")];
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.catalogs = vec![catalog(1, "b2c_fr"), catalog(2, "b2c_fr")];
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.catalogs = vec![catalog(1, "")];
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn duplicate_containers_and_fields_are_rejected() {
        let mut config = Config::default();
        config.containers = vec![container("product_catalog"), container("product_catalog")];
        assert!(config.validate().is_err());

        let mut product = container("product_catalog");
        let field: FieldDefinition =
            serde_json::from_str(r#"{"code":"sku","type":"keyword"}"#).unwrap();
        product.fields = vec![field.clone(), field];
        config.containers = vec![product];
        assert!(config.validate().is_err());
    }

    #[test]
    fn container_catalogs_must_exist() {
        let mut config = Config::default();
        config.catalogs = vec![catalog(1, "b2c_fr")];
        let mut product = container("product_catalog");
        product.catalogs = vec!["b2b_en".to_string()];
        config.containers = vec![product];
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_default_filters_are_rejected() {
        let mut product: ContainerDefinition = serde_json::from_str(
            r#"{
                "name": "product_catalog",
                "entity": "product",
                "default_filters": [{"type": "terms", "field": "visibility", "values": []}]
            }"#,
        )
        .unwrap();
        let mut config = Config::default();
        config.containers = vec![product.clone()];
        assert!(config.validate().is_err());

        product.default_filters.clear();
        config.containers = vec![product];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_reads_file_sections() {
        let mut file = tempfile_in_target("sieve-config-test.json");
        write!(
            file.1,
            r#"{{
                "search": {{ "index_prefix": "gally_", "facet_filter_mode": "apply_all" }},
                "catalogs": [{{ "id": 1, "code": "b2c_fr" }}],
                "containers": [{{
                    "name": "product_catalog",
                    "entity": "product",
                    "default_filters": [{{ "type": "term", "field": "is_active", "value": true }}],
                    "fields": [{{ "code": "price.price", "type": "price", "sortable": true }}]
                }}]
            }}"#
        )
        .unwrap();
        drop(file.1);

        let config = Config::load(Some(&file.0)).unwrap();
        std::fs::remove_file(&file.0).ok();

        assert_eq!(config.search.index_prefix, "gally_");
        assert_eq!(config.search.facet_filter_mode, FacetFilterMode::ApplyAll);
        assert_eq!(config.search.identifier_field, "id");
        assert_eq!(config.catalogs[0].code, "b2c_fr");
        assert_eq!(config.containers[0].default_filters.len(), 1);
        assert!(config.containers[0].fields[0].sortable);
        assert!(config.validate().is_ok());
    }

    fn tempfile_in_target(name: &str) -> (std::path::PathBuf, std::fs::File) {
        let path = std::env::temp_dir().join(format!("{}-{name}", std::process::id()));
        let file = std::fs::File::create(&path).unwrap();
        (path, file)
    }
}
