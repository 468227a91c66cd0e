//! Search container resolution and caching

use crate::config::{Config, ContainerDefinition};
use crate::error::{Error, Result};
use crate::field::{flatten, FieldDescriptor};
use crate::query::QueryNode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub id: u64,
    pub code: String,
    pub name: Option<String>,
}

impl Catalog {
    /// Whether `identifier` names this catalog, by numeric id or by code.
    pub fn matches(&self, identifier: &str) -> bool {
        self.code == identifier || identifier.parse::<u64>().is_ok_and(|id| id == self.id)
    }
}

/// Business-context substitution of a sort field.
///
/// With `context[context_key]` equal to one of the `targets` keys, a sort on
/// `field` is rewritten to the mapped field code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOverride {
    pub field: String,
    pub context_key: String,
    #[serde(default)]
    pub targets: BTreeMap<String, String>,
}

impl SortOverride {
    /// The substituted field code, or `None` to keep the default path.
    pub fn resolve(&self, context: &HashMap<String, String>) -> Option<&str> {
        let value = context.get(&self.context_key)?;
        match self.targets.get(value) {
            Some(target) => Some(target.as_str()),
            None => {
                tracing::warn!(
                    field = %self.field,
                    context_key = %self.context_key,
                    context_value = %value,
                    "No sort override for context value, using default field"
                );
                None
            }
        }
    }
}

/// Resolved configuration of one container in one catalog.
#[derive(Debug, Clone)]
pub struct ContainerConfiguration {
    name: String,
    catalog: Catalog,
    index_name: String,
    default_filters: Vec<QueryNode>,
    fields: Vec<FieldDescriptor>,
    // dotted and flattened code -> position in `fields`
    lookup: HashMap<String, usize>,
    sort_overrides: Vec<SortOverride>,
}

impl ContainerConfiguration {
    pub fn new(
        name: impl Into<String>,
        catalog: Catalog,
        index_name: impl Into<String>,
        default_filters: Vec<QueryNode>,
        fields: Vec<FieldDescriptor>,
        sort_overrides: Vec<SortOverride>,
    ) -> Self {
        let mut lookup = HashMap::with_capacity(fields.len() * 2);
        for (position, field) in fields.iter().enumerate() {
            lookup.insert(field.code().to_string(), position);
            lookup.insert(field.flattened_code(), position);
        }
        Self {
            name: name.into(),
            catalog,
            index_name: index_name.into(),
            default_filters,
            fields,
            lookup,
            sort_overrides,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn default_filters(&self) -> &[QueryNode] {
        &self.default_filters
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn searchable_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_searchable())
    }

    pub fn sortable_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_sortable())
    }

    /// Look up a field by dotted (`price.price`) or flattened (`price__price`) code.
    pub fn field(&self, code: &str) -> Option<&FieldDescriptor> {
        self.lookup.get(code).map(|&position| &self.fields[position])
    }

    pub fn require_field(&self, code: &str) -> Result<&FieldDescriptor> {
        self.field(code).ok_or_else(|| Error::UnknownField {
            field: code.to_string(),
            container: self.name.clone(),
        })
    }

    pub fn sort_override(&self, code: &str) -> Option<&SortOverride> {
        let flat = flatten(code);
        self.sort_overrides
            .iter()
            .find(|o| o.field == code || flatten(&o.field) == flat)
    }
}

/// Read-only source of catalog and container metadata.
pub trait ConfigurationStore: Send + Sync {
    fn catalog(&self, identifier: &str) -> Result<Catalog>;

    fn container(&self, catalog: &Catalog, name: &str) -> Result<ContainerConfiguration>;
}

/// Store backed by a loaded [`Config`].
#[derive(Debug, Clone)]
pub struct InMemoryConfigurationStore {
    index_prefix: String,
    catalogs: Vec<Catalog>,
    containers: HashMap<String, ContainerDefinition>,
}

impl InMemoryConfigurationStore {
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let catalogs = config
            .catalogs
            .iter()
            .map(|c| Catalog {
                id: c.id,
                code: c.code.clone(),
                name: c.name.clone(),
            })
            .collect();
        let containers = config
            .containers
            .iter()
            .map(|c| (c.name.clone(), c.clone()))
            .collect();
        Ok(Self {
            index_prefix: config.search.index_prefix.clone(),
            catalogs,
            containers,
        })
    }

    /// `{prefix}{catalog code}_{entity}`
    pub fn index_name(&self, catalog: &Catalog, entity: &str) -> String {
        format!("{}{}_{}", self.index_prefix, catalog.code, entity)
    }
}

impl ConfigurationStore for InMemoryConfigurationStore {
    fn catalog(&self, identifier: &str) -> Result<Catalog> {
        self.catalogs
            .iter()
            .find(|c| c.matches(identifier))
            .cloned()
            .ok_or_else(|| Error::UnknownCatalog(identifier.to_string()))
    }

    fn container(&self, catalog: &Catalog, name: &str) -> Result<ContainerConfiguration> {
        let definition = self
            .containers
            .get(name)
            .filter(|d| d.is_available_in(&catalog.code))
            .ok_or_else(|| Error::UnknownContainer {
                catalog: catalog.code.clone(),
                container: name.to_string(),
            })?;

        let fields = definition
            .fields
            .iter()
            .map(FieldDescriptor::from_definition)
            .collect::<Result<Vec<_>>>()?;

        Ok(ContainerConfiguration::new(
            definition.name.clone(),
            catalog.clone(),
            self.index_name(catalog, &definition.entity),
            definition.default_filters.clone(),
            fields,
            definition.sort_overrides.clone(),
        ))
    }
}

type CacheKey = (String, String);

/// Process-wide, read-mostly cache of resolved containers.
///
/// Concurrent misses on the same key may both query the store; only the first
/// result is kept.
pub struct ConfigurationCache {
    store: Arc<dyn ConfigurationStore>,
    // (catalog identifier, container name) -> configuration
    cache: RwLock<HashMap<CacheKey, Arc<ContainerConfiguration>>>,
}

impl ConfigurationCache {
    pub fn new(store: Arc<dyn ConfigurationStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Drop every cached configuration.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn resolve(&self, catalog: &str, container: &str) -> Result<Arc<ContainerConfiguration>> {
        let key = (catalog.to_string(), container.to_string());

        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(config) = cache.get(&key) {
                tracing::debug!(catalog, container, "Container found in cache");
                return Ok(Arc::clone(config));
            }
        }

        tracing::debug!(catalog, container, "Cache miss, resolving container");
        let resolved_catalog = self.store.catalog(catalog)?;
        let resolved = Arc::new(self.store.container(&resolved_catalog, container)?);

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let entry = cache.entry(key).or_insert(resolved);
        Ok(Arc::clone(entry))
    }
}

/// Memoizes resolutions for the duration of one compilation.
pub struct ResolutionScope<'a> {
    cache: &'a ConfigurationCache,
    resolved: HashMap<CacheKey, Arc<ContainerConfiguration>>,
}

impl<'a> ResolutionScope<'a> {
    pub fn new(cache: &'a ConfigurationCache) -> Self {
        Self {
            cache,
            resolved: HashMap::new(),
        }
    }

    pub fn resolve(&mut self, catalog: &str, container: &str) -> Result<Arc<ContainerConfiguration>> {
        let key = (catalog.to_string(), container.to_string());
        if let Some(config) = self.resolved.get(&key) {
            return Ok(Arc::clone(config));
        }
        let config = self.cache.resolve(catalog, container)?;
        self.resolved.insert(key, Arc::clone(&config));
        Ok(config)
    }
}
