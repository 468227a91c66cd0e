//! Search request compilation
//!
//! [`RequestBuilder::create`] turns a [`SearchIntent`] into a
//! [`CompiledRequest`]: it resolves the container, combines the text query,
//! translated criteria, prebuilt filters and the container's default filters
//! into one filtered query, then resolves sort clauses and facet
//! aggregations. Compilation either succeeds completely or returns an error.

use crate::aggregation::{self, AggregationBuilder, AggregationNode, FacetFilters, FacetSpec};
use crate::config::{Config, FacetFilterMode, SearchConfig};
use crate::container::{
    ConfigurationCache, ContainerConfiguration, InMemoryConfigurationStore, ResolutionScope,
};
use crate::criteria::{CriteriaTranslator, DefaultCriteriaTranslator, FilterCriterion};
use crate::error::Result;
use crate::field::flatten;
use crate::query::{
    AssemblerRegistry, BoolQuery, FilteredQuery, MatchQuery, NestedQuery, QueryKind, QueryNode,
    ScoreMode,
};
use crate::sort::{SortClause, SortOrderBuilder, SortSpec};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: u64 = 20;

fn default_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

/// How the text query was spelled, as reported by a [`Spellchecker`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellingType {
    #[default]
    Exact,
    MostExact,
    MostFuzzy,
    AllFuzzy,
    PureStopwords,
}

pub trait Spellchecker: Send + Sync {
    fn spelling_type(&self, config: &ContainerConfiguration, text: &str) -> SpellingType;
}

/// Reports every text as exactly spelled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSpellchecker;

impl Spellchecker for NoopSpellchecker {
    fn spelling_type(&self, _config: &ContainerConfiguration, _text: &str) -> SpellingType {
        SpellingType::Exact
    }
}

/// Supplies facets beyond the ones a caller asked for.
pub trait AggregationResolver: Send + Sync {
    fn resolve(&self, config: &ContainerConfiguration, intent: &SearchIntent)
        -> Result<Vec<FacetSpec>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAggregationResolver;

impl AggregationResolver for NoopAggregationResolver {
    fn resolve(
        &self,
        _config: &ContainerConfiguration,
        _intent: &SearchIntent,
    ) -> Result<Vec<FacetSpec>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryInput {
    /// Free text, matched against the container's searchable fields.
    Text(String),
    /// Prebuilt scored query.
    Node(QueryNode),
}

/// Everything a caller wants from one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIntent {
    /// Catalog id or code.
    pub catalog: String,
    pub container: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub from: u64,
    #[serde(default = "default_size")]
    pub size: u64,
    #[serde(default)]
    pub query: Option<QueryInput>,
    #[serde(default)]
    pub sort: Vec<SortSpec>,
    #[serde(default)]
    pub filters: Vec<FilterCriterion>,
    /// Already built filter-only nodes.
    #[serde(default)]
    pub query_filters: Vec<QueryNode>,
    #[serde(default)]
    pub facets: Vec<FacetSpec>,
    /// Business context values such as the price group.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl SearchIntent {
    pub fn new(catalog: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            catalog: catalog.into(),
            container: container.into(),
            name: None,
            from: 0,
            size: DEFAULT_PAGE_SIZE,
            query: None,
            sort: Vec::new(),
            filters: Vec::new(),
            query_filters: Vec::new(),
            facets: Vec::new(),
            context: HashMap::new(),
        }
    }

    pub fn page(mut self, from: u64, size: u64) -> Self {
        self.from = from;
        self.size = size;
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.query = Some(QueryInput::Text(text.into()));
        self
    }

    pub fn query_node(mut self, node: impl Into<QueryNode>) -> Self {
        self.query = Some(QueryInput::Node(node.into()));
        self
    }

    pub fn sort_by(mut self, spec: SortSpec) -> Self {
        self.sort.push(spec);
        self
    }

    pub fn filter(mut self, criterion: FilterCriterion) -> Self {
        self.filters.push(criterion);
        self
    }

    pub fn query_filter(mut self, node: impl Into<QueryNode>) -> Self {
        self.query_filters.push(node.into());
        self
    }

    pub fn facet(mut self, facet: FacetSpec) -> Self {
        self.facets.push(facet);
        self
    }

    pub fn context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Immutable result of one compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRequest {
    pub name: String,
    pub index_name: String,
    pub from: u64,
    pub size: u64,
    /// Always a [`QueryNode::Filtered`].
    pub query: QueryNode,
    /// Criteria on faceted fields, applied after aggregation.
    pub post_filter: Option<QueryNode>,
    pub sort_orders: Vec<SortClause>,
    pub aggregations: Vec<AggregationNode>,
    pub spelling_type: SpellingType,
}

impl CompiledRequest {
    /// Render the backend search body.
    pub fn to_search_body(&self, registry: &AssemblerRegistry) -> Result<JsonValue> {
        let mut body = Map::new();
        body.insert("from".to_string(), self.from.into());
        body.insert("size".to_string(), self.size.into());
        body.insert("query".to_string(), registry.assemble(&self.query)?);
        body.insert(
            "sort".to_string(),
            JsonValue::Array(self.sort_orders.iter().map(SortClause::to_wire).collect()),
        );
        if !self.aggregations.is_empty() {
            body.insert(
                "aggs".to_string(),
                aggregation::render_all(&self.aggregations, registry)?,
            );
        }
        if let Some(post_filter) = &self.post_filter {
            body.insert("post_filter".to_string(), registry.assemble(post_filter)?);
        }
        Ok(JsonValue::Object(body))
    }
}

pub struct RequestBuilder {
    settings: SearchConfig,
    cache: Arc<ConfigurationCache>,
    registry: AssemblerRegistry,
    translator: Box<dyn CriteriaTranslator>,
    spellchecker: Box<dyn Spellchecker>,
    aggregation_resolver: Box<dyn AggregationResolver>,
}

impl RequestBuilder {
    pub fn new(settings: SearchConfig, cache: Arc<ConfigurationCache>) -> Self {
        Self {
            settings,
            cache,
            registry: AssemblerRegistry::with_defaults(),
            translator: Box::new(DefaultCriteriaTranslator),
            spellchecker: Box::new(NoopSpellchecker),
            aggregation_resolver: Box::new(NoopAggregationResolver),
        }
    }

    /// Builder over an in-memory store of `config`'s catalogs and containers.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = InMemoryConfigurationStore::from_config(config)?;
        let cache = Arc::new(ConfigurationCache::new(Arc::new(store)));
        Ok(Self::new(config.search.clone(), cache))
    }

    pub fn with_registry(mut self, registry: AssemblerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_translator(mut self, translator: Box<dyn CriteriaTranslator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_spellchecker(mut self, spellchecker: Box<dyn Spellchecker>) -> Self {
        self.spellchecker = spellchecker;
        self
    }

    pub fn with_aggregation_resolver(mut self, resolver: Box<dyn AggregationResolver>) -> Self {
        self.aggregation_resolver = resolver;
        self
    }

    pub fn settings(&self) -> &SearchConfig {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<ConfigurationCache> {
        &self.cache
    }

    pub fn registry(&self) -> &AssemblerRegistry {
        &self.registry
    }

    pub fn resolve(&self, catalog: &str, container: &str) -> Result<Arc<ContainerConfiguration>> {
        self.cache.resolve(catalog, container)
    }

    pub fn create(&self, intent: &SearchIntent) -> Result<CompiledRequest> {
        let mut scope = ResolutionScope::new(&self.cache);
        let container = scope.resolve(&intent.catalog, &intent.container)?;

        let (text, scored) = match &intent.query {
            Some(QueryInput::Text(text)) if !text.trim().is_empty() => {
                (Some(text.as_str()), Some(self.text_query(&container, text)?))
            }
            Some(QueryInput::Node(node)) => {
                node.validate()?;
                (None, Some(node.clone()))
            }
            _ => (None, None),
        };

        let mut facets = intent.facets.clone();
        facets.extend(self.aggregation_resolver.resolve(&container, intent)?);
        let faceted_fields: Vec<String> = facets
            .iter()
            .map(|f| {
                container
                    .field(&f.field)
                    .map_or_else(|| flatten(&f.field), |d| d.flattened_code())
            })
            .collect();

        let mut filters: Vec<QueryNode> = container.default_filters().to_vec();
        for node in &intent.query_filters {
            node.validate()?;
            filters.push(node.clone());
        }

        // (flattened field, node) for criteria deferred to the post filter
        let mut faceted: Vec<(String, QueryNode)> = Vec::new();
        for criterion in &intent.filters {
            let node = self.translator.translate(&container, criterion)?;
            let facet_field = criterion
                .field()
                .and_then(|code| container.field(code))
                .map(|d| d.flattened_code())
                .filter(|code| faceted_fields.contains(code));
            match (self.settings.facet_filter_mode, facet_field) {
                (FacetFilterMode::ExcludeSelf, Some(code)) => faceted.push((code, node)),
                _ => filters.push(node),
            }
        }

        let mut facet_filters = FacetFilters::new();
        for field in &faceted_fields {
            let others: Vec<QueryNode> = faceted
                .iter()
                .filter(|(code, _)| code != field)
                .map(|(_, node)| node.clone())
                .collect();
            if let Some(filter) = QueryNode::conjunction(others) {
                facet_filters.insert(field, filter);
            }
        }
        let post_filter =
            QueryNode::conjunction(faceted.into_iter().map(|(_, node)| node).collect());

        let query = FilteredQuery::new(scored, QueryNode::conjunction(filters)).into();

        let sort_orders = SortOrderBuilder::new(&self.settings.identifier_field).build(
            &container,
            &intent.sort,
            &intent.context,
        )?;
        let aggregations =
            AggregationBuilder::new(&self.settings).build(&container, &facets, &facet_filters)?;

        let spelling_type = text
            .map(|t| self.spellchecker.spelling_type(&container, t))
            .unwrap_or_default();

        tracing::debug!(
            catalog = %intent.catalog,
            container = %intent.container,
            index = container.index_name(),
            sort_clauses = sort_orders.len(),
            aggregations = aggregations.len(),
            post_filter = post_filter.is_some(),
            "Compiled search request"
        );

        Ok(CompiledRequest {
            name: intent
                .name
                .clone()
                .unwrap_or_else(|| container.name().to_string()),
            index_name: container.index_name().to_string(),
            from: intent.from,
            size: intent.size,
            query,
            post_filter,
            sort_orders,
            aggregations,
            spelling_type,
        })
    }

    /// Should-bool of `match` nodes over the searchable fields, boosted by
    /// weight. Falls back to the catch-all text field.
    fn text_query(&self, container: &ContainerConfiguration, text: &str) -> Result<QueryNode> {
        let mut should = Vec::new();
        for field in container.searchable_fields() {
            if !field.field_type().supports(QueryKind::Match) {
                continue;
            }
            let node: QueryNode = MatchQuery::new(field.code(), text)?
                .with_boost(field.weight())
                .into();
            should.push(match field.nested_path() {
                Some(path) => NestedQuery::new(path, node)?
                    .with_score_mode(ScoreMode::Max)
                    .into(),
                None => node,
            });
        }

        if should.is_empty() {
            tracing::debug!(
                container = container.name(),
                field = %self.settings.fulltext_field,
                "No searchable field, matching the catch-all field"
            );
            return Ok(MatchQuery::new(self.settings.fulltext_field.as_str(), text)?.into());
        }
        Ok(BoolQuery::new(Vec::new(), should, Vec::new())?.into())
    }
}
