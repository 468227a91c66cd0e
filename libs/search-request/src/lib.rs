//! Search Request Compiler
//!
//! This crate compiles business-level search criteria (free text, filter
//! criteria, sort preferences and facet requests) into Elasticsearch request
//! bodies, and maps raw backend responses back into typed results.
//!
//! # Example
//!
//! ```rust,no_run
//! use sieve_search::{Config, RequestBuilder, SearchIntent, SortSpec};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(Some(std::path::Path::new("sieve.yaml")))?;
//! let builder = RequestBuilder::from_config(&config)?;
//!
//! let intent = SearchIntent::new("b2c_fr", "product_catalog")
//!     .text("leather bag")
//!     .sort_by(SortSpec::asc("price.price"));
//! let request = builder.create(&intent)?;
//! let body = request.to_search_body(builder.registry())?;
//! println!("{} {}", request.index_name, body);
//! # Ok(())
//! # }
//! ```

pub mod aggregation;
pub mod config;
pub mod container;
pub mod criteria;
pub mod error;
pub mod field;
pub mod query;
pub mod request;
pub mod response;
pub mod sort;

pub use aggregation::{
    AggregationBuilder, AggregationNode, BucketsPath, FacetFilters, FacetSpec,
    PipelineAggregation, PipelineKind,
};
pub use config::{Config, FacetFilterMode};
pub use container::{
    Catalog, ConfigurationCache, ConfigurationStore, ContainerConfiguration,
    InMemoryConfigurationStore, ResolutionScope, SortOverride,
};
pub use criteria::{CriteriaTranslator, DefaultCriteriaTranslator, FilterCriterion};
pub use error::{Error, ErrorCategory, Result};
pub use field::{FieldDescriptor, FieldType};
pub use query::{AssemblerRegistry, QueryAssembler, QueryKind, QueryNode};
pub use request::{
    AggregationResolver, CompiledRequest, QueryInput, RequestBuilder, SearchIntent, Spellchecker,
    SpellingType,
};
pub use response::SearchResponse;
pub use sort::{
    order_hits, SortClause, SortDirection, SortOrderBuilder, SortSpec, SortingOption,
};
