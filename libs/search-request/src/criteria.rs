//! Filter criteria grammar and translation to query nodes
//!
//! Criteria arrive in the transport-level grammar:
//!
//! ```json
//! {"boolFilter": {
//!     "_must": [{"equalFilter": {"field": "color.value", "in": ["red", "grey"]}}],
//!     "_not":  [{"rangeFilter": {"field": "price.price", "gte": 100}}]
//! }}
//! ```

use crate::container::ContainerConfiguration;
use crate::error::{Error, Result};
use crate::field::FieldDescriptor;
use crate::query::{
    BoolQuery, ExistsQuery, MatchQuery, NestedQuery, QueryKind, QueryNode, RangeBounds,
    RangeQuery, Scalar, TermQuery, TermsQuery,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterCriterion {
    #[serde(rename = "equalFilter")]
    Equal(EqualFilter),
    #[serde(rename = "rangeFilter")]
    Range(RangeFilter),
    #[serde(rename = "matchFilter")]
    Match(MatchFilter),
    #[serde(rename = "existFilter")]
    Exist(ExistFilter),
    #[serde(rename = "boolFilter")]
    Bool(BoolFilter),
}

impl FilterCriterion {
    /// Field a leaf criterion applies to; `None` for boolean composites.
    pub fn field(&self) -> Option<&str> {
        match self {
            FilterCriterion::Equal(f) => Some(&f.field),
            FilterCriterion::Range(f) => Some(&f.field),
            FilterCriterion::Match(f) => Some(&f.field),
            FilterCriterion::Exist(f) => Some(&f.field),
            FilterCriterion::Bool(_) => None,
        }
    }
}

/// Exactly one of `eq` and `in` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualFilter {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eq: Option<Scalar>,
    #[serde(default, rename = "in", skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Scalar>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter {
    pub field: String,
    #[serde(flatten)]
    pub bounds: RangeBounds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchFilter {
    pub field: String,
    #[serde(rename = "match")]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistFilter {
    pub field: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoolFilter {
    #[serde(default, rename = "_must")]
    pub must: Vec<FilterCriterion>,
    #[serde(default, rename = "_should")]
    pub should: Vec<FilterCriterion>,
    #[serde(default, rename = "_not")]
    pub not: Vec<FilterCriterion>,
}

/// Converts transport criteria into query nodes for one container.
pub trait CriteriaTranslator: Send + Sync {
    fn translate(
        &self,
        config: &ContainerConfiguration,
        criterion: &FilterCriterion,
    ) -> Result<QueryNode>;
}

/// Validates criteria against the field catalog and builds term-level nodes,
/// wrapping fields under a nested path in a `nested` node.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCriteriaTranslator;

impl CriteriaTranslator for DefaultCriteriaTranslator {
    fn translate(
        &self,
        config: &ContainerConfiguration,
        criterion: &FilterCriterion,
    ) -> Result<QueryNode> {
        match criterion {
            FilterCriterion::Equal(filter) => {
                let field = filterable(config, &filter.field)?;
                let node: QueryNode = match (&filter.eq, &filter.values) {
                    (Some(value), None) => {
                        ensure_supported(field, QueryKind::Term)?;
                        TermQuery::new(field.code(), value.clone())?.into()
                    }
                    (None, Some(values)) => {
                        ensure_supported(field, QueryKind::Terms)?;
                        TermsQuery::new(field.code(), values.iter().cloned())?.into()
                    }
                    _ => {
                        return Err(Error::malformed(format!(
                            "equalFilter on '{}' needs exactly one of 'eq' or 'in'",
                            filter.field
                        )))
                    }
                };
                wrap_nested(field, node)
            }
            FilterCriterion::Range(filter) => {
                let field = filterable(config, &filter.field)?;
                ensure_supported(field, QueryKind::Range)?;
                let node = RangeQuery::new(field.code(), filter.bounds.clone())?.into();
                wrap_nested(field, node)
            }
            FilterCriterion::Match(filter) => {
                let field = filterable(config, &filter.field)?;
                ensure_supported(field, QueryKind::Match)?;
                let node = MatchQuery::new(field.code(), filter.text.clone())?.into();
                wrap_nested(field, node)
            }
            FilterCriterion::Exist(filter) => {
                let field = filterable(config, &filter.field)?;
                let node = ExistsQuery::new(field.code())?.into();
                wrap_nested(field, node)
            }
            FilterCriterion::Bool(filter) => {
                let translate_all = |criteria: &[FilterCriterion]| {
                    criteria
                        .iter()
                        .map(|c| self.translate(config, c))
                        .collect::<Result<Vec<_>>>()
                };
                let must = translate_all(&filter.must)?;
                let should = translate_all(&filter.should)?;
                let must_not = translate_all(&filter.not)?;
                Ok(BoolQuery::new(must, should, must_not)?.into())
            }
        }
    }
}

fn filterable<'c>(config: &'c ContainerConfiguration, code: &str) -> Result<&'c FieldDescriptor> {
    let field = config.require_field(code)?;
    if !field.is_filterable() {
        return Err(Error::malformed(format!("field '{code}' is not filterable")));
    }
    Ok(field)
}

fn ensure_supported(field: &FieldDescriptor, kind: QueryKind) -> Result<()> {
    if field.field_type().supports(kind) {
        return Ok(());
    }
    Err(Error::malformed(format!(
        "{kind} filter is not supported on {} field '{}'",
        field.field_type(),
        field.code()
    )))
}

fn wrap_nested(field: &FieldDescriptor, node: QueryNode) -> Result<QueryNode> {
    match field.nested_path() {
        Some(path) => Ok(NestedQuery::new(path, node)?.into()),
        None => Ok(node),
    }
}
