//! Typed query tree.
//!
//! Every query kind the compiler can emit is a variant of [`QueryNode`]. The
//! variant structs enforce their structural invariants at construction time;
//! [`QueryNode::validate`] re-checks a whole tree, which matters for trees
//! that were deserialized from configuration rather than built in code.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod assembler;

pub use assembler::{AssemblerRegistry, QueryAssembler};

pub const DEFAULT_BOOST: f64 = 1.0;
pub const DEFAULT_MAX_EXPANSIONS: u32 = 10;
pub const DEFAULT_MINIMUM_SHOULD_MATCH: &str = "1";

fn default_boost() -> f64 {
    DEFAULT_BOOST
}

fn default_max_expansions() -> u32 {
    DEFAULT_MAX_EXPANSIONS
}

fn default_minimum_should_match() -> String {
    DEFAULT_MINIMUM_SHOULD_MATCH.to_string()
}

/// Variant tag of a [`QueryNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Bool,
    Match,
    MatchPhrasePrefix,
    Phrase,
    Exists,
    Range,
    Term,
    Terms,
    Nested,
    Filtered,
}

impl QueryKind {
    pub const COUNT: usize = 10;

    pub const ALL: [QueryKind; Self::COUNT] = [
        QueryKind::Bool,
        QueryKind::Match,
        QueryKind::MatchPhrasePrefix,
        QueryKind::Phrase,
        QueryKind::Exists,
        QueryKind::Range,
        QueryKind::Term,
        QueryKind::Terms,
        QueryKind::Nested,
        QueryKind::Filtered,
    ];

    /// Slot of this kind in a dispatch table.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            QueryKind::Bool => "bool",
            QueryKind::Match => "match",
            QueryKind::MatchPhrasePrefix => "match_phrase_prefix",
            QueryKind::Phrase => "phrase",
            QueryKind::Exists => "exists",
            QueryKind::Range => "range",
            QueryKind::Term => "term",
            QueryKind::Terms => "terms",
            QueryKind::Nested => "nested",
            QueryKind::Filtered => "filtered",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single value compared against a document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Integer(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Integer(value.into())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// Query tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryNode {
    Bool(BoolQuery),
    Match(MatchQuery),
    MatchPhrasePrefix(MatchPhrasePrefixQuery),
    Phrase(PhraseQuery),
    Exists(ExistsQuery),
    Range(RangeQuery),
    Term(TermQuery),
    Terms(TermsQuery),
    Nested(NestedQuery),
    Filtered(FilteredQuery),
}

impl QueryNode {
    pub fn kind(&self) -> QueryKind {
        match self {
            QueryNode::Bool(_) => QueryKind::Bool,
            QueryNode::Match(_) => QueryKind::Match,
            QueryNode::MatchPhrasePrefix(_) => QueryKind::MatchPhrasePrefix,
            QueryNode::Phrase(_) => QueryKind::Phrase,
            QueryNode::Exists(_) => QueryKind::Exists,
            QueryNode::Range(_) => QueryKind::Range,
            QueryNode::Term(_) => QueryKind::Term,
            QueryNode::Terms(_) => QueryKind::Terms,
            QueryNode::Nested(_) => QueryKind::Nested,
            QueryNode::Filtered(_) => QueryKind::Filtered,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            QueryNode::Bool(q) => q.name.as_deref(),
            QueryNode::Match(q) => q.name.as_deref(),
            QueryNode::MatchPhrasePrefix(q) => q.name.as_deref(),
            QueryNode::Phrase(q) => q.name.as_deref(),
            QueryNode::Exists(q) => q.name.as_deref(),
            QueryNode::Range(q) => q.name.as_deref(),
            QueryNode::Term(q) => q.name.as_deref(),
            QueryNode::Terms(q) => q.name.as_deref(),
            QueryNode::Nested(q) => q.name.as_deref(),
            QueryNode::Filtered(q) => q.name.as_deref(),
        }
    }

    pub fn boost(&self) -> f64 {
        match self {
            QueryNode::Bool(q) => q.boost,
            QueryNode::Match(q) => q.boost,
            QueryNode::MatchPhrasePrefix(q) => q.boost,
            QueryNode::Phrase(q) => q.boost,
            QueryNode::Exists(q) => q.boost,
            QueryNode::Range(q) => q.boost,
            QueryNode::Term(q) => q.boost,
            QueryNode::Terms(q) => q.boost,
            QueryNode::Nested(q) => q.boost,
            QueryNode::Filtered(q) => q.boost,
        }
    }

    /// Recursively check the structural invariants of this tree.
    pub fn validate(&self) -> Result<()> {
        match self {
            QueryNode::Bool(q) => q
                .must
                .iter()
                .chain(&q.should)
                .chain(&q.must_not)
                .try_for_each(QueryNode::validate),
            QueryNode::Match(q) => require_field(&q.field, QueryKind::Match),
            QueryNode::MatchPhrasePrefix(q) => q.validate(),
            QueryNode::Phrase(q) => require_field(&q.field, QueryKind::Phrase),
            QueryNode::Exists(q) => require_field(&q.field, QueryKind::Exists),
            QueryNode::Range(q) => q.validate(),
            QueryNode::Term(q) => require_field(&q.field, QueryKind::Term),
            QueryNode::Terms(q) => q.validate(),
            QueryNode::Nested(q) => {
                if q.path.trim().is_empty() {
                    return Err(Error::malformed("nested query requires a path"));
                }
                q.query.validate()
            }
            QueryNode::Filtered(q) => {
                if let Some(query) = &q.query {
                    query.validate()?;
                }
                if let Some(filter) = &q.filter {
                    filter.validate()?;
                }
                Ok(())
            }
        }
    }

    /// Combine filter-only nodes with AND semantics.
    ///
    /// Returns `None` for an empty input and the node itself for a single one.
    pub fn conjunction(mut nodes: Vec<QueryNode>) -> Option<QueryNode> {
        match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(QueryNode::Bool(BoolQuery {
                must: nodes,
                ..BoolQuery::default()
            })),
        }
    }
}

fn require_field(field: &str, kind: QueryKind) -> Result<()> {
    if field.trim().is_empty() {
        return Err(Error::malformed(format!("{kind} query requires a field")));
    }
    Ok(())
}

macro_rules! impl_common {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl $ty {
                pub fn with_name(mut self, name: impl Into<String>) -> Self {
                    self.name = Some(name.into());
                    self
                }

                pub fn with_boost(mut self, boost: f64) -> Self {
                    self.boost = boost;
                    self
                }
            }

            impl From<$ty> for QueryNode {
                fn from(query: $ty) -> Self {
                    QueryNode::$variant(query)
                }
            }
        )*
    };
}

impl_common!(
    BoolQuery => Bool,
    MatchQuery => Match,
    MatchPhrasePrefixQuery => MatchPhrasePrefix,
    PhraseQuery => Phrase,
    ExistsQuery => Exists,
    RangeQuery => Range,
    TermQuery => Term,
    TermsQuery => Terms,
    NestedQuery => Nested,
    FilteredQuery => Filtered,
);

/// Boolean composition of child queries.
///
/// [`BoolQuery::new`] refuses an empty clause set. A clause-less bool can
/// still appear in a tree (`BoolQuery::default()`, or deserialized input) and
/// matches every document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    #[serde(default)]
    pub must: Vec<QueryNode>,
    #[serde(default)]
    pub should: Vec<QueryNode>,
    #[serde(default)]
    pub must_not: Vec<QueryNode>,
    #[serde(default = "default_minimum_should_match")]
    pub minimum_should_match: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl Default for BoolQuery {
    fn default() -> Self {
        Self {
            must: Vec::new(),
            should: Vec::new(),
            must_not: Vec::new(),
            minimum_should_match: default_minimum_should_match(),
            name: None,
            boost: DEFAULT_BOOST,
        }
    }
}

impl BoolQuery {
    pub fn new(
        must: Vec<QueryNode>,
        should: Vec<QueryNode>,
        must_not: Vec<QueryNode>,
    ) -> Result<Self> {
        if must.is_empty() && should.is_empty() && must_not.is_empty() {
            return Err(Error::malformed(
                "bool query requires at least one must, should or must_not clause",
            ));
        }
        Ok(Self {
            must,
            should,
            must_not,
            ..Self::default()
        })
    }

    pub fn with_minimum_should_match(mut self, minimum_should_match: impl Into<String>) -> Self {
        self.minimum_should_match = minimum_should_match.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.must_not.is_empty()
    }
}

/// Full-text match on a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchQuery {
    pub field: String,
    pub query_text: String,
    #[serde(default)]
    pub minimum_should_match: Option<String>,
    #[serde(default)]
    pub analyzer: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl MatchQuery {
    pub fn new(field: impl Into<String>, query_text: impl Into<String>) -> Result<Self> {
        let field = field.into();
        require_field(&field, QueryKind::Match)?;
        Ok(Self {
            field,
            query_text: query_text.into(),
            minimum_should_match: None,
            analyzer: None,
            name: None,
            boost: DEFAULT_BOOST,
        })
    }

    pub fn with_minimum_should_match(mut self, minimum_should_match: impl Into<String>) -> Self {
        self.minimum_should_match = Some(minimum_should_match.into());
        self
    }

    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }
}

/// Phrase match where the last term is treated as a prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPhrasePrefixQuery {
    pub field: String,
    pub query_text: String,
    #[serde(default = "default_max_expansions")]
    pub max_expansions: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl MatchPhrasePrefixQuery {
    pub fn new(field: impl Into<String>, query_text: impl Into<String>) -> Result<Self> {
        let query = Self {
            field: field.into(),
            query_text: query_text.into(),
            max_expansions: DEFAULT_MAX_EXPANSIONS,
            name: None,
            boost: DEFAULT_BOOST,
        };
        query.validate()?;
        Ok(query)
    }

    pub fn with_max_expansions(mut self, max_expansions: u32) -> Self {
        self.max_expansions = max_expansions;
        self
    }

    fn validate(&self) -> Result<()> {
        require_field(&self.field, QueryKind::MatchPhrasePrefix)?;
        if self.query_text.is_empty() {
            return Err(Error::malformed(format!(
                "match_phrase_prefix query on '{}' requires a query text",
                self.field
            )));
        }
        Ok(())
    }
}

/// Exact phrase match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseQuery {
    pub field: String,
    pub query_text: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl PhraseQuery {
    pub fn new(field: impl Into<String>, query_text: impl Into<String>) -> Result<Self> {
        let field = field.into();
        require_field(&field, QueryKind::Phrase)?;
        Ok(Self {
            field,
            query_text: query_text.into(),
            name: None,
            boost: DEFAULT_BOOST,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistsQuery {
    pub field: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl ExistsQuery {
    pub fn new(field: impl Into<String>) -> Result<Self> {
        let field = field.into();
        require_field(&field, QueryKind::Exists)?;
        Ok(Self {
            field,
            name: None,
            boost: DEFAULT_BOOST,
        })
    }
}

/// Bounds of a [`RangeQuery`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Scalar>,
}

impl RangeBounds {
    pub fn gt(mut self, value: impl Into<Scalar>) -> Self {
        self.gt = Some(value.into());
        self
    }

    pub fn gte(mut self, value: impl Into<Scalar>) -> Self {
        self.gte = Some(value.into());
        self
    }

    pub fn lt(mut self, value: impl Into<Scalar>) -> Self {
        self.lt = Some(value.into());
        self
    }

    pub fn lte(mut self, value: impl Into<Scalar>) -> Self {
        self.lte = Some(value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.gt.is_none() && self.gte.is_none() && self.lt.is_none() && self.lte.is_none()
    }

    pub(crate) fn validate(&self, field: &str) -> Result<()> {
        if self.is_empty() {
            return Err(Error::malformed(format!(
                "range on '{field}' requires at least one of gt, gte, lt, lte"
            )));
        }
        if self.gt.is_some() && self.gte.is_some() {
            return Err(Error::malformed(format!(
                "range on '{field}' cannot combine gt and gte"
            )));
        }
        if self.lt.is_some() && self.lte.is_some() {
            return Err(Error::malformed(format!(
                "range on '{field}' cannot combine lt and lte"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery {
    pub field: String,
    #[serde(flatten)]
    pub bounds: RangeBounds,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl RangeQuery {
    pub fn new(field: impl Into<String>, bounds: RangeBounds) -> Result<Self> {
        let query = Self {
            field: field.into(),
            bounds,
            name: None,
            boost: DEFAULT_BOOST,
        };
        query.validate()?;
        Ok(query)
    }

    fn validate(&self) -> Result<()> {
        require_field(&self.field, QueryKind::Range)?;
        self.bounds.validate(&self.field)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub field: String,
    pub value: Scalar,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl TermQuery {
    pub fn new(field: impl Into<String>, value: impl Into<Scalar>) -> Result<Self> {
        let field = field.into();
        require_field(&field, QueryKind::Term)?;
        Ok(Self {
            field,
            value: value.into(),
            name: None,
            boost: DEFAULT_BOOST,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsQuery {
    pub field: String,
    pub values: Vec<Scalar>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl TermsQuery {
    /// Duplicate values are dropped, keeping the first occurrence.
    pub fn new<I, V>(field: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        let mut unique: Vec<Scalar> = Vec::new();
        for value in values {
            let value = value.into();
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
        let query = Self {
            field: field.into(),
            values: unique,
            name: None,
            boost: DEFAULT_BOOST,
        };
        query.validate()?;
        Ok(query)
    }

    fn validate(&self) -> Result<()> {
        require_field(&self.field, QueryKind::Terms)?;
        if self.values.is_empty() {
            return Err(Error::malformed(format!(
                "terms query on '{}' requires at least one value",
                self.field
            )));
        }
        Ok(())
    }
}

/// How scores of matching nested documents are folded into the parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    #[default]
    None,
    Avg,
    Max,
    Min,
    Sum,
}

impl ScoreMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ScoreMode::None => "none",
            ScoreMode::Avg => "avg",
            ScoreMode::Max => "max",
            ScoreMode::Min => "min",
            ScoreMode::Sum => "sum",
        }
    }
}

/// Query on fields stored under a nested object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedQuery {
    pub path: String,
    pub query: Box<QueryNode>,
    #[serde(default)]
    pub score_mode: ScoreMode,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl NestedQuery {
    pub fn new(path: impl Into<String>, query: impl Into<QueryNode>) -> Result<Self> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(Error::malformed("nested query requires a path"));
        }
        Ok(Self {
            path,
            query: Box::new(query.into()),
            score_mode: ScoreMode::None,
            name: None,
            boost: DEFAULT_BOOST,
        })
    }

    pub fn with_score_mode(mut self, score_mode: ScoreMode) -> Self {
        self.score_mode = score_mode;
        self
    }
}

/// Splits a request into a scored query and a non-scored filter.
///
/// With neither part set the node matches every document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredQuery {
    #[serde(default)]
    pub query: Option<Box<QueryNode>>,
    #[serde(default)]
    pub filter: Option<Box<QueryNode>>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl FilteredQuery {
    pub fn new(query: Option<QueryNode>, filter: Option<QueryNode>) -> Self {
        Self {
            query: query.map(Box::new),
            filter: filter.map(Box::new),
            name: None,
            boost: DEFAULT_BOOST,
        }
    }

    pub fn is_match_all(&self) -> bool {
        self.query.is_none() && self.filter.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(field: &str, value: &str) -> QueryNode {
        TermQuery::new(field, value).unwrap().into()
    }

    #[test]
    fn dispatch_slots_are_unique_and_dense() {
        for (slot, kind) in QueryKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), slot);
        }
    }

    #[test]
    fn field_scoped_queries_reject_empty_field() {
        assert!(matches!(
            MatchQuery::new("", "bag"),
            Err(Error::MalformedQuery(_))
        ));
        assert!(matches!(ExistsQuery::new("  "), Err(Error::MalformedQuery(_))));
        assert!(matches!(TermQuery::new("", 1), Err(Error::MalformedQuery(_))));
        assert!(matches!(
            PhraseQuery::new("", "red bag"),
            Err(Error::MalformedQuery(_))
        ));
    }

    #[test]
    fn bool_query_requires_a_clause() {
        let err = BoolQuery::new(vec![], vec![], vec![]).unwrap_err();
        assert!(matches!(err, Error::MalformedQuery(_)));

        let ok = BoolQuery::new(vec![term("sku", "24-MB01")], vec![], vec![]).unwrap();
        assert_eq!(ok.must.len(), 1);
    }

    #[test]
    fn default_bool_query_is_valid_match_all() {
        assert!(QueryNode::Bool(BoolQuery::default()).validate().is_ok());
    }

    #[test]
    fn range_query_rejects_missing_or_conflicting_bounds() {
        assert!(matches!(
            RangeQuery::new("price.price", RangeBounds::default()),
            Err(Error::MalformedQuery(_))
        ));
        assert!(matches!(
            RangeQuery::new("price.price", RangeBounds::default().gt(1).gte(2)),
            Err(Error::MalformedQuery(_))
        ));
        assert!(matches!(
            RangeQuery::new("price.price", RangeBounds::default().lt(1).lte(2)),
            Err(Error::MalformedQuery(_))
        ));
        assert!(RangeQuery::new("price.price", RangeBounds::default().gte(10).lt(20)).is_ok());
    }

    #[test]
    fn terms_query_rejects_empty_set_and_deduplicates() {
        assert!(matches!(
            TermsQuery::new("color.value", Vec::<String>::new()),
            Err(Error::MalformedQuery(_))
        ));

        let q = TermsQuery::new("color.value", ["red", "grey", "red"]).unwrap();
        assert_eq!(q.values, vec![Scalar::from("red"), Scalar::from("grey")]);
    }

    #[test]
    fn match_phrase_prefix_requires_text() {
        assert!(matches!(
            MatchPhrasePrefixQuery::new("name", ""),
            Err(Error::MalformedQuery(_))
        ));
        let q = MatchPhrasePrefixQuery::new("name", "bag").unwrap();
        assert_eq!(q.max_expansions, DEFAULT_MAX_EXPANSIONS);
    }

    #[test]
    fn validate_walks_nested_children() {
        let broken = QueryNode::Nested(NestedQuery {
            path: "category".to_string(),
            query: Box::new(QueryNode::Terms(TermsQuery {
                field: "category.id".to_string(),
                values: vec![],
                name: None,
                boost: DEFAULT_BOOST,
            })),
            score_mode: ScoreMode::None,
            name: None,
            boost: DEFAULT_BOOST,
        });
        assert!(matches!(broken.validate(), Err(Error::MalformedQuery(_))));
    }

    #[test]
    fn deserialized_nodes_get_defaults() {
        let node: QueryNode =
            serde_json::from_str(r#"{"type":"term","field":"is_active","value":true}"#).unwrap();
        assert_eq!(node.kind(), QueryKind::Term);
        assert_eq!(node.boost(), DEFAULT_BOOST);
        assert_eq!(node.name(), None);
    }

    #[test]
    fn deserialized_range_reads_flattened_bounds() {
        let node: QueryNode =
            serde_json::from_str(r#"{"type":"range","field":"stock.qty","gt":0}"#).unwrap();
        match node {
            QueryNode::Range(range) => assert_eq!(range.bounds.gt, Some(Scalar::Integer(0))),
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn conjunction_collapses_small_inputs() {
        assert_eq!(QueryNode::conjunction(vec![]), None);

        let single = term("sku", "a");
        assert_eq!(QueryNode::conjunction(vec![single.clone()]), Some(single));

        match QueryNode::conjunction(vec![term("sku", "a"), term("sku", "b")]) {
            Some(QueryNode::Bool(b)) => assert_eq!(b.must.len(), 2),
            other => panic!("unexpected conjunction {other:?}"),
        }
    }
}
