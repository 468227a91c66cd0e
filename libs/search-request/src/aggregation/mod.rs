//! Aggregation definitions
//!
//! Facets compile to bucket aggregations, optionally wrapped in `filter` and
//! `nested` aggregations that reuse the facet name at every level. Metric
//! aggregations and parent pipelines live inside a bucket; sibling pipelines
//! sit next to it and reach into it through a buckets path.

use crate::error::{Error, Result};
use crate::query::{AssemblerRegistry, QueryNode};
use crate::sort::SortDirection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::BTreeMap;

mod builder;

pub use builder::{AggregationBuilder, FacetFilters, FacetSpec};

/// Separator between aggregation names in a buckets path.
pub const PATH_SEPARATOR: &str = ">";

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationNode {
    Bucket(BucketAggregation),
    Metric(MetricAggregation),
    Pipeline(PipelineAggregation),
}

impl AggregationNode {
    pub fn name(&self) -> &str {
        match self {
            AggregationNode::Bucket(a) => &a.name,
            AggregationNode::Metric(a) => &a.name,
            AggregationNode::Pipeline(a) => &a.name,
        }
    }

    /// Render the aggregation body (the value under its name).
    pub fn to_wire(&self, registry: &AssemblerRegistry) -> Result<JsonValue> {
        match self {
            AggregationNode::Bucket(a) => a.to_wire(registry),
            AggregationNode::Metric(a) => Ok(a.to_wire()),
            AggregationNode::Pipeline(a) => a.to_wire(),
        }
    }
}

/// Render a list of aggregations as a `{ name: body }` map.
pub fn render_all(nodes: &[AggregationNode], registry: &AssemblerRegistry) -> Result<JsonValue> {
    let mut aggs = Map::new();
    for node in nodes {
        aggs.insert(node.name().to_string(), node.to_wire(registry)?);
    }
    Ok(JsonValue::Object(aggs))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermsOrder {
    #[default]
    Count,
    Key,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeBucket {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BucketKind {
    Terms { size: u32, order: TermsOrder },
    Range { ranges: Vec<RangeBucket> },
    Histogram { interval: f64, min_doc_count: u64 },
    DateHistogram { calendar_interval: String },
}

impl BucketKind {
    fn wire_name(&self) -> &'static str {
        match self {
            BucketKind::Terms { .. } => "terms",
            BucketKind::Range { .. } => "range",
            BucketKind::Histogram { .. } => "histogram",
            BucketKind::DateHistogram { .. } => "date_histogram",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketAggregation {
    pub name: String,
    /// Dotted document path aggregated on.
    pub field: String,
    pub kind: BucketKind,
    pub nested_path: Option<String>,
    /// Restricts the documents counted by this facet.
    pub filter: Option<QueryNode>,
    pub children: Vec<AggregationNode>,
}

impl BucketAggregation {
    pub fn new(name: impl Into<String>, field: impl Into<String>, kind: BucketKind) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            kind,
            nested_path: None,
            filter: None,
            children: Vec::new(),
        }
    }

    /// Names from the outermost wrapper down to the bucket itself, joined
    /// with `>`; usable as a sibling pipeline's buckets path prefix.
    pub fn bucket_path(&self) -> String {
        let depth = 1 + usize::from(self.filter.is_some()) + usize::from(self.nested_path.is_some());
        vec![self.name.as_str(); depth].join(PATH_SEPARATOR)
    }

    fn to_wire(&self, registry: &AssemblerRegistry) -> Result<JsonValue> {
        let mut params = Map::new();
        params.insert("field".to_string(), self.field.clone().into());
        match &self.kind {
            BucketKind::Terms { size, order } => {
                params.insert("size".to_string(), (*size).into());
                let order = match order {
                    TermsOrder::Count => json!({ "_count": "desc" }),
                    TermsOrder::Key => json!({ "_key": "asc" }),
                };
                params.insert("order".to_string(), order);
            }
            BucketKind::Range { ranges } => {
                params.insert("ranges".to_string(), serde_json::to_value(ranges)?);
            }
            BucketKind::Histogram {
                interval,
                min_doc_count,
            } => {
                params.insert("interval".to_string(), (*interval).into());
                params.insert("min_doc_count".to_string(), (*min_doc_count).into());
            }
            BucketKind::DateHistogram { calendar_interval } => {
                params.insert(
                    "calendar_interval".to_string(),
                    calendar_interval.clone().into(),
                );
            }
        }

        let mut body = Map::new();
        body.insert(self.kind.wire_name().to_string(), JsonValue::Object(params));
        if !self.children.is_empty() {
            body.insert("aggs".to_string(), render_all(&self.children, registry)?);
        }
        let mut body = JsonValue::Object(body);

        if let Some(path) = &self.nested_path {
            body = json!({
                "nested": { "path": path },
                "aggs": { self.name.clone(): body }
            });
        }
        if let Some(filter) = &self.filter {
            body = json!({
                "filter": registry.assemble(filter)?,
                "aggs": { self.name.clone(): body }
            });
        }
        Ok(body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Min,
    Max,
    Avg,
    Sum,
    Stats,
    Cardinality,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Min => "min",
            MetricKind::Max => "max",
            MetricKind::Avg => "avg",
            MetricKind::Sum => "sum",
            MetricKind::Stats => "stats",
            MetricKind::Cardinality => "cardinality",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricAggregation {
    pub name: String,
    pub field: String,
    pub kind: MetricKind,
}

impl MetricAggregation {
    pub fn new(name: impl Into<String>, field: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            kind,
        }
    }

    fn to_wire(&self) -> JsonValue {
        let mut body = Map::new();
        body.insert(self.kind.as_str().to_string(), json!({ "field": self.field }));
        JsonValue::Object(body)
    }
}

/// Where a pipeline reads its input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BucketsPath {
    Single(String),
    /// Script variable name -> path.
    Named(BTreeMap<String, String>),
}

impl BucketsPath {
    fn is_blank(&self) -> bool {
        match self {
            BucketsPath::Single(path) => path.trim().is_empty(),
            BucketsPath::Named(paths) => {
                paths.is_empty() || paths.values().any(|p| p.trim().is_empty())
            }
        }
    }

    fn paths(&self) -> Vec<&str> {
        match self {
            BucketsPath::Single(path) => vec![path.as_str()],
            BucketsPath::Named(paths) => paths.values().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for BucketsPath {
    fn from(path: &str) -> Self {
        BucketsPath::Single(path.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineKind {
    MaxBucket,
    MinBucket,
    AvgBucket,
    SumBucket,
    StatsBucket,
    BucketSelector {
        script: String,
    },
    BucketScript {
        script: String,
    },
    BucketSort {
        #[serde(default)]
        order: SortDirection,
        #[serde(default)]
        size: Option<u32>,
    },
}

impl PipelineKind {
    pub fn wire_name(&self) -> &'static str {
        match self {
            PipelineKind::MaxBucket => "max_bucket",
            PipelineKind::MinBucket => "min_bucket",
            PipelineKind::AvgBucket => "avg_bucket",
            PipelineKind::SumBucket => "sum_bucket",
            PipelineKind::StatsBucket => "stats_bucket",
            PipelineKind::BucketSelector { .. } => "bucket_selector",
            PipelineKind::BucketScript { .. } => "bucket_script",
            PipelineKind::BucketSort { .. } => "bucket_sort",
        }
    }

    /// Parent pipelines run inside the bucket aggregation they read from.
    pub fn is_parent(&self) -> bool {
        matches!(
            self,
            PipelineKind::BucketSelector { .. }
                | PipelineKind::BucketScript { .. }
                | PipelineKind::BucketSort { .. }
        )
    }
}

/// Aggregation computed from other aggregations' output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineAggregation {
    name: String,
    #[serde(flatten)]
    kind: PipelineKind,
    #[serde(default)]
    buckets_path: Option<BucketsPath>,
}

impl PipelineAggregation {
    pub fn new(
        name: impl Into<String>,
        kind: PipelineKind,
        buckets_path: Option<BucketsPath>,
    ) -> Result<Self> {
        let pipeline = Self {
            name: name.into(),
            kind,
            buckets_path,
        };
        pipeline.validate()?;
        Ok(pipeline)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &PipelineKind {
        &self.kind
    }

    pub fn buckets_path(&self) -> Option<&BucketsPath> {
        self.buckets_path.as_ref()
    }

    pub fn has_buckets_path(&self) -> bool {
        self.buckets_path.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        let Some(path) = &self.buckets_path else {
            return Err(Error::InvalidPipeline(format!(
                "'{}' has no buckets path",
                self.name
            )));
        };
        if self.name.trim().is_empty() || path.is_blank() {
            return Err(Error::InvalidPipeline(format!(
                "'{}' has an empty name or buckets path",
                self.name
            )));
        }
        let scripted = matches!(
            self.kind,
            PipelineKind::BucketSelector { .. } | PipelineKind::BucketScript { .. }
        );
        if scripted && !matches!(path, BucketsPath::Named(_)) {
            return Err(Error::InvalidPipeline(format!(
                "'{}' needs named buckets paths for its script",
                self.name
            )));
        }
        Ok(())
    }

    fn to_wire(&self) -> Result<JsonValue> {
        self.validate()?;
        let path = self
            .buckets_path
            .as_ref()
            .ok_or_else(|| Error::InvalidPipeline(self.name.clone()))?;

        let mut params = Map::new();
        match &self.kind {
            PipelineKind::BucketSort { order, size } => {
                let sort: Vec<JsonValue> = path
                    .paths()
                    .into_iter()
                    .map(|p| json!({ p: { "order": order.as_str() } }))
                    .collect();
                params.insert("sort".to_string(), JsonValue::Array(sort));
                if let Some(size) = size {
                    params.insert("size".to_string(), (*size).into());
                }
            }
            PipelineKind::BucketSelector { script } | PipelineKind::BucketScript { script } => {
                params.insert("buckets_path".to_string(), serde_json::to_value(path)?);
                params.insert("script".to_string(), script.clone().into());
            }
            _ => {
                params.insert("buckets_path".to_string(), serde_json::to_value(path)?);
            }
        }

        let mut body = Map::new();
        body.insert(self.kind.wire_name().to_string(), JsonValue::Object(params));
        Ok(JsonValue::Object(body))
    }
}
