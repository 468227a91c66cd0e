use super::{
    AggregationNode, BucketAggregation, BucketKind, MetricAggregation, MetricKind,
    PipelineAggregation, RangeBucket, TermsOrder,
};
use crate::config::SearchConfig;
use crate::container::ContainerConfiguration;
use crate::error::{Error, Result};
use crate::field::{flatten, FieldDescriptor, FieldType};
use crate::query::QueryNode;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const DEFAULT_CALENDAR_INTERVAL: &str = "month";

/// A requested facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetSpec {
    pub field: String,
    /// Terms facets only.
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub order: TermsOrder,
    /// Numeric facets use these buckets instead of a histogram.
    #[serde(default)]
    pub ranges: Vec<RangeBucket>,
    #[serde(default)]
    pub interval: Option<f64>,
    #[serde(default)]
    pub calendar_interval: Option<String>,
    #[serde(default)]
    pub metrics: Vec<MetricKind>,
    #[serde(default)]
    pub pipelines: Vec<PipelineAggregation>,
}

impl FacetSpec {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            size: None,
            order: TermsOrder::default(),
            ranges: Vec::new(),
            interval: None,
            calendar_interval: None,
            metrics: Vec::new(),
            pipelines: Vec::new(),
        }
    }
}

/// Per-facet adjusted filter, keyed by flattened field code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetFilters {
    filters: HashMap<String, QueryNode>,
}

impl FacetFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &str, filter: QueryNode) {
        self.filters.insert(flatten(field), filter);
    }

    pub fn get(&self, field: &str) -> Option<&QueryNode> {
        self.filters.get(&flatten(field))
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

pub struct AggregationBuilder<'a> {
    settings: &'a SearchConfig,
}

impl<'a> AggregationBuilder<'a> {
    pub fn new(settings: &'a SearchConfig) -> Self {
        Self { settings }
    }

    /// One bucket aggregation per facet, followed by that facet's sibling
    /// pipelines. The adjusted filters are used as given.
    pub fn build(
        &self,
        config: &ContainerConfiguration,
        facets: &[FacetSpec],
        filters: &FacetFilters,
    ) -> Result<Vec<AggregationNode>> {
        let mut nodes = Vec::new();
        let mut seen = HashSet::new();

        for facet in facets {
            let field = config.require_field(&facet.field)?;
            if !field.is_filterable() {
                return Err(Error::malformed(format!(
                    "field '{}' is not filterable and cannot be faceted",
                    field.code()
                )));
            }
            let name = field.flattened_code();
            if !seen.insert(name.clone()) {
                tracing::debug!(facet = %name, "Skipping duplicate facet");
                continue;
            }

            let mut bucket =
                BucketAggregation::new(name.clone(), field.code(), self.bucket_kind(field, facet));
            bucket.nested_path = field.nested_path().map(str::to_string);
            bucket.filter = filters.get(&name).cloned();

            for metric in &facet.metrics {
                bucket.children.push(AggregationNode::Metric(MetricAggregation::new(
                    format!("{name}_{}", metric.as_str()),
                    field.code(),
                    *metric,
                )));
            }

            let mut siblings = Vec::new();
            for pipeline in &facet.pipelines {
                pipeline.validate()?;
                let node = AggregationNode::Pipeline(pipeline.clone());
                if pipeline.kind().is_parent() {
                    bucket.children.push(node);
                } else {
                    siblings.push(node);
                }
            }

            nodes.push(AggregationNode::Bucket(bucket));
            nodes.extend(siblings);
        }

        tracing::debug!(
            container = config.name(),
            aggregations = nodes.len(),
            "Built facet aggregations"
        );
        Ok(nodes)
    }

    fn bucket_kind(&self, field: &FieldDescriptor, facet: &FacetSpec) -> BucketKind {
        match field.field_type() {
            t if t.is_numeric() && !facet.ranges.is_empty() => BucketKind::Range {
                ranges: facet.ranges.clone(),
            },
            t if t.is_numeric() => BucketKind::Histogram {
                interval: facet
                    .interval
                    .filter(|i| *i > 0.0)
                    .unwrap_or(self.settings.default_histogram_interval),
                min_doc_count: 1,
            },
            FieldType::Date => BucketKind::DateHistogram {
                calendar_interval: facet
                    .calendar_interval
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CALENDAR_INTERVAL.to_string()),
            },
            _ => BucketKind::Terms {
                size: facet.size.unwrap_or(self.settings.default_facet_size),
                order: facet.order,
            },
        }
    }
}
