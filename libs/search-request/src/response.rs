//! Mapping of raw backend responses to typed search results

use crate::aggregation::{AggregationNode, BucketAggregation};
use crate::container::ContainerConfiguration;
use crate::error::{Error, Result};
use crate::field::{FacetType, FieldType};
use crate::request::{CompiledRequest, SpellingType};
use crate::sort::SortDirection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub took_ms: u64,
    pub timed_out: bool,
    pub total: u64,
    pub hits: Vec<SearchHit>,
    pub pagination: Pagination,
    pub sort_info: Option<SortInfo>,
    pub facets: Vec<FacetResult>,
    /// Top-level metric and pipeline values by aggregation name.
    pub metrics: BTreeMap<String, JsonValue>,
    pub spelling_type: SpellingType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: Option<f64>,
    pub source: JsonValue,
    /// Sort values the backend reported for this hit.
    pub sort: Vec<JsonValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u64,
    pub last_page: u64,
    pub page_size: u64,
    pub total_count: u64,
}

impl Pagination {
    pub fn new(from: u64, size: u64, total: u64) -> Self {
        if size == 0 {
            return Self {
                current_page: 1,
                last_page: 1,
                page_size: 0,
                total_count: total,
            };
        }
        Self {
            current_page: from / size + 1,
            last_page: total.div_ceil(size).max(1),
            page_size: size,
            total_count: total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortInfo {
    /// Flattened key of the primary sort clause.
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetResult {
    /// Flattened field code.
    pub field: String,
    pub label: String,
    pub facet_type: FacetType,
    /// Number of options returned.
    pub count: usize,
    /// More options exist beyond the returned ones.
    pub has_more: bool,
    pub options: Vec<FacetOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetOption {
    pub label: String,
    pub value: String,
    pub count: u64,
}

impl SearchResponse {
    pub fn from_backend(
        raw: &JsonValue,
        request: &CompiledRequest,
        config: &ContainerConfiguration,
    ) -> Result<Self> {
        let root = raw
            .as_object()
            .ok_or_else(|| invalid("response is not an object"))?;
        let hits_section = root
            .get("hits")
            .and_then(JsonValue::as_object)
            .ok_or_else(|| invalid("missing 'hits' section"))?;

        let total = parse_total(hits_section.get("total"))?;
        let hits = match hits_section.get("hits") {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(parse_hit)
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(invalid("'hits.hits' is not an array")),
        };

        let mut facets = Vec::new();
        let mut metrics = BTreeMap::new();
        if let Some(aggregations) = root.get("aggregations") {
            let aggregations = aggregations
                .as_object()
                .ok_or_else(|| invalid("'aggregations' is not an object"))?;
            for node in &request.aggregations {
                let Some(value) = aggregations.get(node.name()) else {
                    tracing::debug!(aggregation = node.name(), "Aggregation missing from response");
                    continue;
                };
                match node {
                    AggregationNode::Bucket(bucket) => {
                        facets.push(parse_facet(bucket, value, config)?)
                    }
                    AggregationNode::Metric(_) | AggregationNode::Pipeline(_) => {
                        let value = value.get("value").cloned().unwrap_or_else(|| value.clone());
                        metrics.insert(node.name().to_string(), value);
                    }
                }
            }
        }

        Ok(Self {
            took_ms: root.get("took").and_then(JsonValue::as_u64).unwrap_or(0),
            timed_out: root
                .get("timed_out")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false),
            total,
            hits,
            pagination: Pagination::new(request.from, request.size, total),
            sort_info: request.sort_orders.first().map(|clause| SortInfo {
                field: clause.key.clone(),
                direction: clause.direction,
            }),
            facets,
            metrics,
            spelling_type: request.spelling_type,
        })
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidResponse(message.into())
}

/// Accepts both `"total": 12` and `"total": {"value": 12, "relation": "eq"}`.
fn parse_total(total: Option<&JsonValue>) -> Result<u64> {
    match total {
        None => Ok(0),
        Some(JsonValue::Number(n)) => n.as_u64().ok_or_else(|| invalid("negative hit total")),
        Some(JsonValue::Object(map)) => map
            .get("value")
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| invalid("'hits.total.value' is missing")),
        Some(_) => Err(invalid("'hits.total' has an unexpected shape")),
    }
}

fn parse_hit(hit: &JsonValue) -> Result<SearchHit> {
    let hit = hit
        .as_object()
        .ok_or_else(|| invalid("hit is not an object"))?;
    let id = match hit.get("_id") {
        Some(JsonValue::String(id)) => id.clone(),
        Some(JsonValue::Number(id)) => id.to_string(),
        _ => return Err(invalid("hit without '_id'")),
    };
    Ok(SearchHit {
        id,
        score: hit.get("_score").and_then(JsonValue::as_f64),
        source: hit
            .get("_source")
            .cloned()
            .unwrap_or_else(|| JsonValue::Object(Map::new())),
        sort: hit
            .get("sort")
            .and_then(JsonValue::as_array)
            .cloned()
            .unwrap_or_default(),
    })
}

fn parse_facet(
    bucket: &BucketAggregation,
    value: &JsonValue,
    config: &ContainerConfiguration,
) -> Result<FacetResult> {
    // filter and nested wrappers repeat the facet name
    let mut current = value;
    while current.get("buckets").is_none() {
        current = current
            .get(&bucket.name)
            .ok_or_else(|| invalid(format!("aggregation '{}' has no buckets", bucket.name)))?;
    }

    let buckets = current
        .get("buckets")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| invalid(format!("buckets of '{}' are not an array", bucket.name)))?;

    let field = config.field(&bucket.name);
    let catalog_code = config.catalog().code.as_str();
    let options = buckets
        .iter()
        .map(|b| {
            let mut option = parse_option(&bucket.name, b)?;
            if let Some(label) = field.and_then(|f| f.option_label(catalog_code, &option.value)) {
                option.label = label.to_string();
            }
            Ok(option)
        })
        .collect::<Result<Vec<_>>>()?;

    let has_more = current
        .get("sum_other_doc_count")
        .and_then(JsonValue::as_u64)
        .is_some_and(|other| other > 0);

    let (label, facet_type) = match field {
        Some(field) => (field.label(), field.field_type().facet_type()),
        None => (bucket.name.clone(), FieldType::Keyword.facet_type()),
    };

    Ok(FacetResult {
        field: bucket.name.clone(),
        label,
        facet_type,
        count: options.len(),
        has_more,
        options,
    })
}

/// Option labelled with its raw value.
fn parse_option(facet: &str, bucket: &JsonValue) -> Result<FacetOption> {
    let value = match (bucket.get("key_as_string"), bucket.get("key")) {
        (Some(JsonValue::String(key)), _) => key.clone(),
        (_, Some(JsonValue::String(key))) => key.clone(),
        (_, Some(JsonValue::Number(key))) => key.to_string(),
        (_, Some(JsonValue::Bool(key))) => key.to_string(),
        _ => return Err(invalid(format!("bucket of '{facet}' has no key"))),
    };
    let count = bucket
        .get("doc_count")
        .and_then(JsonValue::as_u64)
        .ok_or_else(|| invalid(format!("bucket '{value}' of '{facet}' has no doc_count")))?;
    Ok(FacetOption {
        label: value.clone(),
        value,
        count,
    })
}
