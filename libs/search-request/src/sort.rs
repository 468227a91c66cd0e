//! Sort order resolution
//!
//! Caller sort specs are resolved against the container's field catalog into
//! backend sort clauses. Documents lacking the sort field go last on
//! ascending clauses and first on descending ones, and every sort ends with
//! one deterministic tie-break clause.

use crate::container::ContainerConfiguration;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Relevance pseudo-field.
pub const SCORE_FIELD: &str = "_score";
/// Backend document identifier pseudo-field.
pub const DOC_ID_FIELD: &str = "_id";
pub const SCORE_LABEL: &str = "Relevance";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "ASC")]
    Asc,
    #[serde(alias = "DESC")]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Fixed missing-value policy for this direction.
    pub fn missing(&self) -> MissingPlacement {
        match self {
            Self::Asc => MissingPlacement::Last,
            Self::Desc => MissingPlacement::First,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingPlacement {
    #[serde(rename = "_first")]
    First,
    #[serde(rename = "_last")]
    Last,
}

impl MissingPlacement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "_first",
            Self::Last => "_last",
        }
    }
}

/// One caller-supplied sort key, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

/// Resolved backend sort clause.
///
/// `field` is the dotted document path, `key` its flattened form used by
/// responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortClause {
    pub field: String,
    pub key: String,
    pub direction: SortDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<MissingPlacement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_path: Option<String>,
}

impl SortClause {
    pub fn score(direction: SortDirection) -> Self {
        Self::pseudo(SCORE_FIELD, direction)
    }

    fn pseudo(field: &str, direction: SortDirection) -> Self {
        Self {
            field: field.to_string(),
            key: field.to_string(),
            direction,
            missing: None,
            nested_path: None,
        }
    }

    pub fn is_score(&self) -> bool {
        self.field == SCORE_FIELD
    }

    /// `{ "<field>": { "order", "missing"?, "mode"?, "nested"? } }`
    pub fn to_wire(&self) -> JsonValue {
        let mut params = Map::new();
        params.insert("order".to_string(), self.direction.as_str().into());
        if let Some(missing) = self.missing {
            params.insert("missing".to_string(), missing.as_str().into());
        }
        if let Some(path) = &self.nested_path {
            let mode = match self.direction {
                SortDirection::Asc => "min",
                SortDirection::Desc => "max",
            };
            params.insert("mode".to_string(), mode.into());
            params.insert("nested".to_string(), serde_json::json!({ "path": path }));
        }
        let mut clause = Map::new();
        clause.insert(self.field.clone(), JsonValue::Object(params));
        JsonValue::Object(clause)
    }
}

/// A sort choice offered to clients, keyed like [`SortClause::key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortingOption {
    pub code: String,
    pub label: String,
}

pub struct SortOrderBuilder<'a> {
    identifier_field: &'a str,
}

impl<'a> SortOrderBuilder<'a> {
    /// `identifier_field` is the sortable document id used as secondary tie-break.
    pub fn new(identifier_field: &'a str) -> Self {
        Self { identifier_field }
    }

    /// Every sortable field except the identifier, in declaration order,
    /// followed by relevance.
    pub fn sorting_options(&self, config: &ContainerConfiguration) -> Vec<SortingOption> {
        config
            .sortable_fields()
            .filter(|f| f.code() != self.identifier_field)
            .map(|f| SortingOption {
                code: f.flattened_code(),
                label: f.label(),
            })
            .chain(std::iter::once(SortingOption {
                code: SCORE_FIELD.to_string(),
                label: SCORE_LABEL.to_string(),
            }))
            .collect()
    }

    /// The first sorting option; relevance when nothing else is sortable.
    pub fn default_sorting_field(&self, config: &ContainerConfiguration) -> String {
        self.sorting_options(config)
            .into_iter()
            .next()
            .map_or_else(|| SCORE_FIELD.to_string(), |option| option.code)
    }

    pub fn build(
        &self,
        config: &ContainerConfiguration,
        specs: &[SortSpec],
        context: &HashMap<String, String>,
    ) -> Result<Vec<SortClause>> {
        if specs.is_empty() {
            return Ok(vec![SortClause::score(SortDirection::Desc)]);
        }

        let mut clauses = specs
            .iter()
            .map(|spec| self.resolve(config, spec, context))
            .collect::<Result<Vec<_>>>()?;

        if let Some(tie_break) = self.tie_break(config, &clauses) {
            clauses.push(tie_break);
        }

        tracing::debug!(
            container = config.name(),
            clauses = clauses.len(),
            "Resolved sort order"
        );
        Ok(clauses)
    }

    fn resolve(
        &self,
        config: &ContainerConfiguration,
        spec: &SortSpec,
        context: &HashMap<String, String>,
    ) -> Result<SortClause> {
        match spec.field.as_str() {
            SCORE_FIELD => return Ok(SortClause::score(spec.direction)),
            DOC_ID_FIELD => return Ok(SortClause::pseudo(DOC_ID_FIELD, spec.direction)),
            _ => {}
        }

        let code = config
            .sort_override(&spec.field)
            .and_then(|rule| rule.resolve(context))
            .unwrap_or(&spec.field);

        let field = config
            .field(code)
            .filter(|f| f.is_sortable())
            .ok_or_else(|| Error::UnsortableField(spec.field.clone()))?;

        Ok(SortClause {
            field: field.code().to_string(),
            key: field.flattened_code(),
            direction: spec.direction,
            missing: Some(spec.direction.missing()),
            nested_path: field.nested_path().map(str::to_string),
        })
    }

    /// `_score DESC` unless the caller already sorts by score, in which case
    /// the identifier field (when sortable and not already used).
    fn tie_break(
        &self,
        config: &ContainerConfiguration,
        clauses: &[SortClause],
    ) -> Option<SortClause> {
        if !clauses.iter().any(SortClause::is_score) {
            return Some(SortClause::score(SortDirection::Desc));
        }

        let identifier = config
            .field(self.identifier_field)
            .filter(|f| f.is_sortable())?;
        if clauses.iter().any(|c| c.field == identifier.code()) {
            return None;
        }
        Some(SortClause {
            field: identifier.code().to_string(),
            key: identifier.flattened_code(),
            direction: SortDirection::Desc,
            missing: Some(MissingPlacement::First),
            nested_path: identifier.nested_path().map(str::to_string),
        })
    }
}

/// A document as seen by [`order_hits`].
#[derive(Debug, Clone, PartialEq)]
pub struct SortableHit {
    pub id: String,
    pub score: f64,
    pub source: JsonValue,
}

/// Order `hits` in place the way the backend applies `clauses`.
///
/// Multi-valued fields sort by their minimum ascending and their maximum
/// descending. The sort is stable.
pub fn order_hits(clauses: &[SortClause], hits: &mut [SortableHit]) {
    hits.sort_by(|a, b| {
        clauses
            .iter()
            .map(|clause| compare_on(clause, a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

#[derive(Debug, Clone, PartialEq)]
enum SortValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SortValue {
    fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Bool(v) => Some(Self::Bool(*v)),
            JsonValue::Number(n) => n.as_f64().map(Self::Number),
            JsonValue::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Number(_) => 1,
            Self::Text(_) => 2,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

fn sort_value(clause: &SortClause, hit: &SortableHit) -> Option<SortValue> {
    match clause.field.as_str() {
        SCORE_FIELD => return Some(SortValue::Number(hit.score)),
        DOC_ID_FIELD => return Some(SortValue::Text(hit.id.clone())),
        _ => {}
    }

    let path: Vec<&str> = clause.field.split('.').collect();
    let mut values = Vec::new();
    collect_values(&hit.source, &path, &mut values);

    let candidates = values.into_iter().filter_map(SortValue::from_json);
    match clause.direction {
        SortDirection::Asc => candidates.min_by(SortValue::compare),
        SortDirection::Desc => candidates.max_by(SortValue::compare),
    }
}

fn collect_values<'v>(value: &'v JsonValue, path: &[&str], out: &mut Vec<&'v JsonValue>) {
    match value {
        JsonValue::Array(items) => {
            for item in items {
                collect_values(item, path, out);
            }
        }
        JsonValue::Object(map) => {
            if let Some((head, rest)) = path.split_first() {
                if let Some(child) = map.get(*head) {
                    collect_values(child, rest, out);
                }
            }
        }
        JsonValue::Null => {}
        leaf if path.is_empty() => out.push(leaf),
        _ => {}
    }
}

fn compare_on(clause: &SortClause, a: &SortableHit, b: &SortableHit) -> Ordering {
    let missing_first = clause.missing == Some(MissingPlacement::First);
    match (sort_value(clause, a), sort_value(clause, b)) {
        (Some(a), Some(b)) => {
            let ordering = a.compare(&b);
            match clause.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
        (None, None) => Ordering::Equal,
        (None, Some(_)) if missing_first => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) if missing_first => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Catalog, SortOverride};
    use crate::field::{FieldDescriptor, FieldType};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn container() -> ContainerConfiguration {
        let fields = vec![
            FieldDescriptor::new("id", FieldType::Int).unwrap().sortable(true),
            FieldDescriptor::new("sku", FieldType::Keyword).unwrap().sortable(true),
            FieldDescriptor::new("description", FieldType::Text).unwrap(),
            FieldDescriptor::new("price.price", FieldType::Price).unwrap().sortable(true),
            FieldDescriptor::new("my_price.price", FieldType::Price).unwrap().sortable(true),
        ];
        let overrides = vec![SortOverride {
            field: "my_price.price".to_string(),
            context_key: "price_group_id".to_string(),
            targets: BTreeMap::from([("1".to_string(), "price.price".to_string())]),
        }];
        ContainerConfiguration::new(
            "product_catalog",
            Catalog {
                id: 1,
                code: "b2c_fr".to_string(),
                name: None,
            },
            "gally_b2c_fr_product",
            vec![],
            fields,
            overrides,
        )
    }

    fn build(specs: &[SortSpec]) -> Result<Vec<SortClause>> {
        SortOrderBuilder::new("id").build(&container(), specs, &HashMap::new())
    }

    #[test]
    fn sorting_options_skip_identifier_and_end_with_relevance() {
        let builder = SortOrderBuilder::new("id");
        let options = builder.sorting_options(&container());
        let codes: Vec<&str> = options.iter().map(|o| o.code.as_str()).collect();
        assert_eq!(codes, vec!["sku", "price__price", "my_price__price", "_score"]);
        assert_eq!(options[1].label, "Price");
        assert_eq!(options[2].label, "My_price");
        assert_eq!(options[3].label, "Relevance");
        assert_eq!(builder.default_sorting_field(&container()), "sku");

        let bare = ContainerConfiguration::new(
            "category",
            Catalog {
                id: 1,
                code: "b2c_fr".to_string(),
                name: None,
            },
            "gally_b2c_fr_category",
            vec![],
            vec![FieldDescriptor::new("id", FieldType::Keyword).unwrap().sortable(true)],
            vec![],
        );
        assert_eq!(builder.default_sorting_field(&bare), "_score");
    }

    #[test]
    fn no_specs_sorts_by_score() {
        assert_eq!(build(&[]).unwrap(), vec![SortClause::score(SortDirection::Desc)]);
    }

    #[test]
    fn nested_field_keeps_path_and_flattened_key() {
        let clauses = build(&[SortSpec::asc("price.price")]).unwrap();
        assert_eq!(clauses[0].field, "price.price");
        assert_eq!(clauses[0].key, "price__price");
        assert_eq!(clauses[0].nested_path.as_deref(), Some("price"));
        assert_eq!(clauses[0].missing, Some(MissingPlacement::Last));
    }

    #[test]
    fn flattened_spec_resolves_too() {
        let clauses = build(&[SortSpec::desc("price__price")]).unwrap();
        assert_eq!(clauses[0].field, "price.price");
        assert_eq!(clauses[0].missing, Some(MissingPlacement::First));
    }

    #[test]
    fn unsortable_and_unknown_fields_are_rejected() {
        assert!(matches!(
            build(&[SortSpec::asc("description")]),
            Err(Error::UnsortableField(f)) if f == "description"
        ));
        assert!(matches!(
            build(&[SortSpec::asc("weight")]),
            Err(Error::UnsortableField(_))
        ));
    }

    #[test]
    fn pseudo_fields_are_always_legal_and_have_no_missing() {
        let clauses = build(&[SortSpec::asc("_id")]).unwrap();
        assert_eq!(clauses[0].field, DOC_ID_FIELD);
        assert_eq!(clauses[0].missing, None);
        assert!(clauses[1].is_score());
    }

    #[test]
    fn override_substitutes_before_flattening() {
        let context = HashMap::from([("price_group_id".to_string(), "1".to_string())]);
        let clauses = SortOrderBuilder::new("id")
            .build(&container(), &[SortSpec::asc("my_price.price")], &context)
            .unwrap();
        assert_eq!(clauses[0].field, "price.price");
        assert_eq!(clauses[0].key, "price__price");

        let context = HashMap::from([("price_group_id".to_string(), "fake".to_string())]);
        let clauses = SortOrderBuilder::new("id")
            .build(&container(), &[SortSpec::asc("my_price.price")], &context)
            .unwrap();
        assert_eq!(clauses[0].key, "my_price__price");
        assert_eq!(clauses[0].nested_path.as_deref(), Some("my_price"));
    }

    #[test]
    fn score_tie_break_is_appended_once() {
        let clauses = build(&[SortSpec::asc("id")]).unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[1], SortClause::score(SortDirection::Desc));

        let clauses = build(&[SortSpec::desc("_score")]).unwrap();
        assert_eq!(clauses.iter().filter(|c| c.is_score()).count(), 1);
        assert_eq!(clauses[1].field, "id");
        assert_eq!(clauses[1].direction, SortDirection::Desc);
        assert_eq!(clauses[1].missing, Some(MissingPlacement::First));
    }

    #[test]
    fn identifier_tie_break_is_not_duplicated() {
        let clauses = build(&[SortSpec::desc("_score"), SortSpec::asc("id")]).unwrap();
        assert_eq!(clauses.len(), 2);
    }

    #[test]
    fn nested_clause_wire_form() {
        let clauses = build(&[SortSpec::asc("price.price")]).unwrap();
        assert_eq!(
            clauses[0].to_wire(),
            json!({
                "price.price": {
                    "order": "asc",
                    "missing": "_last",
                    "mode": "min",
                    "nested": { "path": "price" }
                }
            })
        );
        assert_eq!(clauses[1].to_wire(), json!({ "_score": { "order": "desc" } }));
    }

    #[test]
    fn directions_parse_in_either_case() {
        let spec: SortSpec = serde_json::from_str(r#"{"field":"sku","direction":"DESC"}"#).unwrap();
        assert_eq!(spec.direction, SortDirection::Desc);
        let spec: SortSpec = serde_json::from_str(r#"{"field":"sku"}"#).unwrap();
        assert_eq!(spec.direction, SortDirection::Asc);
    }

    #[test]
    fn multi_valued_nested_fields_use_min_or_max() {
        let hits = || {
            vec![
                SortableHit {
                    id: "a".into(),
                    score: 1.0,
                    source: json!({ "price": [{ "price": 5 }, { "price": 50 }] }),
                },
                SortableHit {
                    id: "b".into(),
                    score: 1.0,
                    source: json!({ "price": [{ "price": 10 }] }),
                },
            ]
        };

        let mut asc = hits();
        order_hits(&build(&[SortSpec::asc("price.price")]).unwrap(), &mut asc);
        assert_eq!(asc[0].id, "a");

        let mut desc = hits();
        order_hits(&build(&[SortSpec::desc("price.price")]).unwrap(), &mut desc);
        assert_eq!(desc[0].id, "a");

        let mut by_id = hits();
        order_hits(&[SortClause::pseudo(DOC_ID_FIELD, SortDirection::Desc)], &mut by_id);
        assert_eq!(by_id[0].id, "b");
    }
}
