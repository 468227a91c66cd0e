//! Compound queries wrapping other nodes: `nested` and `filtered`

use super::{push_common, wrong_kind, AssemblerRegistry, QueryAssembler};
use crate::error::Result;
use crate::query::{QueryKind, QueryNode};
use serde_json::{json, Map, Value as JsonValue};

pub struct NestedAssembler;

impl QueryAssembler for NestedAssembler {
    fn kind(&self) -> QueryKind {
        QueryKind::Nested
    }

    fn assemble(&self, node: &QueryNode, registry: &AssemblerRegistry) -> Result<JsonValue> {
        let QueryNode::Nested(query) = node else {
            return Err(wrong_kind(self.kind(), node));
        };

        let mut params = Map::new();
        params.insert("path".to_string(), query.path.clone().into());
        params.insert("query".to_string(), registry.render(&query.query)?);
        params.insert("score_mode".to_string(), query.score_mode.as_str().into());
        push_common(&mut params, query.name.as_deref(), query.boost);

        Ok(json!({ "nested": params }))
    }
}

/// Splits scoring from filtering.
///
/// | query | filter | output                               |
/// |-------|--------|--------------------------------------|
/// | -     | -      | `match_all`                          |
/// | -     | set    | `constant_score { filter }`          |
/// | set   | -      | the query itself                     |
/// | set   | set    | `bool { must: [query], filter: [f] }`|
pub struct FilteredAssembler;

impl QueryAssembler for FilteredAssembler {
    fn kind(&self) -> QueryKind {
        QueryKind::Filtered
    }

    fn assemble(&self, node: &QueryNode, registry: &AssemblerRegistry) -> Result<JsonValue> {
        let QueryNode::Filtered(filtered) = node else {
            return Err(wrong_kind(self.kind(), node));
        };

        let query = filtered.query.as_deref();
        let filter = filtered.filter.as_deref();
        let mut params = Map::new();

        let key = match (query, filter) {
            (None, None) => "match_all",
            (Some(query), None) => return registry.render(query),
            (None, Some(filter)) => {
                params.insert("filter".to_string(), registry.render(filter)?);
                "constant_score"
            }
            (Some(query), Some(filter)) => {
                params.insert("must".to_string(), json!([registry.render(query)?]));
                params.insert("filter".to_string(), json!([registry.render(filter)?]));
                "bool"
            }
        };
        push_common(&mut params, filtered.name.as_deref(), filtered.boost);

        let mut outer = Map::new();
        outer.insert(key.to_string(), JsonValue::Object(params));
        Ok(JsonValue::Object(outer))
    }
}

#[cfg(test)]
mod tests {
    use crate::query::{
        AssemblerRegistry, FilteredQuery, MatchQuery, NestedQuery, QueryNode, ScoreMode,
        TermQuery,
    };
    use serde_json::json;

    fn assemble(node: impl Into<QueryNode>) -> serde_json::Value {
        AssemblerRegistry::with_defaults()
            .assemble(&node.into())
            .unwrap()
    }

    fn text() -> QueryNode {
        MatchQuery::new("search", "bag").unwrap().into()
    }

    fn active() -> QueryNode {
        TermQuery::new("is_active", true).unwrap().into()
    }

    #[test]
    fn nested_defaults_score_mode_to_none() {
        let nested = NestedQuery::new("category", TermQuery::new("category.id", "cat_1").unwrap())
            .unwrap();
        assert_eq!(
            assemble(nested),
            json!({
                "nested": {
                    "path": "category",
                    "query": { "term": { "category.id": { "value": "cat_1", "boost": 1.0 } } },
                    "score_mode": "none",
                    "boost": 1.0
                }
            })
        );

        let scored = NestedQuery::new("category", TermQuery::new("category.id", "cat_1").unwrap())
            .unwrap()
            .with_score_mode(ScoreMode::Max);
        assert_eq!(assemble(scored)["nested"]["score_mode"], "max");
    }

    #[test]
    fn filtered_without_parts_matches_all() {
        assert_eq!(
            assemble(FilteredQuery::new(None, None)),
            json!({ "match_all": { "boost": 1.0 } })
        );
    }

    #[test]
    fn filtered_with_only_filter_is_constant_score() {
        assert_eq!(
            assemble(FilteredQuery::new(None, Some(active()))),
            json!({
                "constant_score": {
                    "filter": { "term": { "is_active": { "value": true, "boost": 1.0 } } },
                    "boost": 1.0
                }
            })
        );
    }

    #[test]
    fn filtered_with_only_query_is_the_bare_query() {
        assert_eq!(
            assemble(FilteredQuery::new(Some(text()), None)),
            json!({ "match": { "search": { "query": "bag", "boost": 1.0 } } })
        );
    }

    #[test]
    fn filtered_with_both_parts_is_bool_must_filter() {
        assert_eq!(
            assemble(FilteredQuery::new(Some(text()), Some(active()))),
            json!({
                "bool": {
                    "must": [{ "match": { "search": { "query": "bag", "boost": 1.0 } } }],
                    "filter": [{ "term": { "is_active": { "value": true, "boost": 1.0 } } }],
                    "boost": 1.0
                }
            })
        );
    }
}
