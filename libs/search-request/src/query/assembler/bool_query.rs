//! `bool` query rendering

use super::{push_common, wrong_kind, AssemblerRegistry, QueryAssembler};
use crate::error::Result;
use crate::query::{QueryKind, QueryNode};
use serde_json::{json, Map, Value as JsonValue};

/// Renders `bool` queries. Empty clause lists are left out entirely.
pub struct BoolAssembler;

impl QueryAssembler for BoolAssembler {
    fn kind(&self) -> QueryKind {
        QueryKind::Bool
    }

    fn assemble(&self, node: &QueryNode, registry: &AssemblerRegistry) -> Result<JsonValue> {
        let QueryNode::Bool(query) = node else {
            return Err(wrong_kind(self.kind(), node));
        };

        let mut params = Map::new();
        if !query.must.is_empty() {
            params.insert("must".to_string(), registry.render_all(&query.must)?);
        }
        if !query.should.is_empty() {
            params.insert("should".to_string(), registry.render_all(&query.should)?);
            params.insert(
                "minimum_should_match".to_string(),
                query.minimum_should_match.clone().into(),
            );
        }
        if !query.must_not.is_empty() {
            params.insert("must_not".to_string(), registry.render_all(&query.must_not)?);
        }
        push_common(&mut params, query.name.as_deref(), query.boost);

        Ok(json!({ "bool": params }))
    }
}

#[cfg(test)]
mod tests {
    use crate::query::{AssemblerRegistry, BoolQuery, ExistsQuery, QueryNode, TermQuery};
    use serde_json::json;

    fn assemble(node: QueryNode) -> serde_json::Value {
        AssemblerRegistry::with_defaults().assemble(&node).unwrap()
    }

    #[test]
    fn empty_clause_lists_are_omitted() {
        let rendered = assemble(BoolQuery::default().into());
        assert_eq!(rendered, json!({ "bool": { "boost": 1.0 } }));
        let params = rendered["bool"].as_object().unwrap();
        for key in ["must", "should", "must_not", "minimum_should_match"] {
            assert!(!params.contains_key(key), "unexpected key {key}");
        }
    }

    #[test]
    fn only_populated_clauses_are_rendered() {
        let must: QueryNode = TermQuery::new("is_active", true).unwrap().into();
        let query = BoolQuery::new(vec![must], vec![], vec![]).unwrap();

        assert_eq!(
            assemble(query.into()),
            json!({
                "bool": {
                    "must": [{ "term": { "is_active": { "value": true, "boost": 1.0 } } }],
                    "boost": 1.0
                }
            })
        );
    }

    #[test]
    fn minimum_should_match_follows_should_clauses() {
        let should: QueryNode = ExistsQuery::new("sku").unwrap().into();
        let must_not: QueryNode = ExistsQuery::new("deleted_at").unwrap().into();
        let query = BoolQuery::new(vec![], vec![should], vec![must_not])
            .unwrap()
            .with_minimum_should_match("100%")
            .with_name("catalog_visibility")
            .with_boost(2.0);

        assert_eq!(
            assemble(query.into()),
            json!({
                "bool": {
                    "should": [{ "exists": { "field": "sku", "boost": 1.0 } }],
                    "minimum_should_match": "100%",
                    "must_not": [{ "exists": { "field": "deleted_at", "boost": 1.0 } }],
                    "boost": 2.0,
                    "_name": "catalog_visibility"
                }
            })
        );
    }
}
