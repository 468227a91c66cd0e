//! Full-text queries: `match`, `match_phrase_prefix` and `match_phrase`

use super::{field_scoped, push_common, wrong_kind, AssemblerRegistry, QueryAssembler};
use crate::error::Result;
use crate::query::{QueryKind, QueryNode};
use serde_json::{Map, Value as JsonValue};

pub struct MatchAssembler;

impl QueryAssembler for MatchAssembler {
    fn kind(&self) -> QueryKind {
        QueryKind::Match
    }

    fn assemble(&self, node: &QueryNode, _registry: &AssemblerRegistry) -> Result<JsonValue> {
        let QueryNode::Match(query) = node else {
            return Err(wrong_kind(self.kind(), node));
        };

        let mut params = Map::new();
        params.insert("query".to_string(), query.query_text.clone().into());
        if let Some(msm) = &query.minimum_should_match {
            params.insert("minimum_should_match".to_string(), msm.clone().into());
        }
        if let Some(analyzer) = &query.analyzer {
            params.insert("analyzer".to_string(), analyzer.clone().into());
        }
        push_common(&mut params, query.name.as_deref(), query.boost);

        Ok(field_scoped("match", &query.field, params))
    }
}

/// The query name sits beside the field object rather than inside it.
pub struct MatchPhrasePrefixAssembler;

impl QueryAssembler for MatchPhrasePrefixAssembler {
    fn kind(&self) -> QueryKind {
        QueryKind::MatchPhrasePrefix
    }

    fn assemble(&self, node: &QueryNode, _registry: &AssemblerRegistry) -> Result<JsonValue> {
        let QueryNode::MatchPhrasePrefix(query) = node else {
            return Err(wrong_kind(self.kind(), node));
        };

        let mut params = Map::new();
        params.insert("query".to_string(), query.query_text.clone().into());
        params.insert("boost".to_string(), query.boost.into());
        params.insert("max_expansions".to_string(), query.max_expansions.into());

        let mut body = Map::new();
        body.insert(query.field.clone(), JsonValue::Object(params));
        if let Some(name) = &query.name {
            body.insert("_name".to_string(), name.clone().into());
        }

        let mut outer = Map::new();
        outer.insert("match_phrase_prefix".to_string(), JsonValue::Object(body));
        Ok(JsonValue::Object(outer))
    }
}

pub struct PhraseAssembler;

impl QueryAssembler for PhraseAssembler {
    fn kind(&self) -> QueryKind {
        QueryKind::Phrase
    }

    fn assemble(&self, node: &QueryNode, _registry: &AssemblerRegistry) -> Result<JsonValue> {
        let QueryNode::Phrase(query) = node else {
            return Err(wrong_kind(self.kind(), node));
        };

        let mut params = Map::new();
        params.insert("query".to_string(), query.query_text.clone().into());
        push_common(&mut params, query.name.as_deref(), query.boost);

        Ok(field_scoped("match_phrase", &query.field, params))
    }
}
