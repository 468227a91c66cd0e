//! Term-level queries: `exists`, `range`, `term` and `terms`

use super::{field_scoped, push_common, wrong_kind, AssemblerRegistry, QueryAssembler};
use crate::error::Result;
use crate::query::{QueryKind, QueryNode, Scalar};
use serde_json::{Map, Value as JsonValue};

fn scalar(value: &Scalar) -> JsonValue {
    match value {
        Scalar::Bool(v) => JsonValue::Bool(*v),
        Scalar::Integer(v) => (*v).into(),
        Scalar::Float(v) => (*v).into(),
        Scalar::Text(v) => JsonValue::String(v.clone()),
    }
}

pub struct ExistsAssembler;

impl QueryAssembler for ExistsAssembler {
    fn kind(&self) -> QueryKind {
        QueryKind::Exists
    }

    fn assemble(&self, node: &QueryNode, _registry: &AssemblerRegistry) -> Result<JsonValue> {
        let QueryNode::Exists(query) = node else {
            return Err(wrong_kind(self.kind(), node));
        };

        let mut params = Map::new();
        params.insert("field".to_string(), query.field.clone().into());
        push_common(&mut params, query.name.as_deref(), query.boost);

        let mut outer = Map::new();
        outer.insert("exists".to_string(), JsonValue::Object(params));
        Ok(JsonValue::Object(outer))
    }
}

pub struct RangeAssembler;

impl QueryAssembler for RangeAssembler {
    fn kind(&self) -> QueryKind {
        QueryKind::Range
    }

    fn assemble(&self, node: &QueryNode, _registry: &AssemblerRegistry) -> Result<JsonValue> {
        let QueryNode::Range(query) = node else {
            return Err(wrong_kind(self.kind(), node));
        };

        let mut params = Map::new();
        let bounds = [
            ("gt", &query.bounds.gt),
            ("gte", &query.bounds.gte),
            ("lt", &query.bounds.lt),
            ("lte", &query.bounds.lte),
        ];
        for (key, bound) in bounds {
            if let Some(value) = bound {
                params.insert(key.to_string(), scalar(value));
            }
        }
        push_common(&mut params, query.name.as_deref(), query.boost);

        Ok(field_scoped("range", &query.field, params))
    }
}

pub struct TermAssembler;

impl QueryAssembler for TermAssembler {
    fn kind(&self) -> QueryKind {
        QueryKind::Term
    }

    fn assemble(&self, node: &QueryNode, _registry: &AssemblerRegistry) -> Result<JsonValue> {
        let QueryNode::Term(query) = node else {
            return Err(wrong_kind(self.kind(), node));
        };

        let mut params = Map::new();
        params.insert("value".to_string(), scalar(&query.value));
        push_common(&mut params, query.name.as_deref(), query.boost);

        Ok(field_scoped("term", &query.field, params))
    }
}

/// Values sit directly under the field key; `boost` and `_name` are siblings.
pub struct TermsAssembler;

impl QueryAssembler for TermsAssembler {
    fn kind(&self) -> QueryKind {
        QueryKind::Terms
    }

    fn assemble(&self, node: &QueryNode, _registry: &AssemblerRegistry) -> Result<JsonValue> {
        let QueryNode::Terms(query) = node else {
            return Err(wrong_kind(self.kind(), node));
        };

        let mut params = Map::new();
        params.insert(
            query.field.clone(),
            JsonValue::Array(query.values.iter().map(scalar).collect()),
        );
        push_common(&mut params, query.name.as_deref(), query.boost);

        let mut outer = Map::new();
        outer.insert("terms".to_string(), JsonValue::Object(params));
        Ok(JsonValue::Object(outer))
    }
}
