//! Query DSL assemblers.
//!
//! Each assembler renders one [`QueryKind`] into the backend's JSON query DSL.
//! Assemblers are stateless; compound kinds call back into the registry to
//! render their children.

use super::{QueryKind, QueryNode};
use crate::error::{Error, Result};
use serde_json::{Map, Value as JsonValue};

mod bool_query;
mod compound;
mod full_text;
mod term_level;

pub use bool_query::BoolAssembler;
pub use compound::{FilteredAssembler, NestedAssembler};
pub use full_text::{MatchAssembler, MatchPhrasePrefixAssembler, PhraseAssembler};
pub use term_level::{ExistsAssembler, RangeAssembler, TermAssembler, TermsAssembler};

/// Renders one query kind.
pub trait QueryAssembler: Send + Sync {
    /// The kind this assembler is registered for.
    fn kind(&self) -> QueryKind;

    /// Render `node`. Children must be rendered through `registry.render`.
    fn assemble(&self, node: &QueryNode, registry: &AssemblerRegistry) -> Result<JsonValue>;
}

/// Dispatch table with one slot per [`QueryKind`].
pub struct AssemblerRegistry {
    slots: [Option<Box<dyn QueryAssembler>>; QueryKind::COUNT],
}

impl AssemblerRegistry {
    /// A registry with no assemblers; every kind is unsupported until registered.
    pub fn empty() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// A registry with the built-in assembler for every kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(BoolAssembler));
        registry.register(Box::new(MatchAssembler));
        registry.register(Box::new(MatchPhrasePrefixAssembler));
        registry.register(Box::new(PhraseAssembler));
        registry.register(Box::new(ExistsAssembler));
        registry.register(Box::new(RangeAssembler));
        registry.register(Box::new(TermAssembler));
        registry.register(Box::new(TermsAssembler));
        registry.register(Box::new(NestedAssembler));
        registry.register(Box::new(FilteredAssembler));
        registry
    }

    /// Install `assembler` in its kind's slot, replacing any previous one.
    pub fn register(&mut self, assembler: Box<dyn QueryAssembler>) {
        let slot = assembler.kind().index();
        self.slots[slot] = Some(assembler);
    }

    pub fn supports(&self, kind: QueryKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    /// Validate the whole tree, then render it.
    pub fn assemble(&self, node: &QueryNode) -> Result<JsonValue> {
        node.validate()?;
        self.render(node)
    }

    /// Render an already validated node.
    pub fn render(&self, node: &QueryNode) -> Result<JsonValue> {
        let kind = node.kind();
        match &self.slots[kind.index()] {
            Some(assembler) => assembler.assemble(node, self),
            None => Err(Error::UnsupportedQueryType(kind)),
        }
    }

    pub(crate) fn render_all(&self, nodes: &[QueryNode]) -> Result<JsonValue> {
        nodes
            .iter()
            .map(|node| self.render(node))
            .collect::<Result<Vec<_>>>()
            .map(JsonValue::Array)
    }
}

impl Default for AssemblerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for AssemblerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registered: Vec<QueryKind> = QueryKind::ALL
            .into_iter()
            .filter(|kind| self.supports(*kind))
            .collect();
        f.debug_struct("AssemblerRegistry")
            .field("registered", &registered)
            .finish()
    }
}

/// Append the `boost` and optional `_name` keys shared by every query kind.
pub(crate) fn push_common(params: &mut Map<String, JsonValue>, name: Option<&str>, boost: f64) {
    params.insert("boost".to_string(), boost.into());
    if let Some(name) = name {
        params.insert("_name".to_string(), name.into());
    }
}

/// Wrap `params` as `{ <key>: { <field>: params } }`.
pub(crate) fn field_scoped(key: &str, field: &str, params: Map<String, JsonValue>) -> JsonValue {
    let mut inner = Map::new();
    inner.insert(field.to_string(), JsonValue::Object(params));
    let mut outer = Map::new();
    outer.insert(key.to_string(), JsonValue::Object(inner));
    JsonValue::Object(outer)
}

pub(crate) fn wrong_kind(expected: QueryKind, node: &QueryNode) -> Error {
    tracing::error!(expected = %expected, actual = %node.kind(), "query assembler dispatched to the wrong node kind");
    Error::UnsupportedQueryType(node.kind())
}
