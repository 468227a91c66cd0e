//! Field metadata for search containers

use crate::error::{Error, Result};
use crate::query::QueryKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Separator between a nested object path and the field inside it.
pub const PATH_SEPARATOR: char = '.';

/// Replacement for [`PATH_SEPARATOR`] in flattened keys (`category.id` -> `category__id`).
pub const FLATTENED_SEPARATOR: &str = "__";

/// Option value -> display label.
pub type OptionLabels = BTreeMap<String, String>;

/// Field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Keyword,
    Select,
    Int,
    Float,
    Boolean,
    Price,
    Stock,
    Category,
    Reference,
    Image,
    Object,
    Date,
    Location,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Keyword => "keyword",
            Self::Select => "select",
            Self::Int => "int",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Price => "price",
            Self::Stock => "stock",
            Self::Category => "category",
            Self::Reference => "reference",
            Self::Image => "image",
            Self::Object => "object",
            Self::Date => "date",
            Self::Location => "location",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float | Self::Price | Self::Stock)
    }

    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            Self::Text | Self::Keyword | Self::Select | Self::Reference
        )
    }

    /// Whether a criterion compiling to `kind` is meaningful on this type.
    pub fn supports(&self, kind: QueryKind) -> bool {
        match kind {
            QueryKind::Match | QueryKind::MatchPhrasePrefix | QueryKind::Phrase => {
                self.is_textual()
            }
            QueryKind::Range => self.is_numeric() || *self == Self::Date,
            QueryKind::Term | QueryKind::Terms | QueryKind::Exists => true,
            QueryKind::Bool | QueryKind::Nested | QueryKind::Filtered => true,
        }
    }

    /// How a facet on this type is presented.
    pub fn facet_type(&self) -> FacetType {
        match self {
            Self::Category => FacetType::Category,
            t if t.is_numeric() => FacetType::Slider,
            _ => FacetType::Checkbox,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetType {
    Checkbox,
    Slider,
    Category,
}

/// Field definition as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub code: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub used_for_rules: bool,
    #[serde(default)]
    pub spellchecked: bool,
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Catalog code -> option labels for that catalog.
    #[serde(default)]
    pub option_labels: BTreeMap<String, OptionLabels>,
}

fn default_weight() -> f64 {
    1.0
}

/// Resolved, read-only description of one field.
///
/// The nested path and nested code are derived from the code once, at
/// construction, and cannot be set independently.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    code: String,
    field_type: FieldType,
    label: Option<String>,
    searchable: bool,
    filterable: bool,
    sortable: bool,
    used_for_rules: bool,
    spellchecked: bool,
    weight: f64,
    option_labels: BTreeMap<String, OptionLabels>,
    nested: Option<(String, String)>,
}

impl FieldDescriptor {
    pub fn new(code: impl Into<String>, field_type: FieldType) -> Result<Self> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(Error::malformed("field code cannot be empty"));
        }
        let nested = code
            .split_once(PATH_SEPARATOR)
            .map(|(path, rest)| (path.to_string(), rest.to_string()));
        Ok(Self {
            code,
            field_type,
            label: None,
            searchable: false,
            filterable: false,
            sortable: false,
            used_for_rules: false,
            spellchecked: false,
            weight: 1.0,
            option_labels: BTreeMap::new(),
            nested,
        })
    }

    pub fn from_definition(definition: &FieldDefinition) -> Result<Self> {
        let mut descriptor = Self::new(definition.code.clone(), definition.field_type)?
            .searchable(definition.searchable)
            .filterable(definition.filterable)
            .sortable(definition.sortable)
            .used_for_rules(definition.used_for_rules)
            .spellchecked(definition.spellchecked)
            .with_weight(definition.weight);
        descriptor.label = definition.label.clone();
        descriptor.option_labels = definition.option_labels.clone();
        Ok(descriptor)
    }

    pub fn searchable(mut self, value: bool) -> Self {
        self.searchable = value;
        self
    }

    pub fn filterable(mut self, value: bool) -> Self {
        self.filterable = value;
        self
    }

    pub fn sortable(mut self, value: bool) -> Self {
        self.sortable = value;
        self
    }

    pub fn used_for_rules(mut self, value: bool) -> Self {
        self.used_for_rules = value;
        self
    }

    pub fn spellchecked(mut self, value: bool) -> Self {
        self.spellchecked = value;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the option labels of one catalog, replacing earlier ones.
    pub fn with_option_labels(
        mut self,
        catalog_code: impl Into<String>,
        labels: OptionLabels,
    ) -> Self {
        self.option_labels.insert(catalog_code.into(), labels);
        self
    }

    /// Weights below 1 are raised to 1.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight.max(1.0);
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_searchable(&self) -> bool {
        self.searchable
    }

    pub fn is_filterable(&self) -> bool {
        self.filterable
    }

    pub fn is_sortable(&self) -> bool {
        self.sortable
    }

    pub fn is_used_for_rules(&self) -> bool {
        self.used_for_rules
    }

    pub fn is_spellchecked(&self) -> bool {
        self.spellchecked
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn is_nested(&self) -> bool {
        self.nested.is_some()
    }

    /// `price` for `price.price`.
    pub fn nested_path(&self) -> Option<&str> {
        self.nested.as_ref().map(|(path, _)| path.as_str())
    }

    /// `price` for `price.price`; everything after the first separator.
    pub fn nested_code(&self) -> Option<&str> {
        self.nested.as_ref().map(|(_, code)| code.as_str())
    }

    pub fn flattened_code(&self) -> String {
        flatten(&self.code)
    }

    pub fn label(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.default_label())
    }

    /// Label of an option value in `catalog_code`, if one is configured.
    pub fn option_label(&self, catalog_code: &str, value: &str) -> Option<&str> {
        self.option_labels
            .get(catalog_code)
            .and_then(|labels| labels.get(value))
            .map(String::as_str)
    }

    /// Capitalized nested path, or capitalized code for flat fields.
    pub fn default_label(&self) -> String {
        let base = self.nested_path().unwrap_or(&self.code);
        let mut chars = base.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Replace every path separator with the flattened delimiter.
pub fn flatten(code: &str) -> String {
    code.replace(PATH_SEPARATOR, FLATTENED_SEPARATOR)
}

/// Inverse of [`flatten`].
pub fn unflatten(key: &str) -> String {
    key.replace(FLATTENED_SEPARATOR, &PATH_SEPARATOR.to_string())
}
