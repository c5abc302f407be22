//! Core schema types for locol-graph
//!
//! This module contains the read-only data model supplied by the component
//! catalog: what a receiver/processor/exporter/extension/connector looks like,
//! which configuration fields it accepts, and which constraint groups apply.
//!
//! # Main Types
//!
//! - [`ComponentKind`] - The five collector component categories
//! - [`Stage`] - One of the three reference lists of a pipeline
//! - [`Field`] - A single schema field (short name, canonical path, kind)
//! - [`ConstraintGroup`] - An anyOf/oneOf/atMostOne/allOf rule over keys
//! - [`ComponentDefinition`] - Everything the catalog knows about a component
//!
//! # Canonical Paths
//!
//! Every field carries a dotted canonical path derived from its position in
//! the configuration tree, e.g. `protocols.grpc.endpoint`. The last segment is
//! the field's short name. [`ComponentDefinition::path_index`] builds the
//! short-name lookup once and caches it on the definition.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use crate::value::ConfigValue;

/// Module identifier used for definitions synthesized for unknown components
pub const CUSTOM_MODULE: &str = "custom";

/// Category of a collector component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Receiver,
    Processor,
    Exporter,
    Extension,
    Connector,
}

impl ComponentKind {
    /// All kinds in document order
    pub const ALL: [ComponentKind; 5] = [
        ComponentKind::Receiver,
        ComponentKind::Processor,
        ComponentKind::Exporter,
        ComponentKind::Extension,
        ComponentKind::Connector,
    ];

    /// Top-level document section holding instances of this kind
    pub fn section(&self) -> &'static str {
        match self {
            ComponentKind::Receiver => "receivers",
            ComponentKind::Processor => "processors",
            ComponentKind::Exporter => "exporters",
            ComponentKind::Extension => "extensions",
            ComponentKind::Connector => "connectors",
        }
    }

    /// Inverse of [`ComponentKind::section`]
    pub fn from_section(section: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.section() == section)
    }

    /// The pipeline stage that may reference this kind, if any.
    ///
    /// Extensions and connectors live only in the global registries.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ComponentKind::Receiver => Some(Stage::Receivers),
            ComponentKind::Processor => Some(Stage::Processors),
            ComponentKind::Exporter => Some(Stage::Exporters),
            ComponentKind::Extension | ComponentKind::Connector => None,
        }
    }

    /// Index into per-kind storage
    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentKind::Receiver => "receiver",
            ComponentKind::Processor => "processor",
            ComponentKind::Exporter => "exporter",
            ComponentKind::Extension => "extension",
            ComponentKind::Connector => "connector",
        };
        f.write_str(name)
    }
}

/// One of the three ordered reference lists of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Receivers,
    Processors,
    Exporters,
}

impl Stage {
    /// All stages in document order
    pub const ALL: [Stage; 3] = [Stage::Receivers, Stage::Processors, Stage::Exporters];

    /// The component kind this stage accepts
    pub fn kind(&self) -> ComponentKind {
        match self {
            Stage::Receivers => ComponentKind::Receiver,
            Stage::Processors => ComponentKind::Processor,
            Stage::Exporters => ComponentKind::Exporter,
        }
    }

    /// Key used for this stage inside `service.pipelines.<name>`
    pub fn key(&self) -> &'static str {
        self.kind().section()
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Declared type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    #[default]
    String,
    Bool,
    Int,
    Double,
    Duration,
    StringArray,
    Array,
    StringMap,
    Map,
    /// Enumerated string (levels, modes)
    Enum,
    /// Nested struct or anything the extractor could not classify
    Custom,
}

impl FieldKind {
    /// Whether values of this kind are stored whole rather than flattened
    /// into dotted child paths.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            FieldKind::StringArray | FieldKind::Array | FieldKind::StringMap | FieldKind::Map
        )
    }
}

/// A single configuration field declared by a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Short name (last path segment), e.g. `endpoint`
    pub name: String,

    /// Full dotted canonical path, e.g. `protocols.grpc.endpoint`
    #[serde(default)]
    pub path: String,

    /// Declared value kind
    #[serde(default)]
    pub kind: FieldKind,

    /// Default value applied by the collector when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ConfigValue>,

    /// Whether the collector requires this field
    #[serde(default)]
    pub required: bool,

    /// Human readable description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Field {
    /// Create a top-level field whose canonical path equals its name
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            path: name.clone(),
            name,
            kind,
            default: None,
            required: false,
            description: String::new(),
        }
    }

    /// Create a field nested under `parent` (a dotted path)
    pub fn nested(parent: &str, name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            path: format!("{}.{}", parent, name),
            ..Self::new(name, kind)
        }
    }

    /// Set the default value
    pub fn with_default(mut self, default: ConfigValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Canonical path, falling back to the short name for catalogs that
    /// only list top-level fields.
    pub fn canonical_path(&self) -> &str {
        if self.path.is_empty() {
            &self.name
        } else {
            &self.path
        }
    }
}

/// Kind of a constraint group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    #[serde(rename = "anyOf")]
    AnyOf,
    #[serde(rename = "oneOf")]
    OneOf,
    #[serde(rename = "atMostOne")]
    AtMostOne,
    #[serde(rename = "allOf")]
    AllOf,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintKind::AnyOf => "anyOf",
            ConstraintKind::OneOf => "oneOf",
            ConstraintKind::AtMostOne => "atMostOne",
            ConstraintKind::AllOf => "allOf",
        };
        f.write_str(name)
    }
}

/// A schema-declared rule over a set of configuration keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintGroup {
    pub kind: ConstraintKind,

    /// Configuration keys covered by the rule (canonical paths or short names)
    pub keys: Vec<String>,

    /// Optional catalog-provided explanation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ConstraintGroup {
    pub fn new<I, S>(kind: ConstraintKind, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            keys: keys.into_iter().map(Into::into).collect(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Bidirectional short-name / canonical-path lookup for one definition
#[derive(Debug, Clone, Default)]
pub struct PathIndex {
    /// Short name -> canonical path. Ambiguous short names are absent.
    by_short_name: HashMap<String, String>,
    /// Every canonical path declared by the definition
    canonical: HashSet<String>,
    /// Canonical path -> short name
    by_path: HashMap<String, String>,
}

impl PathIndex {
    fn build(fields: &[Field]) -> Self {
        let mut index = Self::default();
        let mut ambiguous = HashSet::new();

        for field in fields {
            let path = field.canonical_path().to_string();
            index.canonical.insert(path.clone());
            index.by_path.insert(path.clone(), field.name.clone());

            if ambiguous.contains(&field.name) {
                continue;
            }
            match index.by_short_name.get(&field.name) {
                Some(existing) if *existing != path => {
                    index.by_short_name.remove(&field.name);
                    ambiguous.insert(field.name.clone());
                }
                Some(_) => {}
                None => {
                    index.by_short_name.insert(field.name.clone(), path);
                }
            }
        }

        index
    }

    /// Canonical path for a short field name, if unambiguous
    pub fn path_for(&self, short_name: &str) -> Option<&str> {
        self.by_short_name.get(short_name).map(String::as_str)
    }

    /// Short name for a canonical path
    pub fn short_name_for(&self, path: &str) -> Option<&str> {
        self.by_path.get(path).map(String::as_str)
    }

    /// Whether `path` is a canonical path of this definition
    pub fn is_canonical(&self, path: &str) -> bool {
        self.canonical.contains(path)
    }

    /// Whether any canonical path lies strictly below `prefix`
    pub fn has_children(&self, prefix: &str) -> bool {
        self.canonical
            .iter()
            .any(|p| p.len() > prefix.len() && p.starts_with(prefix) && p.as_bytes()[prefix.len()] == b'.')
    }
}

/// Everything the catalog knows about a component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDefinition {
    /// Catalog identity. Defaults to `<kind>/<name>` when not provided.
    #[serde(default)]
    pub id: String,

    /// Base component name as it appears in documents, e.g. `otlp`
    pub name: String,

    /// Display name for UIs
    #[serde(default)]
    pub display_name: String,

    #[serde(rename = "type")]
    pub kind: ComponentKind,

    /// Go module path of the implementation, or [`CUSTOM_MODULE`]
    #[serde(default)]
    pub module: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default)]
    pub fields: Vec<Field>,

    #[serde(default)]
    pub constraints: Vec<ConstraintGroup>,

    #[serde(skip)]
    path_index: OnceLock<PathIndex>,
}

impl ComponentDefinition {
    /// Create a definition with no fields or constraints
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        let name = name.into();
        Self {
            id: format!("{}/{}", kind, name),
            display_name: name.clone(),
            name,
            kind,
            module: String::new(),
            description: String::new(),
            fields: Vec::new(),
            constraints: Vec::new(),
            path_index: OnceLock::new(),
        }
    }

    /// Minimal stand-in for a component the catalog does not know
    pub fn custom(name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            module: CUSTOM_MODULE.to_string(),
            ..Self::new(name, kind)
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self.path_index = OnceLock::new();
        self
    }

    pub fn with_constraint(mut self, group: ConstraintGroup) -> Self {
        self.constraints.push(group);
        self
    }

    /// Whether this definition was synthesized for an unknown component
    pub fn is_custom(&self) -> bool {
        self.module == CUSTOM_MODULE
    }

    /// Field with the given canonical path
    pub fn field(&self, path: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.canonical_path() == path)
    }

    /// Cached short-name / canonical-path index
    pub fn path_index(&self) -> &PathIndex {
        self.path_index.get_or_init(|| PathIndex::build(&self.fields))
    }

    /// Fill identity fields that catalogs may omit
    pub(crate) fn fill_defaults(&mut self) {
        if self.id.is_empty() {
            self.id = format!("{}/{}", self.kind, self.name);
        }
        if self.display_name.is_empty() {
            self.display_name = self.name.clone();
        }
    }
}
