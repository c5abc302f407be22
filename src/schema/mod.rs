//! Component schema catalog.
//!
//! The catalog is an external, read-only lookup service: given a base
//! component name and the section it appears in, it returns the
//! [`ComponentDefinition`] describing fields and constraint groups.
//!
//! [`ComponentCatalog`] is the in-process implementation, loaded from the JSON
//! document written by the collector config extractor. Fields sit under
//! `config.fields` and address their place in the configuration with
//! `path_tokens`; constraint keys are token lists too:
//!
//! ```json
//! {
//!   "version": "v0.91.0",
//!   "components": [
//!     {
//!       "name": "otlp",
//!       "type": "receiver",
//!       "config": {
//!         "fields": [
//!           { "name": "Endpoint", "type": "string",
//!             "path_tokens": ["protocols", "grpc", "endpoint"] }
//!         ]
//!       },
//!       "constraints": [
//!         { "kind": "anyOf", "keys": [["protocols", "grpc"], ["protocols", "http"]] }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Hand-written catalogs may instead list fields at the component level with
//! a dotted `path` and a `kind`, and give constraint keys as dotted strings.

pub mod constraints;
pub mod path;

pub use constraints::{ConstraintValidator, Violation, ViolationRule};
pub use path::PathNormalizer;

use crate::document::tree;
use crate::error::{LocolError, Result};
use crate::types::{ComponentDefinition, ComponentKind, ConstraintGroup, ConstraintKind, Field, FieldKind};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Read-only component schema lookup
pub trait SchemaCatalog: Send + Sync {
    /// Definition of `base_name` within `kind`.
    ///
    /// Names are scoped by kind: `otlp` is both a receiver and an exporter.
    fn lookup(&self, kind: ComponentKind, base_name: &str) -> Option<Arc<ComponentDefinition>>;

    /// Fields declared by a definition
    fn fields<'a>(&self, definition: &'a ComponentDefinition) -> &'a [Field] {
        &definition.fields
    }

    /// Constraint groups declared by a definition
    fn constraints<'a>(&self, definition: &'a ComponentDefinition) -> &'a [ConstraintGroup] {
        &definition.constraints
    }

    /// Collector version the catalog was extracted from
    fn version(&self) -> &str {
        ""
    }
}

/// On-disk catalog layout
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    version: String,
    #[serde(default)]
    components: Option<Vec<CatalogComponent>>,
}

#[derive(Debug, Deserialize)]
struct CatalogComponent {
    name: String,
    #[serde(rename = "type")]
    kind: ComponentKind,
    #[serde(default)]
    module: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    config: CatalogConfig,
    /// Hand-written layout: fields with dotted paths
    #[serde(default)]
    fields: Vec<Field>,
    /// The extractor writes `null` for components without constraints
    #[serde(default)]
    constraints: Option<Vec<CatalogConstraint>>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogConfig {
    #[serde(default)]
    fields: Option<Vec<ExtractedField>>,
}

/// Field as written by the extractor
#[derive(Debug, Deserialize)]
struct ExtractedField {
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    type_name: String,
    #[serde(default)]
    path_tokens: Vec<String>,
    #[serde(default)]
    format: String,
    #[serde(default)]
    enum_values: Vec<String>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    default: Option<serde_yaml::Value>,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct CatalogConstraint {
    kind: ConstraintKind,
    keys: Vec<CatalogKey>,
    #[serde(default)]
    message: Option<String>,
}

/// Constraint key as path tokens or as a dotted string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogKey {
    Tokens(Vec<String>),
    Dotted(String),
}

/// Marker the extractor uses for "any element of an array"
const ARRAY_TOKEN: &str = "[]";

impl CatalogKey {
    fn into_path(self) -> String {
        match self {
            CatalogKey::Tokens(tokens) => tokens.join("."),
            CatalogKey::Dotted(path) => path,
        }
    }
}

impl ExtractedField {
    fn kind(&self) -> FieldKind {
        let kind = match self.type_name.as_str() {
            "string" => FieldKind::String,
            "bool" => FieldKind::Bool,
            "int" => FieldKind::Int,
            "double" => FieldKind::Double,
            "duration" => FieldKind::Duration,
            "stringArray" => FieldKind::StringArray,
            "array" => FieldKind::Array,
            "stringMap" => FieldKind::StringMap,
            "map" => FieldKind::Map,
            "enum" => FieldKind::Enum,
            _ => FieldKind::Custom,
        };
        if kind.is_container() {
            kind
        } else if self.format == "duration" {
            FieldKind::Duration
        } else if !self.enum_values.is_empty() {
            FieldKind::Enum
        } else {
            kind
        }
    }

    /// Convert to a schema field. Fields inside array elements have no flat
    /// path and are dropped.
    fn into_field(self, component: &str) -> Option<Field> {
        if self.path_tokens.iter().any(|t| t == ARRAY_TOKEN) {
            tracing::trace!("Skipping array element field {:?} of {}", self.path_tokens, component);
            return None;
        }

        let kind = self.kind();
        let path = if self.path_tokens.is_empty() {
            self.name.clone()
        } else {
            self.path_tokens.join(".")
        };
        if path.is_empty() {
            tracing::debug!("Skipping unnamed field of {}", component);
            return None;
        }
        let name = self
            .path_tokens
            .last()
            .cloned()
            .unwrap_or_else(|| self.name.clone());

        Some(Field {
            name,
            path,
            kind,
            default: self
                .default
                .as_ref()
                .filter(|v| !v.is_null())
                .map(|v| tree::convert(kind, v)),
            required: self.required,
            description: self.description,
        })
    }
}

impl CatalogComponent {
    fn into_definition(self) -> ComponentDefinition {
        let mut definition = ComponentDefinition::new(self.name, self.kind).with_module(self.module);
        definition.description = self.description;
        if !self.display_name.is_empty() {
            definition.display_name = self.display_name;
        }

        let extracted: Vec<Field> = self
            .config
            .fields
            .into_iter()
            .flatten()
            .filter_map(|f| f.into_field(&definition.name))
            .collect();
        for field in self.fields.into_iter().chain(extracted) {
            definition = definition.with_field(field);
        }

        for constraint in self.constraints.into_iter().flatten() {
            let keys = constraint.keys.into_iter().map(CatalogKey::into_path);
            let mut group = ConstraintGroup::new(constraint.kind, keys);
            group.message = constraint.message.filter(|m| !m.is_empty());
            definition = definition.with_constraint(group);
        }
        definition
    }
}

/// In-memory catalog keyed by kind and base name
#[derive(Debug, Clone, Default)]
pub struct ComponentCatalog {
    version: String,
    definitions: HashMap<(ComponentKind, String), Arc<ComponentDefinition>>,
}

impl ComponentCatalog {
    /// Create an empty catalog for a collector version
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            definitions: HashMap::new(),
        }
    }

    /// Parse a catalog from its JSON representation
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| LocolError::Config(format!("Failed to parse component catalog: {}", e)))?;

        let mut catalog = Self::new(file.version);
        for component in file.components.into_iter().flatten() {
            catalog.insert(component.into_definition());
        }

        tracing::debug!(
            "Loaded component catalog {} with {} definitions",
            catalog.version,
            catalog.len()
        );
        Ok(catalog)
    }

    /// Load a catalog file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LocolError::Config(format!("Failed to read component catalog {:?}: {}", path, e))
        })?;
        Self::from_json(&content)
    }

    /// Add or replace a definition. Returns the shared handle.
    pub fn insert(&mut self, mut definition: ComponentDefinition) -> Arc<ComponentDefinition> {
        definition.fill_defaults();
        let key = (definition.kind, definition.name.clone());
        let definition = Arc::new(definition);
        if self.definitions.insert(key, definition.clone()).is_some() {
            tracing::warn!(
                "Duplicate catalog entry for {} '{}', keeping the last one",
                definition.kind,
                definition.name
            );
        }
        definition
    }

    /// Builder-style [`ComponentCatalog::insert`]
    pub fn with(mut self, definition: ComponentDefinition) -> Self {
        self.insert(definition);
        self
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// All definitions of one kind, sorted by name
    pub fn definitions_of(&self, kind: ComponentKind) -> Vec<Arc<ComponentDefinition>> {
        let mut defs: Vec<_> = self
            .definitions
            .values()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

impl SchemaCatalog for ComponentCatalog {
    fn lookup(&self, kind: ComponentKind, base_name: &str) -> Option<Arc<ComponentDefinition>> {
        self.definitions.get(&(kind, base_name.to_string())).cloned()
    }

    fn version(&self) -> &str {
        &self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConstraintKind, FieldKind};

    const CATALOG: &str = r#"{
        "version": "v0.91.0",
        "components": [
            {
                "name": "otlp",
                "type": "receiver",
                "module": "go.opentelemetry.io/collector/receiver/otlpreceiver",
                "fields": [
                    {"name": "endpoint", "path": "protocols.grpc.endpoint", "kind": "string"}
                ],
                "constraints": [
                    {"kind": "anyOf", "keys": ["protocols.grpc", "protocols.http"]}
                ]
            },
            {
                "name": "otlp",
                "type": "exporter",
                "fields": [
                    {"name": "endpoint", "kind": "string", "required": true},
                    {"name": "timeout", "kind": "duration", "default": "5s"}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_catalog_from_json() {
        let catalog = ComponentCatalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.version(), "v0.91.0");

        let receiver = catalog.lookup(ComponentKind::Receiver, "otlp").unwrap();
        assert_eq!(receiver.id, "receiver/otlp");
        assert_eq!(receiver.constraints[0].kind, ConstraintKind::AnyOf);

        let exporter = catalog.lookup(ComponentKind::Exporter, "otlp").unwrap();
        assert_eq!(exporter.fields[1].kind, FieldKind::Duration);
        assert_eq!(
            exporter.fields[1].default.as_ref().and_then(|v| v.as_duration()),
            Some(std::time::Duration::from_secs(5))
        );
        assert_eq!(exporter.fields[0].canonical_path(), "endpoint");

        assert!(catalog.lookup(ComponentKind::Processor, "otlp").is_none());
    }

    const EXTRACTED: &str = r#"{
        "version": "v0.129.0",
        "components": [
            {
                "name": "otlp",
                "type": "receiver",
                "description": "OTLP receiver",
                "config": {
                    "fields": [
                        {"name": "Endpoint", "type": "string", "required": false,
                         "path_tokens": ["protocols", "grpc", "endpoint"], "format": "hostport"},
                        {"name": "MaxRecvMsgSizeMiB", "type": "int",
                         "path_tokens": ["protocols", "grpc", "max_recv_msg_size_mib"], "unit": "MiB"},
                        {"name": "AllowedOrigins", "type": "stringArray",
                         "path_tokens": ["protocols", "http", "cors", "allowed_origins"]},
                        {"name": "Endpoint", "type": "string",
                         "path_tokens": ["protocols", "http", "endpoint"]},
                        {"name": "Name", "type": "string",
                         "path_tokens": ["protocols", "grpc", "auth", "[]", "name"]}
                    ],
                    "examples": []
                },
                "constraints": [
                    {"kind": "anyOf", "keys": [["protocols", "grpc"], ["protocols", "http"]]}
                ]
            },
            {
                "name": "batch",
                "type": "processor",
                "description": "",
                "config": {
                    "fields": [
                        {"name": "Timeout", "type": "custom", "format": "duration",
                         "default": "200ms", "path_tokens": ["timeout"]},
                        {"name": "SendBatchSize", "type": "int", "default": 8192,
                         "path_tokens": ["send_batch_size"]}
                    ]
                },
                "constraints": null
            },
            {
                "name": "debug",
                "type": "exporter",
                "description": "",
                "config": {
                    "fields": [
                        {"name": "Verbosity", "type": "custom", "enum_values": ["basic", "normal", "detailed"],
                         "path_tokens": ["verbosity"]}
                    ]
                },
                "constraints": [
                    {"kind": "atMostOne", "keys": [["verbosity"], ["sampling_initial"]], "message": ""}
                ]
            }
        ],
        "document": {"sections": ["receivers"], "signals": ["traces"]}
    }"#;

    #[test]
    fn test_catalog_from_extractor_output() {
        let catalog = ComponentCatalog::from_json(EXTRACTED).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.version(), "v0.129.0");

        let receiver = catalog.lookup(ComponentKind::Receiver, "otlp").unwrap();
        // the array element field has no flat path
        assert_eq!(receiver.fields.len(), 4);
        let endpoint = receiver.field("protocols.grpc.endpoint").unwrap();
        assert_eq!(endpoint.name, "endpoint");
        assert_eq!(endpoint.kind, FieldKind::String);
        assert_eq!(
            receiver.field("protocols.http.cors.allowed_origins").unwrap().kind,
            FieldKind::StringArray
        );
        assert_eq!(receiver.constraints[0].keys, vec!["protocols.grpc", "protocols.http"]);
        // `endpoint` is ambiguous, `max_recv_msg_size_mib` is not
        assert_eq!(receiver.path_index().path_for("endpoint"), None);
        assert_eq!(
            receiver.path_index().path_for("max_recv_msg_size_mib"),
            Some("protocols.grpc.max_recv_msg_size_mib")
        );

        let batch = catalog.lookup(ComponentKind::Processor, "batch").unwrap();
        let timeout = batch.field("timeout").unwrap();
        assert_eq!(timeout.kind, FieldKind::Duration);
        assert_eq!(
            timeout.default,
            Some(crate::value::ConfigValue::Duration(std::time::Duration::from_millis(200)))
        );
        assert_eq!(
            batch.field("send_batch_size").unwrap().default,
            Some(crate::value::ConfigValue::Int(8192))
        );
        assert!(batch.constraints.is_empty());

        let debug = catalog.lookup(ComponentKind::Exporter, "debug").unwrap();
        assert_eq!(debug.field("verbosity").unwrap().kind, FieldKind::Enum);
        assert_eq!(debug.constraints[0].kind, ConstraintKind::AtMostOne);
        assert_eq!(debug.constraints[0].message, None);
    }

    #[test]
    fn test_catalog_invalid_json() {
        let err = ComponentCatalog::from_json("{not json").unwrap_err();
        assert!(err.to_string().contains("component catalog"));
    }

    #[test]
    fn test_catalog_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("components.json");
        std::fs::write(&path, CATALOG).unwrap();

        let catalog = ComponentCatalog::load(&path).unwrap();
        assert_eq!(catalog.definitions_of(ComponentKind::Receiver).len(), 1);
    }
}
