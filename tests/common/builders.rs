//! Test data builders for creating test objects

use locol_graph::{
    ComponentCatalog, ComponentDefinition, ComponentKind, ConfigValue, ConstraintGroup,
    ConstraintKind, Field, FieldKind,
};
use std::time::Duration;

/// Builder for creating test ComponentDefinitions
pub struct DefinitionBuilder {
    definition: ComponentDefinition,
}

impl DefinitionBuilder {
    pub fn new(name: &str, kind: ComponentKind) -> Self {
        Self {
            definition: ComponentDefinition::new(name, kind),
        }
    }

    /// Add a field at a dotted canonical path
    pub fn field(mut self, path: &str, kind: FieldKind) -> Self {
        let field = match path.rsplit_once('.') {
            Some((parent, name)) => Field::nested(parent, name, kind),
            None => Field::new(path, kind),
        };
        self.definition = self.definition.with_field(field);
        self
    }

    pub fn required(mut self, path: &str, kind: FieldKind) -> Self {
        self = self.field(path, kind);
        if let Some(field) = self.definition.fields.last_mut() {
            field.required = true;
        }
        self
    }

    pub fn default_value(mut self, path: &str, kind: FieldKind, default: ConfigValue) -> Self {
        self = self.field(path, kind);
        if let Some(field) = self.definition.fields.last_mut() {
            field.default = Some(default);
        }
        self
    }

    pub fn constraint(mut self, kind: ConstraintKind, keys: &[&str]) -> Self {
        self.definition = self
            .definition
            .with_constraint(ConstraintGroup::new(kind, keys.iter().copied()));
        self
    }

    pub fn build(self) -> ComponentDefinition {
        self.definition
    }
}

/// Catalog with a handful of common collector components
pub fn test_catalog() -> ComponentCatalog {
    use ComponentKind::*;

    ComponentCatalog::new("v0.91.0")
        .with(
            DefinitionBuilder::new("otlp", Receiver)
                .field("protocols.grpc.endpoint", FieldKind::String)
                .field("protocols.grpc.max_recv_msg_size_mib", FieldKind::Int)
                .field("protocols.http.endpoint", FieldKind::String)
                .constraint(ConstraintKind::AnyOf, &["protocols.grpc", "protocols.http"])
                .build(),
        )
        .with(
            DefinitionBuilder::new("batch", Processor)
                .field("timeout", FieldKind::Duration)
                .field("send_batch_size", FieldKind::Int)
                .field("send_batch_max_size", FieldKind::Int)
                .build(),
        )
        .with(
            DefinitionBuilder::new("memory_limiter", Processor)
                .default_value(
                    "check_interval",
                    FieldKind::Duration,
                    ConfigValue::Duration(Duration::from_secs(1)),
                )
                .field("limit_mib", FieldKind::Int)
                .field("limit_percentage", FieldKind::Int)
                .constraint(ConstraintKind::OneOf, &["limit_mib", "limit_percentage"])
                .build(),
        )
        .with(
            DefinitionBuilder::new("debug", Exporter)
                .field("verbosity", FieldKind::Enum)
                .build(),
        )
        .with(
            DefinitionBuilder::new("otlp", Exporter)
                .required("endpoint", FieldKind::String)
                .default_value(
                    "timeout",
                    FieldKind::Duration,
                    ConfigValue::Duration(Duration::from_secs(5)),
                )
                .field("tls.insecure", FieldKind::Bool)
                .field("headers", FieldKind::StringMap)
                .build(),
        )
        .with(
            DefinitionBuilder::new("health_check", Extension)
                .field("endpoint", FieldKind::String)
                .build(),
        )
        .with(DefinitionBuilder::new("spanmetrics", Connector).build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use locol_graph::SchemaCatalog;

    #[test]
    fn test_definition_builder() {
        let def = DefinitionBuilder::new("otlp", ComponentKind::Exporter)
            .required("endpoint", FieldKind::String)
            .field("tls.insecure", FieldKind::Bool)
            .build();

        assert!(def.fields[0].required);
        assert_eq!(def.fields[1].canonical_path(), "tls.insecure");
        assert_eq!(def.fields[1].name, "insecure");
    }

    #[test]
    fn test_catalog_scopes_by_kind() {
        let catalog = test_catalog();
        assert!(catalog.lookup(ComponentKind::Receiver, "otlp").is_some());
        assert!(catalog.lookup(ComponentKind::Exporter, "otlp").is_some());
        assert!(catalog.lookup(ComponentKind::Processor, "otlp").is_none());
    }
}
