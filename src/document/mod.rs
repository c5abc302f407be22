//! Collector configuration documents.
//!
//! [`generate`] renders a [`ConfigGraph`] as the nested mapping the collector
//! reads; [`parse`] rebuilds a graph from such a mapping with the help of a
//! [`SchemaCatalog`]. Generation is deterministic: instance names, pipeline
//! names and configuration keys come out sorted, so an unchanged graph always
//! renders to the same text.
//!
//! ```yaml
//! receivers:
//!   otlp:
//!     protocols:
//!       grpc:
//!         endpoint: 0.0.0.0:4317
//! exporters:
//!   debug: {}
//! service:
//!   pipelines:
//!     traces:
//!       receivers: [otlp]
//!       exporters: [debug]
//! ```
//!
//! `parse(generate(g))` is graph-equal to `g` (see [`ConfigGraph::graph_eq`]).

pub mod tree;

use crate::graph::{ComponentInstance, ConfigGraph, GraphError, GraphResult, InstanceId};
use crate::naming;
use crate::schema::SchemaCatalog;
use crate::types::{ComponentDefinition, ComponentKind, Stage};
use crate::value::{key_string, Configuration};
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Top-level key holding pipelines and enabled extensions
pub const SERVICE_KEY: &str = "service";
const PIPELINES_KEY: &str = "pipelines";
const EXTENSIONS_KEY: &str = "extensions";

// ==================== Generate ====================

/// Render the graph as a document tree
pub fn generate(graph: &ConfigGraph) -> Value {
    let mut root = Mapping::new();

    for kind in ComponentKind::ALL {
        let registry = graph.registry(kind);
        if registry.is_empty() {
            continue;
        }

        let mut instances: Vec<&ComponentInstance> = registry.iter().collect();
        instances.sort_by(|a, b| a.name.cmp(&b.name));

        let mut section = Mapping::new();
        for instance in instances {
            section.insert(
                Value::String(instance.name.clone()),
                Value::Mapping(tree::unflatten(&instance.configuration)),
            );
        }
        root.insert(Value::from(kind.section()), Value::Mapping(section));
    }

    let mut service = Mapping::new();

    let mut extensions: Vec<&str> = graph.extensions().iter().map(|i| i.name.as_str()).collect();
    if !extensions.is_empty() {
        extensions.sort_unstable();
        service.insert(Value::from(EXTENSIONS_KEY), name_list(&extensions));
    }

    let mut pipelines: Vec<_> = graph.pipelines().iter().collect();
    if !pipelines.is_empty() {
        pipelines.sort_by(|a, b| a.name.cmp(&b.name));

        let mut rendered = Mapping::new();
        for pipeline in pipelines {
            let mut stages = Mapping::new();
            for stage in Stage::ALL {
                let names = graph.stage_names(pipeline, stage);
                if !names.is_empty() {
                    stages.insert(Value::from(stage.key()), name_list(&names));
                }
            }
            rendered.insert(Value::String(pipeline.name.clone()), Value::Mapping(stages));
        }
        service.insert(Value::from(PIPELINES_KEY), Value::Mapping(rendered));
    }

    if !service.is_empty() {
        root.insert(Value::from(SERVICE_KEY), Value::Mapping(service));
    }

    Value::Mapping(root)
}

fn name_list(names: &[&str]) -> Value {
    Value::Sequence(names.iter().map(|n| Value::from(*n)).collect())
}

/// Render the graph as YAML text
pub fn to_yaml(graph: &ConfigGraph) -> GraphResult<String> {
    Ok(serde_yaml::to_string(&generate(graph))?)
}

// ==================== Parse ====================

/// Parse YAML text into a new graph
pub fn from_yaml(text: &str, catalog: &dyn SchemaCatalog) -> GraphResult<ConfigGraph> {
    let document: Value = serde_yaml::from_str(text)?;
    parse(&document, catalog)
}

/// Build a graph from a document tree.
///
/// Components the catalog does not know are kept with a fallback definition.
/// Pipeline entries naming no instance of the stage's kind are errors.
pub fn parse(document: &Value, catalog: &dyn SchemaCatalog) -> GraphResult<ConfigGraph> {
    let mut parser = Parser::new(catalog);

    let root = match document {
        Value::Mapping(root) => root,
        Value::Null => return Ok(parser.graph),
        _ => return Err(GraphError::Parse("document root must be a mapping".to_string())),
    };

    for (key, value) in root {
        let section = key_string(key)
            .ok_or_else(|| GraphError::Parse("top-level keys must be strings".to_string()))?;
        if section == SERVICE_KEY {
            continue;
        }
        match ComponentKind::from_section(&section) {
            Some(kind) => parser.section(kind, value)?,
            None => tracing::warn!("Ignoring unknown top-level section '{}'", section),
        }
    }

    if let Some(service) = root.get(SERVICE_KEY) {
        parser.service(service)?;
    }

    let graph = parser.graph;
    tracing::debug!(
        "Parsed document: {} instances, {} pipelines",
        graph.instances().count(),
        graph.pipelines().len()
    );
    Ok(graph)
}

struct Parser<'a> {
    catalog: &'a dyn SchemaCatalog,
    graph: ConfigGraph,
    /// Document name -> identity, per kind
    names: [HashMap<String, InstanceId>; 5],
    /// Fallback definitions shared by instances of the same unknown component
    fallbacks: HashMap<(ComponentKind, String), Arc<ComponentDefinition>>,
}

impl<'a> Parser<'a> {
    fn new(catalog: &'a dyn SchemaCatalog) -> Self {
        Self {
            catalog,
            graph: ConfigGraph::new(catalog.version()),
            names: Default::default(),
            fallbacks: HashMap::new(),
        }
    }

    fn section(&mut self, kind: ComponentKind, value: &Value) -> GraphResult<()> {
        let entries = match value {
            Value::Mapping(entries) => entries,
            Value::Null => return Ok(()),
            _ => {
                return Err(GraphError::Parse(format!(
                    "'{}' must be a mapping",
                    kind.section()
                )))
            }
        };

        for (key, config) in entries {
            let name = key_string(key).ok_or_else(|| {
                GraphError::Parse(format!("instance names in '{}' must be strings", kind.section()))
            })?;
            self.instance(kind, name, config)?;
        }
        Ok(())
    }

    fn definition(&mut self, kind: ComponentKind, base_name: &str) -> Arc<ComponentDefinition> {
        if let Some(definition) = self.catalog.lookup(kind, base_name) {
            return definition;
        }
        self.fallbacks
            .entry((kind, base_name.to_string()))
            .or_insert_with(|| {
                tracing::warn!(
                    "Unknown {} '{}', keeping it as a custom component",
                    kind,
                    base_name
                );
                Arc::new(ComponentDefinition::custom(base_name, kind))
            })
            .clone()
    }

    fn instance(&mut self, kind: ComponentKind, name: String, config: &Value) -> GraphResult<()> {
        let (base_name, _) = naming::split_instance_name(&name);
        if base_name.is_empty() {
            return Err(GraphError::Parse(format!(
                "{} '{}' has an empty component name",
                kind, name
            )));
        }
        let definition = self.definition(kind, base_name);

        let configuration = match config {
            Value::Mapping(mapping) => tree::flatten(&definition, mapping),
            Value::Null => Configuration::new(),
            _ => {
                return Err(GraphError::Parse(format!(
                    "configuration of {} '{}' must be a mapping",
                    kind, name
                )))
            }
        };

        let instance = ComponentInstance::new(definition, name.clone()).with_configuration(configuration);
        let id = self.graph.register_instance(instance).id;
        self.names[kind.index()].insert(name, id);
        Ok(())
    }

    fn service(&mut self, service: &Value) -> GraphResult<()> {
        let service = match service {
            Value::Mapping(service) => service,
            Value::Null => return Ok(()),
            _ => return Err(GraphError::Parse("'service' must be a mapping".to_string())),
        };

        for (key, value) in service {
            match key_string(key).as_deref() {
                Some(EXTENSIONS_KEY) => self.extensions(value)?,
                Some(PIPELINES_KEY) => self.pipelines(value)?,
                Some(other) => tracing::debug!("Ignoring service.{}", other),
                None => return Err(GraphError::Parse("service keys must be strings".to_string())),
            }
        }
        Ok(())
    }

    fn extensions(&self, value: &Value) -> GraphResult<()> {
        for name in string_list(value, "service.extensions")? {
            if !self.names[ComponentKind::Extension.index()].contains_key(&name) {
                return Err(GraphError::Parse(format!(
                    "service.extensions references unknown extension '{}'",
                    name
                )));
            }
        }
        Ok(())
    }

    fn pipelines(&mut self, value: &Value) -> GraphResult<()> {
        let pipelines = match value {
            Value::Mapping(pipelines) => pipelines,
            Value::Null => return Ok(()),
            _ => {
                return Err(GraphError::Parse(
                    "service.pipelines must be a mapping".to_string(),
                ))
            }
        };

        for (key, body) in pipelines {
            let name = key_string(key)
                .ok_or_else(|| GraphError::Parse("pipeline names must be strings".to_string()))?;
            let pipeline_id = self.graph.add_pipeline(&name)?;

            let body = match body {
                Value::Mapping(body) => body,
                Value::Null => continue,
                _ => {
                    return Err(GraphError::Parse(format!(
                        "pipeline '{}' must be a mapping",
                        name
                    )))
                }
            };

            for (stage_key, list) in body {
                let stage_key = key_string(stage_key).unwrap_or_default();
                let Some(stage) = Stage::ALL.into_iter().find(|s| s.key() == stage_key) else {
                    tracing::warn!("Ignoring unknown key '{}' in pipeline '{}'", stage_key, name);
                    continue;
                };

                let context = format!("service.pipelines.{}.{}", name, stage_key);
                for entry in string_list(list, &context)? {
                    if let Some(id) = self.resolve(&name, stage, entry)? {
                        self.graph.attach(id, pipeline_id, stage)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolve a stage entry. Connectors listed as a pipeline's receiver or
    /// exporter resolve to `None`; stages only hold their own kind.
    fn resolve(&self, pipeline: &str, stage: Stage, entry: String) -> GraphResult<Option<InstanceId>> {
        if let Some(id) = self.names[stage.kind().index()].get(&entry) {
            return Ok(Some(*id));
        }
        if stage != Stage::Processors && self.names[ComponentKind::Connector.index()].contains_key(&entry) {
            tracing::warn!(
                "Dropping connector '{}' from {} of pipeline '{}'",
                entry,
                stage,
                pipeline
            );
            return Ok(None);
        }
        match ComponentKind::ALL
            .into_iter()
            .find(|k| self.names[k.index()].contains_key(&entry))
        {
            Some(kind) => Err(GraphError::KindMismatch {
                instance: entry,
                kind,
                stage,
            }),
            None => Err(GraphError::UnresolvedReference {
                pipeline: pipeline.to_string(),
                stage,
                name: entry,
            }),
        }
    }
}

fn string_list(value: &Value, context: &str) -> GraphResult<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| GraphError::Parse(format!("{} must list names", context)))
            })
            .collect(),
        _ => Err(GraphError::Parse(format!("{} must be a list", context))),
    }
}
