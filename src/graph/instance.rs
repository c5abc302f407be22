//! Component instances and pipelines.

use crate::graph::id::{InstanceId, PipelineId};
use crate::naming;
use crate::types::{ComponentDefinition, ComponentKind, Stage};
use crate::value::{ConfigValue, Configuration};
use std::sync::Arc;

/// A named, configured occurrence of a component definition.
///
/// The graph owns exactly one copy of every instance; pipelines hold its
/// [`InstanceId`].
#[derive(Debug, Clone)]
pub struct ComponentInstance {
    pub id: InstanceId,
    pub definition: Arc<ComponentDefinition>,
    /// Unique across the whole graph, `base` or `base/alias`
    pub name: String,
    /// Canonical path -> value
    pub configuration: Configuration,
}

impl ComponentInstance {
    /// New instance with a fresh identity and empty configuration
    pub fn new(definition: Arc<ComponentDefinition>, name: impl Into<String>) -> Self {
        Self {
            id: InstanceId::new(),
            definition,
            name: name.into(),
            configuration: Configuration::new(),
        }
    }

    pub fn with_configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = configuration;
        self
    }

    #[inline]
    pub fn kind(&self) -> ComponentKind {
        self.definition.kind
    }

    /// Base component name, e.g. `otlp`
    pub fn base_name(&self) -> &str {
        &self.definition.name
    }

    /// Alias part of the name, empty for the bare base name
    pub fn alias(&self) -> &str {
        naming::alias_of(&self.definition.name, &self.name)
    }

    /// Configured value at a canonical path
    pub fn get(&self, path: &str) -> Option<&ConfigValue> {
        self.configuration.get(path)
    }

    /// Configured value, falling back to the schema default
    pub fn effective(&self, path: &str) -> Option<&ConfigValue> {
        self.configuration
            .get(path)
            .or_else(|| self.definition.field(path).and_then(|f| f.default.as_ref()))
    }
}

/// A named telemetry path: ordered instance references per stage.
///
/// Order inside `processors` is execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfiguration {
    pub id: PipelineId,
    pub name: String,
    stages: [Vec<InstanceId>; 3],
}

impl PipelineConfiguration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PipelineId::new(),
            name: name.into(),
            stages: Default::default(),
        }
    }

    /// References of one stage, in order
    pub fn stage(&self, stage: Stage) -> &[InstanceId] {
        &self.stages[stage.index()]
    }

    pub(crate) fn stage_mut(&mut self, stage: Stage) -> &mut Vec<InstanceId> {
        &mut self.stages[stage.index()]
    }

    pub fn receivers(&self) -> &[InstanceId] {
        self.stage(Stage::Receivers)
    }

    pub fn processors(&self) -> &[InstanceId] {
        self.stage(Stage::Processors)
    }

    pub fn exporters(&self) -> &[InstanceId] {
        self.stage(Stage::Exporters)
    }

    /// Whether any stage references `id`
    pub fn references(&self, id: InstanceId) -> bool {
        self.stages.iter().any(|s| s.contains(&id))
    }

    /// All references across stages
    pub fn members(&self) -> impl Iterator<Item = (Stage, InstanceId)> + '_ {
        Stage::ALL
            .into_iter()
            .flat_map(move |stage| self.stage(stage).iter().map(move |id| (stage, *id)))
    }

    pub fn is_empty(&self) -> bool {
        self.stages.iter().all(Vec::is_empty)
    }
}
