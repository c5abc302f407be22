//! The configuration graph and its mutation API.
//!
//! All operations are synchronous and in-memory. Callers serialize their
//! calls; the graph does no locking. After every public mutation:
//!
//! 1. instance names are unique across all kinds,
//! 2. every stage reference resolves to an instance in the matching registry,
//! 3. stages only hold instances of their own kind,
//! 4. extensions and connectors are never referenced by pipelines,
//! 5. configuration keys are canonical paths or unresolved custom keys.

use crate::config::ImportSettings;
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::id::{InstanceId, PipelineId};
use crate::graph::instance::{ComponentInstance, PipelineConfiguration};
use crate::graph::registry::Registry;
use crate::graph::shape::{GraphShape, InstanceShape};
use crate::naming;
use crate::schema::{ConstraintValidator, PathNormalizer, SchemaCatalog, Violation};
use crate::types::{ComponentDefinition, ComponentKind, Stage};
use crate::value::ConfigValue;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Violations found on one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceReport {
    pub instance: InstanceId,
    pub name: String,
    pub kind: ComponentKind,
    pub violations: Vec<Violation>,
}

/// Root aggregate: component registries plus pipelines
#[derive(Debug, Clone)]
pub struct ConfigGraph {
    version: String,
    registries: [Registry; 5],
    pipelines: Vec<PipelineConfiguration>,
    /// Bumped by every mutation that changes the graph
    generation: u64,
}

impl Default for ConfigGraph {
    fn default() -> Self {
        Self::new("")
    }
}

impl ConfigGraph {
    /// Empty graph tagged with a collector version
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            registries: ComponentKind::ALL.map(Registry::new),
            pipelines: Vec::new(),
            generation: 0,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
        self.touch();
    }

    /// Mutation counter; changes whenever the graph does
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    fn touch(&mut self) {
        self.generation += 1;
    }

    // ── Lookups ──

    pub fn registry(&self, kind: ComponentKind) -> &Registry {
        &self.registries[kind.index()]
    }

    fn registry_mut(&mut self, kind: ComponentKind) -> &mut Registry {
        &mut self.registries[kind.index()]
    }

    pub fn receivers(&self) -> &Registry {
        self.registry(ComponentKind::Receiver)
    }

    pub fn processors(&self) -> &Registry {
        self.registry(ComponentKind::Processor)
    }

    pub fn exporters(&self) -> &Registry {
        self.registry(ComponentKind::Exporter)
    }

    pub fn extensions(&self) -> &Registry {
        self.registry(ComponentKind::Extension)
    }

    pub fn connectors(&self) -> &Registry {
        self.registry(ComponentKind::Connector)
    }

    pub fn pipelines(&self) -> &[PipelineConfiguration] {
        &self.pipelines
    }

    /// Every instance, receivers first, in registry order
    pub fn instances(&self) -> impl Iterator<Item = &ComponentInstance> {
        self.registries.iter().flat_map(Registry::iter)
    }

    pub fn instance(&self, id: InstanceId) -> Option<&ComponentInstance> {
        self.registries.iter().find_map(|r| r.get(id))
    }

    fn instance_mut(&mut self, id: InstanceId) -> Option<&mut ComponentInstance> {
        self.registries.iter_mut().find_map(|r| r.get_mut(id))
    }

    pub fn instance_by_name(&self, name: &str) -> Option<&ComponentInstance> {
        self.instances().find(|i| i.name == name)
    }

    /// Names of every instance in the graph
    pub fn instance_names(&self) -> HashSet<String> {
        self.instances().map(|i| i.name.clone()).collect()
    }

    pub fn pipeline(&self, id: PipelineId) -> Option<&PipelineConfiguration> {
        self.pipelines.iter().find(|p| p.id == id)
    }

    fn pipeline_mut(&mut self, id: PipelineId) -> GraphResult<&mut PipelineConfiguration> {
        self.pipelines
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(GraphError::UnknownPipeline(id))
    }

    pub fn pipeline_by_name(&self, name: &str) -> Option<&PipelineConfiguration> {
        self.pipelines.iter().find(|p| p.name == name)
    }

    /// Instance names of one pipeline stage, in stage order
    pub fn stage_names(&self, pipeline: &PipelineConfiguration, stage: Stage) -> Vec<&str> {
        pipeline
            .stage(stage)
            .iter()
            .filter_map(|id| self.registry(stage.kind()).get(*id))
            .map(|i| i.name.as_str())
            .collect()
    }

    /// Whether any pipeline references the instance
    pub fn is_referenced(&self, id: InstanceId) -> bool {
        self.pipelines.iter().any(|p| p.references(id))
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty() && self.registries.iter().all(Registry::is_empty)
    }

    // ── Instance mutations ──

    /// Insert or overwrite an instance by identity.
    ///
    /// The configuration is canonicalized first. A name that collides with
    /// another instance is reallocated. Since pipelines hold identities, the
    /// stored copy is what every stage sees.
    pub fn register_instance(&mut self, mut instance: ComponentInstance) -> &ComponentInstance {
        let id = instance.id;
        let kind = instance.kind();
        instance.configuration = PathNormalizer::canonicalize_all(
            &instance.definition,
            std::mem::take(&mut instance.configuration),
        );

        // The identity may have been registered under another kind
        for other in ComponentKind::ALL {
            if other != kind && self.registry_mut(other).remove(id).is_some() {
                tracing::warn!("Instance '{}' moved from {} to {}", instance.name, other, kind);
            }
        }
        for pipeline in &mut self.pipelines {
            for stage in Stage::ALL {
                if stage.kind() != kind {
                    pipeline.stage_mut(stage).retain(|r| *r != id);
                }
            }
        }

        let taken: HashSet<String> = self
            .instances()
            .filter(|i| i.id != id)
            .map(|i| i.name.clone())
            .collect();
        if taken.contains(&instance.name) {
            let alias = naming::alias_of(&instance.definition.name, &instance.name).to_string();
            let name = naming::allocate(&instance.definition.name, &alias, &taken);
            tracing::warn!("Instance name '{}' already taken, using '{}'", instance.name, name);
            instance.name = name;
        }

        self.touch();
        self.registry_mut(kind).upsert(instance)
    }

    /// Materialize a definition as a new, unattached instance
    pub fn create_instance(
        &mut self,
        definition: Arc<ComponentDefinition>,
        requested_alias: &str,
    ) -> &ComponentInstance {
        let name = naming::allocate(&definition.name, requested_alias, &self.instance_names());
        tracing::debug!("Creating {} '{}'", definition.kind, name);
        self.register_instance(ComponentInstance::new(definition, name))
    }

    /// Rename an instance to `base/new_alias` (or `base` for an empty alias)
    pub fn rename_instance(&mut self, id: InstanceId, new_alias: &str) -> GraphResult<String> {
        let instance = self.instance(id).ok_or(GraphError::UnknownInstance(id))?;
        let base = instance.definition.name.clone();
        let current = instance.name.clone();

        let mut taken = self.instance_names();
        taken.remove(&current);
        let name = naming::allocate(&base, new_alias, &taken);

        if name != current {
            if let Some(instance) = self.instance_mut(id) {
                instance.name = name.clone();
            }
            tracing::debug!("Renamed '{}' to '{}'", current, name);
            self.touch();
        }
        Ok(name)
    }

    /// Set one configuration value. Returns the canonical path used.
    pub fn set_value(&mut self, id: InstanceId, raw_key: &str, value: ConfigValue) -> GraphResult<String> {
        let instance = self.instance_mut(id).ok_or(GraphError::UnknownInstance(id))?;
        let path = PathNormalizer::canonicalize(&instance.definition, raw_key).into_owned();
        instance.configuration.insert(path.clone(), value);
        self.touch();
        Ok(path)
    }

    /// Remove one configuration value. Returns the previous value.
    pub fn unset_value(&mut self, id: InstanceId, raw_key: &str) -> GraphResult<Option<ConfigValue>> {
        let instance = self.instance_mut(id).ok_or(GraphError::UnknownInstance(id))?;
        let path = PathNormalizer::canonicalize(&instance.definition, raw_key).into_owned();
        let previous = instance.configuration.remove(&path);
        if previous.is_some() {
            self.touch();
        }
        Ok(previous)
    }

    // ── Pipeline membership ──

    /// Append a registered instance to a pipeline stage (no duplicates)
    pub fn attach(&mut self, instance_id: InstanceId, pipeline_id: PipelineId, stage: Stage) -> GraphResult<()> {
        let instance = self
            .instance(instance_id)
            .ok_or(GraphError::UnknownInstance(instance_id))?;
        if instance.kind() != stage.kind() {
            return Err(GraphError::KindMismatch {
                instance: instance.name.clone(),
                kind: instance.kind(),
                stage,
            });
        }

        let refs = self.pipeline_mut(pipeline_id)?.stage_mut(stage);
        if !refs.contains(&instance_id) {
            refs.push(instance_id);
            self.touch();
        }
        Ok(())
    }

    /// Register `instance` if its identity is new, then attach it
    pub fn attach_instance(
        &mut self,
        instance: ComponentInstance,
        pipeline_id: PipelineId,
        stage: Stage,
    ) -> GraphResult<InstanceId> {
        let kind = instance.kind();
        if kind != stage.kind() {
            return Err(GraphError::KindMismatch {
                instance: instance.name,
                kind,
                stage,
            });
        }
        if self.pipeline(pipeline_id).is_none() {
            return Err(GraphError::UnknownPipeline(pipeline_id));
        }

        let id = instance.id;
        if !self.registry(instance.kind()).contains(id) {
            self.register_instance(instance);
        }
        self.attach(id, pipeline_id, stage)?;
        Ok(id)
    }

    /// Remove an instance from a stage, then garbage-collect it if no
    /// pipeline references it any more. Returns whether a reference was removed.
    pub fn detach(&mut self, instance_id: InstanceId, pipeline_id: PipelineId, stage: Stage) -> GraphResult<bool> {
        let refs = self.pipeline_mut(pipeline_id)?.stage_mut(stage);
        let before = refs.len();
        refs.retain(|r| *r != instance_id);
        let removed = refs.len() != before;
        if removed {
            self.touch();
        }
        self.sweep_orphan(instance_id);
        Ok(removed)
    }

    /// Drop a receiver/processor/exporter that no pipeline references
    fn sweep_orphan(&mut self, id: InstanceId) -> bool {
        let Some(kind) = self.instance(id).map(ComponentInstance::kind) else {
            return false;
        };
        if kind.stage().is_none() || self.is_referenced(id) {
            return false;
        }
        if let Some(instance) = self.registry_mut(kind).remove(id) {
            tracing::debug!("Removed orphaned {} '{}'", kind, instance.name);
            self.touch();
            return true;
        }
        false
    }

    // ── Pipelines ──

    fn check_pipeline_name(&self, name: &str, except: Option<PipelineId>) -> GraphResult<()> {
        if name.trim().is_empty() || name != name.trim() {
            return Err(GraphError::InvalidPipelineName(name.to_string()));
        }
        if self
            .pipelines
            .iter()
            .any(|p| p.name == name && Some(p.id) != except)
        {
            return Err(GraphError::DuplicatePipelineName(name.to_string()));
        }
        Ok(())
    }

    /// Add an empty pipeline, e.g. `traces` or `metrics/internal`
    pub fn add_pipeline(&mut self, name: &str) -> GraphResult<PipelineId> {
        self.check_pipeline_name(name, None)?;
        let pipeline = PipelineConfiguration::new(name);
        let id = pipeline.id;
        self.pipelines.push(pipeline);
        self.touch();
        Ok(id)
    }

    pub fn rename_pipeline(&mut self, id: PipelineId, name: &str) -> GraphResult<()> {
        self.check_pipeline_name(name, Some(id))?;
        let pipeline = self.pipeline_mut(id)?;
        if pipeline.name != name {
            pipeline.name = name.to_string();
            self.touch();
        }
        Ok(())
    }

    /// Remove a pipeline, collecting members nothing else references
    pub fn remove_pipeline(&mut self, id: PipelineId) -> GraphResult<()> {
        let index = self
            .pipelines
            .iter()
            .position(|p| p.id == id)
            .ok_or(GraphError::UnknownPipeline(id))?;
        let pipeline = self.pipelines.remove(index);
        self.touch();

        let mut collected = 0;
        for (_, member) in pipeline.members() {
            if self.sweep_orphan(member) {
                collected += 1;
            }
        }
        tracing::debug!(
            "Removed pipeline '{}' ({} orphaned instances collected)",
            pipeline.name,
            collected
        );
        Ok(())
    }

    /// Move a processor within its stage; processor order is execution order
    pub fn move_processor(&mut self, pipeline_id: PipelineId, from: usize, to: usize) -> GraphResult<()> {
        let refs = self.pipeline_mut(pipeline_id)?.stage_mut(Stage::Processors);
        let len = refs.len();
        for index in [from, to] {
            if index >= len {
                return Err(GraphError::IndexOutOfRange { index, len });
            }
        }
        if from != to {
            let id = refs.remove(from);
            refs.insert(to, id);
            self.touch();
        }
        Ok(())
    }

    // ── Maintenance passes ──

    /// Drop repeated identities from registries and stages. Returns the
    /// number of registry entries removed; zero under normal operation.
    pub fn deduplicate(&mut self) -> usize {
        let removed: usize = self.registries.iter_mut().map(Registry::deduplicate).sum();

        let mut stage_dupes = 0;
        for pipeline in &mut self.pipelines {
            for stage in Stage::ALL {
                let refs = pipeline.stage_mut(stage);
                let before = refs.len();
                let mut seen = HashSet::new();
                refs.retain(|id| seen.insert(*id));
                stage_dupes += before - refs.len();
            }
        }

        if removed + stage_dupes > 0 {
            tracing::warn!(
                "Deduplicated {} instances and {} stage references",
                removed,
                stage_dupes
            );
            self.touch();
        }
        removed
    }

    /// Re-canonicalize every instance's configuration keys
    pub fn normalize_all(&mut self) {
        let mut changed = false;
        for registry in &mut self.registries {
            for instance in registry.iter_mut() {
                let before = instance.configuration.len();
                let keys_before: Vec<String> = instance.configuration.keys().cloned().collect();
                instance.configuration = PathNormalizer::canonicalize_all(
                    &instance.definition,
                    std::mem::take(&mut instance.configuration),
                );
                if instance.configuration.len() != before
                    || !instance.configuration.keys().eq(keys_before.iter())
                {
                    changed = true;
                }
            }
        }
        if changed {
            self.touch();
        }
    }

    /// Clear the connectors registry.
    ///
    /// Connectors never appear in pipeline stages, so none counts as used.
    pub fn purge_unused_connectors(&mut self) -> usize {
        let purged = self.registry_mut(ComponentKind::Connector).clear();
        if purged > 0 {
            tracing::info!("Purged {} connectors", purged);
            self.touch();
        }
        purged
    }

    /// Replace this graph with one parsed from `text`.
    ///
    /// Parsing happens into a fresh graph; on any error `self` is untouched.
    pub fn import_yaml(
        &mut self,
        text: &str,
        catalog: &dyn SchemaCatalog,
        settings: &ImportSettings,
    ) -> GraphResult<()> {
        let mut imported = crate::document::from_yaml(text, catalog)?;
        if settings.deduplicate {
            imported.deduplicate();
        }
        if settings.normalize {
            imported.normalize_all();
        }
        if settings.purge_connectors {
            imported.purge_unused_connectors();
        }
        imported.check_integrity()?;

        imported.generation = self.generation + 1;
        *self = imported;
        tracing::info!(
            "Imported configuration: {} instances, {} pipelines",
            self.instances().count(),
            self.pipelines.len()
        );
        Ok(())
    }

    // ── Validation ──

    /// Advisory violations for every instance that has any
    pub fn validate(&self) -> Vec<InstanceReport> {
        self.instances()
            .filter_map(|instance| {
                let violations =
                    ConstraintValidator::validate(&instance.definition, &instance.configuration);
                (!violations.is_empty()).then(|| InstanceReport {
                    instance: instance.id,
                    name: instance.name.clone(),
                    kind: instance.kind(),
                    violations,
                })
            })
            .collect()
    }

    /// Verify the structural invariants. Holds by construction; used after
    /// bulk imports and in tests.
    pub fn check_integrity(&self) -> GraphResult<()> {
        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for registry in &self.registries {
            for instance in registry {
                if instance.kind() != registry.kind() {
                    return Err(GraphError::Referential(format!(
                        "{} '{}' stored in the {} registry",
                        instance.kind(),
                        instance.name,
                        registry.kind()
                    )));
                }
                if !names.insert(instance.name.as_str()) {
                    return Err(GraphError::Referential(format!(
                        "duplicate instance name '{}'",
                        instance.name
                    )));
                }
                if !ids.insert(instance.id) {
                    return Err(GraphError::Referential(format!(
                        "duplicate instance identity {:?}",
                        instance.id
                    )));
                }
            }
        }

        let mut pipeline_names = HashSet::new();
        for pipeline in &self.pipelines {
            if !pipeline_names.insert(pipeline.name.as_str()) {
                return Err(GraphError::Referential(format!(
                    "duplicate pipeline name '{}'",
                    pipeline.name
                )));
            }
            for stage in Stage::ALL {
                let refs = pipeline.stage(stage);
                let unique: HashSet<_> = refs.iter().collect();
                if unique.len() != refs.len() {
                    return Err(GraphError::Referential(format!(
                        "pipeline '{}' lists an instance twice in {}",
                        pipeline.name, stage
                    )));
                }
                if let Some(missing) = refs.iter().find(|id| !self.registry(stage.kind()).contains(**id)) {
                    return Err(GraphError::Referential(format!(
                        "pipeline '{}' {} references {:?} which is not a registered {}",
                        pipeline.name,
                        stage,
                        missing,
                        stage.kind()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Identity-free summary used for graph equality
    pub fn shape(&self) -> GraphShape {
        let instances = self
            .instances()
            .map(|i| {
                (
                    i.name.clone(),
                    InstanceShape {
                        kind: i.kind(),
                        base_name: i.definition.name.clone(),
                        configuration: i.configuration.clone(),
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();

        let pipelines = self
            .pipelines
            .iter()
            .map(|p| {
                let stages = Stage::ALL.map(|stage| {
                    self.stage_names(p, stage)
                        .into_iter()
                        .map(str::to_string)
                        .collect::<Vec<String>>()
                });
                (p.name.clone(), stages)
            })
            .collect::<BTreeMap<_, _>>();

        GraphShape { instances, pipelines }
    }

    /// Same instances, configuration and pipeline stage lists
    pub fn graph_eq(&self, other: &ConfigGraph) -> bool {
        self.shape() == other.shape()
    }
}
