//! Identity-free view of a graph, for comparing two graphs by content.

use crate::types::ComponentKind;
use crate::value::Configuration;
use std::collections::BTreeMap;

/// One instance as seen by its name
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceShape {
    pub kind: ComponentKind,
    pub base_name: String,
    pub configuration: Configuration,
}

/// Instances keyed by name and pipelines keyed by name, each pipeline holding
/// the instance names of its receivers, processors and exporters stages.
///
/// Two graphs are equal when their shapes are: same instance names with the
/// same kind and configuration, and same pipeline stage lists in order.
/// Identities and registry order do not matter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphShape {
    pub instances: BTreeMap<String, InstanceShape>,
    pub pipelines: BTreeMap<String, [Vec<String>; 3]>,
}

impl GraphShape {
    /// Names of the instances of one kind, sorted
    pub fn names_of(&self, kind: ComponentKind) -> Vec<&str> {
        self.instances
            .iter()
            .filter(|(_, shape)| shape.kind == kind)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
