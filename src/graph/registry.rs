//! Per-kind ownership registry.

use crate::graph::id::InstanceId;
use crate::graph::instance::ComponentInstance;
use crate::types::ComponentKind;

/// Owned instances of one component kind, in insertion order
#[derive(Debug, Clone)]
pub struct Registry {
    kind: ComponentKind,
    entries: Vec<ComponentInstance>,
}

impl Registry {
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ComponentInstance> {
        self.entries.iter()
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: InstanceId) -> Option<&ComponentInstance> {
        self.entries.iter().find(|i| i.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: InstanceId) -> Option<&mut ComponentInstance> {
        self.entries.iter_mut().find(|i| i.id == id)
    }

    fn position(&self, id: InstanceId) -> Option<usize> {
        self.entries.iter().position(|i| i.id == id)
    }

    /// Insert or overwrite in place by identity. Returns the stored copy.
    pub(crate) fn upsert(&mut self, instance: ComponentInstance) -> &ComponentInstance {
        let index = match self.position(instance.id) {
            Some(index) => {
                self.entries[index] = instance;
                index
            }
            None => {
                self.entries.push(instance);
                self.entries.len() - 1
            }
        };
        &self.entries[index]
    }

    pub(crate) fn remove(&mut self, id: InstanceId) -> Option<ComponentInstance> {
        self.position(id).map(|index| self.entries.remove(index))
    }

    pub(crate) fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }

    /// Drop later entries whose identity already appeared. Returns how many.
    pub(crate) fn deduplicate(&mut self) -> usize {
        let before = self.entries.len();
        let mut seen = std::collections::HashSet::new();
        self.entries.retain(|i| seen.insert(i.id));
        before - self.entries.len()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, ComponentInstance> {
        self.entries.iter_mut()
    }

    #[cfg(test)]
    pub(crate) fn push_unchecked(&mut self, instance: ComponentInstance) {
        self.entries.push(instance);
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a ComponentInstance;
    type IntoIter = std::slice::Iter<'a, ComponentInstance>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ComponentDefinition;
    use std::sync::Arc;

    fn instance(name: &str) -> ComponentInstance {
        let def = Arc::new(ComponentDefinition::new("otlp", ComponentKind::Receiver));
        ComponentInstance::new(def, name)
    }

    #[test]
    fn test_upsert_overwrites_in_place() {
        let mut reg = Registry::new(ComponentKind::Receiver);
        let a = instance("otlp");
        let b = instance("otlp/2");
        let a_id = a.id;
        reg.upsert(a.clone());
        reg.upsert(b);

        let mut renamed = a;
        renamed.name = "otlp/renamed".into();
        reg.upsert(renamed);

        assert_eq!(reg.len(), 2);
        assert_eq!(reg.iter().next().map(|i| i.id), Some(a_id));
        assert_eq!(reg.get(a_id).map(|i| i.name.as_str()), Some("otlp/renamed"));
    }

    #[test]
    fn test_deduplicate_keeps_first() {
        let mut reg = Registry::new(ComponentKind::Receiver);
        let a = instance("otlp");
        let mut dup = a.clone();
        dup.name = "dup".into();
        reg.push_unchecked(a.clone());
        reg.push_unchecked(instance("otlp/1"));
        reg.push_unchecked(dup);

        assert_eq!(reg.deduplicate(), 1);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get(a.id).map(|i| i.name.as_str()), Some("otlp"));
    }
}
