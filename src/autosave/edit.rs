//! Graph ownership with autosave notifications.

use crate::autosave::scheduler::{AutosaveHandle, SaveStatus};
use crate::graph::ConfigGraph;
use tokio::sync::watch;

/// Owns a graph and reports every effective mutation to an autosave
/// scheduler.
///
/// Mutations go through [`AutosavedGraph::edit`]; the scheduler is only
/// notified when the graph's generation moved, so failed operations and
/// no-ops never schedule a save.
pub struct AutosavedGraph {
    graph: ConfigGraph,
    autosave: Option<AutosaveHandle>,
}

impl AutosavedGraph {
    pub fn new(graph: ConfigGraph, autosave: AutosaveHandle) -> Self {
        Self {
            graph,
            autosave: Some(autosave),
        }
    }

    /// A graph whose edits are not persisted
    pub fn detached(graph: ConfigGraph) -> Self {
        Self {
            graph,
            autosave: None,
        }
    }

    pub fn graph(&self) -> &ConfigGraph {
        &self.graph
    }

    /// Run a mutation against the graph
    pub fn edit<T>(&mut self, f: impl FnOnce(&mut ConfigGraph) -> T) -> T {
        let before = self.graph.generation();
        let out = f(&mut self.graph);
        if self.graph.generation() != before {
            if let Some(autosave) = &self.autosave {
                if !autosave.notify(&self.graph) {
                    tracing::warn!("Autosave scheduler is gone, change not scheduled");
                }
            }
        }
        out
    }

    /// Autosave status, `None` for detached graphs
    pub fn save_status(&self) -> Option<SaveStatus> {
        self.autosave.as_ref().map(AutosaveHandle::status)
    }

    /// Watch autosave status, `None` for detached graphs
    pub fn subscribe(&self) -> Option<watch::Receiver<SaveStatus>> {
        self.autosave.as_ref().map(AutosaveHandle::subscribe)
    }

    /// Stop autosaving (flushing unsaved changes) and hand the graph back
    pub async fn close(mut self) -> ConfigGraph {
        if let Some(autosave) = self.autosave.take() {
            autosave.shutdown().await;
        }
        self.graph
    }
}
