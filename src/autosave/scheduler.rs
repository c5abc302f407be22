//! Debounced background saving.
//!
//! The scheduler runs as a single tokio task that owns the state machine:
//!
//! ```text
//!   Idle ──change──> Pending(deadline) ──change──> Pending(deadline')
//!                       │ deadline
//!                       v
//!                    Saving ──change──> Saving(dirty)
//!                       │ done
//!                       v
//!            dirty ? Pending(deadline) : Idle
//! ```
//!
//! At most one save is in flight. Every change restarts the debounce window,
//! and the superseded deadline is simply dropped. On shutdown an in-flight
//! save is awaited and one final save runs if changes are still unsaved.

use crate::autosave::store::{ConfigSnapshot, ConfigStore, VersionId};
use crate::error::{LocolError, Result};
use crate::graph::ConfigGraph;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Observable scheduler state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveStatus {
    /// Nothing unsaved
    #[default]
    Idle,
    /// Waiting for the debounce window to close
    Pending,
    /// A save is in flight
    Saving,
    /// The last save succeeded
    Saved { version: VersionId },
    /// The last save failed; the next change schedules another attempt
    Failed { message: String },
}

impl SaveStatus {
    /// Whether unsaved changes are queued or being written
    pub fn is_busy(&self) -> bool {
        matches!(self, SaveStatus::Pending | SaveStatus::Saving)
    }
}

/// Commands sent to the scheduler task
enum AutosaveCommand {
    /// The graph changed; carries the latest state
    Changed(Box<ConfigGraph>),
    /// Flush and stop
    Shutdown(oneshot::Sender<()>),
}

/// Where the state machine is
enum Phase {
    Idle,
    Pending(Instant),
    Saving {
        task: JoinHandle<Result<VersionId>>,
        dirty: bool,
    },
}

/// Spawns autosave tasks
pub struct AutosaveScheduler;

impl AutosaveScheduler {
    /// Start a scheduler on the current tokio runtime
    pub fn spawn(
        store: Arc<dyn ConfigStore>,
        collector_id: impl Into<String>,
        debounce: Duration,
    ) -> AutosaveHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SaveStatus::Idle);

        let worker = AutosaveWorker {
            store,
            collector_id: collector_id.into(),
            debounce,
            status: status_tx,
            latest: None,
        };
        let task = tokio::spawn(worker.run(command_rx));

        AutosaveHandle {
            commands: command_tx,
            status: status_rx,
            task: Some(task),
        }
    }
}

/// Owner-side handle. Dropping it stops the scheduler after a final save.
pub struct AutosaveHandle {
    commands: mpsc::UnboundedSender<AutosaveCommand>,
    status: watch::Receiver<SaveStatus>,
    task: Option<JoinHandle<()>>,
}

impl AutosaveHandle {
    /// Report a mutation. Returns false once the scheduler has stopped.
    pub fn notify(&self, graph: &ConfigGraph) -> bool {
        self.commands
            .send(AutosaveCommand::Changed(Box::new(graph.clone())))
            .is_ok()
    }

    /// Current status
    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    /// Watch status transitions
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Stop the scheduler, waiting for any final save to finish
    pub async fn shutdown(mut self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.commands.send(AutosaveCommand::Shutdown(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Autosave task ended abnormally: {}", e);
            }
        }
    }
}

struct AutosaveWorker {
    store: Arc<dyn ConfigStore>,
    collector_id: String,
    debounce: Duration,
    status: watch::Sender<SaveStatus>,
    /// Most recent graph reported by the owner
    latest: Option<ConfigGraph>,
}

impl AutosaveWorker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<AutosaveCommand>) {
        tracing::debug!(
            "Autosave started for '{}' (debounce {:?})",
            self.collector_id,
            self.debounce
        );
        let mut phase = Phase::Idle;

        let ack = loop {
            let deadline = match &phase {
                Phase::Pending(deadline) => Some(*deadline),
                _ => None,
            };

            tokio::select! {
                command = commands.recv() => match command {
                    Some(AutosaveCommand::Changed(graph)) => {
                        self.latest = Some(*graph);
                        phase = self.on_change(phase);
                    }
                    Some(AutosaveCommand::Shutdown(ack)) => break Some(ack),
                    None => break None,
                },
                _ = wait_until(deadline) => {
                    phase = self.start_save();
                }
                outcome = wait_for_save(&mut phase) => {
                    let dirty = matches!(phase, Phase::Saving { dirty: true, .. });
                    self.on_saved(outcome);
                    phase = if dirty { self.pending() } else { Phase::Idle };
                }
            }
        };

        self.finish(phase).await;
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
        tracing::debug!("Autosave stopped for '{}'", self.collector_id);
    }

    fn on_change(&self, phase: Phase) -> Phase {
        match phase {
            Phase::Idle | Phase::Pending(_) => self.pending(),
            Phase::Saving { task, .. } => {
                tracing::trace!("Change during save, re-arming afterwards");
                Phase::Saving { task, dirty: true }
            }
        }
    }

    fn pending(&self) -> Phase {
        self.status.send_replace(SaveStatus::Pending);
        Phase::Pending(Instant::now() + self.debounce)
    }

    fn start_save(&self) -> Phase {
        let Some(graph) = self.latest.clone() else {
            self.status.send_replace(SaveStatus::Idle);
            return Phase::Idle;
        };

        self.status.send_replace(SaveStatus::Saving);
        tracing::debug!("Autosaving '{}'", self.collector_id);
        let task = tokio::spawn(persist(
            self.store.clone(),
            self.collector_id.clone(),
            graph,
        ));
        Phase::Saving { task, dirty: false }
    }

    fn on_saved(&self, outcome: Result<VersionId>) {
        let status = match outcome {
            Ok(version) => {
                tracing::info!("Autosaved '{}' as {}", self.collector_id, version);
                SaveStatus::Saved { version }
            }
            Err(e) => {
                tracing::warn!("Autosave of '{}' failed: {}", self.collector_id, e);
                SaveStatus::Failed {
                    message: e.to_string(),
                }
            }
        };
        self.status.send_replace(status);
    }

    /// Teardown: drop the timer, drain the in-flight save, flush leftovers
    async fn finish(&mut self, phase: Phase) {
        let unsaved = match phase {
            Phase::Idle => false,
            Phase::Pending(_) => true,
            Phase::Saving { task, dirty } => {
                self.on_saved(join_save(task).await);
                dirty
            }
        };

        if unsaved {
            if let Some(graph) = self.latest.take() {
                self.status.send_replace(SaveStatus::Saving);
                tracing::debug!("Final save for '{}' before shutdown", self.collector_id);
                let outcome = persist(self.store.clone(), self.collector_id.clone(), graph).await;
                self.on_saved(outcome);
            }
        }
    }
}

async fn persist(store: Arc<dyn ConfigStore>, collector_id: String, graph: ConfigGraph) -> Result<VersionId> {
    let snapshot = ConfigSnapshot::capture(&graph)?;
    let version = store.save_version(&collector_id, &snapshot, true).await?;
    store.set_current(&collector_id, version).await?;
    Ok(version)
}

async fn join_save(task: JoinHandle<Result<VersionId>>) -> Result<VersionId> {
    task.await
        .map_err(|e| LocolError::Persistence(format!("save task failed: {}", e)))?
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn wait_for_save(phase: &mut Phase) -> Result<VersionId> {
    match phase {
        Phase::Saving { task, .. } => task
            .await
            .map_err(|e| LocolError::Persistence(format!("save task failed: {}", e)))?,
        _ => std::future::pending().await,
    }
}
