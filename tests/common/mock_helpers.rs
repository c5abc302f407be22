//! Store doubles for autosave tests

use async_trait::async_trait;
use locol_graph::autosave::{ConfigSnapshot, ConfigStore, VersionId};
use locol_graph::{LocolError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One recorded `save_version` call
#[derive(Debug, Clone)]
pub struct SaveRecord {
    pub collector_id: String,
    pub document: String,
    pub autosave: bool,
    pub at: tokio::time::Instant,
}

/// Records every save, optionally failing or taking time
#[derive(Default)]
pub struct RecordingStore {
    saves: Mutex<Vec<SaveRecord>>,
    current: Mutex<Option<VersionId>>,
    fail: AtomicBool,
    latency: Duration,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Make subsequent saves fail (or succeed again)
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn saves(&self) -> Vec<SaveRecord> {
        self.saves.lock().unwrap().clone()
    }

    pub fn current(&self) -> Option<VersionId> {
        *self.current.lock().unwrap()
    }
}

#[async_trait]
impl ConfigStore for RecordingStore {
    async fn save_version(
        &self,
        collector_id: &str,
        snapshot: &ConfigSnapshot,
        autosave: bool,
    ) -> Result<VersionId> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(LocolError::Persistence("store unavailable".to_string()));
        }

        let mut saves = self.saves.lock().unwrap();
        saves.push(SaveRecord {
            collector_id: collector_id.to_string(),
            document: snapshot.document.clone(),
            autosave,
            at: tokio::time::Instant::now(),
        });
        Ok(VersionId(saves.len() as u64))
    }

    async fn set_current(&self, _collector_id: &str, version: VersionId) -> Result<()> {
        *self.current.lock().unwrap() = Some(version);
        Ok(())
    }
}
