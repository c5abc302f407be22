//! Version stores for saved configurations.
//!
//! The scheduler only ever calls [`ConfigStore::save_version`] followed by
//! [`ConfigStore::set_current`]; history, retention and transport are the
//! store's business.

use crate::error::{LocolError, Result};
use crate::graph::ConfigGraph;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Identifier of a saved version, increasing per collector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionId(pub u64);

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// What gets persisted: the graph and its rendered document
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub graph: ConfigGraph,
    pub document: String,
}

impl ConfigSnapshot {
    /// Render `graph` and capture both forms
    pub fn capture(graph: &ConfigGraph) -> Result<Self> {
        let document = crate::document::to_yaml(graph)?;
        Ok(Self {
            graph: graph.clone(),
            document,
        })
    }
}

/// Persistence collaborator for saved configurations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Store a new version for a collector. `autosave` marks versions that
    /// were not explicitly requested by a user.
    async fn save_version(
        &self,
        collector_id: &str,
        snapshot: &ConfigSnapshot,
        autosave: bool,
    ) -> Result<VersionId>;

    /// Mark a stored version as the collector's active configuration
    async fn set_current(&self, collector_id: &str, version: VersionId) -> Result<()>;
}

/// Metadata of one stored version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub id: VersionId,
    pub autosave: bool,
    pub saved_at: DateTime<Utc>,
}

// ==================== Memory Store ====================

#[derive(Debug, Default)]
struct History {
    versions: Vec<(VersionInfo, String)>,
    current: Option<VersionId>,
}

/// In-process version history, keyed by collector id
#[derive(Debug, Default)]
pub struct MemoryStore {
    collectors: Mutex<HashMap<String, History>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_history<T>(&self, collector_id: &str, f: impl FnOnce(&mut History) -> T) -> Result<T> {
        let mut collectors = self
            .collectors
            .lock()
            .map_err(|_| LocolError::Persistence("memory store lock poisoned".to_string()))?;
        Ok(f(collectors.entry(collector_id.to_string()).or_default()))
    }

    /// Stored versions for a collector, oldest first
    pub fn versions(&self, collector_id: &str) -> Result<Vec<VersionInfo>> {
        self.with_history(collector_id, |h| {
            h.versions.iter().map(|(info, _)| info.clone()).collect()
        })
    }

    /// Document text of a stored version
    pub fn document(&self, collector_id: &str, version: VersionId) -> Result<Option<String>> {
        self.with_history(collector_id, |h| {
            h.versions
                .iter()
                .find(|(info, _)| info.id == version)
                .map(|(_, doc)| doc.clone())
        })
    }

    pub fn current(&self, collector_id: &str) -> Result<Option<VersionId>> {
        self.with_history(collector_id, |h| h.current)
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn save_version(
        &self,
        collector_id: &str,
        snapshot: &ConfigSnapshot,
        autosave: bool,
    ) -> Result<VersionId> {
        self.with_history(collector_id, |h| {
            let id = VersionId(h.versions.last().map_or(1, |(info, _)| info.id.0 + 1));
            h.versions.push((
                VersionInfo {
                    id,
                    autosave,
                    saved_at: Utc::now(),
                },
                snapshot.document.clone(),
            ));
            id
        })
    }

    async fn set_current(&self, collector_id: &str, version: VersionId) -> Result<()> {
        self.with_history(collector_id, |h| {
            if h.versions.iter().any(|(info, _)| info.id == version) {
                h.current = Some(version);
                Ok(())
            } else {
                Err(LocolError::Persistence(format!(
                    "unknown version {} for collector '{}'",
                    version, collector_id
                )))
            }
        })?
    }
}

// ==================== Directory Store ====================

/// Name of the file holding the current version number
pub const CURRENT_FILE: &str = "current";

const DOCUMENT_EXTENSION: &str = "yaml";
const AUTOSAVE_MARKER: &str = ".autosave";

/// One YAML file per version under `<root>/<collector_id>/`:
///
/// ```text
/// versions/
///   default/
///     000001.yaml
///     000002.autosave.yaml
///     current            # "2"
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collector_dir(&self, collector_id: &str) -> Result<PathBuf> {
        let valid = !collector_id.is_empty()
            && collector_id != "."
            && collector_id != ".."
            && !collector_id.contains(['/', '\\']);
        if !valid {
            return Err(LocolError::Persistence(format!(
                "invalid collector id '{}'",
                collector_id
            )));
        }
        Ok(self.root.join(collector_id))
    }

    fn file_name(version: VersionId, autosave: bool) -> String {
        let marker = if autosave { AUTOSAVE_MARKER } else { "" };
        format!("{:06}{}.{}", version.0, marker, DOCUMENT_EXTENSION)
    }

    /// Parse `000002.autosave.yaml` into its version and autosave flag
    fn parse_file_name(name: &str) -> Option<(VersionId, bool)> {
        let stem = name.strip_suffix(DOCUMENT_EXTENSION)?.strip_suffix('.')?;
        let (number, autosave) = match stem.strip_suffix(AUTOSAVE_MARKER) {
            Some(number) => (number, true),
            None => (stem, false),
        };
        number.parse().ok().map(|n| (VersionId(n), autosave))
    }

    /// Stored versions for a collector, oldest first
    pub async fn versions(&self, collector_id: &str) -> Result<Vec<(VersionId, bool)>> {
        let dir = self.collector_dir(collector_id)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(parsed) = entry.file_name().to_str().and_then(Self::parse_file_name) {
                versions.push(parsed);
            }
        }
        versions.sort();
        Ok(versions)
    }

    /// Document text of a stored version
    pub async fn load(&self, collector_id: &str, version: VersionId) -> Result<String> {
        let (_, autosave) = self
            .versions(collector_id)
            .await?
            .into_iter()
            .find(|(id, _)| *id == version)
            .ok_or_else(|| {
                LocolError::Persistence(format!(
                    "unknown version {} for collector '{}'",
                    version, collector_id
                ))
            })?;
        let path = self
            .collector_dir(collector_id)?
            .join(Self::file_name(version, autosave));
        Ok(tokio::fs::read_to_string(path).await?)
    }

    pub async fn current(&self, collector_id: &str) -> Result<Option<VersionId>> {
        let path = self.collector_dir(collector_id)?.join(CURRENT_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => text.trim().parse().map(|n| Some(VersionId(n))).map_err(|e| {
                LocolError::Persistence(format!("corrupt current pointer {:?}: {}", path, e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ConfigStore for DirectoryStore {
    async fn save_version(
        &self,
        collector_id: &str,
        snapshot: &ConfigSnapshot,
        autosave: bool,
    ) -> Result<VersionId> {
        let dir = self.collector_dir(collector_id)?;
        tokio::fs::create_dir_all(&dir).await?;

        let next = self
            .versions(collector_id)
            .await?
            .last()
            .map_or(1, |(id, _)| id.0 + 1);
        let version = VersionId(next);

        let path = dir.join(Self::file_name(version, autosave));
        tokio::fs::write(&path, &snapshot.document).await?;
        tracing::debug!("Wrote {} for '{}' to {:?}", version, collector_id, path);
        Ok(version)
    }

    async fn set_current(&self, collector_id: &str, version: VersionId) -> Result<()> {
        let known = self
            .versions(collector_id)
            .await?
            .iter()
            .any(|(id, _)| *id == version);
        if !known {
            return Err(LocolError::Persistence(format!(
                "unknown version {} for collector '{}'",
                version, collector_id
            )));
        }

        let path = self.collector_dir(collector_id)?.join(CURRENT_FILE);
        tokio::fs::write(path, version.0.to_string()).await?;
        Ok(())
    }
}
