//! Engine settings for locol-graph
//!
//! Settings live in a single TOML file:
//!
//! ```toml
//! [autosave]
//! enabled = true
//! debounce_ms = 2000
//! collector_id = "default"
//!
//! [import]
//! deduplicate = true
//! normalize = true
//! purge_connectors = true
//!
//! [catalog]
//! path = "/etc/locol/components.json"
//!
//! [store]
//! directory = "/var/lib/locol/versions"
//! ```
//!
//! # Default Location
//!
//! - **Linux**: `~/.config/dev.locol.locol-graph/settings.toml`
//! - **macOS**: `~/Library/Application Support/dev.locol.locol-graph/settings.toml`
//! - **Windows**: `%APPDATA%\dev.locol.locol-graph\settings.toml`
//!
//! Every field has a default, so a partial file (or none at all) is valid.

use crate::error::{LocolError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config and data directories
pub const APP_ID: &str = "dev.locol.locol-graph";

/// Settings filename
pub const SETTINGS_FILE: &str = "settings.toml";

/// Default autosave debounce window in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 2000;

/// Collector identifier used when none is configured
pub const DEFAULT_COLLECTOR_ID: &str = "default";

/// Get the platform config directory for locol-graph
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the platform data directory for locol-graph
pub fn data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the settings file
pub fn settings_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(SETTINGS_FILE))
}

// ==================== Sections ====================

/// `[autosave]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveSettings {
    pub enabled: bool,
    pub debounce_ms: u64,
    pub collector_id: String,
}

impl Default for AutosaveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            collector_id: DEFAULT_COLLECTOR_ID.to_string(),
        }
    }
}

impl AutosaveSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// `[import]`: cleanup passes run after parsing a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub deduplicate: bool,
    pub normalize: bool,
    pub purge_connectors: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            deduplicate: true,
            normalize: true,
            purge_connectors: true,
        }
    }
}

impl ImportSettings {
    /// Import without any cleanup pass
    pub fn none() -> Self {
        Self {
            deduplicate: false,
            normalize: false,
            purge_connectors: false,
        }
    }
}

/// `[catalog]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// JSON component catalog
    pub path: Option<PathBuf>,
}

/// `[store]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Root of the on-disk version store; in-memory when unset
    pub directory: Option<PathBuf>,
}

// ==================== Engine Config ====================

/// Complete engine settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub autosave: AutosaveSettings,
    pub import: ImportSettings,
    pub catalog: CatalogSettings,
    pub store: StoreSettings,
}

impl EngineConfig {
    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| LocolError::Config(format!("Failed to parse settings: {}", e)))
    }

    /// Render settings as TOML text
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| LocolError::Config(format!("Failed to serialize settings: {}", e)))
    }

    /// Load settings from a file. A missing file yields the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| LocolError::Config(format!("Failed to read settings {:?}: {}", path, e)))?;
        Self::from_toml(&content)
    }

    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        let path = settings_path().ok_or_else(|| {
            LocolError::Config("Could not determine settings path".to_string())
        })?;
        Self::load_from(path)
    }

    /// Load settings, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save settings to a file, creating parent directories
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LocolError::Config(format!("Failed to create settings directory: {}", e))
            })?;
        }

        std::fs::write(path, self.to_toml()?)
            .map_err(|e| LocolError::Config(format!("Failed to write settings: {}", e)))
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<()> {
        let path = settings_path().ok_or_else(|| {
            LocolError::Config("Could not determine settings path".to_string())
        })?;
        self.save_to(path)
    }

    /// Version store directory: the configured one, or the platform data dir
    pub fn store_directory(&self) -> Option<PathBuf> {
        self.store
            .directory
            .clone()
            .or_else(|| data_dir().map(|p| p.join("versions")))
    }
}
