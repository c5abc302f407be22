//! # locol-graph: collector configuration graph engine
//!
//! An in-memory model of an OpenTelemetry-collector style configuration:
//! component instances (receivers, processors, exporters, extensions,
//! connectors) organised into named pipelines, validated against a component
//! schema catalog, rendered to and parsed from the collector's YAML document,
//! and saved in the background with a debounced autosave.
//!
//! ## Architecture
//!
//! - **Schema**: read-only component definitions from a [`ComponentCatalog`]
//! - **Graph**: per-kind registries own instances; pipelines hold identities
//! - **Document**: deterministic YAML generation and schema-guided parsing
//! - **Autosave**: a tokio task debouncing mutations into [`ConfigStore`] saves
//!
//! ## Example
//!
//! ```no_run
//! use locol_graph::{document, ComponentCatalog, ConfigGraph, ImportSettings};
//!
//! # fn main() -> locol_graph::Result<()> {
//! let catalog = ComponentCatalog::load("components.json")?;
//! let text = std::fs::read_to_string("collector.yaml")?;
//!
//! let mut graph = ConfigGraph::default();
//! graph.import_yaml(&text, &catalog, &ImportSettings::default())?;
//!
//! for report in graph.validate() {
//!     for violation in &report.violations {
//!         println!("{}: {}", report.name, violation);
//!     }
//! }
//! println!("{}", document::to_yaml(&graph)?);
//! # Ok(())
//! # }
//! ```

pub mod autosave;
pub mod config;
pub mod document;
pub mod error;
pub mod graph;
pub mod naming;
pub mod schema;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use autosave::{AutosaveHandle, AutosaveScheduler, AutosavedGraph, ConfigStore, SaveStatus};
pub use config::{EngineConfig, ImportSettings};
pub use error::{LocolError, Result, ResultExt};
pub use graph::{
    ComponentInstance, ConfigGraph, GraphError, GraphResult, InstanceId, PipelineConfiguration,
    PipelineId,
};
pub use schema::{ComponentCatalog, ConstraintValidator, PathNormalizer, SchemaCatalog, Violation};
pub use types::{ComponentDefinition, ComponentKind, ConstraintGroup, ConstraintKind, Field, FieldKind, Stage};
pub use value::{ConfigValue, Configuration};
