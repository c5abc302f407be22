//! Debounced persistence of the configuration graph.
//!
//! - [`AutosaveScheduler`] turns a burst of mutations into a single save
//! - [`ConfigStore`] is the persistence collaborator it writes through
//! - [`AutosavedGraph`] pairs a graph with a scheduler handle

mod edit;
mod scheduler;
pub mod store;

pub use edit::AutosavedGraph;
pub use scheduler::{AutosaveHandle, AutosaveScheduler, SaveStatus};
pub use store::{ConfigSnapshot, ConfigStore, DirectoryStore, MemoryStore, VersionId, VersionInfo};
