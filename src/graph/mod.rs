//! The configuration graph.
//!
//! Every instance is owned by exactly one per-kind [`Registry`]; pipelines
//! hold [`InstanceId`]s into those registries, never copies. Updating an
//! instance therefore updates what every pipeline sees, and removing the last
//! reference to a receiver, processor or exporter garbage-collects it.

mod config_graph;
pub mod error;
mod id;
mod instance;
mod registry;
mod shape;

pub use config_graph::{ConfigGraph, InstanceReport};
pub use error::{GraphError, GraphResult};
pub use id::{InstanceId, PipelineId};
pub use instance::{ComponentInstance, PipelineConfiguration};
pub use registry::Registry;
pub use shape::{GraphShape, InstanceShape};
