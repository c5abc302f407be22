//! Graph-specific error types.

use crate::graph::id::{InstanceId, PipelineId};
use crate::types::{ComponentKind, Stage};
use thiserror::Error;

/// Errors surfaced by graph mutations and document parsing.
///
/// A failed operation leaves the graph unmodified.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Pipeline '{pipeline}' references unknown {stage} entry '{name}'")]
    UnresolvedReference {
        pipeline: String,
        stage: Stage,
        name: String,
    },

    #[error("Cannot place {kind} '{instance}' in the {stage} stage")]
    KindMismatch {
        instance: String,
        kind: ComponentKind,
        stage: Stage,
    },

    #[error("Unknown instance {0:?}")]
    UnknownInstance(InstanceId),

    #[error("Unknown pipeline {0:?}")]
    UnknownPipeline(PipelineId),

    #[error("A pipeline named '{0}' already exists")]
    DuplicatePipelineName(String),

    #[error("Invalid pipeline name '{0}'")]
    InvalidPipelineName(String),

    #[error("Processor index {index} out of range (stage has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Referential integrity violated: {0}")]
    Referential(String),
}

impl GraphError {
    /// Whether the error came from reading a document
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            GraphError::Parse(_) | GraphError::Yaml(_) | GraphError::UnresolvedReference { .. }
        )
    }
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::KindMismatch {
            instance: "debug".to_string(),
            kind: ComponentKind::Exporter,
            stage: Stage::Receivers,
        };
        assert_eq!(err.to_string(), "Cannot place exporter 'debug' in the receivers stage");

        let err = GraphError::UnresolvedReference {
            pipeline: "traces".to_string(),
            stage: Stage::Exporters,
            name: "otlp/missing".to_string(),
        };
        assert!(err.is_parse_error());
        assert!(err.to_string().contains("otlp/missing"));
    }
}
