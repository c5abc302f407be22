//! Error handling for locol-graph
//!
//! Graph operations report [`GraphError`]; everything that touches the outside
//! world (catalog files, engine settings, version stores) reports
//! [`LocolError`], which wraps graph errors transparently.

use crate::graph::GraphError;
use thiserror::Error;

/// Main error type for locol-graph operations
#[derive(Error, Debug)]
pub enum LocolError {
    /// Errors from graph mutations or document parsing
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Errors related to configuration or catalog loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors reported by a version store
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<LocolError>,
    },
}

impl LocolError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        LocolError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The graph error at the root of this error, if any
    pub fn as_graph_error(&self) -> Option<&GraphError> {
        match self {
            LocolError::Graph(err) => Some(err),
            LocolError::WithContext { source, .. } => source.as_graph_error(),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for LocolError {
    fn from(err: serde_yaml::Error) -> Self {
        LocolError::Serialization(err.to_string())
    }
}

/// Result type alias for locol-graph operations
pub type Result<T> = std::result::Result<T, LocolError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, GraphError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| LocolError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| LocolError::from(e).with_context(f()))
    }
}
