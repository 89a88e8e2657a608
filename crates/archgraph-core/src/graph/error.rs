//! Graph error types.

use thiserror::Error;

/// Errors raised by the dependency graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Rejected input (blank identifier, negative position, ...). Nothing was mutated.
    #[error("Invalid graph input: {0}")]
    Validation(String),

    /// The persisted document is not a valid graph document.
    #[error("Failed to deserialize graph document: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// The graph could not be rendered as JSON.
    #[error("Failed to serialize graph document: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl GraphError {
    pub fn validation(message: impl Into<String>) -> Self {
        GraphError::Validation(message.into())
    }
}
