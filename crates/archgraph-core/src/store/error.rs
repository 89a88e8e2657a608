use std::path::PathBuf;
use thiserror::Error;

use crate::graph::GraphError;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Project not found: {0}")]
    NotFound(String),

    #[error("Invalid repository location: '{0}'")]
    InvalidRepository(String),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stored graph is invalid: {0}")]
    Graph(#[from] GraphError),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
