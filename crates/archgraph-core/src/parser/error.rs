//! Analysis error types.

use std::path::PathBuf;
use thiserror::Error;

use super::go::ToolchainError;
use crate::graph::GraphError;

/// Errors that abort the analysis of a project.
///
/// Per-file read and parse problems are not represented here: they are logged and the
/// file contributes an empty result.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Rejected input, raised before any file is touched.
    #[error("Invalid analysis input: {0}")]
    Validation(String),

    /// IO error while discovering sources.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tree-sitter grammar could not be loaded.
    #[error("Failed to load {language} grammar: {message}")]
    Grammar { language: String, message: String },

    /// The external Go toolchain failed.
    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    /// The graph rejected extracted data.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl AnalysisError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }
}
