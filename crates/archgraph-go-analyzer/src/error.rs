//! Analyzer error types.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Not a Go module: {0} has no go.mod")]
    MissingModule(PathBuf),

    #[error("go.mod at {0} declares no module path")]
    NoModulePath(PathBuf),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to load Go grammar: {0}")]
    Grammar(String),

    #[error("Syntax error in {file} at line {line}")]
    Syntax { file: String, line: u32 },
}

impl AnalyzerError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AnalyzerError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
