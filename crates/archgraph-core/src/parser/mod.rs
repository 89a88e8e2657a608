//! Ecosystem parsers and the graph construction they feed.
//!
//! Each ecosystem implements [`LanguageParser`]; [`build_graph`] drives any of them through
//! the same two-pass scan.

mod contract;
mod discovery;
mod error;
mod orchestrator;
mod registry;
mod rules;
mod source;

pub mod go;
pub mod java;
pub mod typescript;

pub use contract::{
    HttpEndpoint, KnownIds, Language, LanguageParser, MethodDecl, ParameterRef, StructuralRole,
};
pub use discovery::{relative_path, walk_sources};
pub use error::AnalysisError;
pub use go::{GoParser, ToolchainError, ToolchainLocator, ToolchainRunner};
pub use java::JavaParser;
pub use orchestrator::build_graph;
pub use registry::{analyze_project, ParserFactory};
pub use rules::{classify, RoleRule};
pub use typescript::{HeuristicStrategy, ScriptStrategy, SyntaxTreeStrategy, TypeScriptParser};
