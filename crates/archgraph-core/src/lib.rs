pub mod cache;
pub mod config;
pub mod graph;
pub mod parser;
pub mod store;

pub use cache::{GraphCache, WarmSummary};
pub use config::{Config, ConfigError};
pub use graph::{DependencyGraph, GraphError, GraphStats, MethodInfo, NodeInfo, ParameterLink};
pub use parser::{
    analyze_project, build_graph, AnalysisError, Language, LanguageParser, ParserFactory,
    StructuralRole,
};
pub use store::{FileGraphStore, GraphStore, ProjectRecord, StoreError};
