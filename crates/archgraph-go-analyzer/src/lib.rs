pub mod classify;
pub mod error;
pub mod module;
pub mod routes;
pub mod scan;
pub mod syntax;

pub use error::AnalyzerError;
pub use module::analyze_module;
