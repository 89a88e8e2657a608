//! Ecosystem selection.

use std::path::Path;

use tracing::info;

use super::contract::{Language, LanguageParser};
use super::error::AnalysisError;
use super::go::GoParser;
use super::java::JavaParser;
use super::orchestrator::build_graph;
use super::typescript::TypeScriptParser;
use crate::config::Config;
use crate::graph::DependencyGraph;

/// Builds the parser for an ecosystem from configuration.
pub struct ParserFactory;

impl ParserFactory {
    pub fn create(language: Language, config: &Config) -> Result<Box<dyn LanguageParser>, AnalysisError> {
        let parser: Box<dyn LanguageParser> = match language {
            Language::Java => Box::new(JavaParser::new(config.discovery.clone())),
            Language::TypeScript => Box::new(TypeScriptParser::for_kind(
                config.typescript.strategy_kind(),
                config.discovery.clone(),
            )?),
            Language::Go => Box::new(GoParser::from_config(&config.go)),
        };
        Ok(parser)
    }
}

/// Detect (unless given) the ecosystem of `root` and build its graph.
pub fn analyze_project(
    root: &Path,
    language: Option<Language>,
    config: &Config,
) -> Result<(Language, DependencyGraph), AnalysisError> {
    let language = match language {
        Some(language) => language,
        None => Language::detect(root).ok_or_else(|| {
            AnalysisError::Validation(format!(
                "cannot detect the ecosystem of {} (no pom.xml, build.gradle, go.mod, package.json or tsconfig.json)",
                root.display()
            ))
        })?,
    };
    info!(%language, root = %root.display(), "Analyzing project");

    let parser = ParserFactory::create(language, config)?;
    let graph = build_graph(parser.as_ref(), root)?;
    Ok((language, graph))
}
