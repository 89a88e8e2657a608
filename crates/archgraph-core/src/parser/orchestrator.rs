//! Generic graph construction driven by a [`LanguageParser`].

use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span};

use super::contract::{KnownIds, LanguageParser, MethodDecl, StructuralRole};
use super::discovery::relative_path;
use super::error::AnalysisError;
use crate::graph::{DependencyGraph, MethodInfo, NodeInfo};

/// Build the dependency graph of the project at `root`.
///
/// All nodes are registered before any dependency is resolved, so edges can only point
/// at identifiers discovered in the same run.
pub fn build_graph<P>(parser: &P, root: &Path) -> Result<DependencyGraph, AnalysisError>
where
    P: LanguageParser + ?Sized,
{
    validate_root(root)?;

    let span = info_span!("build_graph", language = %parser.language(), root = %root.display());
    let _guard = span.enter();

    let files = parser.discover_files(root)?;
    debug!(count = files.len(), "Discovered source files");

    let mut graph = DependencyGraph::new();
    let mut units: Vec<(PathBuf, String)> = Vec::with_capacity(files.len());

    // Pass 1: nodes
    for file in files {
        let Some(id) = parser.extract_identifier(&file, root) else {
            debug!(file = %file.display(), "No identifier, skipping file");
            continue;
        };
        if id.trim().is_empty() {
            continue;
        }
        graph.add_node(&id, &relative_path(&file, root))?;
        units.push((file, id));
    }

    let known = KnownIds::from_graph(&graph);

    // Pass 2: edges, entry points, enrichment
    for (file, id) in &units {
        for dependency in parser.extract_dependencies(file, &known) {
            if dependency != *id && known.contains(&dependency) {
                graph.add_dependency(id, &dependency);
            }
        }

        if parser.is_entry_point(file) {
            graph.mark_as_entry_point(id);
        }

        let role = parser.infer_structural_role(file);
        if role != StructuralRole::Unknown {
            graph.set_node_info(id, NodeInfo::with_class_type(role.as_str()));
        }

        for method in parser.extract_methods(file) {
            graph.upsert_method_info(id, method_info(method));
        }

        for parameter in parser.extract_method_parameters(file, root, &known) {
            if let Err(e) = graph.add_method_parameter(
                id,
                &parameter.method,
                parameter.position as i64,
                &parameter.target,
            ) {
                debug!(node = %id, error = %e, "Dropping parameter link");
            }
        }
    }

    info!(stats = %graph.stats(), "Dependency graph built");
    Ok(graph)
}

fn validate_root(root: &Path) -> Result<(), AnalysisError> {
    if root.as_os_str().is_empty() {
        return Err(AnalysisError::Validation(
            "project root must not be empty".to_string(),
        ));
    }
    if !root.is_dir() {
        return Err(AnalysisError::Validation(format!(
            "project root {} is not a directory",
            root.display()
        )));
    }
    Ok(())
}

fn method_info(method: MethodDecl) -> MethodInfo {
    let mut info = MethodInfo::new(method.name);
    info.line_number = Some(method.line);
    if let Some(http) = method.http {
        info.http_method = Some(http.method);
        info.http_path = Some(http.path);
    }
    if !method.exceptions.is_empty() {
        info.exceptions = Some(method.exceptions);
    }
    info
}
