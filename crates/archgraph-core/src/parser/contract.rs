//! The contract every ecosystem parser implements.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::error::AnalysisError;
use crate::graph::{simple_name, DependencyGraph};

/// Source ecosystem handled by a parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    TypeScript,
    Go,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::TypeScript => "typescript",
            Self::Go => "go",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "java" | "spring" => Some(Self::Java),
            "typescript" | "ts" | "javascript" | "js" | "node" => Some(Self::TypeScript),
            "go" | "golang" => Some(Self::Go),
            _ => None,
        }
    }

    /// Detect the ecosystem of a project from its build manifests.
    pub fn detect(project_root: &Path) -> Option<Self> {
        let has = |name: &str| project_root.join(name).is_file();

        if has("pom.xml") || has("build.gradle") || has("build.gradle.kts") {
            Some(Self::Java)
        } else if has("go.mod") {
            Some(Self::Go)
        } else if has("package.json") || has("tsconfig.json") {
            Some(Self::TypeScript)
        } else {
            None
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Architectural category of a source unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StructuralRole {
    Controller,
    Service,
    Repository,
    Entity,
    Dto,
    Config,
    Listener,
    Scheduler,
    Component,
    Utility,
    Application,
    #[default]
    Unknown,
}

impl StructuralRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Controller => "controller",
            Self::Service => "service",
            Self::Repository => "repository",
            Self::Entity => "entity",
            Self::Dto => "dto",
            Self::Config => "config",
            Self::Listener => "listener",
            Self::Scheduler => "scheduler",
            Self::Component => "component",
            Self::Utility => "utility",
            Self::Application => "application",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a class-type label. Unrecognised labels map to `Unknown`.
    pub fn from_class_type(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "controller" | "handler" => Self::Controller,
            "service" => Self::Service,
            "repository" => Self::Repository,
            "entity" | "model" => Self::Entity,
            "dto" => Self::Dto,
            "config" | "configuration" => Self::Config,
            "listener" | "consumer" => Self::Listener,
            "scheduler" => Self::Scheduler,
            "component" => Self::Component,
            "utility" | "util" => Self::Utility,
            "application" => Self::Application,
            _ => Self::Unknown,
        }
    }

    /// Roles whose units are reachable without an internal caller.
    pub fn is_externally_reachable(&self) -> bool {
        matches!(self, Self::Controller | Self::Listener | Self::Scheduler)
    }
}

impl fmt::Display for StructuralRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP route a method is mapped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpEndpoint {
    pub method: String,
    pub path: String,
}

impl HttpEndpoint {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
        }
    }
}

/// A method or function declaration found in a source unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: String,
    /// 1-based line of the declaration.
    pub line: u32,
    pub http: Option<HttpEndpoint>,
    /// Declared failure names (checked exceptions, thrown errors, `error`).
    pub exceptions: Vec<String>,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>, line: u32) -> Self {
        Self {
            name: name.into(),
            line,
            http: None,
            exceptions: Vec::new(),
        }
    }
}

/// A method parameter whose declared type resolved to a known identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterRef {
    pub method: String,
    pub position: usize,
    pub target: String,
}

/// The set of identifiers registered in the graph, with a simple-name index.
#[derive(Debug, Default, Clone)]
pub struct KnownIds {
    ids: IndexSet<String>,
    by_simple_name: HashMap<String, Vec<String>>,
}

impl KnownIds {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut known = KnownIds::default();
        for id in ids {
            known.insert(id.into());
        }
        known
    }

    pub fn from_graph(graph: &DependencyGraph) -> Self {
        Self::new(graph.node_ids())
    }

    fn insert(&mut self, id: String) {
        if self.ids.insert(id.clone()) {
            self.by_simple_name
                .entry(simple_name(&id).to_string())
                .or_default()
                .push(id);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Identifiers whose last segment equals `name`, in registration order.
    pub fn by_simple_name(&self, name: &str) -> &[String] {
        self.by_simple_name
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Hooks an ecosystem provides to [`build_graph`](super::build_graph).
///
/// `file` arguments are the paths returned by [`discover_files`](Self::discover_files).
/// Hooks that look at file contents must not fail on unreadable or malformed files; they
/// return an empty result and let the scan continue.
pub trait LanguageParser {
    /// Ecosystem handled by this parser.
    fn language(&self) -> Language;

    /// Candidate source files under the ecosystem's source root.
    fn discover_files(&self, root: &Path) -> Result<Vec<PathBuf>, AnalysisError>;

    /// Identifier of the unit a file belongs to, or `None` to skip the file.
    fn extract_identifier(&self, file: &Path, root: &Path) -> Option<String>;

    /// Raw dependency references of a file that match `known`.
    fn extract_dependencies(&self, file: &Path, known: &KnownIds) -> Vec<String>;

    fn is_entry_point(&self, file: &Path) -> bool;

    fn infer_structural_role(&self, file: &Path) -> StructuralRole;

    fn extract_methods(&self, file: &Path) -> Vec<MethodDecl>;

    /// Method parameters whose declared type resolves to a known identifier.
    fn extract_method_parameters(
        &self,
        file: &Path,
        root: &Path,
        known: &KnownIds,
    ) -> Vec<ParameterRef>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_known_ids_simple_name_index() {
        let known = KnownIds::new(["com.acme.User", "com.acme.api.User", "com.acme.Order"]);
        assert!(known.contains("com.acme.Order"));
        assert_eq!(
            known.by_simple_name("User"),
            &["com.acme.User".to_string(), "com.acme.api.User".to_string()]
        );
        assert!(known.by_simple_name("Missing").is_empty());
    }

    #[test]
    fn test_role_labels_round_trip() {
        for role in [
            StructuralRole::Controller,
            StructuralRole::Repository,
            StructuralRole::Dto,
            StructuralRole::Listener,
        ] {
            assert_eq!(StructuralRole::from_class_type(role.as_str()), role);
        }
        assert_eq!(
            StructuralRole::from_class_type("handler"),
            StructuralRole::Controller
        );
        assert_eq!(
            StructuralRole::from_class_type("unclassified"),
            StructuralRole::Unknown
        );
    }

    #[test]
    fn test_detect_language() {
        let temp = TempDir::new().unwrap();
        assert_eq!(Language::detect(temp.path()), None);

        std::fs::write(temp.path().join("package.json"), "{}").unwrap();
        assert_eq!(Language::detect(temp.path()), Some(Language::TypeScript));

        std::fs::write(temp.path().join("go.mod"), "module x").unwrap();
        assert_eq!(Language::detect(temp.path()), Some(Language::Go));

        std::fs::write(temp.path().join("pom.xml"), "<project/>").unwrap();
        assert_eq!(Language::detect(temp.path()), Some(Language::Java));
    }
}
