//! Go engine: an adapter over the external analysis toolchain.
//!
//! The toolchain runs once per discovery; every other hook answers from the indexed output.

mod model;
mod toolchain;

pub use model::{GoAnalysis, GoField, GoFunction, GoInterface, GoPackage, GoParameter, GoStruct};
pub use toolchain::{ToolchainCommand, ToolchainError, ToolchainLocator, ToolchainRunner};

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use super::contract::{
    HttpEndpoint, KnownIds, Language, LanguageParser, MethodDecl, ParameterRef, StructuralRole,
};
use super::discovery::relative_path;
use super::error::AnalysisError;
use crate::config::GoConfig;

/// Failure name recorded for functions that declare an `error` result.
const DECLARED_FAILURE: &str = "error";

enum AnalysisSource {
    Toolchain(ToolchainRunner),
    Preloaded(GoAnalysis),
}

#[derive(Default)]
struct GoIndex {
    root: PathBuf,
    /// Package path → package.
    packages: HashMap<String, Rc<GoPackage>>,
    /// Project-relative file → package path.
    files: HashMap<String, String>,
}

impl GoIndex {
    fn build(root: &Path, analysis: GoAnalysis) -> Self {
        let mut index = Self {
            root: root.to_path_buf(),
            ..Self::default()
        };
        for package in analysis.packages {
            for file in &package.files {
                index.files.insert(file.clone(), package.path.clone());
            }
            index.packages.insert(package.path.clone(), Rc::new(package));
        }
        index
    }

    fn package_for(&self, file: &Path) -> Option<Rc<GoPackage>> {
        let relative = relative_path(file, &self.root);
        let path = self.files.get(&relative)?;
        self.packages.get(path).cloned()
    }
}

/// Parser for Go modules.
pub struct GoParser {
    source: AnalysisSource,
    index: RefCell<GoIndex>,
}

impl GoParser {
    pub fn new(runner: ToolchainRunner) -> Self {
        Self {
            source: AnalysisSource::Toolchain(runner),
            index: RefCell::new(GoIndex::default()),
        }
    }

    pub fn from_config(config: &GoConfig) -> Self {
        Self::new(ToolchainRunner::from_config(config))
    }

    /// A parser answering from an already produced toolchain document.
    pub fn with_analysis(analysis: GoAnalysis) -> Self {
        Self {
            source: AnalysisSource::Preloaded(analysis),
            index: RefCell::new(GoIndex::default()),
        }
    }

    fn package(&self, file: &Path) -> Option<Rc<GoPackage>> {
        self.index.borrow().package_for(file)
    }
}

impl LanguageParser for GoParser {
    fn language(&self) -> Language {
        Language::Go
    }

    fn discover_files(&self, root: &Path) -> Result<Vec<PathBuf>, AnalysisError> {
        let analysis = match &self.source {
            AnalysisSource::Toolchain(runner) => runner.run(root)?.unwrap_or_default(),
            AnalysisSource::Preloaded(analysis) => analysis.clone(),
        };

        let files: Vec<PathBuf> = analysis
            .packages
            .iter()
            .filter_map(|p| p.files.first())
            .map(|f| root.join(f))
            .collect();
        debug!(module = %analysis.module, packages = files.len(), "Indexed Go packages");

        *self.index.borrow_mut() = GoIndex::build(root, analysis);
        Ok(files)
    }

    fn extract_identifier(&self, file: &Path, _root: &Path) -> Option<String> {
        self.package(file).map(|p| p.path.clone())
    }

    fn extract_dependencies(&self, file: &Path, known: &KnownIds) -> Vec<String> {
        let Some(package) = self.package(file) else {
            return Vec::new();
        };
        let mut dependencies: Vec<String> = Vec::new();
        for import in &package.imports {
            if *import != package.path && known.contains(import) && !dependencies.contains(import) {
                dependencies.push(import.clone());
            }
        }
        dependencies
    }

    fn is_entry_point(&self, file: &Path) -> bool {
        self.package(file).is_some_and(|p| p.is_entry_point)
    }

    fn infer_structural_role(&self, file: &Path) -> StructuralRole {
        self.package(file)
            .map(|p| StructuralRole::from_class_type(&p.class_type))
            .unwrap_or_default()
    }

    fn extract_methods(&self, file: &Path) -> Vec<MethodDecl> {
        let Some(package) = self.package(file) else {
            return Vec::new();
        };
        package
            .functions
            .iter()
            .map(|f| {
                let mut decl = MethodDecl::new(f.qualified_name(), f.line);
                if let (Some(method), Some(path)) = (&f.http_method, &f.http_path) {
                    decl.http = Some(HttpEndpoint::new(method.as_str(), path.as_str()));
                }
                if f.returns_error {
                    decl.exceptions.push(DECLARED_FAILURE.to_string());
                }
                decl
            })
            .collect()
    }

    fn extract_method_parameters(
        &self,
        file: &Path,
        _root: &Path,
        known: &KnownIds,
    ) -> Vec<ParameterRef> {
        let Some(package) = self.package(file) else {
            return Vec::new();
        };
        let mut links = Vec::new();
        for function in &package.functions {
            for (position, parameter) in function.parameters.iter().enumerate() {
                let Some(target) = parameter.resolved_package.as_deref() else {
                    continue;
                };
                if target != package.path && known.contains(target) {
                    links.push(ParameterRef {
                        method: function.qualified_name(),
                        position,
                        target: target.to_string(),
                    });
                }
            }
        }
        links
    }
}
