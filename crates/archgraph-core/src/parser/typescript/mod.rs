//! TypeScript/JavaScript engine.
//!
//! File content is analysed by a pluggable [`ScriptStrategy`]; this module owns discovery,
//! identifiers, import resolution and the per-file analysis cache.

mod analysis;
mod heuristic;
mod resolve;
mod syntax_tree;

pub use analysis::{bare_type_name, FileAnalysis, ImportRef, ScriptMethod, ScriptStrategy};
pub use heuristic::HeuristicStrategy;
pub use resolve::{resolve_specifier, script_identifier, SCRIPT_EXTENSIONS};
pub use syntax_tree::SyntaxTreeStrategy;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, warn};

use super::contract::{KnownIds, Language, LanguageParser, MethodDecl, ParameterRef, StructuralRole};
use super::discovery::{extension_of, has_dir_component, walk_sources};
use super::error::AnalysisError;
use crate::config::{DiscoveryConfig, ScriptStrategyKind, SCRIPT_SOURCE_ROOT};

const TEST_DIRS: &[&str] = &["__tests__", "__mocks__"];

/// Parser for TypeScript and JavaScript projects.
pub struct TypeScriptParser {
    strategy: Box<dyn ScriptStrategy>,
    config: DiscoveryConfig,
    /// Project root and source root of the last discovery.
    roots: RefCell<Option<(PathBuf, PathBuf)>>,
    cache: RefCell<HashMap<PathBuf, Rc<FileAnalysis>>>,
}

impl TypeScriptParser {
    pub fn with_strategy(strategy: Box<dyn ScriptStrategy>, config: DiscoveryConfig) -> Self {
        Self {
            strategy,
            config,
            roots: RefCell::new(None),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn heuristic(config: DiscoveryConfig) -> Self {
        Self::with_strategy(Box::new(HeuristicStrategy::new()), config)
    }

    pub fn syntax_tree(config: DiscoveryConfig) -> Result<Self, AnalysisError> {
        Ok(Self::with_strategy(Box::new(SyntaxTreeStrategy::new()?), config))
    }

    pub fn for_kind(kind: ScriptStrategyKind, config: DiscoveryConfig) -> Result<Self, AnalysisError> {
        match kind {
            ScriptStrategyKind::Heuristic => Ok(Self::heuristic(config)),
            ScriptStrategyKind::SyntaxTree => Self::syntax_tree(config),
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    fn source_root_of(root: &Path) -> PathBuf {
        let conventional = root.join(SCRIPT_SOURCE_ROOT);
        if conventional.is_dir() {
            conventional
        } else {
            root.to_path_buf()
        }
    }

    /// Project and source roots for `file`, falling back to its directory before discovery.
    fn roots_for(&self, file: &Path) -> (PathBuf, PathBuf) {
        if let Some(roots) = self.roots.borrow().as_ref() {
            return roots.clone();
        }
        let dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
        (dir.clone(), dir)
    }

    fn analysis(&self, file: &Path) -> Rc<FileAnalysis> {
        if let Some(cached) = self.cache.borrow().get(file) {
            return Rc::clone(cached);
        }

        let analysis = match fs::read_to_string(file) {
            Ok(source) => self.strategy.analyze(file, &source),
            Err(e) => {
                warn!(file = %file.display(), error = %e, "Failed to read script source");
                self.strategy.analyze(file, "")
            }
        };
        let analysis = Rc::new(analysis);
        self.cache
            .borrow_mut()
            .insert(file.to_path_buf(), Rc::clone(&analysis));
        analysis
    }
}

fn is_excluded_script(path: &Path, root: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    name.contains(".test.")
        || name.contains(".spec.")
        || name.ends_with(".d.ts")
        || has_dir_component(path, root, TEST_DIRS)
}

impl LanguageParser for TypeScriptParser {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn discover_files(&self, root: &Path) -> Result<Vec<PathBuf>, AnalysisError> {
        let source_root = Self::source_root_of(root);
        *self.roots.borrow_mut() = Some((root.to_path_buf(), source_root.clone()));
        debug!(strategy = self.strategy.name(), source_root = %source_root.display(), "Discovering scripts");

        walk_sources(&source_root, &self.config, |path| {
            SCRIPT_EXTENSIONS.contains(&extension_of(path).as_str()) && !is_excluded_script(path, root)
        })
    }

    fn extract_identifier(&self, file: &Path, root: &Path) -> Option<String> {
        script_identifier(file, root)
    }

    fn extract_dependencies(&self, file: &Path, known: &KnownIds) -> Vec<String> {
        let (root, source_root) = self.roots_for(file);
        let own_id = script_identifier(file, &root);
        let mut dependencies: Vec<String> = Vec::new();

        for import in &self.analysis(file).imports {
            let Some(id) = resolve_specifier(&import.specifier, file, &root, &source_root, known) else {
                continue;
            };
            if Some(&id) != own_id.as_ref() && !dependencies.contains(&id) {
                dependencies.push(id);
            }
        }
        dependencies
    }

    fn is_entry_point(&self, file: &Path) -> bool {
        self.analysis(file).is_entry_point
    }

    fn infer_structural_role(&self, file: &Path) -> StructuralRole {
        self.analysis(file).role
    }

    fn extract_methods(&self, file: &Path) -> Vec<MethodDecl> {
        self.analysis(file)
            .methods
            .iter()
            .map(|m| MethodDecl {
                name: m.name.clone(),
                line: m.line,
                http: m.http.clone(),
                exceptions: m.throws.clone(),
            })
            .collect()
    }

    fn extract_method_parameters(
        &self,
        file: &Path,
        root: &Path,
        known: &KnownIds,
    ) -> Vec<ParameterRef> {
        let analysis = self.analysis(file);
        let (_, source_root) = self.roots_for(file);
        let mut links = Vec::new();

        for method in &analysis.methods {
            for (position, type_name) in method.parameter_types.iter().enumerate() {
                let Some(type_name) = type_name else {
                    continue;
                };
                // `ns.Type` resolves through the namespace binding
                let binding = type_name.split('.').next().unwrap_or(type_name);
                if analysis.local_types.iter().any(|t| t == binding) {
                    continue;
                }

                let target = analysis
                    .imports
                    .iter()
                    .filter(|i| i.bindings.iter().any(|b| b == binding))
                    .find_map(|i| resolve_specifier(&i.specifier, file, root, &source_root, known));

                if let Some(target) = target {
                    links.push(ParameterRef {
                        method: method.name.clone(),
                        position,
                        target,
                    });
                }
            }
        }
        links
    }
}
