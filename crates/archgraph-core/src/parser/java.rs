//! Java engine.
//!
//! Pattern-based extraction for Spring-style projects: package and import statements,
//! stereotype annotations, method declarations with request mappings, and parameter types.
//! Every file is read and scanned once per parser instance.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::warn;

use super::contract::{
    HttpEndpoint, KnownIds, Language, LanguageParser, MethodDecl, ParameterRef, StructuralRole,
};
use super::discovery::{extension_of, has_dir_component, walk_sources};
use super::error::AnalysisError;
use super::rules::{classify, RoleRule};
use super::source::{self, join_route, line_at, matching_close, split_top_level};
use crate::config::{DiscoveryConfig, JAVA_SOURCE_ROOT};
use crate::graph::simple_name;

/// Compiled regex patterns for Java sources.
mod patterns {
    use once_cell::sync::Lazy;
    use regex::Regex;

    pub static PACKAGE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^\s*package\s+([\w.]+)\s*;").expect("Invalid Java package regex")
    });

    pub static IMPORT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^\s*import\s+(static\s+)?([\w.]+?)(\.\*)?\s*;")
            .expect("Invalid Java import regex")
    });

    pub static TYPE_DECL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\b(?:class|interface|enum|record)\s+[A-Za-z_$][\w$]*")
            .expect("Invalid Java type declaration regex")
    });

    pub static ANNOTATION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"@([A-Za-z_][\w.]*)").expect("Invalid Java annotation regex")
    });

    pub static MAIN_METHOD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\b(?:public\s+static|static\s+public)\s+void\s+main\s*\(")
            .expect("Invalid Java main regex")
    });

    pub static REPOSITORY_BASE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"\b(?:extends|implements)\s+[^{]*\b(?:Jpa|Crud|PagingAndSorting|Mongo|Reactive\w*)Repository\b",
        )
        .expect("Invalid Java repository regex")
    });

    pub static METHOD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(concat!(
            r"(?m)^[ \t]*",
            r"(?:@[\w.]+(?:\s*\([^)]*\))?\s+)*",
            r"(?:(?:public|protected|private|static|final|abstract|synchronized|native|default|strictfp)\s+)*",
            r"(?:<[^>{};]*>\s+)?",
            r"(?:([\w$.]+(?:<[^{};()]*>)?(?:\[\])*)\s+)?",
            r"([A-Za-z_$][\w$]*)\s*\(",
        ))
        .expect("Invalid Java method regex")
    });

    pub static MAPPING: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"@(Get|Post|Put|Delete|Patch|Request)Mapping\b(?:\s*\(([^)]*)\))?")
            .expect("Invalid Java mapping regex")
    });

    pub static MAPPING_PATH: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"\b(?:value|path)\s*=\s*\{?\s*"([^"]*)""#)
            .expect("Invalid Java mapping path regex")
    });

    pub static LEADING_QUOTED: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"^\s*\{?\s*"([^"]*)""#).expect("Invalid Java quoted regex")
    });

    pub static REQUEST_METHOD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"RequestMethod\s*\.\s*([A-Z]+)").expect("Invalid Java request method regex")
    });

    pub static PARAM_ANNOTATION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"@[\w.]+(?:\s*\([^)]*\))?").expect("Invalid Java parameter annotation regex")
    });
}

use patterns::*;

const CONTROLLER_ANNOTATIONS: &[&str] = &["RestController", "Controller"];

const LISTENER_ANNOTATIONS: &[&str] = &[
    "KafkaListener",
    "RabbitListener",
    "JmsListener",
    "SqsListener",
    "EventListener",
    "StreamListener",
];

const ENTITY_ANNOTATIONS: &[&str] = &["Entity", "Document", "Table", "Embeddable"];

/// Words that can open a line like a declaration but never name a method.
const NON_METHOD_NAMES: &[&str] = &[
    "if", "for", "while", "switch", "catch", "synchronized", "return", "new", "throw", "else",
    "try", "do", "super", "this", "assert", "case",
];

/// Words that can sit in the return-type slot of a statement.
const NON_TYPE_WORDS: &[&str] = &[
    "return", "new", "throw", "else", "case", "yield", "package", "import", "class", "interface",
    "enum", "record", "assert",
];

#[derive(Debug, Clone)]
struct JavaImport {
    path: String,
    is_static: bool,
    wildcard: bool,
}

#[derive(Debug, Clone)]
struct JavaMethod {
    decl: MethodDecl,
    /// Bare parameter type names, positional.
    parameter_types: Vec<Option<String>>,
}

/// One scanned Java file.
#[derive(Debug, Default)]
struct JavaSource {
    stem: String,
    package: Option<String>,
    imports: Vec<JavaImport>,
    annotations: HashSet<String>,
    has_main: bool,
    extends_repository: bool,
    methods: Vec<JavaMethod>,
}

impl JavaSource {
    fn parse(path: &Path, raw: &str) -> Self {
        let code = source::sanitize(raw, source::JAVA, false);
        let bare = source::sanitize(raw, source::JAVA, true);

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let package = PACKAGE.captures(&bare).map(|c| c[1].to_string());
        let type_decl_at = first_type_declaration(&bare);
        let import_limit = type_decl_at.unwrap_or(bare.len());

        let imports = IMPORT
            .captures_iter(&bare)
            .filter(|c| c.get(0).map(|m| m.start() < import_limit).unwrap_or(false))
            .map(|c| JavaImport {
                path: c[2].to_string(),
                is_static: c.get(1).is_some(),
                wildcard: c.get(3).is_some(),
            })
            .collect();

        let annotations = ANNOTATION
            .captures_iter(&bare)
            .map(|c| simple_name(&c[1]).to_string())
            .collect();

        let class_prefix = type_decl_at
            .map(|at| {
                let start = bare[..at].rfind(';').map(|i| i + 1).unwrap_or(0);
                class_route_prefix(&code[start..at])
            })
            .unwrap_or_default();

        Self {
            stem,
            package,
            imports,
            annotations,
            has_main: MAIN_METHOD.is_match(&bare),
            extends_repository: REPOSITORY_BASE.is_match(&bare),
            methods: scan_methods(&code, &bare, &class_prefix),
        }
    }

    fn has_any(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.annotations.contains(*n))
    }

    fn identifier(&self) -> String {
        match &self.package {
            Some(package) => format!("{}.{}", package, self.stem),
            None => self.stem.clone(),
        }
    }

    /// First two segments of the package, or the whole package when shorter.
    fn namespace_prefix(&self) -> Option<String> {
        self.package
            .as_ref()
            .map(|p| p.split('.').take(2).collect::<Vec<_>>().join("."))
    }

    fn in_namespace(&self, import: &str) -> bool {
        match self.namespace_prefix() {
            Some(prefix) => import == prefix || import.starts_with(&format!("{}.", prefix)),
            None => true,
        }
    }
}

fn first_type_declaration(bare: &str) -> Option<usize> {
    TYPE_DECL
        .find_iter(bare)
        .map(|m| m.start())
        .find(|&start| !bare[..start].trim_end().ends_with('.'))
}

fn class_route_prefix(window: &str) -> String {
    MAPPING
        .captures_iter(window)
        .filter(|c| &c[1] == "Request")
        .last()
        .map(|c| mapping_path(c.get(2).map(|m| m.as_str()).unwrap_or("")))
        .unwrap_or_default()
}

fn mapping_path(args: &str) -> String {
    MAPPING_PATH
        .captures(args)
        .or_else(|| LEADING_QUOTED.captures(args))
        .map(|c| c[1].to_string())
        .unwrap_or_default()
}

/// HTTP endpoint declared by the mapping annotation nearest to a declaration.
fn method_endpoint(window: &str, class_prefix: &str) -> Option<HttpEndpoint> {
    let caps = MAPPING.captures_iter(window).last()?;
    let args = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    let method = match &caps[1] {
        "Request" => REQUEST_METHOD
            .captures(args)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| "ANY".to_string()),
        verb => verb.to_ascii_uppercase(),
    };
    Some(HttpEndpoint::new(
        method,
        join_route(class_prefix, &mapping_path(args)),
    ))
}

fn scan_methods(code: &str, bare: &str, class_prefix: &str) -> Vec<JavaMethod> {
    let mut methods = Vec::new();

    for caps in METHOD.captures_iter(bare) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        let return_type = caps.get(1).map(|m| m.as_str());

        if NON_METHOD_NAMES.contains(&name.as_str()) {
            continue;
        }
        if return_type.is_some_and(|t| NON_TYPE_WORDS.contains(&t)) {
            continue;
        }

        let open = whole.end() - 1;
        let Some(close) = matching_close(bare, open) else {
            continue;
        };
        let Some(tail) = declaration_tail(&bare[close + 1..]) else {
            continue;
        };
        // `foo(x);` is a call unless a return type makes it an abstract declaration.
        if tail.abstract_decl && return_type.is_none() {
            continue;
        }

        let mut decl = MethodDecl::new(name.as_str(), line_at(bare, name.start()));
        decl.http = method_endpoint(&code[whole.start()..name.start()], class_prefix);
        decl.exceptions = tail.throws;

        let parameter_types = split_top_level(&bare[open + 1..close], ',')
            .into_iter()
            .map(parameter_type)
            .collect();

        methods.push(JavaMethod {
            decl,
            parameter_types,
        });
    }

    methods
}

struct DeclarationTail {
    throws: Vec<String>,
    abstract_decl: bool,
}

/// Inspect what follows a parameter list: an optional `throws` clause, then `{` or `;`.
fn declaration_tail(rest: &str) -> Option<DeclarationTail> {
    let rest = rest.trim_start();
    let (throws, after) = match rest.strip_prefix("throws") {
        Some(clause) if clause.starts_with(char::is_whitespace) => {
            let end = clause.find(&['{', ';'][..])?;
            let names = clause[..end]
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            (names, &clause[end..])
        }
        _ => (Vec::new(), rest),
    };

    match after.chars().next() {
        Some('{') => Some(DeclarationTail {
            throws,
            abstract_decl: false,
        }),
        Some(';') => Some(DeclarationTail {
            throws,
            abstract_decl: true,
        }),
        _ => None,
    }
}

/// Bare type of one formal parameter: annotations, `final`, generics, arrays and varargs
/// removed.
fn parameter_type(parameter: &str) -> Option<String> {
    let cleaned = PARAM_ANNOTATION.replace_all(parameter, " ");
    let tokens: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|t| *t != "final")
        .collect();
    if tokens.len() < 2 {
        return None;
    }

    let declared = tokens[..tokens.len() - 1].join(" ");
    let bare = declared
        .split('<')
        .next()
        .unwrap_or_default()
        .replace("[]", "")
        .replace("...", "");
    let bare = bare.trim();
    (!bare.is_empty()).then(|| bare.to_string())
}

// ============================================================================
// Role rules
// ============================================================================

fn stem_ends_with(source: &JavaSource, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|s| source.stem.ends_with(s))
}

const JAVA_ROLE_RULES: &[RoleRule<JavaSource>] = &[
    RoleRule::new("controller-annotation", StructuralRole::Controller, |s| {
        s.has_any(CONTROLLER_ANNOTATIONS)
    }),
    RoleRule::new("listener-annotation", StructuralRole::Listener, |s| {
        s.has_any(LISTENER_ANNOTATIONS)
    }),
    RoleRule::new("scheduled", StructuralRole::Scheduler, |s| {
        s.has_any(&["Scheduled"])
    }),
    RoleRule::new("application", StructuralRole::Application, |s| {
        s.has_any(&["SpringBootApplication"])
    }),
    RoleRule::new("service-annotation", StructuralRole::Service, |s| {
        s.has_any(&["Service"])
    }),
    RoleRule::new("repository", StructuralRole::Repository, |s| {
        s.has_any(&["Repository"]) || s.extends_repository
    }),
    RoleRule::new("entity-annotation", StructuralRole::Entity, |s| {
        s.has_any(ENTITY_ANNOTATIONS)
    }),
    RoleRule::new("configuration", StructuralRole::Config, |s| {
        s.has_any(&["Configuration"])
    }),
    RoleRule::new("component", StructuralRole::Component, |s| {
        s.has_any(&["Component"])
    }),
    RoleRule::new("controller-suffix", StructuralRole::Controller, |s| {
        stem_ends_with(s, &["Controller", "Resource"])
    }),
    RoleRule::new("service-suffix", StructuralRole::Service, |s| {
        stem_ends_with(s, &["Service", "ServiceImpl"])
    }),
    RoleRule::new("repository-suffix", StructuralRole::Repository, |s| {
        stem_ends_with(s, &["Repository", "Dao"])
    }),
    RoleRule::new("entity-suffix", StructuralRole::Entity, |s| {
        stem_ends_with(s, &["Entity"])
    }),
    RoleRule::new("dto-suffix", StructuralRole::Dto, |s| {
        stem_ends_with(s, &["Dto", "DTO", "Request", "Response"])
    }),
    RoleRule::new("config-suffix", StructuralRole::Config, |s| {
        stem_ends_with(s, &["Config", "Configuration", "Properties"])
    }),
    RoleRule::new("listener-suffix", StructuralRole::Listener, |s| {
        stem_ends_with(s, &["Listener", "Consumer"])
    }),
    RoleRule::new("utility-suffix", StructuralRole::Utility, |s| {
        stem_ends_with(s, &["Util", "Utils", "Helper"])
    }),
];

// ============================================================================
// Parser
// ============================================================================

/// Parser for Java projects.
pub struct JavaParser {
    config: DiscoveryConfig,
    sources: RefCell<HashMap<PathBuf, Rc<JavaSource>>>,
}

impl Default for JavaParser {
    fn default() -> Self {
        Self::new(DiscoveryConfig::default())
    }
}

impl JavaParser {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self {
            config,
            sources: RefCell::new(HashMap::new()),
        }
    }

    fn source(&self, file: &Path) -> Rc<JavaSource> {
        if let Some(cached) = self.sources.borrow().get(file) {
            return Rc::clone(cached);
        }

        let parsed = match fs::read_to_string(file) {
            Ok(raw) => JavaSource::parse(file, &raw),
            Err(e) => {
                warn!(file = %file.display(), error = %e, "Failed to read Java source");
                JavaSource::parse(file, "")
            }
        };
        let parsed = Rc::new(parsed);
        self.sources
            .borrow_mut()
            .insert(file.to_path_buf(), Rc::clone(&parsed));
        parsed
    }

    /// Resolve a class reference written in an import.
    ///
    /// Imports of nested classes (`a.b.Outer.Inner`) fall back to the enclosing class.
    fn resolve_import(path: &str, known: &KnownIds) -> Option<String> {
        let mut candidate = path;
        loop {
            if known.contains(candidate) {
                return Some(candidate.to_string());
            }
            match candidate.rsplit_once('.') {
                Some((parent, _))
                    if simple_name(parent)
                        .chars()
                        .next()
                        .is_some_and(|c| c.is_ascii_uppercase()) =>
                {
                    candidate = parent;
                }
                _ => return None,
            }
        }
    }

    fn resolve_type(source: &JavaSource, type_name: &str, known: &KnownIds) -> Option<String> {
        if type_name.contains('.') {
            return known.contains(type_name).then(|| type_name.to_string());
        }

        let candidates = known.by_simple_name(type_name);
        if candidates.is_empty() {
            return None;
        }

        if let Some(package) = &source.package {
            let same_package = format!("{}.{}", package, type_name);
            if candidates.contains(&same_package) {
                return Some(same_package);
            }
        }

        for import in source.imports.iter().filter(|i| !i.is_static) {
            let imported = if import.wildcard {
                format!("{}.{}", import.path, type_name)
            } else if simple_name(&import.path) == type_name {
                import.path.clone()
            } else {
                continue;
            };
            if candidates.contains(&imported) {
                return Some(imported);
            }
        }

        candidates.first().cloned()
    }
}

fn is_test_source(path: &Path, root: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    name.ends_with("Test.java")
        || name.ends_with("Tests.java")
        || name.ends_with("IT.java")
        || has_dir_component(path, root, &["test", "tests"])
}

fn package_of(id: &str) -> &str {
    id.rsplit_once('.').map(|(p, _)| p).unwrap_or("")
}

impl LanguageParser for JavaParser {
    fn language(&self) -> Language {
        Language::Java
    }

    fn discover_files(&self, root: &Path) -> Result<Vec<PathBuf>, AnalysisError> {
        let conventional = root.join(JAVA_SOURCE_ROOT);
        let source_root = if conventional.is_dir() {
            conventional
        } else {
            root.to_path_buf()
        };

        walk_sources(&source_root, &self.config, |path| {
            extension_of(path) == "java" && !is_test_source(path, root)
        })
    }

    fn extract_identifier(&self, file: &Path, _root: &Path) -> Option<String> {
        let source = self.source(file);
        (!source.stem.is_empty()).then(|| source.identifier())
    }

    fn extract_dependencies(&self, file: &Path, known: &KnownIds) -> Vec<String> {
        let source = self.source(file);
        let mut dependencies: Vec<String> = Vec::new();
        let mut push = |id: String| {
            if !dependencies.contains(&id) {
                dependencies.push(id);
            }
        };

        for import in source.imports.iter() {
            if !source.in_namespace(&import.path) {
                continue;
            }

            if import.wildcard && !import.is_static {
                known
                    .iter()
                    .filter(|id| package_of(id) == import.path)
                    .for_each(|id| push(id.to_string()));
                continue;
            }

            let class_path = if import.is_static && !import.wildcard {
                package_of(&import.path)
            } else {
                import.path.as_str()
            };
            if let Some(id) = Self::resolve_import(class_path, known) {
                push(id);
            }
        }

        dependencies
    }

    fn is_entry_point(&self, file: &Path) -> bool {
        let source = self.source(file);
        source.has_any(CONTROLLER_ANNOTATIONS)
            || source.has_any(LISTENER_ANNOTATIONS)
            || source.has_any(&["Scheduled", "SpringBootApplication"])
            || source.has_main
    }

    fn infer_structural_role(&self, file: &Path) -> StructuralRole {
        classify(JAVA_ROLE_RULES, self.source(file).as_ref())
    }

    fn extract_methods(&self, file: &Path) -> Vec<MethodDecl> {
        self.source(file)
            .methods
            .iter()
            .map(|m| m.decl.clone())
            .collect()
    }

    fn extract_method_parameters(
        &self,
        file: &Path,
        _root: &Path,
        known: &KnownIds,
    ) -> Vec<ParameterRef> {
        let source = self.source(file);
        let own_id = source.identifier();
        let mut links = Vec::new();

        for method in &source.methods {
            for (position, type_name) in method.parameter_types.iter().enumerate() {
                let Some(type_name) = type_name else {
                    continue;
                };
                if let Some(target) = Self::resolve_type(&source, type_name, known) {
                    if target != own_id {
                        links.push(ParameterRef {
                            method: method.decl.name.clone(),
                            position,
                            target,
                        });
                    }
                }
            }
        }

        links
    }
}
