//! Per-file analysis shape shared by both script strategies.

use std::collections::HashSet;
use std::path::{Component, Path};

use crate::parser::contract::{HttpEndpoint, StructuralRole};
use crate::parser::discovery::extension_of;
use crate::parser::rules::{classify, RoleRule};

/// File stems treated as framework entry points regardless of content.
pub const ENTRY_STEMS: &[&str] = &["index", "main", "app", "server"];

/// HTTP verbs recognised on router call sites and route-handler exports.
pub const HTTP_VERBS: &[&str] = &["get", "post", "put", "delete", "patch", "options", "head", "all"];

const CONTROLLER_DECORATORS: &[&str] = &["Controller", "Resolver", "WebSocketGateway"];

const LISTENER_DECORATORS: &[&str] = &[
    "EventPattern",
    "MessagePattern",
    "Processor",
    "OnEvent",
    "SqsMessageHandler",
];

const SCHEDULER_DECORATORS: &[&str] = &["Cron", "Interval"];

/// A function, method or route handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptMethod {
    pub name: String,
    pub line: u32,
    pub http: Option<HttpEndpoint>,
    /// Bare declared parameter types, positional; `None` when untyped.
    pub parameter_types: Vec<Option<String>>,
    /// Constructors named in `throw new X(...)` statements.
    pub throws: Vec<String>,
}

impl ScriptMethod {
    pub fn new(name: impl Into<String>, line: u32) -> Self {
        Self {
            name: name.into(),
            line,
            http: None,
            parameter_types: Vec::new(),
            throws: Vec::new(),
        }
    }
}

/// A module reference and the local names it binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    pub specifier: String,
    pub bindings: Vec<String>,
}

/// Result of analysing one script file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAnalysis {
    pub role: StructuralRole,
    pub is_entry_point: bool,
    pub methods: Vec<ScriptMethod>,
    pub imports: Vec<ImportRef>,
    /// Classes declared in the file.
    pub local_types: Vec<String>,
}

/// A way of analysing script source.
pub trait ScriptStrategy {
    /// Strategy label for logs.
    fn name(&self) -> &'static str;

    /// Analyse one file. Never fails: malformed input yields a content-free analysis.
    fn analyze(&self, path: &Path, source: &str) -> FileAnalysis;
}

/// Raw observations a strategy collects before classification.
#[derive(Debug, Default)]
pub struct FileFacts {
    stem: String,
    extension: String,
    route_path: Option<String>,
    pub decorators: HashSet<String>,
    pub class_names: Vec<String>,
    pub registers_routes: bool,
    pub methods: Vec<ScriptMethod>,
    pub imports: Vec<ImportRef>,
}

impl FileFacts {
    pub fn for_path(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let route_path = (stem == "route").then(|| app_route_path(path));

        Self {
            stem,
            extension: extension_of(path),
            route_path,
            ..Self::default()
        }
    }

    /// Record an import, merging bindings of a repeated specifier.
    pub fn add_import(&mut self, specifier: &str, bindings: Vec<String>) {
        if specifier.is_empty() {
            return;
        }
        match self.imports.iter_mut().find(|i| i.specifier == specifier) {
            Some(existing) => {
                for binding in bindings {
                    if !existing.bindings.contains(&binding) {
                        existing.bindings.push(binding);
                    }
                }
            }
            None => self.imports.push(ImportRef {
                specifier: specifier.to_string(),
                bindings,
            }),
        }
    }

    /// Attach a router registration to the named handler, or record it as its own method.
    pub fn add_route(&mut self, handler: Option<&str>, verb: &str, path: &str, line: u32) {
        self.registers_routes = true;
        let endpoint = HttpEndpoint::new(verb, path);

        if let Some(name) = handler {
            if let Some(method) = self
                .methods
                .iter_mut()
                .find(|m| m.name == name && m.http.is_none())
            {
                method.http = Some(endpoint);
                return;
            }
        }

        let name = handler
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} {}", endpoint.method, endpoint.path));
        let mut method = ScriptMethod::new(name, line);
        method.http = Some(endpoint);
        self.methods.push(method);
    }

    pub fn has_decorator(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.decorators.contains(*n))
    }

    fn stem_lower(&self) -> String {
        self.stem.to_ascii_lowercase()
    }

    fn stem_has_suffix(&self, suffixes: &[&str]) -> bool {
        let stem = self.stem_lower();
        suffixes
            .iter()
            .any(|s| stem.ends_with(&format!(".{}", s)) || stem == *s)
    }

    /// Classify, detect entry points and produce the final analysis.
    pub fn finish(mut self) -> FileAnalysis {
        if let Some(path) = self.route_path.clone() {
            for method in self.methods.iter_mut() {
                let verb = method.name.to_ascii_lowercase();
                if method.http.is_none()
                    && method.name.chars().all(|c| c.is_ascii_uppercase())
                    && HTTP_VERBS.contains(&verb.as_str())
                {
                    method.http = Some(HttpEndpoint::new(&method.name, &path));
                    self.registers_routes = true;
                }
            }
        }

        let role = classify(SCRIPT_ROLE_RULES, &self);
        let is_entry_point = ENTRY_STEMS.contains(&self.stem.as_str())
            || role.is_externally_reachable()
            || self.registers_routes
            || self.methods.iter().any(|m| m.http.is_some());

        FileAnalysis {
            role,
            is_entry_point,
            methods: self.methods,
            imports: self.imports,
            local_types: self.class_names,
        }
    }
}

/// Route path of a Next.js `route` file: the directories below `app/`, minus route groups.
fn app_route_path(path: &Path) -> String {
    let dirs: Vec<String> = path
        .parent()
        .map(|p| {
            p.components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let Some(app_at) = dirs.iter().rposition(|d| d == "app") else {
        return "/".to_string();
    };

    let segments: Vec<&str> = dirs[app_at + 1..]
        .iter()
        .map(String::as_str)
        .filter(|s| !(s.starts_with('(') && s.ends_with(')')))
        .collect();
    format!("/{}", segments.join("/"))
}

/// Reduce a declared type to the single name that can match a known unit.
///
/// Unions pick their first non-nullish member; generics and array suffixes are dropped.
pub fn bare_type_name(type_text: &str) -> Option<String> {
    let text = type_text.trim().trim_start_matches(':').trim();
    let text = text.strip_prefix("readonly ").unwrap_or(text);

    let member = text
        .split('|')
        .map(str::trim)
        .find(|m| !m.is_empty() && *m != "null" && *m != "undefined")?;

    let name = member
        .split(|c| c == '<' || c == '[')
        .next()
        .unwrap_or_default()
        .trim();

    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.');
    valid.then(|| name.to_string())
}

// ============================================================================
// Role rules
// ============================================================================

const SCRIPT_ROLE_RULES: &[RoleRule<FileFacts>] = &[
    RoleRule::new("controller-decorator", StructuralRole::Controller, |f| {
        f.has_decorator(CONTROLLER_DECORATORS)
    }),
    RoleRule::new("route-registration", StructuralRole::Controller, |f| {
        f.registers_routes
    }),
    RoleRule::new("listener-decorator", StructuralRole::Listener, |f| {
        f.has_decorator(LISTENER_DECORATORS)
    }),
    RoleRule::new("scheduler-decorator", StructuralRole::Scheduler, |f| {
        f.has_decorator(SCHEDULER_DECORATORS)
    }),
    RoleRule::new("entity-decorator", StructuralRole::Entity, |f| {
        f.has_decorator(&["Entity", "Schema"])
    }),
    RoleRule::new("injectable-repository", StructuralRole::Repository, |f| {
        f.has_decorator(&["Injectable"]) && f.class_names.iter().any(|c| c.ends_with("Repository"))
    }),
    RoleRule::new("injectable", StructuralRole::Service, |f| {
        f.has_decorator(&["Injectable"])
    }),
    RoleRule::new("module", StructuralRole::Config, |f| {
        f.has_decorator(&["Module"])
    }),
    RoleRule::new("controller-name", StructuralRole::Controller, |f| {
        f.stem_has_suffix(&["controller", "routes", "router"])
    }),
    RoleRule::new("service-name", StructuralRole::Service, |f| {
        f.stem_has_suffix(&["service"])
    }),
    RoleRule::new("repository-name", StructuralRole::Repository, |f| {
        f.stem_has_suffix(&["repository", "repo", "dao"])
    }),
    RoleRule::new("entity-name", StructuralRole::Entity, |f| {
        f.stem_has_suffix(&["entity", "model", "schema"])
    }),
    RoleRule::new("dto-name", StructuralRole::Dto, |f| f.stem_has_suffix(&["dto"])),
    RoleRule::new("config-name", StructuralRole::Config, |f| {
        f.stem_has_suffix(&["config", "module"])
    }),
    RoleRule::new("listener-name", StructuralRole::Listener, |f| {
        f.stem_has_suffix(&["listener", "consumer", "subscriber"])
    }),
    RoleRule::new("utility-name", StructuralRole::Utility, |f| {
        f.stem_has_suffix(&["util", "utils", "helper", "helpers"])
    }),
    RoleRule::new("component-file", StructuralRole::Component, |f| {
        matches!(f.extension.as_str(), "tsx" | "jsx")
            && f.stem.chars().next().is_some_and(|c| c.is_ascii_uppercase())
    }),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(path: &str) -> FileFacts {
        FileFacts::for_path(Path::new(path))
    }

    #[test]
    fn test_decorators_beat_file_names() {
        let mut f = facts("src/users/users.service.ts");
        f.decorators.insert("Controller".to_string());
        assert_eq!(f.finish().role, StructuralRole::Controller);

        let mut f = facts("src/users/users.service.ts");
        f.decorators.insert("Injectable".to_string());
        f.class_names.push("UsersRepository".to_string());
        assert_eq!(f.finish().role, StructuralRole::Repository);
    }

    #[test]
    fn test_file_name_conventions() {
        let cases = [
            ("src/users/users.controller.ts", StructuralRole::Controller),
            ("src/routes.js", StructuralRole::Controller),
            ("src/users/users.dto.ts", StructuralRole::Dto),
            ("src/db/user.model.ts", StructuralRole::Entity),
            ("src/lib/utils.ts", StructuralRole::Utility),
            ("src/components/UserCard.tsx", StructuralRole::Component),
            ("src/components/userCard.tsx", StructuralRole::Unknown),
        ];
        for (path, role) in cases {
            assert_eq!(facts(path).finish().role, role, "{}", path);
        }
    }

    #[test]
    fn test_entry_stems() {
        assert!(facts("src/index.ts").finish().is_entry_point);
        assert!(facts("server.js").finish().is_entry_point);
        assert!(!facts("src/users/users.service.ts").finish().is_entry_point);
    }

    #[test]
    fn test_route_file_verbs() {
        let mut f = facts("src/app/(shop)/api/orders/[id]/route.ts");
        f.methods.push(ScriptMethod::new("GET", 3));
        f.methods.push(ScriptMethod::new("helper", 9));
        let analysis = f.finish();

        assert_eq!(
            analysis.methods[0].http,
            Some(HttpEndpoint::new("GET", "/api/orders/[id]"))
        );
        assert_eq!(analysis.methods[1].http, None);
        assert_eq!(analysis.role, StructuralRole::Controller);
        assert!(analysis.is_entry_point);
    }

    #[test]
    fn test_add_route_attaches_to_handler() {
        let mut f = facts("src/api.ts");
        f.methods.push(ScriptMethod::new("listUsers", 4));
        f.add_route(Some("listUsers"), "get", "/users", 10);
        f.add_route(None, "post", "/users", 11);

        assert_eq!(f.methods.len(), 2);
        assert_eq!(
            f.methods[0].http,
            Some(HttpEndpoint::new("GET", "/users"))
        );
        assert_eq!(f.methods[1].name, "POST /users");
    }

    #[test]
    fn test_bare_type_name() {
        assert_eq!(bare_type_name(": UsersService"), Some("UsersService".into()));
        assert_eq!(bare_type_name("User[] "), Some("User".into()));
        assert_eq!(
            bare_type_name("null | Repository<User>"),
            Some("Repository".into())
        );
        assert_eq!(bare_type_name("{ id: string }"), None);
        assert_eq!(bare_type_name("() => void"), None);
    }
}
