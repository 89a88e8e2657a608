//! Package-level flags: entry points and class types.

use archgraph_core::parser::{classify, RoleRule};
use archgraph_core::StructuralRole;

/// Lowercased name tokens of a package directory and its files.
#[derive(Debug, Default)]
pub struct PackageNames {
    tokens: Vec<String>,
}

impl PackageNames {
    /// `dir_name` is the last directory segment; `files` are file names or paths.
    pub fn new<'a>(dir_name: &str, files: impl IntoIterator<Item = &'a str>) -> Self {
        let mut names = Self::default();
        names.push_tokens(dir_name);
        for file in files {
            let name = file.rsplit('/').next().unwrap_or(file);
            names.push_tokens(name.trim_end_matches(".go"));
        }
        names
    }

    fn push_tokens(&mut self, name: &str) {
        for token in name
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            if !self.tokens.contains(&token) {
                self.tokens.push(token);
            }
        }
    }

    fn has_any(&self, keywords: &[&str]) -> bool {
        self.tokens.iter().any(|t| keywords.contains(&t.as_str()))
    }
}

fn is_handler_named(n: &PackageNames) -> bool {
    n.has_any(&[
        "handler",
        "handlers",
        "controller",
        "controllers",
        "api",
        "route",
        "routes",
        "router",
    ])
}

fn is_service_named(n: &PackageNames) -> bool {
    n.has_any(&["service", "services", "usecase", "usecases", "logic"])
}

fn is_repository_named(n: &PackageNames) -> bool {
    n.has_any(&[
        "repository",
        "repositories",
        "repo",
        "repos",
        "store",
        "storage",
        "dao",
        "persistence",
        "db",
    ])
}

fn is_entity_named(n: &PackageNames) -> bool {
    n.has_any(&["entity", "entities", "model", "models", "domain"])
}

fn is_dto_named(n: &PackageNames) -> bool {
    n.has_any(&[
        "dto",
        "dtos",
        "request",
        "requests",
        "response",
        "responses",
        "payload",
    ])
}

fn is_config_named(n: &PackageNames) -> bool {
    n.has_any(&["config", "configs", "configuration", "settings"])
}

fn is_listener_named(n: &PackageNames) -> bool {
    n.has_any(&[
        "listener",
        "listeners",
        "consumer",
        "consumers",
        "subscriber",
        "subscribers",
        "worker",
        "workers",
    ])
}

fn is_utility_named(n: &PackageNames) -> bool {
    n.has_any(&["util", "utils", "helper", "helpers", "common"])
}

const NAMING_RULES: &[RoleRule<PackageNames>] = &[
    RoleRule::new("handler-names", StructuralRole::Controller, is_handler_named),
    RoleRule::new("service-names", StructuralRole::Service, is_service_named),
    RoleRule::new("repository-names", StructuralRole::Repository, is_repository_named),
    RoleRule::new("entity-names", StructuralRole::Entity, is_entity_named),
    RoleRule::new("dto-names", StructuralRole::Dto, is_dto_named),
    RoleRule::new("config-names", StructuralRole::Config, is_config_named),
    RoleRule::new("listener-names", StructuralRole::Listener, is_listener_named),
    RoleRule::new("utility-names", StructuralRole::Utility, is_utility_named),
];

/// Class type label: `controller` on call-site evidence, otherwise the first naming bucket.
pub fn class_type(names: &PackageNames, owns_route_handlers: bool) -> &'static str {
    if owns_route_handlers {
        return StructuralRole::Controller.as_str();
    }
    classify(NAMING_RULES, names).as_str()
}

/// Facts deciding whether a package is reachable from outside the module.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntryFacts {
    pub is_main_package: bool,
    pub has_main_func: bool,
    pub registers_routes: bool,
    pub owns_route_handlers: bool,
}

pub fn is_entry_point(facts: EntryFacts) -> bool {
    (facts.is_main_package && facts.has_main_func)
        || facts.registers_routes
        || facts.owns_route_handlers
}
