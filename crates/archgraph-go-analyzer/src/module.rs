//! Whole-module assembly: per-file results folded into packages, routes attached to handlers.

use std::fs;
use std::path::Path;

use archgraph_core::parser::go::{GoAnalysis, GoPackage};
use tracing::{debug, info};

use crate::classify::{class_type, is_entry_point, EntryFacts, PackageNames};
use crate::error::AnalyzerError;
use crate::routes::RouteCall;
use crate::scan::{collect_packages, package_path, read_module_path, relative_slash_path};
use crate::syntax::{is_internal, GoSyntax, ParsedFile};

struct PackageUnit {
    package: GoPackage,
    /// Name from the package clauses.
    name: String,
    has_main_func: bool,
    routes: Vec<RouteCall>,
    owns_route_handlers: bool,
}

impl PackageUnit {
    fn new(path: String, dir: String) -> Self {
        Self {
            package: GoPackage {
                path,
                dir,
                ..GoPackage::default()
            },
            name: String::new(),
            has_main_func: false,
            routes: Vec::new(),
            owns_route_handlers: false,
        }
    }

    fn absorb(&mut self, file: String, parsed: ParsedFile, module: &str) {
        if self.name.is_empty() {
            self.name = parsed.package;
        }
        for import in parsed.imports {
            if is_internal(&import.path, module)
                && import.path != self.package.path
                && !self.package.imports.contains(&import.path)
            {
                self.package.imports.push(import.path);
            }
        }
        self.package.files.push(file);
        self.package.structs.extend(parsed.structs);
        self.package.interfaces.extend(parsed.interfaces);
        self.package.functions.extend(parsed.functions);
        self.routes.extend(parsed.routes);
        self.has_main_func |= parsed.has_main;
    }

    fn finish(mut self, module: &str) -> GoPackage {
        let dir_name = if self.package.dir == "." {
            module.rsplit('/').next().unwrap_or(module)
        } else {
            self.package.dir.rsplit('/').next().unwrap_or(&self.package.dir)
        };
        let names = PackageNames::new(dir_name, self.package.files.iter().map(String::as_str));

        self.package.class_type = class_type(&names, self.owns_route_handlers).to_string();
        self.package.is_entry_point = is_entry_point(EntryFacts {
            is_main_package: self.name == "main",
            has_main_func: self.has_main_func,
            registers_routes: !self.routes.is_empty(),
            owns_route_handlers: self.owns_route_handlers,
        });
        self.package
    }
}

/// Analyse the Go module rooted at `root`.
pub fn analyze_module(root: &Path) -> Result<GoAnalysis, AnalyzerError> {
    let module = read_module_path(root)?;
    let layout = collect_packages(root)?;
    let mut syntax = GoSyntax::new()?;

    let mut units = Vec::with_capacity(layout.len());
    for (dir, files) in layout {
        let mut unit = PackageUnit::new(package_path(&module, &dir), dir);
        for file in files {
            let relative = relative_slash_path(&file, root);
            let source = fs::read_to_string(&file).map_err(|e| AnalyzerError::io(&file, e))?;
            let parsed = syntax.parse(&relative, &source, &module)?;
            debug!(file = %relative, functions = parsed.functions.len(), routes = parsed.routes.len(), "Parsed Go file");
            unit.absorb(relative, parsed, &module);
        }
        units.push(unit);
    }

    attach_routes(&mut units);

    let packages: Vec<GoPackage> = units.into_iter().map(|u| u.finish(&module)).collect();
    info!(module = %module, packages = packages.len(), "Analyzed Go module");
    Ok(GoAnalysis { module, packages })
}

/// Give every resolvable route handler its HTTP method and path.
fn attach_routes(units: &mut [PackageUnit]) {
    let mut assignments = Vec::new();
    for (registrar, unit) in units.iter().enumerate() {
        for route in &unit.routes {
            match locate_handler(units, registrar, route) {
                Some((owner, function)) => {
                    assignments.push((owner, function, route.method.clone(), route.path.clone()))
                }
                None => debug!(handler = %route.handler, path = %route.path, "Route handler not declared in module"),
            }
        }
    }

    for (owner, function, method, path) in assignments {
        let unit = &mut units[owner];
        unit.owns_route_handlers = true;
        let function = &mut unit.package.functions[function];
        // first registration wins
        if function.http_method.is_none() {
            function.http_method = Some(method);
            function.http_path = Some(path);
        }
    }
}

/// `(package, function)` indices of a route's handler. The registering package is searched
/// first unless the handler is qualified by an internal import.
fn locate_handler(units: &[PackageUnit], registrar: usize, route: &RouteCall) -> Option<(usize, usize)> {
    let find = |unit: usize| {
        units[unit]
            .package
            .functions
            .iter()
            .position(|f| f.name == route.handler)
            .map(|function| (unit, function))
    };

    if let Some(package) = &route.handler_package {
        let owner = units.iter().position(|u| &u.package.path == package)?;
        return find(owner);
    }
    find(registrar).or_else(|| (0..units.len()).filter(|&u| u != registrar).find_map(find))
}
