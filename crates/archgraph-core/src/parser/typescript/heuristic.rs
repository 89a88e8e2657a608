//! Pattern-based script strategy.

use std::path::Path;

use super::analysis::{bare_type_name, FileAnalysis, FileFacts, ScriptMethod, ScriptStrategy};
use crate::parser::contract::HttpEndpoint;
use crate::parser::source::{self, line_at, matching_close, split_top_level};

mod patterns {
    use once_cell::sync::Lazy;
    use regex::Regex;

    pub static IMPORT_FROM: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"(?m)^[ \t]*import\s+(?:type\s+)?([\w$*{},\s]+?)\s*from\s*['"]([^'"]+)['"]"#)
            .expect("Invalid import regex")
    });

    pub static SIDE_EFFECT_IMPORT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"(?m)^[ \t]*import\s*['"]([^'"]+)['"]"#).expect("Invalid side-effect import regex")
    });

    pub static EXPORT_FROM: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r#"(?m)^[ \t]*export\s+(?:type\s+)?(?:\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})\s*from\s*['"]([^'"]+)['"]"#,
        )
        .expect("Invalid re-export regex")
    });

    pub static IMPORT_REQUIRE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"(?m)^[ \t]*import\s+([\w$]+)\s*=\s*require\(\s*['"]([^'"]+)['"]\s*\)"#)
            .expect("Invalid import-require regex")
    });

    pub static REQUIRE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r#"(?:\b(?:const|let|var)\s+(\{[^}]*\}|[\w$]+)\s*=\s*)?\brequire\(\s*['"]([^'"]+)['"]\s*\)"#,
        )
        .expect("Invalid require regex")
    });

    pub static DYNAMIC_IMPORT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"\bimport\(\s*['"]([^'"]+)['"]\s*\)"#).expect("Invalid dynamic import regex")
    });

    pub static DECORATOR: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"@([A-Za-z_$][\w$]*)").expect("Invalid decorator regex")
    });

    pub static CLASS_DECL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\bclass\s+([A-Za-z_$][\w$]*)[^{;]*\{").expect("Invalid class regex")
    });

    pub static CLASS_METHOD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(concat!(
            r"(?m)^[ \t]*",
            r"(?:@[\w$.]+(?:\([^)]*\))?\s+)*",
            r"(?:(?:public|private|protected|static|async|readonly|override|abstract|get|set)\s+)*",
            r"\*?([A-Za-z_$][\w$]*)\s*(?:<[^>(]*>)?\s*\(",
        ))
        .expect("Invalid class method regex")
    });

    pub static FUNCTION_DECL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?m)^[ \t]*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*(?:<[^>(]*>)?\s*\(",
        )
        .expect("Invalid function regex")
    });

    pub static ARROW_DECL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(concat!(
            r"(?m)^[ \t]*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=\n]+)?=\s*",
            r"((?:[\w$.]+\s*\(\s*)*)",
            r"(?:async\s+)?(?:function\b[^(]*\(|\(|([A-Za-z_$][\w$]*)\s*=>)",
        ))
        .expect("Invalid arrow function regex")
    });

    pub static HTTP_DECORATOR: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"@(Get|Post|Put|Delete|Patch|Options|Head|All)\(\s*(?:['"`]([^'"`]*)['"`])?"#)
            .expect("Invalid HTTP decorator regex")
    });

    pub static CONTROLLER_PATH: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"@Controller\(\s*(?:['"`]([^'"`]*)['"`]|\{[^}]*\bpath\s*:\s*['"`]([^'"`]*)['"`])?"#)
            .expect("Invalid controller path regex")
    });

    pub static ROUTE_CALL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r#"\b(?:app|router|server|api|fastify|routes|[A-Za-z_$][\w$]*Router)\.(get|post|put|delete|patch|options|head|all)\s*\(\s*['"`]([^'"`]*)['"`]\s*,"#,
        )
        .expect("Invalid route call regex")
    });

    pub static THROW_NEW: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\bthrow\s+new\s+([A-Za-z_$][\w$.]*)").expect("Invalid throw regex")
    });

    pub static PARAM_DECORATOR: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"@[\w$.]+(?:\s*\([^)]*\))?").expect("Invalid parameter decorator regex")
    });
}

use patterns::*;

/// Call wrappers whose first argument is the declared function.
const FUNCTION_WRAPPERS: &[&str] = &[
    "memo",
    "useCallback",
    "useMemo",
    "forwardRef",
    "React.memo",
    "React.forwardRef",
    "React.useCallback",
    "React.useMemo",
];

const NON_METHOD_NAMES: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "with", "do", "else", "new",
    "typeof", "await", "yield", "super", "import", "export", "throw",
];

const PARAMETER_MODIFIERS: &[&str] = &["public", "private", "protected", "readonly", "override"];

/// Regex-driven strategy. Stateless and cheap to construct.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicStrategy;

impl HeuristicStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl ScriptStrategy for HeuristicStrategy {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn analyze(&self, path: &Path, source_text: &str) -> FileAnalysis {
        let code = source::sanitize(source_text, source::SCRIPT, false);
        let bare = source::sanitize(source_text, source::SCRIPT, true);

        let mut facts = FileFacts::for_path(path);
        collect_imports(&code, &bare, &mut facts);

        facts.decorators = DECORATOR
            .captures_iter(&bare)
            .map(|c| c[1].to_string())
            .collect();

        collect_class_methods(&code, &bare, &mut facts);
        collect_functions(&bare, &mut facts);
        collect_routes(&code, &bare, &mut facts);

        facts.finish()
    }
}

// ============================================================================
// Imports
// ============================================================================

/// Whether the match at `start` begins outside a string literal.
fn starts_in_code(bare: &str, start: usize) -> bool {
    bare.get(start..)
        .is_some_and(|rest| rest.starts_with(|c: char| !c.is_whitespace()))
}

fn collect_imports(code: &str, bare: &str, facts: &mut FileFacts) {
    for caps in IMPORT_FROM.captures_iter(code) {
        facts.add_import(&caps[2], clause_bindings(&caps[1]));
    }
    for caps in SIDE_EFFECT_IMPORT.captures_iter(code) {
        facts.add_import(&caps[1], Vec::new());
    }
    for caps in EXPORT_FROM.captures_iter(code) {
        facts.add_import(&caps[1], Vec::new());
    }
    for caps in IMPORT_REQUIRE.captures_iter(code) {
        facts.add_import(&caps[2], vec![caps[1].to_string()]);
    }
    for caps in REQUIRE.captures_iter(code) {
        if !starts_in_code(bare, caps.get(0).map_or(0, |m| m.start())) {
            continue;
        }
        let bindings = caps
            .get(1)
            .map(|m| pattern_bindings(m.as_str()))
            .unwrap_or_default();
        facts.add_import(&caps[2], bindings);
    }
    for caps in DYNAMIC_IMPORT.captures_iter(code) {
        if !starts_in_code(bare, caps.get(0).map_or(0, |m| m.start())) {
            continue;
        }
        facts.add_import(&caps[1], Vec::new());
    }
}

/// Local names bound by an import clause such as `A, { b as c, type D }` or `* as ns`.
fn clause_bindings(clause: &str) -> Vec<String> {
    let (outer, named) = match (clause.find('{'), clause.rfind('}')) {
        (Some(open), Some(close)) if open < close => (
            format!("{}{}", &clause[..open], &clause[close + 1..]),
            &clause[open + 1..close],
        ),
        _ => (clause.to_string(), ""),
    };

    let mut bindings = Vec::new();
    for part in outer.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.strip_prefix('*') {
            Some(ns) => {
                if let Some(name) = ns.trim().strip_prefix("as") {
                    bindings.push(name.trim().to_string());
                }
            }
            None => bindings.push(part.to_string()),
        }
    }
    for part in named.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let part = part.strip_prefix("type ").unwrap_or(part).trim();
        let local = part.rsplit(" as ").next().unwrap_or(part).trim();
        if !local.is_empty() {
            bindings.push(local.to_string());
        }
    }
    bindings
}

/// Local names bound by a `require` target: an identifier or a destructuring pattern.
fn pattern_bindings(pattern: &str) -> Vec<String> {
    let pattern = pattern.trim();
    match pattern.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
        Some(inner) => inner
            .split(',')
            .filter_map(|entry| {
                let local = entry.rsplit(':').next()?.split('=').next()?.trim();
                (!local.is_empty()).then(|| local.to_string())
            })
            .collect(),
        None => vec![pattern.to_string()],
    }
}

// ============================================================================
// Declarations
// ============================================================================

struct Signature {
    close: usize,
    body: Option<(usize, usize)>,
}

/// Locate the body that follows a parameter list closing at `close`, skipping an optional
/// return-type annotation. `None` when no block body follows.
fn block_after(bare: &str, close: usize) -> Option<(usize, usize)> {
    let rest = &bare[close + 1..];
    let trimmed = rest.trim_start();
    let offset = close + 1 + (rest.len() - trimmed.len());

    let open = if trimmed.starts_with('{') {
        offset
    } else if trimmed.starts_with(':') {
        let brace = trimmed.find('{')?;
        if trimmed[..brace].contains(&[';', '=', '}'][..]) {
            return None;
        }
        offset + brace
    } else {
        return None;
    };

    matching_close(bare, open).map(|end| (open, end))
}

fn parameter_types(bare: &str, open: usize, close: usize) -> Vec<Option<String>> {
    split_top_level(&bare[open + 1..close], ',')
        .into_iter()
        .map(|param| {
            let cleaned = PARAM_DECORATOR.replace_all(param, " ");
            let mut text = cleaned.trim();
            loop {
                let stripped = PARAMETER_MODIFIERS
                    .iter()
                    .find_map(|m| text.strip_prefix(m).filter(|r| r.starts_with(' ')));
                match stripped {
                    Some(rest) => text = rest.trim_start(),
                    None => break,
                }
            }
            let parts = split_top_level(text, ':');
            if parts.len() < 2 {
                return None;
            }
            let type_text = parts[1..].join(":");
            let type_text = split_top_level(&type_text, '=')
                .first()
                .map(|t| t.to_string())
                .unwrap_or_default();
            bare_type_name(&type_text)
        })
        .collect()
}

fn thrown_names(bare: &str, body: Option<(usize, usize)>) -> Vec<String> {
    let Some((open, close)) = body else {
        return Vec::new();
    };
    let mut names: Vec<String> = Vec::new();
    for caps in THROW_NEW.captures_iter(&bare[open..close]) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

fn build_method(bare: &str, name: &str, name_at: usize, open: usize, sig: &Signature) -> ScriptMethod {
    let mut method = ScriptMethod::new(name, line_at(bare, name_at));
    method.parameter_types = parameter_types(bare, open, sig.close);
    method.throws = thrown_names(bare, sig.body);
    method
}

fn collect_class_methods(code: &str, bare: &str, facts: &mut FileFacts) {
    for class in CLASS_DECL.captures_iter(bare) {
        let (Some(whole), Some(name)) = (class.get(0), class.get(1)) else {
            continue;
        };
        facts.class_names.push(name.as_str().to_string());

        let body_open = whole.end() - 1;
        let Some(body_close) = matching_close(bare, body_open) else {
            continue;
        };

        let decorator_window = &code[source::declaration_window_start(bare, whole.start())..whole.start()];
        let prefix = CONTROLLER_PATH
            .captures(decorator_window)
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        let body = &bare[..body_close];
        let mut member_start = body_open + 1;
        let mut search_from = body_open + 1;

        while let Some(caps) = CLASS_METHOD.captures_at(body, search_from) {
            let (Some(whole), Some(method_name)) = (caps.get(0), caps.get(1)) else {
                break;
            };
            search_from = whole.end();

            if NON_METHOD_NAMES.contains(&method_name.as_str()) {
                continue;
            }
            let open = whole.end() - 1;
            let Some(close) = matching_close(bare, open) else {
                continue;
            };
            let Some(block) = block_after(bare, close) else {
                continue;
            };

            let sig = Signature {
                close,
                body: Some(block),
            };
            let mut method = build_method(bare, method_name.as_str(), method_name.start(), open, &sig);

            let window = &code[member_start..method_name.start()];
            if let Some(http) = HTTP_DECORATOR.captures_iter(window).last() {
                let path = http.get(2).map(|m| m.as_str()).unwrap_or_default();
                method.http = Some(HttpEndpoint::new(
                    &http[1],
                    source::join_route(&prefix, path),
                ));
            }

            facts.methods.push(method);
            member_start = block.1 + 1;
            search_from = block.1 + 1;
        }
    }
}

fn collect_functions(bare: &str, facts: &mut FileFacts) {
    for caps in FUNCTION_DECL.captures_iter(bare) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let open = whole.end() - 1;
        let Some(close) = matching_close(bare, open) else {
            continue;
        };
        let sig = Signature {
            close,
            body: block_after(bare, close),
        };
        facts
            .methods
            .push(build_method(bare, name.as_str(), name.start(), open, &sig));
    }

    for caps in ARROW_DECL.captures_iter(bare) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        let wrappers = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let wrappers_ok = wrappers
            .split('(')
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .all(|w| FUNCTION_WRAPPERS.contains(&w));
        if !wrappers_ok {
            continue;
        }

        if caps.get(3).is_some() {
            // `x => ...`: one untyped parameter
            let mut method = ScriptMethod::new(name.as_str(), line_at(bare, name.start()));
            method.parameter_types = vec![None];
            let after_arrow = whole.end();
            method.throws = thrown_names(bare, arrow_block(bare, after_arrow));
            facts.methods.push(method);
            continue;
        }

        let open = whole.end() - 1;
        let Some(close) = matching_close(bare, open) else {
            continue;
        };
        let is_function_keyword = bare[name.end()..whole.end()].contains("function");

        let body = if is_function_keyword {
            block_after(bare, close)
        } else {
            let rest = &bare[close + 1..];
            let Some(arrow) = rest.find("=>") else {
                continue;
            };
            let between = rest[..arrow].trim();
            if !(between.is_empty() || between.starts_with(':')) || between.contains(';') {
                continue;
            }
            arrow_block(bare, close + 1 + arrow + 2)
        };

        let sig = Signature { close, body };
        facts
            .methods
            .push(build_method(bare, name.as_str(), name.start(), open, &sig));
    }
}

/// Block body of an arrow function whose `=>` ends at `from`, if it has one.
fn arrow_block(bare: &str, from: usize) -> Option<(usize, usize)> {
    let rest = &bare[from..];
    let trimmed = rest.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }
    let open = from + (rest.len() - trimmed.len());
    matching_close(bare, open).map(|close| (open, close))
}

// ============================================================================
// Router call sites
// ============================================================================

fn collect_routes(code: &str, bare: &str, facts: &mut FileFacts) {
    for caps in ROUTE_CALL.captures_iter(code) {
        let (Some(verb), Some(path)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let Some(open) = code[verb.end()..].find('(').map(|i| verb.end() + i) else {
            continue;
        };
        let Some(close) = matching_close(bare, open) else {
            continue;
        };

        let args = split_top_level(&bare[open + 1..close], ',');
        let handler = args.last().map(|a| a.trim()).filter(|a| {
            a.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
                && a.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.')
        });

        facts.add_route(handler, verb.as_str(), path.as_str(), line_at(code, verb.start()));
    }
}
