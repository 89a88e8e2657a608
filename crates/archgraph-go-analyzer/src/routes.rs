//! Route registration calls of the common Go routers (gin, echo, chi, gorilla/mux, net/http).

use tree_sitter::Node;

use crate::syntax::{call_arguments, line_of, string_literal};

/// Method recorded for registrations that accept every verb.
pub const ANY_METHOD: &str = "ANY";

/// Router method name → HTTP method.
const ROUTE_VERBS: &[(&str, &str)] = &[
    ("GET", "GET"),
    ("POST", "POST"),
    ("PUT", "PUT"),
    ("DELETE", "DELETE"),
    ("PATCH", "PATCH"),
    ("HEAD", "HEAD"),
    ("OPTIONS", "OPTIONS"),
    ("Get", "GET"),
    ("Post", "POST"),
    ("Put", "PUT"),
    ("Delete", "DELETE"),
    ("Patch", "PATCH"),
    ("Head", "HEAD"),
    ("Options", "OPTIONS"),
    ("Any", ANY_METHOD),
    ("Handle", ANY_METHOD),
    ("HandleFunc", ANY_METHOD),
];

/// One `x.VERB("/path", ..., handler)` registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteCall {
    pub method: String,
    pub path: String,
    /// Function or method name of the handler.
    pub handler: String,
    /// Identifier in front of the handler: a package binding or a receiver variable.
    pub qualifier: Option<String>,
    /// Internal package the qualifier names, when it is an import binding.
    pub handler_package: Option<String>,
    pub line: u32,
}

/// Recognise a route registration. The path must be a literal starting with `/`.
pub fn route_call(call: Node, source: &str) -> Option<RouteCall> {
    let selector = call
        .child_by_field_name("function")
        .filter(|f| f.kind() == "selector_expression")?;
    let verb = &source[selector.child_by_field_name("field")?.byte_range()];
    let &(_, method) = ROUTE_VERBS.iter().find(|(name, _)| *name == verb)?;

    let arguments = call_arguments(call);
    let (first, last) = match arguments.as_slice() {
        [first, .., last] => (*first, *last),
        _ => return None,
    };
    let pattern = string_literal(first, source)?;
    let (qualifier, handler) = handler_ref(last, source)?;

    let (method, path) = if method == ANY_METHOD {
        match split_method_pattern(&pattern) {
            // Go 1.22 mux patterns: "GET /items/{id}"
            Some((method, path)) => (method.to_string(), path.to_string()),
            None => (
                refined_method(call, source).unwrap_or_else(|| ANY_METHOD.to_string()),
                pattern,
            ),
        }
    } else {
        (method.to_string(), pattern)
    };
    if !path.starts_with('/') {
        return None;
    }

    Some(RouteCall {
        method,
        path,
        handler,
        qualifier,
        handler_package: None,
        line: line_of(call),
    })
}

fn split_method_pattern(pattern: &str) -> Option<(&str, &str)> {
    let (method, path) = pattern.split_once(' ')?;
    let path = path.trim_start();
    (!method.is_empty() && method.chars().all(|c| c.is_ascii_uppercase()) && path.starts_with('/'))
        .then_some((method, path))
}

/// `(qualifier, name)` of a handler argument. Conversions like `http.HandlerFunc(h.Show)` are unwrapped.
fn handler_ref(argument: Node, source: &str) -> Option<(Option<String>, String)> {
    let text = |node: Node| source[node.byte_range()].to_string();
    match argument.kind() {
        "identifier" => Some((None, text(argument))),
        "selector_expression" => {
            let field = argument.child_by_field_name("field")?;
            let qualifier = argument
                .child_by_field_name("operand")
                .filter(|o| o.kind() == "identifier")
                .map(text);
            Some((qualifier, text(field)))
        }
        "call_expression" => match call_arguments(argument).as_slice() {
            [inner] => handler_ref(*inner, source),
            _ => None,
        },
        _ => None,
    }
}

/// Method from a gorilla-style `.Methods("GET")` chained onto the registration.
fn refined_method(call: Node, source: &str) -> Option<String> {
    let selector = call.parent().filter(|p| p.kind() == "selector_expression")?;
    let field = selector.child_by_field_name("field")?;
    if &source[field.byte_range()] != "Methods" {
        return None;
    }
    let chained = selector.parent().filter(|p| p.kind() == "call_expression")?;
    let first = call_arguments(chained).into_iter().next()?;
    string_literal(first, source).map(|m| m.to_ascii_uppercase())
}
