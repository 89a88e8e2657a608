//! Tree-sitter script strategy.
//!
//! Grammars are loaded once per strategy and the parsers are reused for every file, which
//! makes the strategy `!Sync`: each worker thread needs its own instance.

use std::cell::RefCell;
use std::path::Path;

use tracing::warn;
use tree_sitter::{Node, Parser, Tree};

use super::analysis::{bare_type_name, FileAnalysis, FileFacts, ScriptMethod, ScriptStrategy, HTTP_VERBS};
use crate::parser::contract::HttpEndpoint;
use crate::parser::discovery::extension_of;
use crate::parser::error::AnalysisError;
use crate::parser::source::join_route;

const ROUTER_RECEIVERS: &[&str] = &["app", "router", "server", "api", "fastify", "routes"];

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

const HTTP_DECORATORS: &[&str] = &["Get", "Post", "Put", "Delete", "Patch", "Options", "Head", "All"];

const FUNCTION_KINDS: &[&str] = &[
    "arrow_function",
    "function_expression",
    "function",
    "generator_function",
];

/// Syntax-tree strategy backed by the TypeScript, TSX and JavaScript grammars.
pub struct SyntaxTreeStrategy {
    typescript: RefCell<Parser>,
    tsx: RefCell<Parser>,
    javascript: RefCell<Parser>,
}

fn load_grammar(language: tree_sitter::Language, name: &str) -> Result<Parser, AnalysisError> {
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| AnalysisError::Grammar {
            language: name.to_string(),
            message: e.to_string(),
        })?;
    Ok(parser)
}

impl SyntaxTreeStrategy {
    pub fn new() -> Result<Self, AnalysisError> {
        Ok(Self {
            typescript: RefCell::new(load_grammar(
                tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
                "TypeScript",
            )?),
            tsx: RefCell::new(load_grammar(
                tree_sitter_typescript::LANGUAGE_TSX.into(),
                "TSX",
            )?),
            javascript: RefCell::new(load_grammar(
                tree_sitter_javascript::LANGUAGE.into(),
                "JavaScript",
            )?),
        })
    }

    fn parse_tree(&self, path: &Path, source: &str) -> Option<Tree> {
        let parser = match extension_of(path).as_str() {
            "ts" | "mts" | "cts" => &self.typescript,
            "tsx" => &self.tsx,
            _ => &self.javascript,
        };
        parser.borrow_mut().parse(source, None)
    }
}

impl ScriptStrategy for SyntaxTreeStrategy {
    fn name(&self) -> &'static str {
        "syntax-tree"
    }

    fn analyze(&self, path: &Path, source: &str) -> FileAnalysis {
        let facts = FileFacts::for_path(path);

        let Some(tree) = self.parse_tree(path, source) else {
            warn!(file = %path.display(), "Parser produced no tree, skipping file content");
            return facts.finish();
        };
        let root = tree.root_node();
        if root.has_error() {
            warn!(file = %path.display(), "Syntax errors in file, skipping file content");
            return facts.finish();
        }

        let mut walker = Walker {
            source,
            facts,
            routes: Vec::new(),
        };
        walker.visit(root);
        walker.finish()
    }
}

struct PendingRoute {
    handler: Option<String>,
    verb: String,
    path: String,
    line: u32,
}

struct Walker<'s> {
    source: &'s str,
    facts: FileFacts,
    /// Applied after the walk so handlers declared below the registration still match.
    routes: Vec<PendingRoute>,
}

fn node_line(node: &Node) -> u32 {
    node.start_position().row as u32 + 1
}

impl<'s> Walker<'s> {
    fn text(&self, node: Node) -> &'s str {
        &self.source[node.byte_range()]
    }

    fn string_value(&self, node: Node) -> Option<String> {
        matches!(node.kind(), "string" | "template_string")
            .then(|| self.text(node).trim_matches(&['\'', '"', '`'][..]).to_string())
    }

    fn finish(mut self) -> FileAnalysis {
        for route in std::mem::take(&mut self.routes) {
            self.facts
                .add_route(route.handler.as_deref(), &route.verb, &route.path, route.line);
        }
        self.facts.finish()
    }

    fn visit(&mut self, node: Node) {
        match node.kind() {
            "import_statement" => self.import_statement(node),
            "export_statement" => {
                if let Some(source) = node.child_by_field_name("source") {
                    if let Some(specifier) = self.string_value(source) {
                        self.facts.add_import(&specifier, Vec::new());
                    }
                }
            }
            "call_expression" => self.call_expression(node),
            "decorator" => {
                if let Some(name) = self.decorator_name(node) {
                    self.facts.decorators.insert(name.to_string());
                }
            }
            "class_declaration" | "abstract_class_declaration" | "class" => self.class(node),
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let method = self.function_like(self.text(name), name, node);
                    self.facts.methods.push(method);
                }
            }
            "variable_declarator" => self.variable_declarator(node),
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    // ------------------------------------------------------------------
    // Imports
    // ------------------------------------------------------------------

    fn import_statement(&mut self, node: Node) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();

        if let Some(source) = node.child_by_field_name("source") {
            let mut bindings = Vec::new();
            for clause in children.iter().filter(|c| c.kind() == "import_clause") {
                self.import_clause_bindings(*clause, &mut bindings);
            }
            if let Some(specifier) = self.string_value(source) {
                self.facts.add_import(&specifier, bindings);
            }
            return;
        }

        // import x = require('y')
        for clause in children.iter().filter(|c| c.kind() == "import_require_clause") {
            let binding = clause
                .named_child(0)
                .filter(|n| n.kind() == "identifier")
                .map(|n| self.text(n).to_string());
            if let Some(specifier) = clause
                .child_by_field_name("source")
                .and_then(|s| self.string_value(s))
            {
                self.facts
                    .add_import(&specifier, binding.into_iter().collect());
            }
        }
    }

    fn import_clause_bindings(&self, clause: Node, bindings: &mut Vec<String>) {
        let mut cursor = clause.walk();
        for child in clause.named_children(&mut cursor) {
            match child.kind() {
                "identifier" => bindings.push(self.text(child).to_string()),
                "namespace_import" => {
                    let mut inner = child.walk();
                    if let Some(id) = child
                        .named_children(&mut inner)
                        .find(|n| n.kind() == "identifier")
                    {
                        bindings.push(self.text(id).to_string());
                    };
                }
                "named_imports" => {
                    let mut inner = child.walk();
                    for spec in child
                        .named_children(&mut inner)
                        .filter(|n| n.kind() == "import_specifier")
                    {
                        let local = spec
                            .child_by_field_name("alias")
                            .or_else(|| spec.child_by_field_name("name"));
                        if let Some(local) = local {
                            bindings.push(self.text(local).to_string());
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn first_argument<'t>(&self, call: Node<'t>) -> Option<Node<'t>> {
        call.child_by_field_name("arguments")
            .and_then(|args| args.named_child(0))
    }

    fn call_expression(&mut self, node: Node) {
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };

        match function.kind() {
            "identifier" if self.text(function) == "require" => {
                let Some(specifier) = node
                    .child_by_field_name("arguments")
                    .and_then(|a| a.named_child(0))
                    .and_then(|a| self.string_value(a))
                else {
                    return;
                };
                let bindings = node
                    .parent()
                    .filter(|p| p.kind() == "variable_declarator")
                    .and_then(|p| p.child_by_field_name("name"))
                    .map(|pattern| self.pattern_bindings(pattern))
                    .unwrap_or_default();
                self.facts.add_import(&specifier, bindings);
            }
            "import" => {
                if let Some(specifier) = node
                    .child_by_field_name("arguments")
                    .and_then(|a| a.named_child(0))
                    .and_then(|a| self.string_value(a))
                {
                    self.facts.add_import(&specifier, Vec::new());
                }
            }
            "member_expression" => self.route_call(node, function),
            _ => {}
        }
    }

    fn pattern_bindings(&self, pattern: Node) -> Vec<String> {
        match pattern.kind() {
            "identifier" => vec![self.text(pattern).to_string()],
            "object_pattern" => {
                let mut names = Vec::new();
                let mut cursor = pattern.walk();
                for entry in pattern.named_children(&mut cursor) {
                    let local = match entry.kind() {
                        "shorthand_property_identifier_pattern" => Some(entry),
                        "pair_pattern" => entry.child_by_field_name("value"),
                        "object_assignment_pattern" => entry.child_by_field_name("left"),
                        _ => None,
                    };
                    if let Some(local) = local.filter(|n| {
                        matches!(n.kind(), "identifier" | "shorthand_property_identifier_pattern")
                    }) {
                        names.push(self.text(local).to_string());
                    }
                }
                names
            }
            _ => Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Router call sites
    // ------------------------------------------------------------------

    fn route_call(&mut self, call: Node, callee: Node) {
        let (Some(object), Some(property)) = (
            callee.child_by_field_name("object"),
            callee.child_by_field_name("property"),
        ) else {
            return;
        };

        let receiver = self.text(object);
        let is_router = object.kind() == "identifier"
            && (ROUTER_RECEIVERS.contains(&receiver) || receiver.ends_with("Router"));
        let verb = self.text(property);
        if !is_router || !HTTP_VERBS.contains(&verb) {
            return;
        }

        let Some(arguments) = call.child_by_field_name("arguments") else {
            return;
        };
        let mut cursor = arguments.walk();
        let args: Vec<Node> = arguments
            .named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .collect();
        if args.len() < 2 {
            return;
        }
        let Some(path) = self.string_value(args[0]) else {
            return;
        };

        let handler = args
            .last()
            .filter(|n| matches!(n.kind(), "identifier" | "member_expression"))
            .map(|n| self.text(*n).to_string());

        self.routes.push(PendingRoute {
            handler,
            verb: verb.to_string(),
            path,
            line: node_line(&property),
        });
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn decorator_name(&self, decorator: Node) -> Option<&'s str> {
        let expr = decorator.named_child(0)?;
        let target = match expr.kind() {
            "call_expression" => expr.child_by_field_name("function")?,
            _ => expr,
        };
        match target.kind() {
            "identifier" => Some(self.text(target)),
            "member_expression" => target
                .child_by_field_name("property")
                .map(|p| self.text(p)),
            _ => None,
        }
    }

    /// First string argument of a decorator call, or the `path` of an options object.
    fn decorator_path(&self, decorator: Node) -> Option<String> {
        let call = decorator
            .named_child(0)
            .filter(|n| n.kind() == "call_expression")?;
        let arg = self.first_argument(call)?;
        if let Some(value) = self.string_value(arg) {
            return Some(value);
        }
        if arg.kind() != "object" {
            return None;
        }
        let mut cursor = arg.walk();
        let pairs: Vec<Node> = arg.named_children(&mut cursor).collect();
        pairs.into_iter().find_map(|pair| {
            let key = pair.child_by_field_name("key")?;
            if self.text(key).trim_matches(&['\'', '"'][..]) != "path" {
                return None;
            }
            self.string_value(pair.child_by_field_name("value")?)
        })
    }

    fn class(&mut self, node: Node) {
        if let Some(name) = node.child_by_field_name("name") {
            self.facts.class_names.push(self.text(name).to_string());
        }

        let mut decorators: Vec<Node> = Vec::new();
        let mut cursor = node.walk();
        decorators.extend(node.children(&mut cursor).filter(|c| c.kind() == "decorator"));
        if let Some(parent) = node.parent().filter(|p| p.kind() == "export_statement") {
            let mut cursor = parent.walk();
            decorators.extend(parent.children(&mut cursor).filter(|c| c.kind() == "decorator"));
        }

        let prefix = decorators
            .iter()
            .find(|d| self.decorator_name(**d) == Some("Controller"))
            .and_then(|d| self.decorator_path(*d))
            .unwrap_or_default();

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        let members: Vec<Node> = body.named_children(&mut cursor).collect();

        let mut pending: Vec<Node> = Vec::new();
        for member in members {
            match member.kind() {
                "decorator" => pending.push(member),
                "comment" => {}
                "method_definition" => {
                    let mut own = member.walk();
                    let mut member_decorators: Vec<Node> = member
                        .children(&mut own)
                        .filter(|c| c.kind() == "decorator")
                        .collect();
                    member_decorators.append(&mut pending);
                    self.class_method(member, &member_decorators, &prefix);
                }
                _ => pending.clear(),
            }
        }
    }

    fn class_method(&mut self, member: Node, decorators: &[Node], prefix: &str) {
        let Some(name) = member.child_by_field_name("name") else {
            return;
        };
        if member.child_by_field_name("body").is_none() {
            return;
        }

        let mut method = self.function_like(self.text(name), name, member);
        method.http = decorators.iter().find_map(|d| {
            let verb = self.decorator_name(*d)?;
            if !HTTP_DECORATORS.contains(&verb) {
                return None;
            }
            let path = self.decorator_path(*d).unwrap_or_default();
            Some(HttpEndpoint::new(verb, join_route(prefix, &path)))
        });
        self.facts.methods.push(method);
    }

    fn variable_declarator(&mut self, node: Node) {
        let (Some(name), Some(mut value)) = (
            node.child_by_field_name("name"),
            node.child_by_field_name("value"),
        ) else {
            return;
        };
        if name.kind() != "identifier" {
            return;
        }

        while value.kind() == "call_expression" {
            let callee = value
                .child_by_field_name("function")
                .map(|f| self.text(f))
                .unwrap_or_default();
            if !FUNCTION_WRAPPERS.contains(&callee) {
                return;
            }
            let Some(inner) = self.first_argument(value) else {
                return;
            };
            value = inner;
        }

        if FUNCTION_KINDS.contains(&value.kind()) {
            let method = self.function_like(self.text(name), name, value);
            self.facts.methods.push(method);
        }
    }

    /// Build a method from any function-shaped node.
    fn function_like(&self, name: &str, name_node: Node, function: Node) -> ScriptMethod {
        let mut method = ScriptMethod::new(name, node_line(&name_node));

        if let Some(params) = function.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            method.parameter_types = params
                .named_children(&mut cursor)
                .filter(|p| p.kind() != "comment")
                .map(|p| self.parameter_type(p))
                .collect();
        } else if function.child_by_field_name("parameter").is_some() {
            method.parameter_types = vec![None];
        }

        if let Some(body) = function
            .child_by_field_name("body")
            .filter(|b| b.kind() == "statement_block")
        {
            self.collect_throws(body, &mut method.throws);
        }
        method
    }

    fn parameter_type(&self, param: Node) -> Option<String> {
        match param.kind() {
            "required_parameter" | "optional_parameter" => param
                .child_by_field_name("type")
                .and_then(|t| bare_type_name(self.text(t))),
            _ => None,
        }
    }

    fn collect_throws(&self, node: Node, throws: &mut Vec<String>) {
        if node.kind() == "throw_statement" {
            let constructor = node
                .named_child(0)
                .filter(|n| n.kind() == "new_expression")
                .and_then(|n| n.child_by_field_name("constructor"));
            if let Some(constructor) = constructor {
                let name = self.text(constructor).to_string();
                if !throws.contains(&name) {
                    throws.push(name);
                }
            }
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_throws(child, throws);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::contract::StructuralRole;

    fn analyze(path: &str, source: &str) -> FileAnalysis {
        SyntaxTreeStrategy::new()
            .unwrap()
            .analyze(Path::new(path), source)
    }

    #[test]
    fn test_nest_controller() {
        let analysis = analyze(
            "src/users/users.controller.ts",
            r#"import { Controller, Get, Param } from '@nestjs/common';
import { UsersService } from './users.service';

@Controller('users')
export class UsersController {
  constructor(private readonly usersService: UsersService) {}

  @Get(':id')
  findOne(@Param('id') id: string) {
    throw new NotFoundException();
  }
}
"#,
        );

        assert_eq!(analysis.role, StructuralRole::Controller);
        assert!(analysis.is_entry_point);

        let names: Vec<_> = analysis.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["constructor", "findOne"]);
        assert_eq!(
            analysis.methods[0].parameter_types,
            vec![Some("UsersService".to_string())]
        );
        assert_eq!(
            analysis.methods[1].http,
            Some(HttpEndpoint::new("GET", "/users/:id"))
        );
        assert_eq!(analysis.methods[1].line, 9);
        assert_eq!(analysis.methods[1].throws, vec!["NotFoundException"]);
        assert_eq!(
            analysis.imports[1].bindings,
            vec!["UsersService".to_string()]
        );
    }

    #[test]
    fn test_require_and_routes_before_handler() {
        let analysis = analyze(
            "src/routes.js",
            r#"const express = require('express');
const { list } = require('./handlers');
const router = express.Router();

router.get('/items', show);

function show(req, res) {}
"#,
        );

        assert_eq!(analysis.imports[1].bindings, vec!["list".to_string()]);
        let show = analysis.methods.iter().find(|m| m.name == "show").unwrap();
        assert_eq!(show.http, Some(HttpEndpoint::new("GET", "/items")));
        assert_eq!(analysis.methods.len(), 1);
    }

    #[test]
    fn test_malformed_source_is_empty() {
        let analysis = analyze("src/broken.ts", "export class {{{ function (");
        assert!(analysis.methods.is_empty());
        assert!(analysis.imports.is_empty());
        assert_eq!(analysis.role, StructuralRole::Unknown);
    }

    #[test]
    fn test_memo_wrapped_component() {
        let analysis = analyze(
            "src/components/Card.tsx",
            "export const Card = React.memo(forwardRef((props: CardProps, ref) => {\n  return <div />;\n}));\n",
        );
        assert_eq!(analysis.methods.len(), 1);
        assert_eq!(analysis.methods[0].name, "Card");
        assert_eq!(
            analysis.methods[0].parameter_types,
            vec![Some("CardProps".to_string()), None]
        );
        assert_eq!(analysis.role, StructuralRole::Component);
    }
}
