//! Per-file extraction over the tree-sitter Go grammar.

use archgraph_core::parser::go::{GoField, GoFunction, GoInterface, GoParameter, GoStruct};
use tree_sitter::{Node, Parser};

use crate::error::AnalyzerError;
use crate::routes::{route_call, RouteCall};

/// One entry of an import block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub alias: Option<String>,
    pub path: String,
}

impl ImportSpec {
    /// Name the package goes by inside the importing file.
    pub fn binding(&self) -> &str {
        match self.alias.as_deref() {
            Some(alias) => alias,
            None => self.path.rsplit('/').next().unwrap_or(&self.path),
        }
    }
}

/// Whether `path` lies under `module`.
pub fn is_internal(path: &str, module: &str) -> bool {
    path == module
        || path
            .strip_prefix(module)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Everything extracted from one source file.
#[derive(Debug, Default)]
pub struct ParsedFile {
    /// Name from the package clause.
    pub package: String,
    pub imports: Vec<ImportSpec>,
    pub structs: Vec<GoStruct>,
    pub interfaces: Vec<GoInterface>,
    pub functions: Vec<GoFunction>,
    pub routes: Vec<RouteCall>,
    /// Declares a receiver-less `func main`.
    pub has_main: bool,
}

/// Reusable Go parser.
pub struct GoSyntax {
    parser: Parser,
}

impl GoSyntax {
    pub fn new() -> Result<Self, AnalyzerError> {
        let language: tree_sitter::Language = tree_sitter_go::LANGUAGE.into();
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| AnalyzerError::Grammar(e.to_string()))?;
        Ok(Self { parser })
    }

    /// Parse one file. `file` is the module-relative path recorded on declarations.
    pub fn parse(
        &mut self,
        file: &str,
        source: &str,
        module: &str,
    ) -> Result<ParsedFile, AnalyzerError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| AnalyzerError::Syntax {
                file: file.to_string(),
                line: 1,
            })?;
        let root = tree.root_node();
        if let Some(error) = first_error(root) {
            return Err(AnalyzerError::Syntax {
                file: file.to_string(),
                line: line_of(error),
            });
        }

        let mut extractor = Extractor {
            source,
            file,
            module,
            parsed: ParsedFile::default(),
        };
        extractor.visit_file(root);
        Ok(extractor.parsed)
    }
}

struct Extractor<'s> {
    source: &'s str,
    file: &'s str,
    module: &'s str,
    parsed: ParsedFile,
}

impl<'s> Extractor<'s> {
    fn text(&self, node: Node) -> &'s str {
        &self.source[node.byte_range()]
    }

    fn visit_file(&mut self, root: Node) {
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "package_clause" => {
                    if let Some(name) = child.named_child(0) {
                        self.parsed.package = self.text(name).to_string();
                    }
                }
                "import_declaration" => self.visit_imports(child),
                "type_declaration" => self.visit_types(child),
                "function_declaration" | "method_declaration" => self.visit_function(child),
                _ => {}
            }
        }
        self.visit_routes(root);
    }

    fn visit_imports(&mut self, declaration: Node) {
        for spec in descendants_of_kind(declaration, "import_spec") {
            let Some(path) = spec.child_by_field_name("path") else {
                continue;
            };
            let alias = spec
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string());
            self.parsed.imports.push(ImportSpec {
                alias,
                path: unquote(self.text(path)).to_string(),
            });
        }
    }

    /// Internal package bound to `binding` by this file's imports.
    fn internal_import(&self, binding: &str) -> Option<String> {
        self.parsed
            .imports
            .iter()
            .find(|i| i.binding() == binding && is_internal(&i.path, self.module))
            .map(|i| i.path.clone())
    }

    fn visit_types(&mut self, declaration: Node) {
        let mut cursor = declaration.walk();
        let specs: Vec<Node> = declaration
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "type_spec")
            .collect();
        let single = specs.len() == 1;

        for spec in specs {
            let (Some(name), Some(ty)) = (
                spec.child_by_field_name("name"),
                spec.child_by_field_name("type"),
            ) else {
                continue;
            };
            let name = self.text(name).to_string();
            let doc = doc_summary(spec, self.source).or_else(|| {
                if single {
                    doc_summary(declaration, self.source)
                } else {
                    None
                }
            });

            match ty.kind() {
                "struct_type" => {
                    let fields = self.struct_fields(ty);
                    self.parsed.structs.push(GoStruct {
                        name,
                        file: self.file.to_string(),
                        line: line_of(spec),
                        fields,
                        doc,
                    });
                }
                "interface_type" => {
                    let methods = self.interface_methods(ty);
                    self.parsed.interfaces.push(GoInterface {
                        name,
                        file: self.file.to_string(),
                        line: line_of(spec),
                        methods,
                        doc,
                    });
                }
                _ => {}
            }
        }
    }

    fn struct_fields(&self, struct_type: Node) -> Vec<GoField> {
        let mut fields = Vec::new();
        let mut cursor = struct_type.walk();
        let Some(list) = struct_type
            .named_children(&mut cursor)
            .find(|n| n.kind() == "field_declaration_list")
        else {
            return fields;
        };

        let mut list_cursor = list.walk();
        for declaration in list.named_children(&mut list_cursor) {
            if declaration.kind() != "field_declaration" {
                continue;
            }
            let Some(ty) = declaration.child_by_field_name("type") else {
                continue;
            };
            let mut names_cursor = declaration.walk();
            let names: Vec<String> = declaration
                .children_by_field_name("name", &mut names_cursor)
                .map(|n| self.text(n).to_string())
                .collect();

            if names.is_empty() {
                // embedded
                let mut token_cursor = declaration.walk();
                let pointer = declaration
                    .children(&mut token_cursor)
                    .any(|n| n.kind() == "*");
                let type_name = self.text(ty);
                fields.push(GoField {
                    name: TypeShape::of(type_name).name.to_string(),
                    type_name: if pointer {
                        format!("*{}", type_name)
                    } else {
                        type_name.to_string()
                    },
                });
            } else {
                for name in names {
                    fields.push(GoField {
                        name,
                        type_name: self.text(ty).to_string(),
                    });
                }
            }
        }
        fields
    }

    fn interface_methods(&self, interface: Node) -> Vec<String> {
        let mut cursor = interface.walk();
        interface
            .named_children(&mut cursor)
            .filter(|n| matches!(n.kind(), "method_elem" | "method_spec"))
            .filter_map(|n| n.child_by_field_name("name"))
            .map(|n| self.text(n).to_string())
            .collect()
    }

    fn visit_function(&mut self, declaration: Node) {
        let Some(name) = declaration.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name).to_string();
        let receiver = declaration
            .child_by_field_name("receiver")
            .and_then(|r| self.receiver_type(r));
        if receiver.is_none() && name == "main" {
            self.parsed.has_main = true;
        }

        let parameters = declaration
            .child_by_field_name("parameters")
            .map(|p| self.parameters(p))
            .unwrap_or_default();
        let returns = declaration
            .child_by_field_name("result")
            .map(|r| self.result_types(r))
            .unwrap_or_default();
        let constructs_errors = declaration
            .child_by_field_name("body")
            .is_some_and(|b| self.constructs_errors(b));

        self.parsed.functions.push(GoFunction {
            name,
            file: self.file.to_string(),
            line: line_of(declaration),
            receiver,
            parameters,
            returns_error: constructs_errors || returns.iter().any(|r| r == "error"),
            returns,
            doc: doc_summary(declaration, self.source),
            ..GoFunction::default()
        });
    }

    fn receiver_type(&self, receiver: Node) -> Option<String> {
        let mut cursor = receiver.walk();
        let declaration = receiver
            .named_children(&mut cursor)
            .find(|n| n.kind() == "parameter_declaration")?;
        let ty = self.text(declaration.child_by_field_name("type")?);
        // drop type arguments of generic receivers
        Some(ty.split('[').next().unwrap_or(ty).trim().to_string())
    }

    fn parameters(&self, list: Node) -> Vec<GoParameter> {
        let mut parameters = Vec::new();
        let mut cursor = list.walk();
        for declaration in list.named_children(&mut cursor) {
            let variadic = match declaration.kind() {
                "parameter_declaration" => false,
                "variadic_parameter_declaration" => true,
                _ => continue,
            };
            let Some(ty) = declaration.child_by_field_name("type") else {
                continue;
            };
            let type_name = if variadic {
                format!("...{}", self.text(ty))
            } else {
                self.text(ty).to_string()
            };

            let mut names_cursor = declaration.walk();
            let mut names: Vec<String> = declaration
                .children_by_field_name("name", &mut names_cursor)
                .map(|n| self.text(n).to_string())
                .collect();
            if names.is_empty() {
                names.push(String::new());
            }

            let shape = TypeShape::of(&type_name);
            let resolved_package = shape.qualifier.and_then(|q| self.internal_import(q));
            for name in names {
                parameters.push(GoParameter {
                    name,
                    type_name: type_name.clone(),
                    resolved_package: resolved_package.clone(),
                    is_pointer: shape.pointer,
                    is_slice: shape.slice,
                    is_variadic: variadic,
                });
            }
        }
        parameters
    }

    fn result_types(&self, result: Node) -> Vec<String> {
        if result.kind() != "parameter_list" {
            return vec![self.text(result).to_string()];
        }
        let mut types = Vec::new();
        let mut cursor = result.walk();
        for declaration in result.named_children(&mut cursor) {
            let Some(ty) = declaration.child_by_field_name("type") else {
                continue;
            };
            let mut names_cursor = declaration.walk();
            let count = declaration
                .children_by_field_name("name", &mut names_cursor)
                .count()
                .max(1);
            for _ in 0..count {
                types.push(self.text(ty).to_string());
            }
        }
        types
    }

    fn constructs_errors(&self, body: Node) -> bool {
        descendants_of_kind(body, "call_expression")
            .into_iter()
            .filter_map(|call| call.child_by_field_name("function"))
            .any(|callee| is_error_constructor(self.text(callee)))
    }

    fn visit_routes(&mut self, root: Node) {
        for call in descendants_of_kind(root, "call_expression") {
            if let Some(mut route) = route_call(call, self.source) {
                route.handler_package = route
                    .qualifier
                    .as_deref()
                    .and_then(|q| self.internal_import(q));
                self.parsed.routes.push(route);
            }
        }
    }
}

fn is_error_constructor(callee: &str) -> bool {
    matches!(callee, "errors.New" | "fmt.Errorf" | "errors.Errorf")
        || callee.starts_with("errors.Wrap")
}

/// Pointer/slice markers and package qualifier of a type expression.
struct TypeShape<'t> {
    pointer: bool,
    slice: bool,
    qualifier: Option<&'t str>,
    name: &'t str,
}

impl<'t> TypeShape<'t> {
    fn of(type_name: &'t str) -> Self {
        let mut rest = type_name.trim().trim_start_matches("...");
        let (mut pointer, mut slice) = (false, false);
        loop {
            if let Some(inner) = rest.strip_prefix("[]") {
                slice = true;
                rest = inner;
            } else if let Some(inner) = rest.strip_prefix('*') {
                pointer = true;
                rest = inner;
            } else {
                break;
            }
        }
        let base = rest.split('[').next().unwrap_or(rest);
        match base.split_once('.') {
            Some((qualifier, name)) if is_identifier(qualifier) && is_identifier(name) => Self {
                pointer,
                slice,
                qualifier: Some(qualifier),
                name,
            },
            _ => Self {
                pointer,
                slice,
                qualifier: None,
                name: base,
            },
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn unquote(literal: &str) -> &str {
    literal.trim_matches(|c| c == '"' || c == '`')
}

/// 1-based line of a node.
pub(crate) fn line_of(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

/// Value of a string literal node.
pub(crate) fn string_literal(node: Node, source: &str) -> Option<String> {
    matches!(node.kind(), "interpreted_string_literal" | "raw_string_literal")
        .then(|| unquote(&source[node.byte_range()]).to_string())
}

/// Argument expressions of a call, comments excluded.
pub(crate) fn call_arguments(call: Node) -> Vec<Node> {
    let Some(arguments) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };
    let mut cursor = arguments.walk();
    arguments
        .named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}

/// Pre-order descendants of `kind`, including nested matches.
fn descendants_of_kind<'t>(node: Node<'t>, kind: &str) -> Vec<Node<'t>> {
    let mut found = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if current.id() != node.id() && current.kind() == kind {
            found.push(current);
        }
        let mut cursor = current.walk();
        let children: Vec<Node<'t>> = current.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    found
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

/// First sentence of the comment block directly above `node`.
fn doc_summary(node: Node, source: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut expected_row = node.start_position().row;
    let mut sibling = node.prev_sibling();

    while let Some(comment) = sibling.filter(|s| s.kind() == "comment") {
        if comment.end_position().row + 1 != expected_row {
            break;
        }
        lines.push(strip_comment_markers(&source[comment.byte_range()]));
        expected_row = comment.start_position().row;
        sibling = comment.prev_sibling();
    }
    lines.reverse();

    let text = lines.join(" ").split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }
    let end = text.find(". ").map(|i| i + 1).unwrap_or(text.len());
    Some(text[..end].to_string())
}

fn strip_comment_markers(comment: &str) -> String {
    if let Some(line) = comment.strip_prefix("//") {
        return line.trim().to_string();
    }
    comment
        .trim_start_matches("/*")
        .trim_end_matches("*/")
        .lines()
        .map(|l| l.trim().trim_start_matches('*').trim())
        .collect::<Vec<_>>()
        .join(" ")
}
