use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use archgraph_core::parser::go::GoAnalysis;
use archgraph_core::parser::{build_graph, GoParser, ToolchainLocator, ToolchainRunner};
use archgraph_core::StructuralRole;
use archgraph_go_analyzer::{analyze_module, AnalyzerError};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn shop() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "go.mod", "module example.com/shop\n\ngo 1.22\n");
    write(
        root,
        "cmd/server/main.go",
        r#"package main

import (
	"net/http"

	"example.com/shop/internal/api"
)

func main() {
	mux := http.NewServeMux()
	api.Register(mux)
	http.ListenAndServe(":8080", mux)
}
"#,
    );
    write(
        root,
        "internal/api/routes.go",
        r#"package api

import (
	"net/http"

	"example.com/shop/internal/orders"
)

func Register(mux *http.ServeMux) {
	h := orders.NewHandler(nil)
	mux.HandleFunc("GET /orders/{id}", h.Show)
	mux.HandleFunc("/orders", h.Create).Methods("POST")
}
"#,
    );
    write(
        root,
        "internal/orders/handler.go",
        r#"package orders

import (
	"net/http"

	"example.com/shop/internal/store"
)

type Handler struct {
	repo *store.Repository
}

func NewHandler(repo *store.Repository) *Handler {
	return &Handler{repo: repo}
}

// Show renders one order.
func (h *Handler) Show(w http.ResponseWriter, r *http.Request) {}

func (h *Handler) Create(w http.ResponseWriter, r *http.Request) {}
"#,
    );
    write(root, "internal/orders/service.go", "package orders\n\ntype Service struct{}\n");
    write(
        root,
        "internal/store/repository.go",
        r#"package store

import "errors"

type Order struct {
	ID string
}

type Repository struct{}

func (r *Repository) Find(id string) (*Order, error) {
	return nil, errors.New("not found")
}
"#,
    );
    write(
        root,
        "internal/store/repository_test.go",
        "package store\n\nfunc TestFind(t *testing.T) {}\n",
    );
    write(root, "internal/models/order.go", "package models\n\ntype Order struct{}\n");
    tmp
}

fn package<'a>(analysis: &'a GoAnalysis, dir: &str) -> &'a archgraph_core::parser::go::GoPackage {
    analysis
        .packages
        .iter()
        .find(|p| p.dir == dir)
        .unwrap_or_else(|| panic!("no package in {}", dir))
}

#[test]
fn test_module_layout() {
    let tmp = shop();
    let analysis = analyze_module(tmp.path()).unwrap();

    assert_eq!(analysis.module, "example.com/shop");
    let dirs: Vec<&str> = analysis.packages.iter().map(|p| p.dir.as_str()).collect();
    assert_eq!(
        dirs,
        vec!["cmd/server", "internal/api", "internal/models", "internal/orders", "internal/store"]
    );

    let server = package(&analysis, "cmd/server");
    assert_eq!(server.path, "example.com/shop/cmd/server");
    assert_eq!(server.imports, vec!["example.com/shop/internal/api"]);
    assert!(server.is_entry_point);
    assert_eq!(server.class_type, "unknown");

    let store = package(&analysis, "internal/store");
    assert_eq!(store.files, vec!["internal/store/repository.go"]);
    assert!(store.imports.is_empty());
    assert!(!store.is_entry_point);
    assert_eq!(store.class_type, "repository");
    assert!(store.functions[0].returns_error);

    let models = package(&analysis, "internal/models");
    assert_eq!(models.class_type, "entity");
    assert!(!models.is_entry_point);
}

#[test]
fn test_routes_attach_to_handlers_in_other_packages() {
    let tmp = shop();
    let analysis = analyze_module(tmp.path()).unwrap();

    let api = package(&analysis, "internal/api");
    assert!(api.is_entry_point);
    assert_eq!(api.class_type, "controller");

    let orders = package(&analysis, "internal/orders");
    assert!(orders.is_entry_point);
    assert_eq!(orders.class_type, "controller");

    let endpoints: Vec<(String, Option<&str>, Option<&str>)> = orders
        .functions
        .iter()
        .map(|f| (f.qualified_name(), f.http_method.as_deref(), f.http_path.as_deref()))
        .collect();
    assert_eq!(
        endpoints,
        vec![
            ("NewHandler".to_string(), None, None),
            ("Handler.Show".to_string(), Some("GET"), Some("/orders/{id}")),
            ("Handler.Create".to_string(), Some("POST"), Some("/orders")),
        ]
    );
    assert_eq!(orders.functions[1].doc.as_deref(), Some("Show renders one order."));
    assert_eq!(
        orders.functions[0].parameters[0].resolved_package.as_deref(),
        Some("example.com/shop/internal/store")
    );
}

#[test]
fn test_missing_module_and_syntax_errors_fail() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "main.go", "package main\n");
    assert!(matches!(
        analyze_module(tmp.path()),
        Err(AnalyzerError::MissingModule(_))
    ));

    write(tmp.path(), "go.mod", "module example.com/broken\n");
    write(tmp.path(), "bad.go", "package main\n\nfunc (\n");
    assert!(matches!(
        analyze_module(tmp.path()),
        Err(AnalyzerError::Syntax { .. })
    ));
}

#[test]
fn test_binary_writes_output_file() {
    let tmp = shop();
    let out = TempDir::new().unwrap();
    let output = out.path().join("analysis.json");

    let status = Command::new(env!("CARGO_BIN_EXE_archgraph-go-analyzer"))
        .arg("-o")
        .arg(&output)
        .arg(tmp.path())
        .status()
        .unwrap();
    assert!(status.success());

    let analysis: GoAnalysis = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(analysis.packages.len(), 5);
}

#[test]
fn test_binary_fails_without_go_mod() {
    let tmp = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_archgraph-go-analyzer"))
        .arg(tmp.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(!output.stderr.is_empty());
}

#[test]
fn test_graph_through_toolchain_runner() {
    let tmp = shop();
    let runner = ToolchainRunner::new(
        vec![ToolchainLocator::ConfiguredBinary(
            env!("CARGO_BIN_EXE_archgraph-go-analyzer").into(),
        )],
        Duration::from_secs(60),
    );
    let graph = build_graph(&GoParser::new(runner), tmp.path()).unwrap();

    assert_eq!(graph.node_count(), 5);
    assert_eq!(
        graph.dependencies_of("example.com/shop/internal/api"),
        vec!["example.com/shop/internal/orders"]
    );
    assert!(graph.is_entry_point("example.com/shop/cmd/server"));
    assert!(!graph.is_entry_point("example.com/shop/internal/store"));

    let orders = "example.com/shop/internal/orders";
    assert_eq!(
        graph.node_info(orders).and_then(|i| i.class_type.as_deref()),
        Some(StructuralRole::Controller.as_str())
    );
    let show = graph
        .method_info(orders)
        .iter()
        .find(|m| m.method_name == "Handler.Show")
        .unwrap();
    assert_eq!(show.http_method.as_deref(), Some("GET"));
    assert_eq!(show.http_path.as_deref(), Some("/orders/{id}"));
    assert_eq!(
        graph.method_parameters(orders, "NewHandler")[0].target,
        "example.com/shop/internal/store"
    );
}
