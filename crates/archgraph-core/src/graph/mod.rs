//! Language-agnostic dependency graph.
//!
//! A [`DependencyGraph`] models the intra-project structure of one repository:
//!
//! - **Nodes**: identifier → relative source file, in first-seen order
//! - **Edges**: identifier → ordered set of identifiers it depends on
//! - **Entry points**: identifiers reachable from outside (HTTP handlers, listeners, `main`)
//! - **Method parameters**: which method parameters reference another known unit
//! - **Enrichment**: optional [`NodeInfo`] / [`MethodInfo`] metadata
//!
//! Edges and parameter links are only recorded when both endpoints are registered nodes.
//! Dependencies on anything outside the project are dropped silently; the graph only
//! describes the project itself.

mod document;
mod enrichment;
mod error;

pub use enrichment::{MethodInfo, NodeInfo};
pub use error::GraphError;

use std::collections::VecDeque;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use document::{GraphDocument, NodeEntry};

/// A method parameter that references another known unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterLink {
    /// Zero-based parameter position.
    pub position: usize,
    /// Identifier of the referenced unit.
    pub target: String,
}

/// Composite key of the method-parameter table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MethodKey {
    class_id: String,
    method: String,
}

impl MethodKey {
    fn new(class_id: &str, method: &str) -> Self {
        Self {
            class_id: class_id.to_string(),
            method: method.to_string(),
        }
    }
}

/// Directed dependency graph over source-unit identifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph {
    nodes: IndexMap<String, String>,
    edges: IndexMap<String, IndexSet<String>>,
    entry_points: IndexSet<String>,
    class_ids: IndexMap<String, i64>,
    method_parameters: IndexMap<MethodKey, Vec<ParameterLink>>,
    node_info: IndexMap<String, NodeInfo>,
    method_info: IndexMap<String, Vec<MethodInfo>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Register a node. A duplicate identifier overwrites the file but keeps its position.
    pub fn add_node(&mut self, id: &str, source_file: &str) -> Result<(), GraphError> {
        if id.trim().is_empty() {
            return Err(GraphError::validation("node identifier must not be blank"));
        }
        self.nodes.insert(id.to_string(), source_file.to_string());
        Ok(())
    }

    /// Record that `from` depends on `to`. No-op unless both are registered nodes.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        if !self.contains(from) || !self.contains(to) {
            return;
        }
        self.edges
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
    }

    /// Mark a node as externally reachable. No-op for unknown identifiers.
    pub fn mark_as_entry_point(&mut self, id: &str) {
        if self.contains(id) {
            self.entry_points.insert(id.to_string());
        }
    }

    /// Record that parameter `position` of `class_id::method` references `target_id`.
    ///
    /// A negative position or blank method name is rejected. Unknown identifiers are
    /// ignored.
    pub fn add_method_parameter(
        &mut self,
        class_id: &str,
        method: &str,
        position: i64,
        target_id: &str,
    ) -> Result<(), GraphError> {
        if position < 0 {
            return Err(GraphError::validation(format!(
                "parameter position must be >= 0, got {}",
                position
            )));
        }
        if method.trim().is_empty() {
            return Err(GraphError::validation("method name must not be blank"));
        }
        if !self.contains(class_id) || !self.contains(target_id) {
            return Ok(());
        }

        let link = ParameterLink {
            position: position as usize,
            target: target_id.to_string(),
        };
        let links = self
            .method_parameters
            .entry(MethodKey::new(class_id, method))
            .or_default();
        if !links.contains(&link) {
            links.push(link);
        }
        Ok(())
    }

    /// Bind the external persistence key of a stored node.
    pub fn bind_class_id(&mut self, id: &str, class_id: i64) {
        if self.contains(id) {
            self.class_ids.insert(id.to_string(), class_id);
        }
    }

    /// Attach node enrichment. Returns `false` for unknown identifiers.
    pub fn set_node_info(&mut self, id: &str, info: NodeInfo) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.node_info.insert(id.to_string(), info);
        true
    }

    /// Insert or replace the enrichment of one method.
    ///
    /// Methods match on name and declaration line, so overloads stay distinct. An update
    /// without a line replaces the first method of that name.
    pub fn upsert_method_info(&mut self, id: &str, info: MethodInfo) -> bool {
        if !self.contains(id) {
            return false;
        }
        let methods = self.method_info.entry(id.to_string()).or_default();
        let existing = methods.iter_mut().find(|m| {
            m.method_name == info.method_name
                && (info.line_number.is_none() || m.line_number == info.line_number)
        });
        match existing {
            Some(existing) => *existing = info,
            None => methods.push(info),
        }
        true
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Identifiers in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// `(identifier, source file)` pairs in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.nodes.iter().map(|(id, file)| (id.as_str(), file.as_str()))
    }

    pub fn source_file(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).map(String::as_str)
    }

    /// All edges as `(from, to)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges
            .iter()
            .flat_map(|(from, tos)| tos.iter().map(move |to| (from.as_str(), to.as_str())))
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(IndexSet::len).sum()
    }

    /// Outgoing neighbours.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.edges
            .get(id)
            .map(|tos| tos.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Incoming neighbours.
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, tos)| tos.contains(id))
            .map(|(from, _)| from.as_str())
            .collect()
    }

    /// Union of outgoing and incoming neighbours. Unknown identifiers yield an empty set.
    pub fn resolve(&self, id: &str) -> IndexSet<String> {
        let mut neighbours = IndexSet::new();
        if !self.contains(id) {
            return neighbours;
        }
        for to in self.dependencies_of(id) {
            neighbours.insert(to.to_string());
        }
        for from in self.dependents_of(id) {
            neighbours.insert(from.to_string());
        }
        neighbours
    }

    pub fn entry_points(&self) -> impl Iterator<Item = &str> {
        self.entry_points.iter().map(String::as_str)
    }

    pub fn is_entry_point(&self, id: &str) -> bool {
        self.entry_points.contains(id)
    }

    pub fn class_id(&self, id: &str) -> Option<i64> {
        self.class_ids.get(id).copied()
    }

    pub fn node_info(&self, id: &str) -> Option<&NodeInfo> {
        self.node_info.get(id)
    }

    pub fn method_info(&self, id: &str) -> &[MethodInfo] {
        self.method_info.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Parameter links of one method.
    pub fn method_parameters(&self, id: &str, method: &str) -> &[ParameterLink] {
        self.method_parameters
            .get(&MethodKey::new(id, method))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All parameter links of a node, grouped by method name.
    pub fn method_parameters_of(&self, id: &str) -> IndexMap<&str, &[ParameterLink]> {
        self.method_parameters
            .iter()
            .filter(|(key, _)| key.class_id == id)
            .map(|(key, links)| (key.method.as_str(), links.as_slice()))
            .collect()
    }

    /// Identifiers whose last `.`/`/` segment equals `name`, or that equal it outright.
    pub fn find_by_simple_name(&self, name: &str) -> Vec<&str> {
        self.node_ids()
            .filter(|id| *id == name || simple_name(id) == name)
            .collect()
    }

    /// A single breadth-first traversal seeded by all entry points, followed by unreached nodes.
    ///
    /// Every node appears exactly once. Entry points lead in insertion order;
    /// orphans keep their node insertion order.
    pub fn analysis_order(&self) -> Vec<String> {
        let mut visited: IndexSet<&str> = IndexSet::with_capacity(self.nodes.len());
        let mut queue: VecDeque<&str> = VecDeque::new();

        for entry in &self.entry_points {
            if visited.insert(entry.as_str()) {
                queue.push_back(entry.as_str());
            }
        }
        while let Some(current) = queue.pop_front() {
            if let Some(tos) = self.edges.get(current) {
                for to in tos {
                    if visited.insert(to.as_str()) {
                        queue.push_back(to.as_str());
                    }
                }
            }
        }

        for id in self.nodes.keys() {
            visited.insert(id.as_str());
        }

        visited.into_iter().map(str::to_string).collect()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.nodes.len(),
            edges: self.edge_count(),
            entry_points: self.entry_points.len(),
            methods: self.method_info.values().map(Vec::len).sum(),
            endpoints: self
                .method_info
                .values()
                .flatten()
                .filter(|m| m.is_endpoint())
                .count(),
            parameter_links: self.method_parameters.values().map(Vec::len).sum(),
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    pub fn to_json(&self) -> Result<String, GraphError> {
        serde_json::to_string(&self.to_document()).map_err(GraphError::Serialize)
    }

    pub fn to_json_pretty(&self) -> Result<String, GraphError> {
        serde_json::to_string_pretty(&self.to_document()).map_err(GraphError::Serialize)
    }

    /// Rebuild a graph from its persisted document.
    ///
    /// The document is replayed through the regular mutators, so anything violating the
    /// graph invariants (edges to unknown nodes, ...) is dropped.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let doc: GraphDocument = serde_json::from_str(json).map_err(GraphError::Deserialize)?;
        Self::from_document(doc)
    }

    fn to_document(&self) -> GraphDocument {
        let nodes = self
            .nodes
            .iter()
            .map(|(id, file)| {
                let entry = NodeEntry {
                    source_file: file.clone(),
                    class_id: self.class_ids.get(id).copied(),
                };
                (id.clone(), entry)
            })
            .collect();

        let edges = self
            .edges
            .iter()
            .map(|(from, tos)| (from.clone(), tos.iter().cloned().collect()))
            .collect();

        let mut method_parameters: IndexMap<String, IndexMap<String, Vec<ParameterLink>>> =
            IndexMap::new();
        for (key, links) in &self.method_parameters {
            method_parameters
                .entry(key.class_id.clone())
                .or_default()
                .insert(key.method.clone(), links.clone());
        }

        GraphDocument {
            nodes,
            edges,
            entry_points: self.entry_points.iter().cloned().collect(),
            method_parameters,
            node_info: self.node_info.clone(),
            method_info: self.method_info.clone(),
        }
    }

    fn from_document(doc: GraphDocument) -> Result<Self, GraphError> {
        let mut graph = DependencyGraph::new();

        for (id, entry) in &doc.nodes {
            graph.add_node(id, &entry.source_file)?;
            if let Some(class_id) = entry.class_id {
                graph.bind_class_id(id, class_id);
            }
        }
        for (from, tos) in &doc.edges {
            for to in tos {
                graph.add_dependency(from, to);
            }
        }
        for id in &doc.entry_points {
            graph.mark_as_entry_point(id);
        }
        for (id, methods) in &doc.method_parameters {
            for (method, links) in methods {
                for link in links {
                    graph.add_method_parameter(id, method, link.position as i64, &link.target)?;
                }
            }
        }
        for (id, info) in doc.node_info {
            graph.set_node_info(&id, info);
        }
        for (id, methods) in doc.method_info {
            if graph.contains(&id) {
                graph.method_info.entry(id).or_default().extend(methods);
            }
        }

        Ok(graph)
    }
}

/// Last `.` or `/` separated segment of an identifier.
pub fn simple_name(id: &str) -> &str {
    id.rsplit(&['.', '/'][..]).next().unwrap_or(id)
}

/// Summary counts of a graph.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub entry_points: usize,
    pub methods: usize,
    pub endpoints: usize,
    pub parameter_links: usize,
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Nodes:        {}", self.nodes)?;
        writeln!(f, "Edges:        {}", self.edges)?;
        writeln!(f, "Entry points: {}", self.entry_points)?;
        writeln!(f, "Methods:      {}", self.methods)?;
        writeln!(f, "Endpoints:    {}", self.endpoints)?;
        write!(f, "Param links:  {}", self.parameter_links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(ids: &[&str]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for id in ids {
            graph.add_node(id, &format!("{}.java", id)).unwrap();
        }
        graph
    }

    #[test]
    fn test_add_node_rejects_blank_id() {
        let mut graph = DependencyGraph::new();
        assert!(matches!(
            graph.add_node("  ", "a.java"),
            Err(GraphError::Validation(_))
        ));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_add_node_overwrites_file_keeps_order() {
        let mut graph = graph_with(&["a", "b"]);
        graph.add_node("a", "moved/a.java").unwrap();
        assert_eq!(graph.source_file("a"), Some("moved/a.java"));
        assert_eq!(graph.node_ids().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_dependency_requires_known_endpoints() {
        let mut graph = graph_with(&["a", "b"]);
        graph.add_dependency("a", "external");
        graph.add_dependency("external", "a");
        assert_eq!(graph.edge_count(), 0);

        graph.add_dependency("a", "b");
        graph.add_dependency("a", "b");
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_entry_point_requires_known_node() {
        let mut graph = graph_with(&["a"]);
        graph.mark_as_entry_point("ghost");
        graph.mark_as_entry_point("a");
        assert_eq!(graph.entry_points().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_method_parameter_validation() {
        let mut graph = graph_with(&["a", "b"]);
        assert!(matches!(
            graph.add_method_parameter("a", "run", -1, "b"),
            Err(GraphError::Validation(_))
        ));
        graph.add_method_parameter("a", "run", 0, "ghost").unwrap();
        assert!(graph.method_parameters("a", "run").is_empty());

        graph.add_method_parameter("a", "run", 1, "b").unwrap();
        graph.add_method_parameter("a", "run", 1, "b").unwrap();
        assert_eq!(
            graph.method_parameters("a", "run"),
            &[ParameterLink { position: 1, target: "b".to_string() }]
        );
    }

    #[test]
    fn test_resolve_isolated_and_self_edge() {
        let mut graph = graph_with(&["a", "b"]);
        assert!(graph.resolve("a").is_empty());
        assert!(graph.resolve("unknown").is_empty());

        graph.add_dependency("a", "a");
        let resolved = graph.resolve("a");
        assert_eq!(resolved.len(), 1);
        assert!(resolved.contains("a"));
    }

    #[test]
    fn test_resolve_unions_both_directions() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph.add_dependency("a", "b");
        graph.add_dependency("c", "a");
        let resolved = graph.resolve("a");
        assert!(resolved.contains("b"));
        assert!(resolved.contains("c"));
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn test_analysis_order_bfs_then_orphans() {
        let mut graph = graph_with(&["orphan", "svc", "repo", "ctrl", "listener"]);
        graph.add_dependency("ctrl", "svc");
        graph.add_dependency("svc", "repo");
        graph.add_dependency("repo", "svc");
        graph.add_dependency("listener", "repo");
        graph.mark_as_entry_point("ctrl");
        graph.mark_as_entry_point("listener");

        assert_eq!(
            graph.analysis_order(),
            vec!["ctrl", "listener", "svc", "repo", "orphan"]
        );
    }

    #[test]
    fn test_analysis_order_visits_entry_points_first() {
        let mut graph = graph_with(&["ctrl", "svc", "repo", "listener"]);
        graph.add_dependency("ctrl", "svc");
        graph.add_dependency("svc", "repo");
        graph.add_dependency("listener", "repo");
        graph.mark_as_entry_point("ctrl");
        graph.mark_as_entry_point("listener");

        assert_eq!(graph.analysis_order(), vec!["ctrl", "listener", "svc", "repo"]);
    }

    #[test]
    fn test_analysis_order_without_entry_points() {
        let graph = graph_with(&["x", "y"]);
        assert_eq!(graph.analysis_order(), vec!["x", "y"]);
    }

    #[test]
    fn test_json_round_trip() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph.add_dependency("a", "b");
        graph.add_dependency("b", "c");
        graph.mark_as_entry_point("a");
        graph.bind_class_id("b", 42);
        graph.add_method_parameter("a", "handle", 0, "c").unwrap();
        graph.set_node_info("a", NodeInfo::with_class_type("controller"));
        let mut method = MethodInfo::new("handle");
        method.http_method = Some("GET".to_string());
        method.http_path = Some("/a".to_string());
        method.line_number = Some(12);
        graph.upsert_method_info("a", method);

        let json = graph.to_json().unwrap();
        let restored = DependencyGraph::from_json(&json).unwrap();
        assert_eq!(restored, graph);
        assert_eq!(restored.class_id("b"), Some(42));
    }

    #[test]
    fn test_json_omits_absent_optionals() {
        let mut graph = graph_with(&["a"]);
        graph.upsert_method_info("a", MethodInfo::new("run"));
        let json = graph.to_json().unwrap();
        assert!(!json.contains("null"));
        assert!(!json.contains("classId"));
        assert!(json.contains("\"sourceFile\""));
        assert!(json.contains("\"methodName\":\"run\""));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            DependencyGraph::from_json("{not json"),
            Err(GraphError::Deserialize(_))
        ));
        assert!(matches!(
            DependencyGraph::from_json("{}"),
            Err(GraphError::Deserialize(_))
        ));
        assert!(matches!(
            DependencyGraph::from_json("[]"),
            Err(GraphError::Deserialize(_))
        ));
    }

    #[test]
    fn test_upsert_method_info_replaces_by_name() {
        let mut graph = graph_with(&["a"]);
        graph.upsert_method_info("a", MethodInfo::new("run"));
        let mut enriched = MethodInfo::new("run");
        enriched.description = Some("Runs the job".to_string());
        graph.upsert_method_info("a", enriched);
        assert_eq!(graph.method_info("a").len(), 1);
        assert_eq!(
            graph.method_info("a")[0].description.as_deref(),
            Some("Runs the job")
        );
    }

    #[test]
    fn test_overloads_keep_separate_method_info() {
        let mut graph = graph_with(&["a"]);
        let mut first = MethodInfo::new("save");
        first.line_number = Some(10);
        let mut second = MethodInfo::new("save");
        second.line_number = Some(20);
        graph.upsert_method_info("a", first);
        graph.upsert_method_info("a", second);
        assert_eq!(graph.method_info("a").len(), 2);

        let mut described = MethodInfo::new("save");
        described.line_number = Some(20);
        described.description = Some("Saves a batch".to_string());
        graph.upsert_method_info("a", described);
        assert_eq!(graph.method_info("a").len(), 2);
        assert_eq!(graph.method_info("a")[1].description.as_deref(), Some("Saves a batch"));

        let restored = DependencyGraph::from_json(&graph.to_json().unwrap()).unwrap();
        assert_eq!(restored, graph);
    }

    #[test]
    fn test_round_trip_keeps_duplicate_method_names() {
        let json = r#"{"nodes":{"a":{"sourceFile":"a.java"}},"edges":{},"entryPoints":[],
            "methodParameters":{},"nodeInfo":{},
            "methodInfo":{"a":[{"methodName":"run"},{"methodName":"run"}]}}"#;
        let graph = DependencyGraph::from_json(json).unwrap();
        assert_eq!(graph.method_info("a").len(), 2);
    }

    #[test]
    fn test_find_by_simple_name() {
        let graph = graph_with(&["com.acme.UserService", "src/users/user.service"]);
        assert_eq!(
            graph.find_by_simple_name("UserService"),
            vec!["com.acme.UserService"]
        );
        assert_eq!(
            graph.find_by_simple_name("user.service"),
            Vec::<&str>::new()
        );
        assert_eq!(graph.find_by_simple_name("service"), vec!["src/users/user.service"]);
    }
}
