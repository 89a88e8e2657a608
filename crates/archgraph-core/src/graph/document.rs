//! Persisted JSON shape of a dependency graph.
//!
//! ```text
//! {
//!   "nodes":            { id: { "sourceFile": path, "classId"?: n } },
//!   "edges":            { id: [id, ...] },
//!   "entryPoints":      [id, ...],
//!   "methodParameters": { id: { method: [{ "position": n, "target": id }] } },
//!   "nodeInfo":         { id: { "classType"?: s, "description"?: s } },
//!   "methodInfo":       { id: [{ "methodName": s, ... }] }
//! }
//! ```
//!
//! `nodes` is mandatory; everything else defaults to empty.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::enrichment::{MethodInfo, NodeInfo};
use super::ParameterLink;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphDocument {
    pub nodes: IndexMap<String, NodeEntry>,

    #[serde(default)]
    pub edges: IndexMap<String, Vec<String>>,

    #[serde(default)]
    pub entry_points: Vec<String>,

    #[serde(default)]
    pub method_parameters: IndexMap<String, IndexMap<String, Vec<ParameterLink>>>,

    #[serde(default)]
    pub node_info: IndexMap<String, NodeInfo>,

    #[serde(default)]
    pub method_info: IndexMap<String, Vec<MethodInfo>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NodeEntry {
    pub source_file: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<i64>,
}
