//! In-memory graphs shared with readers.
//!
//! Graphs are published whole: a reader holding an `Arc` keeps seeing the graph it got,
//! and never observes a partially built one.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use crate::graph::DependencyGraph;
use crate::store::{GraphStore, StoreError};

/// Outcome of [`GraphCache::warm_from_store`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WarmSummary {
    /// Project ids whose graph was loaded.
    pub loaded: Vec<String>,
    /// Project ids whose stored graph could not be deserialized.
    pub skipped: Vec<String>,
}

/// Project id → latest graph.
#[derive(Debug, Default)]
pub struct GraphCache {
    graphs: RwLock<HashMap<String, Arc<DependencyGraph>>>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the graph of a project.
    pub fn publish(&self, project_id: impl Into<String>, graph: DependencyGraph) -> Arc<DependencyGraph> {
        let graph = Arc::new(graph);
        self.graphs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(project_id.into(), Arc::clone(&graph));
        graph
    }

    pub fn get(&self, project_id: &str) -> Option<Arc<DependencyGraph>> {
        self.graphs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(project_id)
            .cloned()
    }

    pub fn remove(&self, project_id: &str) -> Option<Arc<DependencyGraph>> {
        self.graphs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(project_id)
    }

    pub fn project_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .graphs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.graphs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load every stored graph. Corrupted graphs are logged and skipped.
    pub fn warm_from_store(&self, store: &dyn GraphStore) -> Result<WarmSummary, StoreError> {
        let mut summary = WarmSummary::default();

        for record in store.list_projects_with_graph()? {
            match record.graph() {
                Ok(Some(graph)) => {
                    self.publish(record.id.clone(), graph);
                    summary.loaded.push(record.id);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(project = %record.id, error = %e, "Skipping corrupted stored graph");
                    summary.skipped.push(record.id);
                }
            }
        }

        info!(
            loaded = summary.loaded.len(),
            skipped = summary.skipped.len(),
            "Graph cache warmed"
        );
        Ok(summary)
    }
}
