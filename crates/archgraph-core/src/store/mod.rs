//! Persistence of analysed projects and their graphs.

mod error;
mod file;

pub use error::StoreError;
pub use file::FileGraphStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::graph::{DependencyGraph, GraphError};
use crate::parser::Language;

/// Length of a project id, in hex characters.
const PROJECT_ID_LEN: usize = 16;

/// Trait for project storage backends.
pub trait GraphStore {
    /// Saves a project, replacing any record with the same id.
    fn save_project(&self, record: &ProjectRecord) -> Result<(), StoreError>;

    /// Loads a project by id.
    fn load_project(&self, id: &str) -> Result<ProjectRecord, StoreError>;

    /// Lists the projects that carry a graph, most recently analysed first.
    fn list_projects_with_graph(&self) -> Result<Vec<ProjectRecord>, StoreError>;

    /// Deletes a project.
    fn delete_project(&self, id: &str) -> Result<(), StoreError>;
}

/// An analysed repository and its serialized graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    /// Repository location the project was analysed from.
    pub repository: String,
    pub language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_json: Option<String>,
    /// Hex SHA-256 of `graph_json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_sha256: Option<String>,
    pub analyzed_at: DateTime<Utc>,
    /// Identifier of the analysis run that produced the graph.
    pub run_id: Uuid,
}

impl ProjectRecord {
    /// A record without a graph.
    pub fn new(repository: &str, language: Language) -> Result<Self, StoreError> {
        let repository = normalize_repository(repository)?;
        let name = repository
            .rsplit(['/', '\\'])
            .find(|s| !s.is_empty())
            .unwrap_or(&repository)
            .trim_end_matches(".git")
            .to_string();

        Ok(Self {
            id: project_id(&repository)?,
            name,
            repository,
            language,
            graph_json: None,
            graph_sha256: None,
            analyzed_at: Utc::now(),
            run_id: Uuid::new_v4(),
        })
    }

    /// Attach a freshly built graph, stamping a new run.
    pub fn with_graph(mut self, graph: &DependencyGraph) -> Result<Self, StoreError> {
        let json = graph.to_json()?;
        self.graph_sha256 = Some(content_digest(&json));
        self.graph_json = Some(json);
        self.analyzed_at = Utc::now();
        self.run_id = Uuid::new_v4();
        Ok(self)
    }

    /// Deserialize the stored graph, checking it against its digest.
    pub fn graph(&self) -> Result<Option<DependencyGraph>, StoreError> {
        let Some(json) = &self.graph_json else {
            return Ok(None);
        };
        if let Some(expected) = &self.graph_sha256 {
            if content_digest(json) != *expected {
                return Err(StoreError::Graph(GraphError::validation(format!(
                    "digest mismatch for project {}",
                    self.id
                ))));
            }
        }
        Ok(Some(DependencyGraph::from_json(json)?))
    }
}

fn normalize_repository(repository: &str) -> Result<String, StoreError> {
    let trimmed = repository.trim().trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        return Err(StoreError::InvalidRepository(repository.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Stable project id derived from a repository location.
pub fn project_id(repository: &str) -> Result<String, StoreError> {
    let repository = normalize_repository(repository)?;
    let mut digest = content_digest(&repository);
    digest.truncate(PROJECT_ID_LEN);
    Ok(digest)
}

/// Compute SHA256 hash of content.
pub fn content_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_id_is_stable() {
        let a = project_id("/work/shop").unwrap();
        assert_eq!(a.len(), 16);
        assert_eq!(a, project_id("  /work/shop/ ").unwrap());
        assert_ne!(a, project_id("/work/other").unwrap());
    }

    #[test]
    fn test_blank_repository_rejected() {
        assert!(matches!(
            project_id("   "),
            Err(StoreError::InvalidRepository(_))
        ));
        assert!(matches!(
            ProjectRecord::new("/", Language::Go),
            Err(StoreError::InvalidRepository(_))
        ));
    }

    #[test]
    fn test_record_name_and_graph() {
        let mut graph = DependencyGraph::new();
        graph.add_node("a", "a.go").unwrap();

        let record = ProjectRecord::new("https://github.com/acme/shop.git", Language::Go)
            .unwrap()
            .with_graph(&graph)
            .unwrap();
        assert_eq!(record.name, "shop");
        assert_eq!(record.graph().unwrap(), Some(graph));

        let mut tampered = record.clone();
        tampered.graph_json = Some(r#"{"nodes":{}}"#.to_string());
        assert!(matches!(tampered.graph(), Err(StoreError::Graph(_))));
    }
}
