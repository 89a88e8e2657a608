use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::StorageConfig;

use super::error::StoreError;
use super::{GraphStore, ProjectRecord};

/// File-based store.
///
/// ```text
/// .archgraph/projects/
///   {project-id}.json      # ProjectRecord, graph embedded
/// ```
pub struct FileGraphStore {
    dir: PathBuf,
}

impl FileGraphStore {
    /// Creates a store rooted at an explicit directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates a store from configuration.
    pub fn with_config(config: &StorageConfig) -> Self {
        Self::new(config.projects_path())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn project_file(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        }
        Ok(())
    }
}

impl GraphStore for FileGraphStore {
    fn save_project(&self, record: &ProjectRecord) -> Result<(), StoreError> {
        self.ensure_dir()?;

        let path = self.project_file(&record.id);
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json).map_err(|e| StoreError::io(&path, e))?;

        Ok(())
    }

    fn load_project(&self, id: &str) -> Result<ProjectRecord, StoreError> {
        let path = self.project_file(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let json = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        Ok(serde_json::from_str(&json)?)
    }

    fn list_projects_with_graph(&self) -> Result<Vec<ProjectRecord>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load_project(id) {
                Ok(record) if record.graph_json.is_some() => records.push(record),
                Ok(_) => {}
                Err(e) => warn!(file = %path.display(), error = %e, "Skipping unreadable project record"),
            }
        }

        // Most recent first
        records.sort_by(|a, b| b.analyzed_at.cmp(&a.analyzed_at));

        Ok(records)
    }

    fn delete_project(&self, id: &str) -> Result<(), StoreError> {
        let path = self.project_file(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))
    }
}
