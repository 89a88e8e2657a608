use std::fs;

use archgraph_core::config::StorageConfig;
use archgraph_core::{
    DependencyGraph, FileGraphStore, GraphCache, GraphStore, Language, ProjectRecord, StoreError,
};
use tempfile::TempDir;

fn create_test_store() -> (FileGraphStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = StorageConfig {
        data_dir: temp_dir.path().to_string_lossy().to_string(),
        ..StorageConfig::default()
    };
    (FileGraphStore::with_config(&config), temp_dir)
}

fn sample_graph() -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    graph.add_node("com.acme.UserController", "com/acme/UserController.java").unwrap();
    graph.add_node("com.acme.UserService", "com/acme/UserService.java").unwrap();
    graph.add_dependency("com.acme.UserController", "com.acme.UserService");
    graph.mark_as_entry_point("com.acme.UserController");
    graph
}

#[test]
fn test_save_and_load_project() {
    let (store, _temp) = create_test_store();

    let record = ProjectRecord::new("/work/acme", Language::Java)
        .unwrap()
        .with_graph(&sample_graph())
        .unwrap();
    store.save_project(&record).unwrap();

    let loaded = store.load_project(&record.id).unwrap();
    assert_eq!(loaded, record);
    assert_eq!(loaded.graph().unwrap(), Some(sample_graph()));
}

#[test]
fn test_list_only_projects_with_graph() {
    let (store, _temp) = create_test_store();

    let with_graph = ProjectRecord::new("/work/one", Language::Go)
        .unwrap()
        .with_graph(&sample_graph())
        .unwrap();
    let without_graph = ProjectRecord::new("/work/two", Language::TypeScript).unwrap();

    store.save_project(&with_graph).unwrap();
    store.save_project(&without_graph).unwrap();

    let listed = store.list_projects_with_graph().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, with_graph.id);
}

#[test]
fn test_delete_project() {
    let (store, _temp) = create_test_store();

    let record = ProjectRecord::new("/work/gone", Language::Java).unwrap();
    store.save_project(&record).unwrap();
    store.delete_project(&record.id).unwrap();

    assert!(matches!(
        store.load_project(&record.id),
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        store.delete_project(&record.id),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn test_empty_store_lists_nothing() {
    let (store, _temp) = create_test_store();
    assert!(store.list_projects_with_graph().unwrap().is_empty());
}

#[test]
fn test_cache_warm_skips_corrupted_graphs() {
    let (store, _temp) = create_test_store();

    let good = ProjectRecord::new("/work/good", Language::Java)
        .unwrap()
        .with_graph(&sample_graph())
        .unwrap();
    let mut bad = ProjectRecord::new("/work/bad", Language::Java).unwrap();
    bad.graph_json = Some("{ not json".to_string());

    store.save_project(&good).unwrap();
    store.save_project(&bad).unwrap();
    // An unreadable record file is ignored entirely
    fs::write(store.dir().join("garbage.json"), "???").unwrap();

    let cache = GraphCache::new();
    let summary = cache.warm_from_store(&store).unwrap();

    assert_eq!(summary.loaded, vec![good.id.clone()]);
    assert_eq!(summary.skipped, vec![bad.id.clone()]);
    assert_eq!(*cache.get(&good.id).unwrap(), sample_graph());
    assert!(cache.get(&bad.id).is_none());
}
