//! Integration test: Promotion into staging and the single production slot

use kolosal_pipeline::config::ArtifactsConfig;
use kolosal_pipeline::error::PipelineError;
use kolosal_pipeline::promotion::{ArtifactStore, PromotionManager};
use std::fs;

fn store_with_trained(root: &std::path::Path, names: &[&str]) -> ArtifactStore {
    let store = ArtifactStore::new(&ArtifactsConfig {
        root: root.join("models"),
        ..ArtifactsConfig::default()
    });
    fs::create_dir_all(store.trained_dir()).unwrap();
    for name in names {
        fs::write(store.trained_path(name), format!("{{\"name\": \"{}\"}}", name)).unwrap();
    }
    store
}

fn file_names(store: &ArtifactStore, dir: &std::path::Path) -> Vec<String> {
    store
        .artifacts_in(dir)
        .unwrap()
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect()
}

#[test]
fn test_best_goes_to_production_rest_to_staging() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_trained(dir.path(), &["A", "B", "C"]);

    let report = PromotionManager::new(&store)
        .promote(&[(0.71, "A"), (0.94, "B"), (0.83, "C")])
        .unwrap();

    assert_eq!(report.production, "B");
    assert_eq!(report.staged, vec!["A", "C"]);
    assert_eq!(store.production().current_name().unwrap(), "B");
    assert_eq!(file_names(&store, store.staging_dir()), vec!["A.json", "C.json"]);
    assert_eq!(file_names(&store, store.trained_dir()), vec!["A.json", "B.json", "C.json"]);
}

#[test]
fn test_tie_goes_to_first_model() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_trained(dir.path(), &["A", "B"]);

    let report = PromotionManager::new(&store).promote(&[(0.9, "A"), (0.9, "B")]).unwrap();
    assert_eq!(report.production, "A");
}

#[test]
fn test_repromotion_keeps_one_production_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_trained(dir.path(), &["A", "B"]);
    let manager = PromotionManager::new(&store);

    manager.promote(&[(0.9, "A"), (0.5, "B")]).unwrap();
    manager.promote(&[(0.4, "A"), (0.8, "B")]).unwrap();

    assert_eq!(file_names(&store, store.production().dir()), vec!["B.json"]);
}

#[test]
fn test_new_winner_leaves_staging() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_trained(dir.path(), &["A", "B", "C"]);
    let manager = PromotionManager::new(&store);

    manager.promote(&[(0.71, "A"), (0.94, "B"), (0.83, "C")]).unwrap();
    assert_eq!(file_names(&store, store.staging_dir()), vec!["A.json", "C.json"]);

    let report = manager.promote(&[(0.99, "A"), (0.10, "B"), (0.83, "C")]).unwrap();
    assert_eq!(report.production, "A");
    assert_eq!(store.production().current_name().unwrap(), "A");
    assert_eq!(file_names(&store, store.staging_dir()), vec!["B.json", "C.json"]);
}

#[test]
fn test_missing_trained_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_trained(dir.path(), &["A"]);

    let result = PromotionManager::new(&store).promote(&[(0.9, "Z")]);
    assert!(matches!(result, Err(PipelineError::ArtifactNotFound(_))));
}
