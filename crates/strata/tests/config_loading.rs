//! Layered configuration loading

use std::fs;

use strata::{config::ConfigLoader, StrataError};
use tempfile::TempDir;

#[test]
fn test_file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("strata.toml");
    fs::write(
        &path,
        r#"
[embedding]
url = "http://embedder:9000"
dimension = 768

[qdrant]
collection_name = "lectures"

[retrieval]
title_threshold = 0.7
top_k = 3
"#,
    )
    .unwrap();

    let config = ConfigLoader::new()
        .without_global()
        .with_env_prefix("STRATA_TEST_FILE")
        .with_path(&path)
        .load()
        .unwrap();

    assert_eq!(config.embedding.url, "http://embedder:9000");
    assert_eq!(config.embedding.dimension, 768);
    assert_eq!(config.qdrant.collection_name, "lectures");
    assert_eq!(config.qdrant.uri, "http://localhost:6334");
    assert_eq!(config.retrieval.top_k, 3);
    assert!((config.retrieval.thresholds().title - 0.7).abs() < 1e-6);
    assert!((config.retrieval.thresholds().filename - 0.60).abs() < 1e-6);
}

#[test]
fn test_environment_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("strata.toml");
    fs::write(&path, "[index]\nbatch_size = 16\n").unwrap();

    std::env::set_var("STRATA_ENVTEST__INDEX__BATCH_SIZE", "8");
    std::env::set_var("STRATA_ENVTEST__CHUNKING__MODEL", "qwen2.5");
    let config = ConfigLoader::new()
        .without_global()
        .with_env_prefix("STRATA_ENVTEST")
        .with_path(&path)
        .load();
    std::env::remove_var("STRATA_ENVTEST__INDEX__BATCH_SIZE");
    std::env::remove_var("STRATA_ENVTEST__CHUNKING__MODEL");

    let config = config.unwrap();
    assert_eq!(config.index.batch_size, 8);
    assert_eq!(config.chunking.model, "qwen2.5");
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = ConfigLoader::new()
        .without_global()
        .with_env_prefix("STRATA_TEST_MISSING")
        .with_path(dir.path().join("absent.toml"))
        .load();
    assert!(matches!(result, Err(StrataError::Config(_))));
}

#[test]
fn test_invalid_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("strata.toml");
    fs::write(&path, "[retrieval]\ncontent_threshold = 1.5\n").unwrap();

    let result = ConfigLoader::new()
        .without_global()
        .with_env_prefix("STRATA_TEST_INVALID")
        .with_path(&path)
        .load();
    assert!(matches!(result, Err(StrataError::Validation(_))));
}

#[test]
fn test_rendered_config_loads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("strata.toml");
    fs::write(&path, "[chunking]\ncheckpoint_every = 5\n").unwrap();
    let config = ConfigLoader::new()
        .without_global()
        .with_env_prefix("STRATA_TEST_ROUNDTRIP")
        .with_path(&path)
        .load()
        .unwrap();

    let rendered = toml::to_string_pretty(&config).unwrap();
    let copy = dir.path().join("copy.toml");
    fs::write(&copy, rendered).unwrap();
    let reloaded = ConfigLoader::new()
        .without_global()
        .with_env_prefix("STRATA_TEST_ROUNDTRIP")
        .with_path(&copy)
        .load()
        .unwrap();
    assert_eq!(reloaded, config);
}
