use std::env;
use std::fs::write;

use minio_init_core::contract::NoticeLevel;
use minio_init_core::error::ConfigError;
use minio_init_core::load_config::{
    discover_documents_with, load_document, load_document_with, DocumentSources,
};
use minio_init_core::memory::InMemoryCluster;
use minio_init_core::report::CollectingReporter;
use serial_test::serial;
use tempfile::{tempdir, NamedTempFile};

fn no_env(_: &str) -> Option<String> {
    None
}

fn fixed_env(name: &str) -> Option<String> {
    match name {
        "APP_SECRET" => Some("from-env".to_string()),
        "REGION" => Some("eu-central-1".to_string()),
        _ => None,
    }
}

/// This test ensures a missing document is reported as absent, not as an error.
#[test]
fn test_missing_document_is_absent() {
    let dir = tempdir().expect("temp dir");
    let loaded = load_document_with(dir.path().join("nope.json"), &no_env).expect("no error");
    assert!(loaded.is_none());
}

/// This test ensures placeholders are resolved before the document is returned.
#[test]
fn test_load_document_resolves_placeholders() {
    let file = NamedTempFile::new().expect("temp file");
    write(
        file.path(),
        r#"{"users": [{"access_key": "app", "secret_key": "${APP_SECRET}"}],
            "buckets": [{"name": "docs", "region": "${REGION}"}]}"#,
    )
    .unwrap();

    let doc = load_document_with(file.path(), &fixed_env)
        .expect("document should load")
        .expect("document exists");

    assert_eq!(doc["users"][0]["secret_key"], "from-env");
    assert_eq!(doc["buckets"][0]["region"], "eu-central-1");
}

/// This test ensures an unset variable fails the load, naming the variable,
/// and that nothing reaches the cluster.
#[test]
fn test_unresolved_placeholder_fails_before_any_call() {
    let file = NamedTempFile::new().expect("temp file");
    write(
        file.path(),
        r#"{"buckets": [{"name": "docs"}], "users": [{"access_key": "a", "secret_key": "${FOO}"}]}"#,
    )
    .unwrap();
    let cluster = InMemoryCluster::new();

    let err = load_document_with(file.path(), &no_env).unwrap_err();

    match err {
        ConfigError::UnresolvedPlaceholder { name, path } => {
            assert_eq!(name, "FOO");
            assert_eq!(path, file.path());
        }
        other => panic!("expected unresolved placeholder, got {other:?}"),
    }
    assert!(cluster.calls().is_empty());
}

/// This test ensures invalid JSON is reported as a malformed document.
#[test]
fn test_malformed_json_is_reported() {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), b"{\"buckets\": [").unwrap();

    let err = load_document_with(file.path(), &no_env).unwrap_err();
    assert!(matches!(err, ConfigError::MalformedDocument { .. }));
    assert!(err.to_string().contains("malformed config document"));
}

/// This test ensures the top level must be an object.
#[test]
fn test_top_level_array_is_malformed() {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), b"[1, 2, 3]").unwrap();

    let err = load_document_with(file.path(), &no_env).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("top-level value must be an object"), "got: {msg}");
}

/// This test ensures YAML documents are accepted by extension.
#[test]
fn test_yaml_document_is_parsed() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("init.yaml");
    write(
        &path,
        "buckets:\n  - name: docs\n    versioning: true\nusers:\n  - access_key: app\n    secret_key: \"${APP_SECRET}\"\n",
    )
    .unwrap();

    let doc = load_document_with(&path, &fixed_env)
        .expect("yaml should load")
        .expect("document exists");
    assert_eq!(doc["buckets"][0]["name"], "docs");
    assert_eq!(doc["buckets"][0]["versioning"], true);
    assert_eq!(doc["users"][0]["secret_key"], "from-env");
}

/// This test ensures the real process environment is used by default.
#[test]
#[serial]
fn test_load_document_reads_process_env() {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), r#"{"users": [{"access_key": "a", "secret_key": "${MINIO_INIT_TEST_SECRET}"}]}"#)
        .unwrap();

    env::set_var("MINIO_INIT_TEST_SECRET", "hunter2");
    let doc = load_document(file.path()).expect("loads").expect("exists");
    assert_eq!(doc["users"][0]["secret_key"], "hunter2");

    env::remove_var("MINIO_INIT_TEST_SECRET");
    let err = load_document(file.path()).unwrap_err();
    assert!(err.to_string().contains("MINIO_INIT_TEST_SECRET"));
}

fn sources_in(dir: &std::path::Path) -> DocumentSources {
    DocumentSources {
        default_path: dir.join("default.json"),
        user_override: None,
        fallback_user_path: dir.join("init.json"),
    }
}

/// This test ensures default then user documents are loaded, in that order.
#[test]
fn test_discovery_loads_default_then_fallback_user() {
    let dir = tempdir().expect("temp dir");
    let sources = sources_in(dir.path());
    write(&sources.default_path, r#"{"policies": []}"#).unwrap();
    write(&sources.fallback_user_path, r#"{"buckets": [{"name": "x"}]}"#).unwrap();

    let reporter = CollectingReporter::new();
    let docs = discover_documents_with(&sources, &reporter, &no_env).expect("discovery");

    let labels: Vec<_> = docs.iter().map(|d| d.label.as_str()).collect();
    assert_eq!(labels, ["default", "user"]);
    assert_eq!(docs[1].path, sources.fallback_user_path);
    assert!(reporter.notices(NoticeLevel::Warning).is_empty());
}

/// This test ensures the override path wins over the fallback path.
#[test]
fn test_discovery_prefers_override() {
    let dir = tempdir().expect("temp dir");
    let mut sources = sources_in(dir.path());
    let override_path = dir.path().join("custom.json");
    write(&override_path, r#"{"users": []}"#).unwrap();
    write(&sources.fallback_user_path, r#"{"buckets": []}"#).unwrap();
    sources.user_override = Some(override_path.clone());

    let reporter = CollectingReporter::new();
    let docs = discover_documents_with(&sources, &reporter, &no_env).expect("discovery");

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].label, "user");
    assert_eq!(docs[0].path, override_path);
    assert!(docs[0].document.contains_key("users"));
    let warnings = reporter.notices(NoticeLevel::Warning);
    assert!(warnings.iter().any(|w| w.contains("built-in default not found")));
}

/// This test ensures a missing override falls back with a warning.
#[test]
fn test_discovery_missing_override_falls_back() {
    let dir = tempdir().expect("temp dir");
    let mut sources = sources_in(dir.path());
    sources.user_override = Some(dir.path().join("missing.json"));
    write(&sources.fallback_user_path, r#"{"buckets": []}"#).unwrap();

    let reporter = CollectingReporter::new();
    let docs = discover_documents_with(&sources, &reporter, &no_env).expect("discovery");

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].path, sources.fallback_user_path);
    assert!(reporter
        .notices(NoticeLevel::Warning)
        .iter()
        .any(|w| w.contains("user config not found")));
}

/// This test ensures the default document is not loaded twice.
#[test]
fn test_discovery_skips_user_path_equal_to_default() {
    let dir = tempdir().expect("temp dir");
    let mut sources = sources_in(dir.path());
    write(&sources.default_path, r#"{}"#).unwrap();
    sources.user_override = Some(sources.default_path.clone());

    let reporter = CollectingReporter::new();
    let docs = discover_documents_with(&sources, &reporter, &no_env).expect("discovery");

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].label, "default");
}

/// This test ensures a bad user document fails discovery as a whole.
#[test]
fn test_discovery_propagates_errors() {
    let dir = tempdir().expect("temp dir");
    let sources = sources_in(dir.path());
    write(&sources.default_path, r#"{}"#).unwrap();
    write(&sources.fallback_user_path, r#"{"users": [{"secret_key": "${NOPE}"}]}"#).unwrap();

    let reporter = CollectingReporter::new();
    let err = discover_documents_with(&sources, &reporter, &no_env).unwrap_err();
    assert!(err.to_string().contains("'NOPE'"));
}
