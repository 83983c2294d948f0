//! Integration tests for keepsimple CLI commands.
//!
//! Uses tempfile for the databases and the repository's own templates and
//! seed document.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use keepsimple::AppError;
use keepsimple::cli::{cmd_init, cmd_render, cmd_routes};
use keepsimple::keepsimple_core::{CmsError, ContentStore, RedbStore};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn repo_path(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..").join(relative)
}

fn seed_path() -> PathBuf {
    repo_path("data/seed.json")
}

fn templates_path() -> PathBuf {
    repo_path("templates")
}

/// A database initialized from the sample seed.
fn seeded_db(dir: &TempDir) -> PathBuf {
    let db_path = dir.path().join("site.redb");
    cmd_init(&db_path, Some(&seed_path()), false).unwrap();
    db_path
}

// =============================================================================
// INIT-DB COMMAND TESTS
// =============================================================================

#[test]
fn test_init_creates_database_with_default_types() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("site.redb");

    let summary = cmd_init(&db_path, None, false).unwrap();
    assert!(db_path.exists());
    assert_eq!(summary.value_types, 2);
    assert_eq!(summary.nodes, 0);

    let store = RedbStore::open(&db_path).unwrap();
    let names: Vec<_> = store
        .value_types()
        .unwrap()
        .into_iter()
        .map(|vt| vt.name)
        .collect();
    assert_eq!(names, vec!["text", "node"]);
}

#[test]
fn test_init_applies_seed() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("site.redb");

    let summary = cmd_init(&db_path, Some(&seed_path()), false).unwrap();
    assert_eq!(summary.routes, 2);
    assert_eq!(summary.nodes, 7);

    let store = RedbStore::open(&db_path).unwrap();
    assert!(store.node_by_name("Home").unwrap().is_some());
    assert_eq!(store.route("home").unwrap().unwrap().view, "Home");
}

#[test]
fn test_init_fails_if_exists_without_force() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("site.redb");

    cmd_init(&db_path, None, false).unwrap();

    let result = cmd_init(&db_path, None, false);
    assert!(matches!(result, Err(AppError::DatabaseExists(_))));
}

#[test]
fn test_init_force_replaces_database() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp);

    cmd_init(&db_path, None, true).unwrap();

    let store = RedbStore::open(&db_path).unwrap();
    assert!(store.routes().unwrap().is_empty());
}

#[test]
fn test_init_rejects_malformed_seed() {
    let temp = create_temp_dir();
    let seed = temp.path().join("seed.json");
    std::fs::write(&seed, "{ not json").unwrap();

    let result = cmd_init(&temp.path().join("site.redb"), Some(&seed), false);
    assert!(matches!(result, Err(AppError::Json(_))));
}

#[test]
fn test_init_force_keeps_database_when_seed_is_malformed() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp);
    let seed = temp.path().join("seed.json");
    std::fs::write(&seed, "{ not json").unwrap();

    let result = cmd_init(&db_path, Some(&seed), true);
    assert!(matches!(result, Err(AppError::Json(_))));

    let store = RedbStore::open(&db_path).unwrap();
    assert_eq!(store.routes().unwrap().len(), 2);
}

#[test]
fn test_init_force_keeps_database_when_seed_is_rejected() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp);
    let seed = temp.path().join("seed.json");
    std::fs::write(
        &seed,
        r#"{ "routes": [{ "name": "about", "pattern": "/about", "view": "About" }] }"#,
    )
    .unwrap();

    let result = cmd_init(&db_path, Some(&seed), true);
    assert!(matches!(result, Err(AppError::Cms(CmsError::Seed(_)))));

    let store = RedbStore::open(&db_path).unwrap();
    assert!(store.node_by_name("Home").unwrap().is_some());
    assert_eq!(store.routes().unwrap().len(), 2);
}

#[test]
fn test_failed_init_leaves_no_database() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("site.redb");
    let seed = temp.path().join("seed.json");
    std::fs::write(
        &seed,
        r#"{
            "nodes": [{ "name": "Home", "type": "View",
                        "values": [{ "key": "body", "value": "x", "type": "markdown" }] }]
        }"#,
    )
    .unwrap();

    assert!(cmd_init(&db_path, Some(&seed), false).is_err());
    assert!(!db_path.exists());
    let leftovers: Vec<_> = std::fs::read_dir(temp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .filter(|name| name != "seed.json")
        .collect();
    assert!(leftovers.is_empty(), "unexpected files: {leftovers:?}");

    // Without a leftover file the next attempt needs no --force.
    cmd_init(&db_path, Some(&seed_path()), false).unwrap();
    assert!(db_path.exists());
}

// =============================================================================
// ROUTES COMMAND TESTS
// =============================================================================

#[test]
fn test_routes_lists_table() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp);

    let listing = cmd_routes(&db_path, false).unwrap();
    assert!(listing.contains("home"));
    assert!(listing.contains("/sample/{slug}"));
}

#[test]
fn test_routes_json() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp);

    let json = cmd_routes(&db_path, true).unwrap();
    let routes: serde_json::Value = serde_json::from_str(&json).unwrap();
    let routes = routes.as_array().unwrap();
    assert_eq!(routes.len(), 2);
    assert_eq!(routes[0]["name"], "home");
    assert_eq!(routes[0]["view"], "Home");
}

#[test]
fn test_routes_missing_database() {
    let temp = create_temp_dir();
    let result = cmd_routes(&temp.path().join("absent.redb"), false);
    assert!(matches!(result, Err(AppError::DatabaseMissing(_))));
}

// =============================================================================
// RENDER COMMAND TESTS
// =============================================================================

#[test]
fn test_render_home_scope() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp);

    let json = cmd_render(&db_path, &templates_path(), "Home", true).unwrap();
    let scope: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(scope["page_title"], "Sample title");
    assert_eq!(scope["foo"], "bar");
    assert_eq!(scope["layout"], "layouts/default.html");
    assert_eq!(scope["header"]["name"], "Header");
    assert_eq!(scope["items"].as_array().unwrap().len(), 2);
    assert!(scope.get("__header").is_none());
}

#[test]
fn test_render_home_html() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp);

    let html = cmd_render(&db_path, &templates_path(), "Home", false).unwrap();

    assert!(html.contains("<title>Sample title</title>"));
    assert!(html.contains("foo is bar"));
    assert!(html.contains("<!--\nname: Header\ntemplate: nodes/header.html\n-->"));
    assert!(html.contains("<article>First item</article>"));
    assert!(html.contains("<article>Second item</article>"));
    assert!(html.contains("<p>Welcome.</p>"));
    assert!(html.contains("href=\"/backoffice\""));
}

#[test]
fn test_render_custom_node_behavior() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp);

    let html = cmd_render(&db_path, &templates_path(), "Sample", false).unwrap();
    assert!(html.contains("<div class=\"sample\">bar2</div>"));
}

#[test]
fn test_render_unknown_view() {
    let temp = create_temp_dir();
    let db_path = seeded_db(&temp);

    let result = cmd_render(&db_path, &templates_path(), "Nowhere", false);
    assert!(matches!(
        result,
        Err(AppError::Cms(CmsError::NodeNotFound(name))) if name == "Nowhere"
    ));
}
