use rusqlite::Connection;
use simplegraph::{GraphConfig, GraphLocation, SimpleGraph, SimpleGraphError};
use tempfile::tempdir;

fn table_count(conn: &Connection, kind: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type=?1 AND name NOT LIKE 'sqlite_%'",
        [kind],
        |row| row.get(0),
    )
    .expect("count")
}

#[test]
fn test_initialize_creates_regular_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("apple.sqlite");
    SimpleGraph::initialize(&path, GraphConfig::default()).expect("initialize");
    let meta = std::fs::metadata(&path).expect("metadata");
    assert!(meta.is_file());
}

#[test]
fn test_initialize_twice_is_noop() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("apple.sqlite");
    let graph = SimpleGraph::initialize(&path, GraphConfig::default()).expect("first");
    graph
        .upsert_node("1", serde_json::Map::new())
        .expect("node");
    SimpleGraph::initialize(&path, GraphConfig::default()).expect("second");

    let conn = Connection::open(&path).expect("conn");
    assert_eq!(table_count(&conn, "table"), 2);
    assert_eq!(table_count(&conn, "index"), 2);
    assert_eq!(graph.node_count().expect("count"), 1);
}

#[test]
fn test_dir_and_file_location() {
    let dir = tempdir().expect("tempdir");
    let location = GraphLocation::dir(dir.path(), "apple.sqlite");
    let graph = SimpleGraph::initialize(location, GraphConfig::default()).expect("initialize");
    assert_eq!(graph.path(), dir.path().join("apple.sqlite"));
    assert!(graph.path().exists());
}

#[test]
fn test_missing_parent_directory_is_connection_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("missing").join("apple.sqlite");
    let err = SimpleGraph::initialize(&path, GraphConfig::default()).expect_err("no parent");
    assert!(matches!(err, SimpleGraphError::ConnectionError(_)));
}

#[test]
fn test_open_does_not_create_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("absent.sqlite");
    let graph = SimpleGraph::open(&path, GraphConfig::default());
    let err = graph.find_node("1").expect_err("missing file");
    assert!(matches!(err, SimpleGraphError::ConnectionError(_)));
    assert!(!path.exists());
}
