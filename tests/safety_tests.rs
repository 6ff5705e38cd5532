use rusqlite::{Connection, params};
use serde_json::json;
use simplegraph::{GraphConfig, IntegrityReport, SimpleGraph};
use tempfile::{TempDir, tempdir};

fn small_graph() -> (TempDir, SimpleGraph) {
    let dir = tempdir().expect("tempdir");
    let graph = SimpleGraph::initialize(dir.path().join("safety.sqlite"), GraphConfig::default())
        .expect("graph");
    for id in ["a", "b"] {
        graph
            .add_node(json!({"name": id}).as_object().cloned().expect("object"), Some(id))
            .expect("node");
    }
    graph.connect_nodes("a", "b", None).expect("edge");
    (dir, graph)
}

fn raw_insert(dir: &TempDir, id: &str, body: &str) {
    let conn = Connection::open(dir.path().join("safety.sqlite")).expect("conn");
    conn.execute(
        "INSERT INTO nodes(id, body) VALUES(?1, ?2)",
        params![id, body],
    )
    .expect("raw insert");
}

#[test]
fn test_clean_graph_reports_no_issues() {
    let (_dir, graph) = small_graph();
    let report = graph.check_integrity().expect("clean");
    assert_eq!(
        report,
        IntegrityReport {
            total_nodes: 2,
            total_edges: 1,
            ..IntegrityReport::default()
        }
    );
}

#[test]
fn test_orphan_edges_are_counted() {
    let (dir, graph) = small_graph();
    let conn = Connection::open(dir.path().join("safety.sqlite")).expect("conn");
    conn.execute(
        "INSERT INTO edges(source, target) VALUES(?1, ?2)",
        params!["a", "ghost"],
    )
    .expect("unchecked edge");
    let err = graph.check_integrity().expect_err("orphan");
    assert_eq!(err.report.orphan_edges, 1);
    assert!(err.to_string().contains("1 orphan edges"));
}

#[test]
fn test_malformed_bodies_and_id_mismatches() {
    let (dir, graph) = small_graph();
    raw_insert(&dir, "broken", "{\"name\": ");
    raw_insert(&dir, "list", "[1, 2]");
    raw_insert(&dir, "drifted", r#"{"id": "other", "name": "x"}"#);
    raw_insert(&dir, "bare", r#"{"name": "y"}"#);
    raw_insert(&dir, "7", r#"{"id": 7}"#);

    let report = graph.integrity_report().expect("report");
    assert_eq!(report.total_nodes, 7);
    assert_eq!(report.malformed_bodies, 2);
    assert_eq!(report.id_mismatches, 2);
    assert_eq!(report.orphan_edges, 0);
    assert!(report.has_issues());
}
