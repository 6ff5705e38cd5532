use serde_json::{Value, json};
use simplegraph::{
    AttributeBag, DiagramFormat, Direction, ExportOptions, GraphConfig, Selection, SimpleGraph,
    render,
};
use tempfile::{TempDir, tempdir};

fn bag(value: Value) -> AttributeBag {
    value.as_object().cloned().expect("object")
}

fn apple() -> (TempDir, SimpleGraph) {
    let dir = tempdir().expect("tempdir");
    let graph = SimpleGraph::initialize(dir.path().join("apple.sqlite"), GraphConfig::default())
        .expect("graph");
    let nodes = [
        ("1", json!({"name": "Apple Computer Company", "type": ["company", "start-up"]})),
        ("4", json!({"name": "Ronald Wayne", "type": ["person", "founder"]})),
        ("5", json!({"name": "Mike Markkula", "type": ["person", "investor"]})),
    ];
    for (id, body) in nodes {
        graph.add_node(bag(body), Some(id)).expect("node");
    }
    let edges = [
        ("1", "4", json!({"action": "divested", "amount": 800})),
        ("4", "1", json!({"action": "founded"})),
        ("5", "1", json!({"action": "invested"})),
    ];
    for (source, target, props) in edges {
        graph
            .connect_nodes(source, target, Some(bag(props)))
            .expect("edge");
    }
    (dir, graph)
}

#[test]
fn test_selection_keeps_edges_between_selected_nodes() {
    let (_dir, graph) = apple();
    let selection = graph.selection(&["4", "1"]).expect("selection");
    let ids: Vec<&str> = selection.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["4", "1"]);
    let pairs: Vec<(&str, &str)> = selection
        .edges
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .collect();
    assert_eq!(pairs, vec![("4", "1"), ("1", "4")]);
}

#[test]
fn test_selection_skips_unknown_and_repeated_ids() {
    let (_dir, graph) = apple();
    let selection = graph.selection(&["5", "nobody", "5"]).expect("selection");
    assert_eq!(selection.nodes.len(), 1);
    assert!(selection.edges.is_empty());
}

#[test]
fn test_dot_export_of_selection() {
    let (_dir, graph) = apple();
    let selection = graph.selection(&["4", "1", "5"]).expect("selection");
    let options = ExportOptions {
        exclude_node_keys: vec!["type".into()],
        hide_edge_key: true,
        format: DiagramFormat::Dot,
    };
    let dot = render(&selection, &options);
    assert!(dot.starts_with("digraph {\n"));
    assert!(dot.ends_with("}\n"));
    assert!(dot.contains("\t\"5\" [label=\"name: Mike Markkula\\lid: 5\\l\"];"));
    assert!(dot.contains("\t\"1\" -> \"4\" [label=\"divested\\n800\"];"));
    assert!(dot.contains("\t\"5\" -> \"1\" [label=\"invested\"];"));
    assert!(!dot.contains("person"));
}

#[test]
fn test_mermaid_export_of_walk() {
    let (_dir, graph) = apple();
    let rows = graph
        .traverse_with_bodies("5", None, Direction::Outbound)
        .expect("walk");
    let selection = Selection::from_rows(&rows);
    assert_eq!(selection.nodes.len(), 3);
    let options = ExportOptions {
        format: DiagramFormat::Mermaid,
        ..ExportOptions::default()
    };
    let text = render(&selection, &options);
    assert!(text.starts_with("flowchart LR\n"));
    assert!(text.contains("n0 -->|\"action: invested\"| n1"));
    assert!(text.contains("n1 -->|\"action: divested<br/>amount: 800\"| n2"));
}

fn two_founders() -> (TempDir, SimpleGraph) {
    let dir = tempdir().expect("tempdir");
    let graph = SimpleGraph::initialize(dir.path().join("founders.sqlite"), GraphConfig::default())
        .expect("graph");
    for id in ["0", "1", "2", "3"] {
        graph.add_node(bag(json!({"name": id})), Some(id)).expect("node");
    }
    let founded = || Some(bag(json!({"action": "founded"})));
    graph.connect_nodes("0", "2", None).expect("edge");
    graph.connect_nodes("0", "3", None).expect("edge");
    graph.connect_nodes("2", "1", founded()).expect("edge");
    graph.connect_nodes("3", "1", founded()).expect("edge");
    (dir, graph)
}

fn sorted_pairs(selection: &Selection) -> Vec<(&str, &str)> {
    let mut pairs: Vec<(&str, &str)> = selection
        .edges
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .collect();
    pairs.sort();
    pairs
}

#[test]
fn test_walk_selection_keeps_edges_with_equal_properties() {
    let (_dir, graph) = two_founders();
    let selection = graph
        .walk_selection("0", None, Direction::Outbound)
        .expect("walk");
    let ids: Vec<&str> = selection.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["0", "2", "3", "1"]);
    assert_eq!(
        sorted_pairs(&selection),
        vec![("0", "2"), ("0", "3"), ("2", "1"), ("3", "1")]
    );
    let dot = render(&selection, &ExportOptions::default());
    assert_eq!(dot.matches(" -> ").count(), 4);
}

#[test]
fn test_walk_selection_stops_at_target() {
    let (_dir, graph) = two_founders();
    let selection = graph
        .walk_selection("0", Some("2"), Direction::Outbound)
        .expect("walk");
    assert_eq!(selection.nodes.len(), 2);
    assert_eq!(sorted_pairs(&selection), vec![("0", "2"), ("0", "3")]);
}

#[test]
fn test_rows_of_both_directions_draw_each_edge_once() {
    let (_dir, graph) = two_founders();
    let rows = graph
        .traverse_with_bodies("0", None, Direction::Both)
        .expect("walk");
    let selection = Selection::from_rows(&rows);
    assert_eq!(
        sorted_pairs(&selection),
        vec![("0", "2"), ("0", "3"), ("2", "1"), ("3", "1")]
    );
    let walked = graph
        .walk_selection("0", None, Direction::Both)
        .expect("walk");
    assert_eq!(sorted_pairs(&walked), sorted_pairs(&selection));
}
