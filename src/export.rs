//! Diagram text for a selection of nodes and edges.
//!
//! Rendering is a pure function of the [`Selection`] and [`ExportOptions`]; turning
//! the text into an image is left to Graphviz or a Mermaid renderer.

use std::fmt::Write as _;

use ahash::{AHashMap, AHashSet};
use serde_json::Value;
use tracing::instrument;

use crate::{
    errors::SimpleGraphError,
    graph::{AttributeBag, Direction, Edge, Node, RowKind, SimpleGraph, TraversalRow},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DiagramFormat {
    #[default]
    Dot,
    Mermaid,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Node attributes left out of node labels.
    pub exclude_node_keys: Vec<String>,
    /// Label edges with property values only.
    pub hide_edge_key: bool,
    pub format: DiagramFormat,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Selection {
    /// Rebuilds nodes and edges from `traverse_with_bodies` output. Edge rows are
    /// relative to the node row before them. An edge seen from both endpoints is kept
    /// once.
    ///
    /// Rows carry no edge identity, so edges the row stream already folded together
    /// (same far endpoint, direction and properties) cannot be told apart here; use
    /// [`SimpleGraph::walk_selection`] for the stored edges of a walk.
    pub fn from_rows(rows: &[TraversalRow]) -> Self {
        let mut selection = Selection::default();
        let mut seen = AHashSet::new();
        let mut current: Option<&str> = None;
        for row in rows {
            match row.kind {
                RowKind::Node => {
                    selection.nodes.push(Node {
                        id: row.id.clone(),
                        body: row.payload.clone(),
                    });
                    current = Some(&row.id);
                }
                RowKind::Outbound | RowKind::Inbound => {
                    let Some(anchor) = current else { continue };
                    let (source, target) = if row.kind == RowKind::Outbound {
                        (anchor.to_string(), row.id.clone())
                    } else {
                        (row.id.clone(), anchor.to_string())
                    };
                    let key = (
                        source.clone(),
                        target.clone(),
                        Value::Object(row.payload.clone()).to_string(),
                    );
                    if !seen.insert(key) {
                        continue;
                    }
                    selection.edges.push(Edge {
                        id: 0,
                        source,
                        target,
                        properties: row.payload.clone(),
                    });
                }
            }
        }
        selection
    }
}

impl SimpleGraph {
    /// The named nodes that exist, plus every edge running between two of them.
    pub fn selection<S: AsRef<str>>(&self, ids: &[S]) -> Result<Selection, SimpleGraphError> {
        let mut selection = Selection::default();
        let mut chosen = AHashSet::new();
        for id in ids {
            let id = id.as_ref();
            if !chosen.insert(id.to_string()) {
                continue;
            }
            if let Some(body) = self.find_node(id)? {
                selection.nodes.push(Node {
                    id: id.to_string(),
                    body,
                });
            }
        }
        for node in &selection.nodes {
            for edge in self.connections(&node.id, Direction::Outbound)? {
                if chosen.contains(&edge.target) {
                    selection.edges.push(edge);
                }
            }
        }
        Ok(selection)
    }

    /// Nodes visited by [`SimpleGraph::traverse`] and the stored edges each expanded
    /// node was walked across, every edge once. A reached target is not expanded.
    #[instrument(skip(self))]
    pub fn walk_selection(
        &self,
        start: &str,
        target: Option<&str>,
        direction: Direction,
    ) -> Result<Selection, SimpleGraphError> {
        let visited = self.traverse(start, target, direction)?;
        let expanded = match (target, visited.last()) {
            (Some(target), Some(last)) if last == target => visited.len() - 1,
            _ => visited.len(),
        };
        let mut selection = Selection::default();
        let mut edge_ids = AHashSet::new();
        for (position, id) in visited.iter().enumerate() {
            if let Some(body) = self.find_node(id)? {
                selection.nodes.push(Node {
                    id: id.clone(),
                    body,
                });
            }
            if position >= expanded {
                continue;
            }
            for edge in self.connections(id, direction)? {
                if edge_ids.insert(edge.id) {
                    selection.edges.push(edge);
                }
            }
        }
        Ok(selection)
    }
}

pub fn render(selection: &Selection, options: &ExportOptions) -> String {
    match options.format {
        DiagramFormat::Dot => render_dot(selection, options),
        DiagramFormat::Mermaid => render_mermaid(selection, options),
    }
}

fn render_dot(selection: &Selection, options: &ExportOptions) -> String {
    let mut out = String::from("digraph {\n");
    for node in &selection.nodes {
        let label = node_lines(&node.body, options).join("\\l");
        let _ = writeln!(
            out,
            "\t\"{}\" [label=\"{}\\l\"];",
            dot_escape(&node.id),
            label
        );
    }
    for edge in &selection.edges {
        let lines = edge_lines(&edge.properties, options);
        if lines.is_empty() {
            let _ = writeln!(
                out,
                "\t\"{}\" -> \"{}\";",
                dot_escape(&edge.source),
                dot_escape(&edge.target)
            );
        } else {
            let _ = writeln!(
                out,
                "\t\"{}\" -> \"{}\" [label=\"{}\"];",
                dot_escape(&edge.source),
                dot_escape(&edge.target),
                lines.join("\\n")
            );
        }
    }
    out.push_str("}\n");
    out
}

fn render_mermaid(selection: &Selection, options: &ExportOptions) -> String {
    let mut out = String::from("flowchart LR\n");
    let mut handles: AHashMap<&str, String> = AHashMap::new();
    for node in &selection.nodes {
        let handle = format!("n{}", handles.len());
        let label = node_lines(&node.body, options).join("<br/>");
        let _ = writeln!(out, "    {handle}[\"{label}\"]");
        handles.insert(&node.id, handle);
    }
    for edge in &selection.edges {
        let source = mermaid_handle(&mut handles, &edge.source, &mut out);
        let target = mermaid_handle(&mut handles, &edge.target, &mut out);
        let lines = edge_lines(&edge.properties, options);
        if lines.is_empty() {
            let _ = writeln!(out, "    {source} --> {target}");
        } else {
            let _ = writeln!(out, "    {source} -->|\"{}\"| {target}", lines.join("<br/>"));
        }
    }
    out
}

// Endpoints without a node row get a bare node labelled with their id.
fn mermaid_handle<'a>(
    handles: &mut AHashMap<&'a str, String>,
    id: &'a str,
    out: &mut String,
) -> String {
    if let Some(handle) = handles.get(id) {
        return handle.clone();
    }
    let handle = format!("n{}", handles.len());
    let _ = writeln!(out, "    {handle}[\"{}\"]", mermaid_escape(id));
    handles.insert(id, handle.clone());
    handle
}

fn node_lines(body: &AttributeBag, options: &ExportOptions) -> Vec<String> {
    let escape = escaper(options.format);
    body.iter()
        .filter(|(key, _)| !options.exclude_node_keys.iter().any(|k| k == *key))
        .map(|(key, value)| escape(&format!("{key}: {}", value_text(value))))
        .collect()
}

fn edge_lines(properties: &AttributeBag, options: &ExportOptions) -> Vec<String> {
    let escape = escaper(options.format);
    properties
        .iter()
        .map(|(key, value)| {
            if options.hide_edge_key {
                escape(&value_text(value))
            } else {
                escape(&format!("{key}: {}", value_text(value)))
            }
        })
        .collect()
}

fn escaper(format: DiagramFormat) -> fn(&str) -> String {
    match format {
        DiagramFormat::Dot => dot_escape,
        DiagramFormat::Mermaid => mermaid_escape,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn dot_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn mermaid_escape(text: &str) -> String {
    text.replace('"', "#quot;")
}
