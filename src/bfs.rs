//! Breadth-first traversal over the stored graph.
//!
//! [`bfs`] is the engine: it knows nothing about storage and asks an expansion
//! function for the neighbors of each node it dequeues. The methods on
//! [`SimpleGraph`] plug in the stored adjacency for one of the [`Direction`]s and run
//! the whole walk against a single connection so it reads one consistent state.

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use tracing::{debug, instrument};

use crate::{
    errors::SimpleGraphError,
    graph::{Direction, RowKind, SimpleGraph, TraversalRow, parse_bag},
    query::{
        INBOUND_EDGES_SQL, OUTBOUND_EDGES_SQL, collect_adjacency, collect_edges, fetch_body,
        neighbor_sql,
    },
};

/// Terminal state of a walk. Both variants carry the identifiers in the order they
/// were visited, starting with the start node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Traversal {
    /// The target was dequeued; it is the last element.
    Found(Vec<String>),
    /// Every reachable node was visited without meeting a target.
    Exhausted(Vec<String>),
}

impl Traversal {
    pub fn path(&self) -> &[String] {
        match self {
            Traversal::Found(path) | Traversal::Exhausted(path) => path,
        }
    }

    pub fn into_path(self) -> Vec<String> {
        match self {
            Traversal::Found(path) | Traversal::Exhausted(path) => path,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Traversal::Found(_))
    }
}

/// Visits nodes breadth-first from `start`, stopping as soon as `target` is dequeued.
///
/// Identifiers are marked when enqueued, so each one is expanded at most once and
/// cycles terminate. The visiting order follows the order `expand` returns neighbors
/// in, which makes the result deterministic for a deterministic expansion.
pub fn bfs<F>(
    start: &str,
    target: Option<&str>,
    mut expand: F,
) -> Result<Traversal, SimpleGraphError>
where
    F: FnMut(&str) -> Result<Vec<String>, SimpleGraphError>,
{
    let mut visited = Vec::new();
    let mut seen = AHashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(start.to_string());
    seen.insert(start.to_string());
    while let Some(current) = queue.pop_front() {
        if target == Some(current.as_str()) {
            visited.push(current);
            return Ok(Traversal::Found(visited));
        }
        let neighbors = expand(&current)?;
        visited.push(current);
        for next in neighbors {
            if seen.insert(next.clone()) {
                queue.push_back(next);
            }
        }
    }
    Ok(Traversal::Exhausted(visited))
}

impl SimpleGraph {
    /// Identifiers in breadth-first visiting order, up to and including `target` when
    /// it is reachable, otherwise every node reachable from `start`.
    #[instrument(skip(self))]
    pub fn traverse(
        &self,
        start: &str,
        target: Option<&str>,
        direction: Direction,
    ) -> Result<Vec<String>, SimpleGraphError> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction()
            .map_err(|e| SimpleGraphError::query(e.to_string()))?;
        let sql = neighbor_sql(direction);
        let walk = bfs(start, target, |id| collect_adjacency(&tx, sql, id))?;
        debug!(found = walk.is_found(), visited = walk.path().len(), "traversal done");
        Ok(walk.into_path())
    }

    /// Same walk with a caller-supplied expansion, e.g.
    /// `|id| graph.find_inbound_neighbors(id)`.
    pub fn traverse_with<F>(
        &self,
        start: &str,
        target: Option<&str>,
        expand: F,
    ) -> Result<Vec<String>, SimpleGraphError>
    where
        F: FnMut(&str) -> Result<Vec<String>, SimpleGraphError>,
    {
        Ok(bfs(start, target, expand)?.into_path())
    }

    /// Fewest-edges path from `start` to `end`, or `None` when `end` is unreachable.
    #[instrument(skip(self))]
    pub fn shortest_path(
        &self,
        start: &str,
        end: &str,
        direction: Direction,
    ) -> Result<Option<Vec<String>>, SimpleGraphError> {
        self.node(start)?;
        self.node(end)?;
        if start == end {
            return Ok(Some(vec![start.to_string()]));
        }
        let conn = self.connect()?;
        let sql = neighbor_sql(direction);
        let mut queue = VecDeque::new();
        let mut parents: AHashMap<String, String> = AHashMap::new();
        let mut seen = AHashSet::new();
        queue.push_back(start.to_string());
        seen.insert(start.to_string());
        let mut found = false;
        'search: while let Some(node) = queue.pop_front() {
            for next in collect_adjacency(&conn, sql, &node)? {
                if seen.insert(next.clone()) {
                    parents.insert(next.clone(), node.clone());
                    if next == end {
                        found = true;
                        break 'search;
                    }
                    queue.push_back(next);
                }
            }
        }
        if !found {
            return Ok(None);
        }
        let mut path = vec![end.to_string()];
        let mut current = end;
        while let Some(parent) = parents.get(current) {
            path.push(parent.clone());
            current = parent.as_str();
        }
        path.reverse();
        Ok(Some(path))
    }

    /// The walk of [`SimpleGraph::traverse`] with payloads: a `Node` row carrying each
    /// visited body, followed by one row per edge touching it (inbound, then
    /// outbound) for every node except a reached target. A row equal to one already
    /// emitted is skipped.
    #[instrument(skip(self))]
    pub fn traverse_with_bodies(
        &self,
        start: &str,
        target: Option<&str>,
        direction: Direction,
    ) -> Result<Vec<TraversalRow>, SimpleGraphError> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction()
            .map_err(|e| SimpleGraphError::query(e.to_string()))?;
        let sql = neighbor_sql(direction);
        let walk = bfs(start, target, |id| collect_adjacency(&tx, sql, id))?;
        let expanded = match &walk {
            Traversal::Found(path) => path.len() - 1,
            Traversal::Exhausted(path) => path.len(),
        };

        let mut rows = Vec::new();
        let mut emitted = AHashSet::new();
        for (position, id) in walk.path().iter().enumerate() {
            if let Some(body) = fetch_body(&tx, id)? {
                let payload = parse_bag(&body)?;
                if emitted.insert((id.clone(), RowKind::Node, body)) {
                    rows.push(TraversalRow {
                        id: id.clone(),
                        kind: RowKind::Node,
                        payload,
                    });
                }
            }
            if position >= expanded {
                continue;
            }
            for &(kind, sql) in edge_queries(direction) {
                for edge in collect_edges(&tx, sql, id)? {
                    let other = match kind {
                        RowKind::Inbound => edge.source,
                        _ => edge.target,
                    };
                    let key = serde_json::Value::Object(edge.properties.clone()).to_string();
                    if emitted.insert((other.clone(), kind, key)) {
                        rows.push(TraversalRow {
                            id: other,
                            kind,
                            payload: edge.properties,
                        });
                    }
                }
            }
        }
        Ok(rows)
    }
}

fn edge_queries(direction: Direction) -> &'static [(RowKind, &'static str)] {
    match direction {
        Direction::Outbound => &[(RowKind::Outbound, OUTBOUND_EDGES_SQL)],
        Direction::Inbound => &[(RowKind::Inbound, INBOUND_EDGES_SQL)],
        Direction::Both => &[
            (RowKind::Inbound, INBOUND_EDGES_SQL),
            (RowKind::Outbound, OUTBOUND_EDGES_SQL),
        ],
    }
}
