//! Write operations. Each public call is one transaction: single-row calls and bulk
//! calls alike either apply completely or leave the database untouched.

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, instrument};

use crate::{
    errors::SimpleGraphError,
    graph::{
        AttributeBag, EdgeSpec, NewNode, SimpleGraph, encode_bag, merge_bags, parse_bag,
        resolve_identity,
    },
};

impl SimpleGraph {
    /// Inserts one node. The body is made to carry `id` (see [`NewNode`]); a duplicate
    /// identifier fails with [`SimpleGraphError::ConstraintViolation`].
    #[instrument(skip(self, body))]
    pub fn add_node(
        &self,
        body: AttributeBag,
        id: Option<&str>,
    ) -> Result<usize, SimpleGraphError> {
        self.atomic(|tx| insert_node(tx, body, id))
    }

    /// Like [`SimpleGraph::add_node`] for caller-supplied JSON text. Text that is not a
    /// JSON object is refused before anything is written.
    pub fn add_node_json(&self, text: &str, id: Option<&str>) -> Result<usize, SimpleGraphError> {
        let body = parse_bag(text)?;
        self.add_node(body, id)
    }

    #[instrument(skip_all, fields(count = nodes.len()))]
    pub fn add_nodes(&self, nodes: &[NewNode]) -> Result<usize, SimpleGraphError> {
        if nodes.is_empty() {
            return Ok(0);
        }
        self.atomic(|tx| {
            let mut affected = 0;
            for node in nodes {
                affected += insert_node(tx, node.body.clone(), node.id.as_deref())?;
            }
            Ok(affected)
        })
    }

    /// Inserts the node when absent, otherwise merges `partial` into the stored body.
    /// The read, merge and write happen in one immediate transaction.
    #[instrument(skip(self, partial))]
    pub fn upsert_node(&self, id: &str, partial: AttributeBag) -> Result<usize, SimpleGraphError> {
        self.atomic(|tx| upsert_in(tx, id, partial))
    }

    #[instrument(skip_all, fields(count = nodes.len()))]
    pub fn upsert_nodes(&self, nodes: &[NewNode]) -> Result<usize, SimpleGraphError> {
        if nodes.is_empty() {
            return Ok(0);
        }
        self.atomic(|tx| {
            let mut affected = 0;
            for node in nodes {
                let (id, _) = resolve_identity(node.body.clone(), node.id.as_deref())?;
                affected += upsert_in(tx, &id, node.body.clone())?;
            }
            Ok(affected)
        })
    }

    /// Deletes the node and every edge touching it. Returns `false` when there was no
    /// such node.
    #[instrument(skip(self))]
    pub fn remove_node(&self, id: &str) -> Result<bool, SimpleGraphError> {
        self.atomic(|tx| delete_node(tx, id))
    }

    /// Returns how many of the given nodes existed and were removed.
    #[instrument(skip_all, fields(count = ids.len()))]
    pub fn remove_nodes<S: AsRef<str>>(&self, ids: &[S]) -> Result<usize, SimpleGraphError> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.atomic(|tx| {
            let mut removed = 0;
            for id in ids {
                if delete_node(tx, id.as_ref())? {
                    removed += 1;
                }
            }
            Ok(removed)
        })
    }

    /// Adds the edge `source -> target`. Properties default to `{}`.
    #[instrument(skip(self, properties))]
    pub fn connect_nodes(
        &self,
        source: &str,
        target: &str,
        properties: Option<AttributeBag>,
    ) -> Result<usize, SimpleGraphError> {
        let properties = properties.unwrap_or_default();
        self.atomic(|tx| insert_edge(tx, source, target, &properties))
    }

    #[instrument(skip_all, fields(count = edges.len()))]
    pub fn connect_many_nodes(&self, edges: &[EdgeSpec]) -> Result<usize, SimpleGraphError> {
        if edges.is_empty() {
            return Ok(0);
        }
        self.atomic(|tx| {
            let mut affected = 0;
            for edge in edges {
                affected += insert_edge(tx, &edge.source, &edge.target, &edge.properties)?;
            }
            Ok(affected)
        })
    }

    /// Removes every edge `source -> target`, parallel edges included.
    #[instrument(skip(self))]
    pub fn disconnect_nodes(&self, source: &str, target: &str) -> Result<usize, SimpleGraphError> {
        self.atomic(|tx| {
            tx.execute(
                "DELETE FROM edges WHERE source=?1 AND target=?2",
                params![source, target],
            )
            .map_err(SimpleGraphError::from_sqlite)
        })
    }
}

fn insert_node(
    conn: &Connection,
    body: AttributeBag,
    id: Option<&str>,
) -> Result<usize, SimpleGraphError> {
    let (id, body) = resolve_identity(body, id)?;
    let payload = encode_bag(&body)?;
    let mut stmt = conn
        .prepare_cached("INSERT INTO nodes(id, body) VALUES(?1, ?2)")
        .map_err(|e| SimpleGraphError::query(e.to_string()))?;
    let affected = stmt
        .execute(params![id, payload])
        .map_err(|e| match SimpleGraphError::from_sqlite(e) {
            SimpleGraphError::ConstraintViolation(_) => {
                SimpleGraphError::constraint(format!("node {id} already exists"))
            }
            other => other,
        })?;
    debug!(%id, "node inserted");
    Ok(affected)
}

fn upsert_in(
    conn: &Connection,
    id: &str,
    partial: AttributeBag,
) -> Result<usize, SimpleGraphError> {
    let current: Option<String> = conn
        .query_row("SELECT body FROM nodes WHERE id=?1", params![id], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| SimpleGraphError::query(e.to_string()))?;
    let Some(current) = current else {
        return insert_node(conn, partial, Some(id));
    };
    let merged = merge_bags(id, parse_bag(&current)?, partial)?;
    let payload = encode_bag(&merged)?;
    let mut stmt = conn
        .prepare_cached("UPDATE nodes SET body=?1 WHERE id=?2")
        .map_err(|e| SimpleGraphError::query(e.to_string()))?;
    let affected = stmt
        .execute(params![payload, id])
        .map_err(SimpleGraphError::from_sqlite)?;
    debug!(%id, "node merged");
    Ok(affected)
}

// Edges go first: with foreign keys enforced the node row cannot be deleted while
// an edge still references it.
fn delete_node(conn: &Connection, id: &str) -> Result<bool, SimpleGraphError> {
    let edges = conn
        .execute(
            "DELETE FROM edges WHERE source=?1 OR target=?1",
            params![id],
        )
        .map_err(SimpleGraphError::from_sqlite)?;
    let nodes = conn
        .execute("DELETE FROM nodes WHERE id=?1", params![id])
        .map_err(SimpleGraphError::from_sqlite)?;
    debug!(%id, edges, removed = nodes > 0, "node deleted");
    Ok(nodes > 0)
}

fn insert_edge(
    conn: &Connection,
    source: &str,
    target: &str,
    properties: &AttributeBag,
) -> Result<usize, SimpleGraphError> {
    let payload = encode_bag(properties)?;
    let mut stmt = conn
        .prepare_cached("INSERT INTO edges(source, target, properties) VALUES(?1, ?2, ?3)")
        .map_err(|e| SimpleGraphError::query(e.to_string()))?;
    stmt.execute(params![source, target, payload])
        .map_err(|e| match SimpleGraphError::from_sqlite(e) {
            SimpleGraphError::ReferentialIntegrity(_) => SimpleGraphError::referential(format!(
                "edge {source} -> {target} references a missing node"
            )),
            other => other,
        })
}
