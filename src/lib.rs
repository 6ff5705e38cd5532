//! Property graph of JSON documents stored in a single SQLite file.
//!
//! Nodes are JSON objects keyed by a string identifier; edges are directed, carry
//! their own JSON properties and must point at existing nodes. Every public
//! operation opens a connection, runs one transaction and releases the connection
//! before returning.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use simplegraph::{Direction, GraphConfig, SimpleGraph};
//!
//! let graph = SimpleGraph::initialize("apple.sqlite", GraphConfig::default())?;
//! let body = json!({"name": "Steve Jobs"}).as_object().cloned().unwrap_or_default();
//! graph.add_node(body, Some("3"))?;
//! graph.upsert_node("1", Default::default())?;
//! graph.connect_nodes("3", "1", None)?;
//! let walk = graph.traverse("3", Some("1"), Direction::Outbound)?;
//! assert_eq!(walk, ["3", "1"]);
//! # Ok::<(), simplegraph::SimpleGraphError>(())
//! ```
//!
//! # Public API Organization
//!
//! - [`SimpleGraph`] - handle on one database; all operations are methods on it
//! - [`mutation`] - add, upsert, remove, connect and disconnect, single and bulk
//! - [`query`] - lookups by id or attribute predicate, neighbors, edge records
//! - [`bfs`] - breadth-first traversal, shortest path, traversal with payloads
//! - [`safety`] - integrity report over stored rows
//! - [`export`] - DOT and Mermaid text for a selection of nodes and edges

pub mod bfs;
pub mod config;
pub mod errors;
pub mod export;
pub mod graph;
pub mod mutation;
pub mod query;
pub mod safety;
pub mod schema;

pub use crate::bfs::Traversal;
pub use crate::config::{GraphConfig, GraphLocation};
pub use crate::errors::SimpleGraphError;
pub use crate::export::{DiagramFormat, ExportOptions, Selection, render};
pub use crate::graph::{
    AttributeBag, Direction, Edge, EdgeSpec, ID_KEY, NewNode, Node, RowKind, SimpleGraph,
    TraversalRow,
};
pub use crate::query::MatchMode;
pub use crate::safety::{IntegrityError, IntegrityReport};
