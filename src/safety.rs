use std::fmt;

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::{errors::SimpleGraphError, graph::SimpleGraph};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub total_nodes: i64,
    pub total_edges: i64,
    /// Edges with an endpoint that has no node row. Only possible when rows were
    /// written with foreign keys switched off.
    pub orphan_edges: i64,
    /// Bodies that are not valid JSON text.
    pub malformed_bodies: i64,
    /// Valid bodies whose `id` attribute does not mirror the row identifier.
    pub id_mismatches: i64,
}

impl IntegrityReport {
    pub fn merge(&mut self, other: &IntegrityReport) {
        self.total_nodes = self.total_nodes.max(other.total_nodes);
        self.total_edges = self.total_edges.max(other.total_edges);
        self.orphan_edges += other.orphan_edges;
        self.malformed_bodies += other.malformed_bodies;
        self.id_mismatches += other.id_mismatches;
    }

    pub fn has_issues(&self) -> bool {
        self.orphan_edges > 0 || self.malformed_bodies > 0 || self.id_mismatches > 0
    }
}

#[derive(Debug)]
pub struct IntegrityError {
    pub report: IntegrityReport,
    pub source: Option<SimpleGraphError>,
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "integrity violations detected: {} orphan edges, {} malformed bodies, {} id mismatches",
            self.report.orphan_edges, self.report.malformed_bodies, self.report.id_mismatches
        )
    }
}

impl std::error::Error for IntegrityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|err| err as &dyn std::error::Error)
    }
}

impl SimpleGraph {
    #[instrument(skip(self))]
    pub fn integrity_report(&self) -> Result<IntegrityReport, SimpleGraphError> {
        let conn = self.connect()?;
        let mut report = IntegrityReport::default();
        report.merge(&validate_referential_integrity(&conn)?);
        report.merge(&validate_bodies(&conn)?);
        if report.has_issues() {
            warn!(?report, "graph integrity issues");
        }
        Ok(report)
    }

    /// Fails unless the report is clean.
    pub fn check_integrity(&self) -> Result<IntegrityReport, IntegrityError> {
        let report = self.integrity_report().map_err(|err| IntegrityError {
            report: IntegrityReport::default(),
            source: Some(err),
        })?;
        if report.has_issues() {
            Err(IntegrityError {
                report,
                source: None,
            })
        } else {
            Ok(report)
        }
    }
}

pub fn validate_referential_integrity(
    conn: &Connection,
) -> Result<IntegrityReport, SimpleGraphError> {
    let mut report = base_report(conn)?;
    report.orphan_edges = query_single(
        conn,
        "SELECT COUNT(*) FROM edges e \
         LEFT JOIN nodes src ON src.id = e.source \
         LEFT JOIN nodes dst ON dst.id = e.target \
         WHERE src.id IS NULL OR dst.id IS NULL",
    )?;
    Ok(report)
}

pub fn validate_bodies(conn: &Connection) -> Result<IntegrityReport, SimpleGraphError> {
    let mut report = base_report(conn)?;
    report.malformed_bodies = query_single(
        conn,
        "SELECT COUNT(*) FROM nodes WHERE \
         CASE WHEN json_valid(body) THEN json_type(body) != 'object' ELSE 1 END",
    )?;
    report.id_mismatches = query_single(
        conn,
        "SELECT COUNT(*) FROM nodes WHERE \
         CASE WHEN json_valid(body) = 0 THEN 0 \
              WHEN json_type(body) != 'object' THEN 0 \
              ELSE coalesce(CAST(json_extract(body, '$.id') AS TEXT), '') != id END",
    )?;
    Ok(report)
}

fn base_report(conn: &Connection) -> Result<IntegrityReport, SimpleGraphError> {
    let total_nodes = query_single(conn, "SELECT COUNT(*) FROM nodes")?;
    let total_edges = query_single(conn, "SELECT COUNT(*) FROM edges")?;
    Ok(IntegrityReport {
        total_nodes,
        total_edges,
        ..IntegrityReport::default()
    })
}

fn query_single(conn: &Connection, sql: &str) -> Result<i64, SimpleGraphError> {
    conn.query_row(sql, [], |row| row.get(0))
        .optional()
        .map(|opt| opt.unwrap_or(0))
        .map_err(|e| SimpleGraphError::query(e.to_string()))
}
