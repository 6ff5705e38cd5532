use rusqlite::{
    Connection, OptionalExtension, params, params_from_iter, types::Value as SqlValue,
};
use serde_json::Value;
use tracing::instrument;

use crate::{
    errors::SimpleGraphError,
    graph::{AttributeBag, Direction, Edge, SimpleGraph, parse_bag},
};

const OUTBOUND_SQL: &str = "SELECT DISTINCT target FROM edges WHERE source=?1 ORDER BY target";
const INBOUND_SQL: &str = "SELECT DISTINCT source FROM edges WHERE target=?1 ORDER BY source";
const BOTH_SQL: &str = "SELECT target FROM edges WHERE source=?1 \
     UNION SELECT source FROM edges WHERE target=?1 ORDER BY 1";

pub(crate) const OUTBOUND_EDGES_SQL: &str =
    "SELECT id, source, target, properties FROM edges WHERE source=?1 ORDER BY id";
pub(crate) const INBOUND_EDGES_SQL: &str =
    "SELECT id, source, target, properties FROM edges WHERE target=?1 ORDER BY id";

/// How a predicate value is compared with a node attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Same JSON type and value.
    #[default]
    Exact,
    /// Attribute text begins with the predicate text (case-sensitive).
    ///
    /// Strings compare by their contents; every other value by its JSON text, so
    /// `true`, `null`, `800` and `["person"]` are matched as written in the body.
    StartsWith,
    /// Attribute text contains the predicate text (case-sensitive), with the same
    /// text rendering as `StartsWith`.
    Contains,
}

impl SimpleGraph {
    /// `Ok(None)` when no node has this id.
    #[instrument(skip(self))]
    pub fn find_node(&self, id: &str) -> Result<Option<AttributeBag>, SimpleGraphError> {
        let conn = self.connect()?;
        fetch_body(&conn, id)?
            .map(|body| parse_bag(&body))
            .transpose()
    }

    pub fn node(&self, id: &str) -> Result<AttributeBag, SimpleGraphError> {
        self.find_node(id)?
            .ok_or_else(|| SimpleGraphError::not_found(format!("node {id}")))
    }

    /// Nodes whose body matches every attribute of `predicate` under `mode`, in
    /// insertion order. A node lacking one of the attributes does not match.
    ///
    /// A stored body that is not a JSON object fails the search with
    /// [`SimpleGraphError::MalformedBody`], as it does for an empty predicate.
    #[instrument(skip(self, predicate))]
    pub fn find_nodes(
        &self,
        predicate: &AttributeBag,
        mode: MatchMode,
    ) -> Result<Vec<AttributeBag>, SimpleGraphError> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        for (key, value) in predicate {
            clauses.push(attribute_clause(key, value, mode, &mut values)?);
        }
        // Rows the JSON functions would choke on are let through unfiltered so they
        // reach `parse_bag` below.
        let mut sql = String::from("SELECT body FROM nodes");
        if !clauses.is_empty() {
            sql.push_str(
                " WHERE CASE WHEN NOT json_valid(body) THEN 1 \
                 WHEN json_type(body) != 'object' THEN 1 ELSE (",
            );
            sql.push_str(&clauses.join(" AND "));
            sql.push_str(") END");
        }
        sql.push_str(" ORDER BY rowid");

        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| SimpleGraphError::query(e.to_string()))?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| row.get::<_, String>(0))
            .map_err(|e| SimpleGraphError::query(e.to_string()))?;
        let mut bodies = Vec::new();
        for row in rows {
            let body = row.map_err(|e| SimpleGraphError::query(e.to_string()))?;
            bodies.push(parse_bag(&body)?);
        }
        Ok(bodies)
    }

    pub fn find_outbound_neighbors(&self, id: &str) -> Result<Vec<String>, SimpleGraphError> {
        self.neighbors(id, Direction::Outbound)
    }

    pub fn find_inbound_neighbors(&self, id: &str) -> Result<Vec<String>, SimpleGraphError> {
        self.neighbors(id, Direction::Inbound)
    }

    /// Union of inbound and outbound neighbors; a node reachable both ways, or over
    /// parallel edges, is listed once.
    pub fn find_neighbors(&self, id: &str) -> Result<Vec<String>, SimpleGraphError> {
        self.neighbors(id, Direction::Both)
    }

    /// Distinct adjacent identifiers, ordered by identifier.
    pub fn neighbors(
        &self,
        id: &str,
        direction: Direction,
    ) -> Result<Vec<String>, SimpleGraphError> {
        let conn = self.connect()?;
        collect_adjacency(&conn, neighbor_sql(direction), id)
    }

    /// Edge records touching `id`, each direction in insertion order. `Both` lists
    /// inbound edges before outbound ones.
    pub fn connections(
        &self,
        id: &str,
        direction: Direction,
    ) -> Result<Vec<Edge>, SimpleGraphError> {
        let conn = self.connect()?;
        match direction {
            Direction::Outbound => collect_edges(&conn, OUTBOUND_EDGES_SQL, id),
            Direction::Inbound => collect_edges(&conn, INBOUND_EDGES_SQL, id),
            Direction::Both => {
                let mut edges = collect_edges(&conn, INBOUND_EDGES_SQL, id)?;
                edges.extend(collect_edges(&conn, OUTBOUND_EDGES_SQL, id)?);
                Ok(edges)
            }
        }
    }

    pub fn node_count(&self) -> Result<i64, SimpleGraphError> {
        let conn = self.connect()?;
        count_rows(&conn, "SELECT COUNT(*) FROM nodes")
    }

    pub fn edge_count(&self) -> Result<i64, SimpleGraphError> {
        let conn = self.connect()?;
        count_rows(&conn, "SELECT COUNT(*) FROM edges")
    }
}

pub(crate) fn neighbor_sql(direction: Direction) -> &'static str {
    match direction {
        Direction::Outbound => OUTBOUND_SQL,
        Direction::Inbound => INBOUND_SQL,
        Direction::Both => BOTH_SQL,
    }
}

pub(crate) fn fetch_body(conn: &Connection, id: &str) -> Result<Option<String>, SimpleGraphError> {
    conn.prepare_cached("SELECT body FROM nodes WHERE id=?1")
        .map_err(|e| SimpleGraphError::query(e.to_string()))?
        .query_row(params![id], |row| row.get(0))
        .optional()
        .map_err(|e| SimpleGraphError::query(e.to_string()))
}

pub(crate) fn collect_adjacency(
    conn: &Connection,
    sql: &str,
    id: &str,
) -> Result<Vec<String>, SimpleGraphError> {
    let mut stmt = conn
        .prepare_cached(sql)
        .map_err(|e| SimpleGraphError::query(e.to_string()))?;
    let rows = stmt
        .query_map(params![id], |row| row.get(0))
        .map_err(|e| SimpleGraphError::query(e.to_string()))?;
    let mut result = Vec::new();
    for item in rows {
        result.push(item.map_err(|e| SimpleGraphError::query(e.to_string()))?);
    }
    Ok(result)
}

pub(crate) fn collect_edges(
    conn: &Connection,
    sql: &str,
    id: &str,
) -> Result<Vec<Edge>, SimpleGraphError> {
    let mut stmt = conn
        .prepare_cached(sql)
        .map_err(|e| SimpleGraphError::query(e.to_string()))?;
    let rows = stmt
        .query_map(params![id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .map_err(|e| SimpleGraphError::query(e.to_string()))?;
    let mut edges = Vec::new();
    for row in rows {
        let (id, source, target, properties) =
            row.map_err(|e| SimpleGraphError::query(e.to_string()))?;
        edges.push(Edge {
            id,
            source,
            target,
            properties: parse_bag(&properties)?,
        });
    }
    Ok(edges)
}

pub(crate) fn count_rows(conn: &Connection, sql: &str) -> Result<i64, SimpleGraphError> {
    conn.query_row(sql, [], |row| row.get(0))
        .map_err(|e| SimpleGraphError::query(e.to_string()))
}

/// Builds the SQL test for one predicate attribute, pushing its bound values. Values
/// are referenced by number because the JSON path is used more than once.
fn attribute_clause(
    key: &str,
    value: &Value,
    mode: MatchMode,
    values: &mut Vec<SqlValue>,
) -> Result<String, SimpleGraphError> {
    if key.contains('"') {
        return Err(SimpleGraphError::invalid_input(format!(
            "attribute name {key:?} cannot contain a double quote"
        )));
    }
    values.push(SqlValue::Text(format!("$.\"{key}\"")));
    let path = values.len();
    let clause = match mode {
        MatchMode::Exact => match value {
            Value::Null => format!("json_type(body, ?{path}) = 'null'"),
            Value::Bool(flag) => {
                values.push(SqlValue::Text(flag.to_string()));
                format!("json_type(body, ?{path}) = ?{}", values.len())
            }
            Value::Number(number) => {
                values.push(match number.as_i64() {
                    Some(int) => SqlValue::Integer(int),
                    None => SqlValue::Real(number.as_f64().unwrap_or(f64::NAN)),
                });
                format!(
                    "json_type(body, ?{path}) IN ('integer', 'real') \
                     AND json_extract(body, ?{path}) = ?{}",
                    values.len()
                )
            }
            Value::String(text) => {
                values.push(SqlValue::Text(text.clone()));
                format!(
                    "json_type(body, ?{path}) = 'text' AND json_extract(body, ?{path}) = ?{}",
                    values.len()
                )
            }
            Value::Array(_) | Value::Object(_) => {
                values.push(SqlValue::Text(value.to_string()));
                format!(
                    "json_type(body, ?{path}) IN ('array', 'object') \
                     AND json_extract(body, ?{path}) = json(?{})",
                    values.len()
                )
            }
        },
        MatchMode::StartsWith => {
            values.push(SqlValue::Text(pattern_text(value)));
            let pattern = values.len();
            let text = attribute_text(path);
            format!("substr({text}, 1, length(?{pattern})) = ?{pattern}")
        }
        MatchMode::Contains => {
            values.push(SqlValue::Text(pattern_text(value)));
            format!("instr({}, ?{}) > 0", attribute_text(path), values.len())
        }
    };
    Ok(clause)
}

/// Text of the attribute at parameter `path`: string contents for strings, JSON
/// text for everything else. NULL when the attribute is absent.
fn attribute_text(path: usize) -> String {
    format!(
        "CASE json_type(body, ?{path}) \
         WHEN 'text' THEN json_extract(body, ?{path}) \
         WHEN 'true' THEN 'true' WHEN 'false' THEN 'false' WHEN 'null' THEN 'null' \
         ELSE CAST(json_extract(body, ?{path}) AS TEXT) END"
    )
}

fn pattern_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
