use rusqlite::Connection;

use crate::errors::SimpleGraphError;

pub const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS nodes (
        id   TEXT PRIMARY KEY NOT NULL,
        body TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS edges (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        source     TEXT NOT NULL REFERENCES nodes(id),
        target     TEXT NOT NULL REFERENCES nodes(id),
        properties TEXT NOT NULL DEFAULT '{}'
    );
    CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source);
    CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target);
"#;

/// Creates the node and edge tables with their indexes. Every statement is guarded by
/// `IF NOT EXISTS`, so running it against a provisioned database changes nothing.
pub fn ensure_schema(conn: &Connection) -> Result<(), SimpleGraphError> {
    conn.execute_batch(SCHEMA)
        .map_err(|e| SimpleGraphError::schema(e.to_string()))?;
    Ok(())
}
