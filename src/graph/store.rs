use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use tracing::{debug, instrument, warn};

use crate::{
    config::{GraphConfig, GraphLocation},
    errors::SimpleGraphError,
    schema::ensure_schema,
};

/// Handle on a graph stored in one SQLite file.
///
/// The handle keeps no connection open. Every operation acquires its own connection,
/// does one unit of work and drops it before returning, so a `SimpleGraph` is cheap to
/// clone and share between threads. Writers take SQLite's reserved lock up front
/// (`BEGIN IMMEDIATE`); correctness under concurrent writers rests on SQLite's
/// serializable transactions.
#[derive(Clone, Debug)]
pub struct SimpleGraph {
    path: PathBuf,
    config: GraphConfig,
}

impl SimpleGraph {
    /// Creates the database file if needed and provisions the schema. Safe to call on
    /// an already initialized database.
    #[instrument(skip_all, fields(location = ?location))]
    pub fn initialize<L: Into<GraphLocation> + std::fmt::Debug>(
        location: L,
        config: GraphConfig,
    ) -> Result<Self, SimpleGraphError> {
        let path = location.into().resolve();
        let conn = open_connection(&path, &config, true)?;
        ensure_schema(&conn)?;
        debug!(path = %path.display(), "schema ready");
        Ok(Self { path, config })
    }

    /// Attaches to an existing database without touching its schema. A missing file is
    /// reported when the first operation tries to connect.
    pub fn open<L: Into<GraphLocation>>(location: L, config: GraphConfig) -> Self {
        Self {
            path: location.into().resolve(),
            config,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub(crate) fn connect(&self) -> Result<Connection, SimpleGraphError> {
        open_connection(&self.path, &self.config, false)
    }

    /// Runs `op` inside one immediate transaction. `Ok` commits, `Err` rolls back; the
    /// connection is released on both paths. A panic inside `op` drops the transaction,
    /// which rolls back as well.
    pub(crate) fn atomic<T, F>(&self, op: F) -> Result<T, SimpleGraphError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, SimpleGraphError>,
    {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| SimpleGraphError::query(e.to_string()))?;
        match op(&tx) {
            Ok(value) => {
                tx.commit()
                    .map_err(|e| SimpleGraphError::query(e.to_string()))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback() {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

fn open_connection(
    path: &Path,
    config: &GraphConfig,
    create: bool,
) -> Result<Connection, SimpleGraphError> {
    let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    if create {
        flags |= OpenFlags::SQLITE_OPEN_CREATE;
    }
    let conn = Connection::open_with_flags(path, flags).map_err(|e| {
        SimpleGraphError::connection(format!("{}: {e}", path.display()))
    })?;
    conn.pragma_update(None, "foreign_keys", config.enforce_foreign_keys)
        .map_err(|e| SimpleGraphError::connection(e.to_string()))?;
    if let Some(timeout) = config.busy_timeout() {
        conn.busy_timeout(timeout)
            .map_err(|e| SimpleGraphError::connection(e.to_string()))?;
    }
    Ok(conn)
}
