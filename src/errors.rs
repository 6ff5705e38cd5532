use rusqlite::{ErrorCode, ffi};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimpleGraphError {
    #[error("connection error: {0}")]
    ConnectionError(String),
    #[error("schema error: {0}")]
    SchemaError(String),
    #[error("query error: {0}")]
    QueryError(String),
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("referential integrity error: {0}")]
    ReferentialIntegrity(String),
    #[error("node not found: {0}")]
    NotFound(String),
    #[error("malformed body: {0}")]
    MalformedBody(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl SimpleGraphError {
    pub fn connection<T: Into<String>>(msg: T) -> Self {
        SimpleGraphError::ConnectionError(msg.into())
    }

    pub fn schema<T: Into<String>>(msg: T) -> Self {
        SimpleGraphError::SchemaError(msg.into())
    }

    pub fn query<T: Into<String>>(msg: T) -> Self {
        SimpleGraphError::QueryError(msg.into())
    }

    pub fn constraint<T: Into<String>>(msg: T) -> Self {
        SimpleGraphError::ConstraintViolation(msg.into())
    }

    pub fn referential<T: Into<String>>(msg: T) -> Self {
        SimpleGraphError::ReferentialIntegrity(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        SimpleGraphError::NotFound(msg.into())
    }

    pub fn malformed<T: Into<String>>(msg: T) -> Self {
        SimpleGraphError::MalformedBody(msg.into())
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        SimpleGraphError::InvalidInput(msg.into())
    }

    /// Classifies a statement failure. Constraint failures are split by SQLite's
    /// extended result code; everything else is a plain query error.
    pub fn from_sqlite(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, ref msg) = err {
            if code.code == ErrorCode::ConstraintViolation {
                let detail = msg.clone().unwrap_or_else(|| err.to_string());
                return match code.extended_code {
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => SimpleGraphError::referential(detail),
                    ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                        SimpleGraphError::constraint(detail)
                    }
                    _ => SimpleGraphError::query(detail),
                };
            }
        }
        SimpleGraphError::query(err.to_string())
    }
}
