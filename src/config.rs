//! Storage location and connection options.
//!
//! A graph lives in exactly one SQLite file. Callers name it either directly or as a
//! directory plus file name; both forms resolve to a single path. Connection options
//! are plain data so the CLI can layer them from a config file and the environment.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphLocation {
    File(PathBuf),
    Dir { dir: PathBuf, file: String },
}

impl GraphLocation {
    pub fn file<P: Into<PathBuf>>(path: P) -> Self {
        GraphLocation::File(path.into())
    }

    pub fn dir<P: Into<PathBuf>, F: Into<String>>(dir: P, file: F) -> Self {
        GraphLocation::Dir {
            dir: dir.into(),
            file: file.into(),
        }
    }

    pub fn resolve(&self) -> PathBuf {
        match self {
            GraphLocation::File(path) => path.clone(),
            GraphLocation::Dir { dir, file } => dir.join(file),
        }
    }
}

impl From<&Path> for GraphLocation {
    fn from(path: &Path) -> Self {
        GraphLocation::File(path.to_path_buf())
    }
}

impl From<PathBuf> for GraphLocation {
    fn from(path: PathBuf) -> Self {
        GraphLocation::File(path)
    }
}

impl From<&PathBuf> for GraphLocation {
    fn from(path: &PathBuf) -> Self {
        GraphLocation::File(path.clone())
    }
}

impl From<&str> for GraphLocation {
    fn from(path: &str) -> Self {
        GraphLocation::File(PathBuf::from(path))
    }
}

/// Per-connection options applied every time a call acquires a handle.
///
/// ```rust
/// use simplegraph::GraphConfig;
/// let config = GraphConfig::default();
/// assert!(config.enforce_foreign_keys);
/// assert!(config.busy_timeout_ms.is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Issues `PRAGMA foreign_keys = ON`. SQLite leaves enforcement off unless asked,
    /// so edge endpoints are only checked while this is set.
    pub enforce_foreign_keys: bool,

    /// How long a statement waits on a locked database before failing. This is the
    /// only cancellation mechanism; `None` keeps the 5 second timeout rusqlite sets on
    /// every connection it opens.
    pub busy_timeout_ms: Option<u64>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            enforce_foreign_keys: true,
            busy_timeout_ms: None,
        }
    }
}

impl GraphConfig {
    pub fn without_foreign_keys() -> Self {
        Self {
            enforce_foreign_keys: false,
            ..Self::default()
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn busy_timeout(&self) -> Option<Duration> {
        self.busy_timeout_ms.map(Duration::from_millis)
    }
}
