/// Connection configuration
///
/// A [`ConnectionConfig`] says where the database lives and how long the
/// engine may block while acquiring the handle or waiting on locks.
use crate::constants::{DEFAULT_OPEN_TIMEOUT_SECS, IN_MEMORY};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where a connection's database lives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Location {
    /// Private, ephemeral database that disappears with its connection.
    #[default]
    InMemory,
    /// Database file, created when missing.
    File(PathBuf),
}

impl Location {
    /// An empty path or the `:memory:` sentinel selects [`Location::InMemory`].
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.as_os_str().is_empty() || path.as_os_str() == IN_MEMORY {
            Location::InMemory
        } else {
            Location::File(path.to_path_buf())
        }
    }

    /// Path handed to the engine's open call.
    pub(crate) fn engine_path(&self) -> &Path {
        match self {
            Location::InMemory => Path::new(IN_MEMORY),
            Location::File(path) => path,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self, Location::InMemory)
    }
}

/// Options used when opening a [`crate::Connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub location: Location,
    /// How long the engine retries on a locked database before giving up.
    /// `None` keeps the engine default of failing immediately.
    pub busy_timeout: Option<Duration>,
    /// Upper bound for acquiring the engine handle.
    pub open_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            busy_timeout: None,
            open_timeout: Duration::from_secs(DEFAULT_OPEN_TIMEOUT_SECS),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Location::InMemory)
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::new(Location::from_path(path))
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl From<Location> for ConnectionConfig {
    fn from(location: Location) -> Self {
        Self::new(location)
    }
}

impl From<&str> for ConnectionConfig {
    fn from(path: &str) -> Self {
        Self::file(path)
    }
}

impl From<&Path> for ConnectionConfig {
    fn from(path: &Path) -> Self {
        Self::file(path)
    }
}

impl From<PathBuf> for ConnectionConfig {
    fn from(path: PathBuf) -> Self {
        Self::file(path)
    }
}

impl From<&PathBuf> for ConnectionConfig {
    fn from(path: &PathBuf) -> Self {
        Self::file(path)
    }
}
