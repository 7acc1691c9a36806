//! Fatal run errors.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::client::ClientError;
use crate::config::ConfigError;

/// Errors that abort a profiling run.
///
/// Malformed profile or symbol lines are not represented here; those are
/// logged and skipped while parsing.
#[derive(Debug)]
pub enum Error {
    /// Configuration could not be loaded or is invalid
    Config(ConfigError),
    /// Request to the profiler endpoint failed
    Client(ClientError),
    /// Output or intermediate file could not be read or written
    Io { path: PathBuf, source: io::Error },
}

impl Error {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration error: {}", e),
            Self::Client(e) => write!(f, "profiler request failed: {}", e),
            Self::Io { path, source } => write!(f, "{}: {}", path.display(), source),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Client(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<ClientError> for Error {
    fn from(err: ClientError) -> Self {
        Self::Client(err)
    }
}

/// Result type for profiling runs.
pub type Result<T> = std::result::Result<T, Error>;
