use std::fmt;

/// Result type for intelligence-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the store layer.
#[derive(Debug)]
pub enum Error {
    /// Underlying sqlite operation failed.
    Database(rusqlite::Error),
    /// Filesystem operation on the database path failed.
    Io(std::io::Error),
    /// Caller asked for a record that doesn't exist.
    NotFound(String),
    /// The blocking task running the query panicked or was cancelled.
    TaskFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database(err) => write!(f, "database error: {err}"),
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::NotFound(what) => write!(f, "not found: {what}"),
            Error::TaskFailed(msg) => write!(f, "store task failed: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::NotFound(_) | Error::TaskFailed(_) => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
