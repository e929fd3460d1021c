use std::fmt;

/// Error kinds recognized across the indexing and persistence core.
///
/// `InvalidConfig`/`NotFound`/`Conflict` are synchronous, never retried.
/// `TransientIO`/`Persistence` are handed back to a queue job so it retries.
/// `DataLossPrevention` is the last resort when recovery cannot tell whether
/// data is safe — see `bulk::persistence_worker`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    Io,
    Parse,
    NotFound,
    InvalidArgument,
    Internal,
    InvalidInput,
    OutOfMemory,
    InvalidState,
    UnsupportedQuery,
    InvalidConfig,
    Conflict,
    TransientIO,
    Persistence,
    DataLossPrevention,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }

    pub fn not_found(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::NotFound, context.into())
    }

    pub fn invalid_config(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidConfig, context.into())
    }

    pub fn conflict(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Conflict, context.into())
    }

    /// Whether a queue worker should retry the job that produced this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::TransientIO | ErrorKind::Persistence)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: err.to_string(),
        }
    }
}

impl From<mongodb::error::Error> for Error {
    fn from(err: mongodb::error::Error) -> Self {
        Error {
            kind: ErrorKind::TransientIO,
            context: format!("mongo error: {}", err),
        }
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error {
            kind: ErrorKind::TransientIO,
            context: format!("redis error: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;