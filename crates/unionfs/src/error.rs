//! Union filesystem error types.

use std::io;
use thiserror::Error;

/// Union filesystem error type.
#[derive(Debug, Error)]
pub enum UnionError {
    /// No visible entry in any layer.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad index, range, or mismatched path kinds.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The filesystem (or a layer handle) has been closed.
    #[error("filesystem is closed")]
    Closed,

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// URI could not be parsed or has the wrong scheme.
    #[error("invalid uri: {0}")]
    InvalidUri(String),

    /// No live filesystem for the key carried by a URI.
    #[error("no filesystem for key: {0}")]
    FileSystemNotFound(String),

    /// A provider for this scheme is already installed.
    #[error("provider already installed for scheme: {0}")]
    DuplicateScheme(String),

    /// Layer stack configuration could not be loaded.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error from a content source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl UnionError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an InvalidArgument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create an InvalidUri error.
    pub fn invalid_uri(uri: impl Into<String>) -> Self {
        Self::InvalidUri(uri.into())
    }

    /// Returns true for errors that mean "nothing visible here".
    pub fn is_not_found(&self) -> bool {
        match self {
            UnionError::NotFound(_) => true,
            UnionError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Convert UnionError to std::io::Error for compatibility.
impl From<UnionError> for io::Error {
    fn from(e: UnionError) -> Self {
        match e {
            UnionError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            UnionError::InvalidArgument(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            UnionError::Closed => io::Error::other("filesystem is closed"),
            UnionError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            UnionError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            UnionError::InvalidUri(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            UnionError::FileSystemNotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            UnionError::DuplicateScheme(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            UnionError::Config(msg) => io::Error::new(io::ErrorKind::InvalidData, msg),
            UnionError::Io(e) => e,
        }
    }
}

/// Union filesystem result type.
pub type UnionResult<T> = Result<T, UnionError>;
