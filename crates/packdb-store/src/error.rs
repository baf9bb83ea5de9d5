use std::path::PathBuf;

use packdb_types::{ObjectId, TypeError};

/// Errors from object database operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object is not held by any registered archive.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// The store does not accept single-object writes.
    #[error("operation not supported by this object database")]
    UnsupportedOperation,

    /// The hash given by the caller could not be normalized.
    #[error("invalid object id: {0}")]
    InvalidId(#[from] TypeError),

    /// The database was configured with unusable settings.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An archive failed to open or decode.
    #[error("archive {path:?}: {reason}")]
    Archive { path: PathBuf, reason: String },

    /// The object data is malformed or cannot be decoded.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
