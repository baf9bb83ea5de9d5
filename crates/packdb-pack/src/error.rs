use std::path::PathBuf;

use packdb_store::StoreError;
use packdb_types::ObjectId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("invalid pack magic: expected {expected}, got {actual}")]
    InvalidMagic { expected: String, actual: String },

    #[error("unsupported pack version: {0}")]
    UnsupportedVersion(u32),

    #[error("pack checksum does not match its index")]
    ChecksumMismatch,

    #[error("pack holds {pack} objects but its index lists {index}")]
    CountMismatch { pack: u32, index: usize },

    #[error("corrupt pack entry at offset {offset}: {reason}")]
    CorruptEntry { offset: u64, reason: String },

    #[error("CRC32 mismatch for object {id}")]
    CrcMismatch { id: ObjectId },

    #[error("no object at index position {0}")]
    InvalidPosition(usize),

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index corrupted: {0}")]
    IndexCorrupted(String),
}

impl PackError {
    /// Attach the archive path and convert into the store-level error.
    pub fn into_store_error(self, path: impl Into<PathBuf>) -> StoreError {
        match self {
            Self::Io(e) => StoreError::Io(e),
            other => StoreError::Archive {
                path: path.into(),
                reason: other.to_string(),
            },
        }
    }
}

pub type PackResult<T> = Result<T, PackError>;
