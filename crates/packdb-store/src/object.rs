use std::fmt;
use std::io::{self, Read};

use packdb_types::{ContentHasher, ObjectId};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Raw content (file contents, arbitrary data).
    Blob,
    /// Directory listing mapping names to object references.
    Tree,
    /// A commit pointing at a tree and its parents.
    Commit,
    /// An annotated tag.
    Tag,
}

impl ObjectKind {
    fn hasher(&self) -> &'static ContentHasher {
        match self {
            Self::Blob => &ContentHasher::BLOB,
            Self::Tree => &ContentHasher::TREE,
            Self::Commit => &ContentHasher::COMMIT,
            Self::Tag => &ContentHasher::TAG,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blob => write!(f, "blob"),
            Self::Tree => write!(f, "tree"),
            Self::Commit => write!(f, "commit"),
            Self::Tag => write!(f, "tag"),
        }
    }
}

/// Object metadata, readable without decompressing the object body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub id: ObjectId,
    pub kind: ObjectKind,
    /// Uncompressed size in bytes.
    pub size: u64,
}

/// A stored object: kind tag + data + cached size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// The uncompressed bytes of the object.
    pub data: Vec<u8>,
    /// The size of `data` in bytes.
    pub size: u64,
}

impl StoredObject {
    /// Create a new stored object from kind and data.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// Compute the content-addressed ID for this object.
    ///
    /// Uses the domain-separated hasher of the object's kind.
    pub fn compute_id(&self) -> ObjectId {
        self.kind.hasher().hash(&self.data)
    }
}

/// Upper bound on the buffer reserved up front by [`ObjectStream::read_to_vec`].
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Object bytes produced on demand.
///
/// The reader may decompress lazily; dropping the stream early is always
/// allowed and releases whatever the archive handed out.
pub struct ObjectStream {
    info: ObjectInfo,
    reader: Box<dyn Read + Send>,
}

impl ObjectStream {
    pub fn new(info: ObjectInfo, reader: Box<dyn Read + Send>) -> Self {
        Self { info, reader }
    }

    pub fn info(&self) -> &ObjectInfo {
        &self.info
    }

    pub fn kind(&self) -> ObjectKind {
        self.info.kind
    }

    pub fn size(&self) -> u64 {
        self.info.size
    }

    /// Drain the stream into a [`StoredObject`], checking size and hash.
    pub fn read_to_vec(mut self) -> StoreResult<StoredObject> {
        let mut data = Vec::with_capacity(self.info.size.min(MAX_PREALLOC) as usize);
        self.reader.read_to_end(&mut data)?;
        if data.len() as u64 != self.info.size {
            return Err(StoreError::CorruptObject {
                id: self.info.id,
                reason: format!(
                    "size mismatch: expected {}, got {}",
                    self.info.size,
                    data.len()
                ),
            });
        }
        let object = StoredObject::new(self.info.kind, data);
        if !self.info.kind.hasher().verify(&object.data, &self.info.id) {
            return Err(StoreError::CorruptObject {
                id: self.info.id,
                reason: "content does not hash to its id".into(),
            });
        }
        Ok(object)
    }
}

impl Read for ObjectStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for ObjectStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStream")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}
