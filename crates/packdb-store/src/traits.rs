use packdb_types::ObjectId;

use crate::error::StoreResult;
use crate::object::{ObjectInfo, ObjectStream, StoredObject};

/// Read side of a content-addressed object database.
///
/// A miss is reported as `Ok(false)` by [`exists`](Self::exists) and as
/// [`StoreError::NotFound`](crate::StoreError::NotFound) by the other methods.
/// Implementations never retry on their own; a caller composing several
/// databases decides whether a miss warrants a refresh.
pub trait ObjectDbRead: Send + Sync {
    /// Check whether an object exists in the database.
    fn exists(&self, id: &ObjectId) -> bool;

    /// Kind and size of an object.
    fn info(&self, id: &ObjectId) -> StoreResult<ObjectInfo>;

    /// Stream the bytes of an object.
    fn stream(&self, id: &ObjectId) -> StoreResult<ObjectStream>;

    /// Read an object fully into memory.
    ///
    /// Default implementation drains [`stream`](Self::stream).
    fn read(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        self.stream(id)?.read_to_vec()
    }
}

/// Write side of a content-addressed object database.
pub trait ObjectDbWrite {
    /// Store an object and return its content-addressed ID.
    fn store(&self, object: &StoredObject) -> StoreResult<ObjectId>;
}
