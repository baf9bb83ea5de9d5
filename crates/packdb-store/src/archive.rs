use std::path::Path;

use packdb_types::ObjectId;

use crate::error::StoreResult;
use crate::object::{ObjectInfo, ObjectStream};

/// Opaque position of an object inside one archive's index.
///
/// A locator is only meaningful to the archive that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator(pub usize);

impl Locator {
    pub fn position(&self) -> usize {
        self.0
    }
}

/// Hash to locator resolution, bound to the archive that owns the index.
///
/// This is the hot path of every multiplexed lookup: implementations should
/// answer from their in-memory index without touching object data.
pub trait Locate {
    /// Returns the locator of `id`, or `None` if this archive does not hold it.
    fn locate(&self, id: &ObjectId) -> Option<Locator>;
}

/// A single immutable archive holding many content-addressed objects.
///
/// All implementations must satisfy these invariants:
/// - `locate(id)` is `Some` iff `id_at(i) == Some(id)` for some `i` in
///   `0..object_count()`.
/// - Locators returned by `locate` stay valid for the lifetime of the unit.
/// - The unit never mutates its backing file.
pub trait ArchiveUnit: Locate + Send + Sync {
    /// Number of objects indexed by this archive.
    fn object_count(&self) -> usize;

    /// Size of the backing archive file in bytes.
    fn size_bytes(&self) -> u64;

    /// Metadata of the object at `locator`.
    fn info_at(&self, locator: Locator) -> StoreResult<ObjectInfo>;

    /// Byte stream of the object at `locator`.
    fn stream_at(&self, locator: Locator) -> StoreResult<ObjectStream>;

    /// Path of the archive file this unit was opened from.
    fn backing_path(&self) -> &Path;

    /// Id of the object at index position `index`, for `index < object_count()`.
    fn id_at(&self, index: usize) -> Option<ObjectId>;
}
