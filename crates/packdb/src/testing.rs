//! In-memory archive units for exercising the registry and reconciler
//! without pack files.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use packdb_store::{
    ArchiveUnit, Locate, Locator, ObjectInfo, ObjectKind, ObjectStream, StoreError, StoreResult,
    StoredObject,
};
use packdb_types::ObjectId;

pub(crate) struct MemoryArchive {
    path: PathBuf,
    size: u64,
    objects: Vec<StoredObject>,
    ids: Vec<ObjectId>,
}

impl MemoryArchive {
    /// Blobs with the given contents, reporting `size` as the archive size.
    pub(crate) fn new(path: impl Into<PathBuf>, size: u64, contents: &[&str]) -> Self {
        let mut objects: Vec<StoredObject> = contents
            .iter()
            .map(|c| StoredObject::new(ObjectKind::Blob, c.as_bytes().to_vec()))
            .collect();
        objects.sort_by_key(|o| o.compute_id());
        objects.dedup_by_key(|o| o.compute_id());
        let ids = objects.iter().map(|o| o.compute_id()).collect();
        Self {
            path: path.into(),
            size,
            objects,
            ids,
        }
    }

    pub(crate) fn ids(&self) -> &[ObjectId] {
        &self.ids
    }

    fn object(&self, locator: Locator) -> StoreResult<&StoredObject> {
        self.objects
            .get(locator.position())
            .ok_or_else(|| StoreError::Archive {
                path: self.path.clone(),
                reason: format!("no object at {}", locator.position()),
            })
    }
}

impl Locate for MemoryArchive {
    fn locate(&self, id: &ObjectId) -> Option<Locator> {
        self.ids.binary_search(id).ok().map(Locator)
    }
}

impl ArchiveUnit for MemoryArchive {
    fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn size_bytes(&self) -> u64 {
        self.size
    }

    fn info_at(&self, locator: Locator) -> StoreResult<ObjectInfo> {
        let object = self.object(locator)?;
        Ok(ObjectInfo {
            id: self.ids[locator.position()],
            kind: object.kind,
            size: object.size,
        })
    }

    fn stream_at(&self, locator: Locator) -> StoreResult<ObjectStream> {
        let info = self.info_at(locator)?;
        let data = self.object(locator)?.data.clone();
        Ok(ObjectStream::new(info, Box::new(Cursor::new(data))))
    }

    fn backing_path(&self) -> &Path {
        &self.path
    }

    fn id_at(&self, index: usize) -> Option<ObjectId> {
        self.ids.get(index).copied()
    }
}
