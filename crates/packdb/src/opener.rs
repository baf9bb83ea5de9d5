use std::path::Path;
use std::sync::Arc;

use packdb_pack::PackReader;
use packdb_store::{ArchiveUnit, StoreResult};

/// Turns an archive file found during reconciliation into an [`ArchiveUnit`].
///
/// The returned unit's [`backing_path`](ArchiveUnit::backing_path) must equal
/// `path`: the reconciler matches registered archives against directory
/// entries by path.
pub trait ArchiveOpener: Send + Sync {
    fn open(&self, path: &Path) -> StoreResult<Arc<dyn ArchiveUnit>>;
}

impl<F> ArchiveOpener for F
where
    F: Fn(&Path) -> StoreResult<Arc<dyn ArchiveUnit>> + Send + Sync,
{
    fn open(&self, path: &Path) -> StoreResult<Arc<dyn ArchiveUnit>> {
        self(path)
    }
}

/// Opens `pack-*.pack` files with [`PackReader`].
#[derive(Clone, Copy, Debug, Default)]
pub struct PackOpener;

impl ArchiveOpener for PackOpener {
    fn open(&self, path: &Path) -> StoreResult<Arc<dyn ArchiveUnit>> {
        let reader = PackReader::open(path).map_err(|e| e.into_store_error(path))?;
        Ok(Arc::new(reader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packdb_pack::PackWriter;
    use packdb_store::{ObjectKind, StoreError, StoredObject};

    #[test]
    fn pack_opener_keeps_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = PackWriter::new(&dir.path().join("pack-open"));
        writer.add_stored_object(&StoredObject::new(ObjectKind::Blob, b"x".to_vec()));
        let pack = writer.finish().unwrap();

        let unit = PackOpener.open(&pack.pack_path).unwrap();
        assert_eq!(unit.backing_path(), pack.pack_path.as_path());
        assert_eq!(unit.object_count(), 1);
    }

    #[test]
    fn pack_opener_reports_corrupt_archives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pack-bad.pack");
        std::fs::write(&path, b"garbage").unwrap();
        std::fs::write(path.with_extension("idx"), b"garbage").unwrap();

        let err = PackOpener.open(&path).err().unwrap();
        assert!(matches!(err, StoreError::Archive { .. }));
    }
}
