use std::path::{Path, PathBuf};
use std::sync::Arc;

use packdb_store::{
    ArchiveUnit, ObjectDbRead, ObjectDbWrite, ObjectInfo, ObjectStream, StoreError, StoreResult,
    StoredObject,
};
use packdb_types::ObjectId;

use crate::config::PackedDbConfig;
use crate::opener::{ArchiveOpener, PackOpener};
use crate::reconcile::ArchiveSetReconciler;
use crate::registry::{Hit, PriorityRegistry};

/// Read-only object database over a directory of pack archives.
///
/// Lookups walk the registered archives in priority order. A miss only
/// means no *registered* archive holds the object: new packs are picked up
/// by [`refresh`](Self::refresh), which callers invoke when a miss might be
/// caused by a repack that happened since the last refresh.
pub struct PackedDb {
    root: PathBuf,
    registry: PriorityRegistry,
    reconciler: ArchiveSetReconciler,
}

impl PackedDb {
    /// Open the archives under `config.root` with [`PackReader`](packdb_pack::PackReader).
    pub fn open(config: PackedDbConfig) -> StoreResult<Self> {
        Self::with_opener(config, Arc::new(PackOpener))
    }

    /// Open with a custom archive implementation.
    ///
    /// The configuration is validated and the archive set is reconciled
    /// once, forcibly, before returning.
    pub fn with_opener(
        config: PackedDbConfig,
        opener: Arc<dyn ArchiveOpener>,
    ) -> StoreResult<Self> {
        config.validate()?;
        let db = Self {
            registry: PriorityRegistry::new(config.sort_interval),
            reconciler: ArchiveSetReconciler::new(config.root.clone(), config.naming, opener),
            root: config.root,
        };
        db.refresh(true)?;
        Ok(db)
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// `rela_path` resolved against the archive directory.
    pub fn db_path(&self, rela_path: impl AsRef<Path>) -> PathBuf {
        self.root.join(rela_path)
    }

    /// Normalize a binary or hexadecimal hash to an [`ObjectId`].
    pub fn resolve(input: &[u8]) -> StoreResult<ObjectId> {
        Ok(ObjectId::from_raw_or_hex(input)?)
    }

    /// Re-read the archive directory. See [`ArchiveSetReconciler::reconcile`].
    pub fn refresh(&self, force: bool) -> StoreResult<bool> {
        self.reconciler.reconcile(&self.registry, force)
    }

    /// Registered archives. The order carries no meaning.
    pub fn archives(&self) -> Vec<Arc<dyn ArchiveUnit>> {
        self.registry.archives()
    }

    /// Every object id in every registered archive.
    ///
    /// The iterator works on the archive set as of this call; archives added
    /// or removed while it runs are not reflected.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> {
        self.archives().into_iter().flat_map(|unit| {
            let count = unit.object_count();
            (0..count).filter_map(move |i| unit.id_at(i))
        })
    }

    /// Total objects across registered archives. 0 when there are none.
    pub fn object_count(&self) -> usize {
        self.registry
            .snapshot()
            .iter()
            .map(|record| record.unit().object_count())
            .sum()
    }

    /// Directory scans performed by refreshes so far.
    pub fn scan_count(&self) -> u64 {
        self.reconciler.scan_count()
    }

    pub fn registry(&self) -> &PriorityRegistry {
        &self.registry
    }

    fn locate(&self, id: &ObjectId) -> StoreResult<Hit> {
        self.registry.find(id).ok_or(StoreError::NotFound(*id))
    }
}

impl ObjectDbRead for PackedDb {
    fn exists(&self, id: &ObjectId) -> bool {
        self.registry.find(id).is_some()
    }

    fn info(&self, id: &ObjectId) -> StoreResult<ObjectInfo> {
        let hit = self.locate(id)?;
        hit.archive.info_at(hit.locator)
    }

    fn stream(&self, id: &ObjectId) -> StoreResult<ObjectStream> {
        let hit = self.locate(id)?;
        hit.archive.stream_at(hit.locator)
    }
}

impl ObjectDbWrite for PackedDb {
    /// Always fails: packs are written whole by repacking, never one object
    /// at a time.
    fn store(&self, _object: &StoredObject) -> StoreResult<ObjectId> {
        Err(StoreError::UnsupportedOperation)
    }
}

impl std::fmt::Debug for PackedDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackedDb")
            .field("root", &self.root)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
