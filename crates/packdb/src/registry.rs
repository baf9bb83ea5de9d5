//! Adaptive-priority list of registered archives.
//!
//! Lookups probe archives in list order and stop at the first hit, so the
//! list is kept roughly sorted by descending hit count: archives that hold
//! more objects or hotter data drift to the front and the expected probe
//! count drops under skewed access.
//!
//! # Concurrency
//!
//! The sequence is copy-on-write. A lookup clones the current `Arc<Vec<_>>`
//! under a short read lock and scans it without any lock held, so it never
//! sees a half-applied insert or removal, and a removed archive stays alive
//! until the last in-flight lookup drops it.
//!
//! Hit counters are relaxed atomics and the periodic resort is optimistic:
//! counters are not ordered against a resort in progress, two threads may
//! both decide to resort, and a resort that raced a structural change is
//! simply dropped. These only steer probe order. A stale order never
//! changes a lookup result, because `find` always scans every record in its
//! snapshot. Do not put a lock around them.

use std::cmp::Reverse;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use packdb_store::{ArchiveUnit, Locator};
use packdb_types::ObjectId;

/// One registered archive and its hit counter.
pub struct ArchiveRecord {
    hits: AtomicU64,
    unit: Arc<dyn ArchiveUnit>,
}

impl ArchiveRecord {
    /// Register `unit` with its byte size as the initial priority.
    ///
    /// Size is a cheap proxy for how many objects an archive holds, so big
    /// archives are probed first before any hits have been observed.
    pub fn new(unit: Arc<dyn ArchiveUnit>) -> Self {
        let seed = unit.size_bytes();
        Self::with_hits(unit, seed)
    }

    fn with_hits(unit: Arc<dyn ArchiveUnit>, hits: u64) -> Self {
        Self {
            hits: AtomicU64::new(hits),
            unit,
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn unit(&self) -> &Arc<dyn ArchiveUnit> {
        &self.unit
    }

    pub fn path(&self) -> &Path {
        self.unit.backing_path()
    }
}

impl fmt::Debug for ArchiveRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveRecord")
            .field("path", &self.path())
            .field("hits", &self.hits())
            .finish()
    }
}

/// A resolved lookup: the archive holding the object and where.
#[derive(Clone)]
pub struct Hit {
    pub archive: Arc<dyn ArchiveUnit>,
    pub locator: Locator,
}

impl fmt::Debug for Hit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hit")
            .field("archive", &self.archive.backing_path())
            .field("locator", &self.locator)
            .finish()
    }
}

/// Immutable view of the registry at one point in time.
pub type Records = Arc<Vec<Arc<ArchiveRecord>>>;

/// Ordered archive records, resorted by hit count every `sort_interval` hits.
///
/// Callers outside this crate can read and reorder the registry but not
/// change its membership; that is the reconciler's job.
///
/// ```compile_fail
/// let registry = packdb::PriorityRegistry::new(500);
/// registry.remove(std::path::Path::new("pack-a.pack"));
/// ```
pub struct PriorityRegistry {
    records: RwLock<Records>,
    hits: AtomicU64,
    /// Global hit count at which the last periodic resort ran.
    sorted_at: AtomicU64,
    sort_interval: u64,
}

impl PriorityRegistry {
    /// An empty registry. A `sort_interval` of 0 is treated as 1.
    pub fn new(sort_interval: u64) -> Self {
        Self {
            records: RwLock::new(Arc::new(Vec::new())),
            hits: AtomicU64::new(0),
            sorted_at: AtomicU64::new(0),
            sort_interval: sort_interval.max(1),
        }
    }

    /// Find the archive holding `id`.
    ///
    /// Every `sort_interval` global hits the list is resorted before the
    /// probe. Misses leave all counters untouched.
    pub fn find(&self, id: &ObjectId) -> Option<Hit> {
        let hits = self.hits.load(Ordering::Relaxed);
        if hits % self.sort_interval == 0 && self.sorted_at.swap(hits, Ordering::Relaxed) != hits {
            self.resort();
        }

        let records = self.snapshot();
        for record in records.iter() {
            if let Some(locator) = record.unit.locate(id) {
                record.hits.fetch_add(1, Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(Hit {
                    archive: Arc::clone(&record.unit),
                    locator,
                });
            }
        }
        None
    }

    /// Current sequence, in probe order.
    pub fn snapshot(&self) -> Records {
        Arc::clone(&self.records.read().expect("registry lock poisoned"))
    }

    /// Registered archives in probe order.
    pub fn archives(&self) -> Vec<Arc<dyn ArchiveUnit>> {
        self.snapshot()
            .iter()
            .map(|record| Arc::clone(&record.unit))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Successful lookups since construction.
    pub fn total_hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn sort_interval(&self) -> u64 {
        self.sort_interval
    }

    /// Append a record.
    ///
    /// Structural changes belong to [`ArchiveSetReconciler`](crate::ArchiveSetReconciler),
    /// which relies on being the only caller.
    pub(crate) fn insert(&self, record: ArchiveRecord) {
        let record = Arc::new(record);
        self.update(|records| records.push(record));
    }

    /// Remove the record backed by `path`, returning it if present.
    ///
    /// Reconciler only, like [`insert`](Self::insert).
    pub(crate) fn remove(&self, path: &Path) -> Option<Arc<ArchiveRecord>> {
        let mut removed = None;
        self.update(|records| {
            if let Some(pos) = records.iter().position(|r| r.path() == path) {
                removed = Some(records.remove(pos));
            }
        });
        removed
    }

    /// Sort by descending hit count, unconditionally.
    pub fn sort(&self) {
        self.update(|records| records.sort_by_cached_key(|r| Reverse(r.hits())));
    }

    /// Copy, modify and publish the sequence under the write lock.
    fn update(&self, f: impl FnOnce(&mut Vec<Arc<ArchiveRecord>>)) {
        let mut guard = self.records.write().expect("registry lock poisoned");
        let mut next = guard.as_ref().clone();
        f(&mut next);
        *guard = Arc::new(next);
    }

    /// Periodic resort from the lookup path.
    ///
    /// Sorting happens outside the lock on a snapshot; the result is dropped
    /// if the sequence changed meanwhile, so a resort can never resurrect a
    /// record removed by a concurrent reconciliation.
    fn resort(&self) {
        let snapshot = self.snapshot();
        let mut sorted = snapshot.as_ref().clone();
        sorted.sort_by_cached_key(|r| Reverse(r.hits()));
        if self.publish_if_unchanged(&snapshot, sorted) {
            tracing::debug!(archives = snapshot.len(), "resorted archive priorities");
        }
    }

    fn publish_if_unchanged(&self, expected: &Records, next: Vec<Arc<ArchiveRecord>>) -> bool {
        let mut guard = self.records.write().expect("registry lock poisoned");
        if !Arc::ptr_eq(&guard, expected) {
            return false;
        }
        *guard = Arc::new(next);
        true
    }
}

impl Default for PriorityRegistry {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SORT_INTERVAL)
    }
}

impl fmt::Debug for PriorityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityRegistry")
            .field("records", &self.snapshot())
            .field("hits", &self.total_hits())
            .field("sort_interval", &self.sort_interval)
            .finish()
    }
}
