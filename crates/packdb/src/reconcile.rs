use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use packdb_store::StoreResult;
use tracing::{debug, info, warn};

use crate::config::ArchiveNaming;
use crate::opener::ArchiveOpener;
use crate::registry::{ArchiveRecord, PriorityRegistry};

#[derive(Debug, Default)]
struct ReconcileState {
    /// Directory mtime observed by the last completed reconciliation.
    last_seen_mtime: Option<SystemTime>,
    scans: u64,
}

/// Brings a [`PriorityRegistry`] in line with the archives on disk.
///
/// Reconciliations are serialized; lookups keep running against the
/// registry's previous snapshot while one is in progress.
pub struct ArchiveSetReconciler {
    root: PathBuf,
    naming: ArchiveNaming,
    opener: Arc<dyn ArchiveOpener>,
    state: Mutex<ReconcileState>,
}

impl ArchiveSetReconciler {
    pub fn new(
        root: impl Into<PathBuf>,
        naming: ArchiveNaming,
        opener: Arc<dyn ArchiveOpener>,
    ) -> Self {
        Self {
            root: root.into(),
            naming,
            opener,
            state: Mutex::new(ReconcileState::default()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn naming(&self) -> &ArchiveNaming {
        &self.naming
    }

    /// Directory scans performed so far. Skipped reconciliations don't count.
    pub fn scan_count(&self) -> u64 {
        self.state.lock().expect("reconcile lock poisoned").scans
    }

    /// Register new archives and drop vanished ones.
    ///
    /// Unless `force` is set, nothing is scanned when the root directory's
    /// mtime is not newer than at the last reconciliation. Returns `true`
    /// if any archive was added or removed.
    ///
    /// # Errors
    ///
    /// If an archive fails to open, every other addition and removal is
    /// still applied, then the first open error is returned. The staleness
    /// marker is left where it was, so the next refresh scans again and
    /// retries the failed archive.
    ///
    /// # Panics
    ///
    /// If a registered archive missing from disk cannot be found in the
    /// registry. The reconciler is the only structural writer, so this is
    /// an internal invariant violation.
    pub fn reconcile(&self, registry: &PriorityRegistry, force: bool) -> StoreResult<bool> {
        let mut state = self.state.lock().expect("reconcile lock poisoned");

        let mtime = fs::metadata(&self.root)?.modified()?;
        if !force && state.last_seen_mtime.is_some_and(|seen| mtime <= seen) {
            debug!(root = %self.root.display(), "archive directory unchanged");
            return Ok(false);
        }

        state.scans += 1;
        let on_disk = self.scan()?;
        let registered: HashSet<PathBuf> = registry
            .snapshot()
            .iter()
            .map(|record| record.path().to_path_buf())
            .collect();

        let mut added: Vec<&PathBuf> = on_disk.difference(&registered).collect();
        added.sort();
        let mut removed: Vec<&PathBuf> = registered.difference(&on_disk).collect();
        removed.sort();

        let mut changed = false;
        let mut failures = Vec::new();
        for path in added {
            match self.opener.open(path) {
                Ok(unit) => {
                    info!(
                        path = %path.display(),
                        objects = unit.object_count(),
                        bytes = unit.size_bytes(),
                        "registered archive"
                    );
                    registry.insert(ArchiveRecord::new(unit));
                    changed = true;
                }
                Err(e) => {
                    warn!("failed to open archive {:?}: {}", path, e);
                    failures.push(e);
                }
            }
        }

        for path in removed {
            let record = registry.remove(path);
            assert!(
                record.is_some(),
                "archive {} was registered but is missing from the registry",
                path.display()
            );
            info!(path = %path.display(), "dropped archive");
            changed = true;
        }

        registry.sort();

        let failed = failures.len();
        if let Some(first) = failures.into_iter().next() {
            warn!(
                root = %self.root.display(),
                failed,
                changed,
                "reconciliation incomplete, will rescan"
            );
            return Err(first);
        }

        state.last_seen_mtime = Some(mtime);
        debug!(
            root = %self.root.display(),
            archives = registry.len(),
            changed,
            "reconciled archive directory"
        );
        Ok(changed)
    }

    /// Archive files directly under the root.
    fn scan(&self) -> StoreResult<HashSet<PathBuf>> {
        let mut found = HashSet::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.naming.matches(name));
            if matches && path.is_file() {
                found.insert(path);
            }
        }
        Ok(found)
    }
}

impl std::fmt::Debug for ArchiveSetReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveSetReconciler")
            .field("root", &self.root)
            .field("naming", &self.naming)
            .finish_non_exhaustive()
    }
}
