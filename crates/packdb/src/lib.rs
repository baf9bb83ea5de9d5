//! Read-only object database over a directory of pack archives.
//!
//! A repository's packed objects are spread over many `pack-*.pack` files
//! that appear and disappear as repacks run. [`PackedDb`] answers "which
//! pack holds this object" for all of them at once:
//!
//! - [`PriorityRegistry`] keeps one record per pack, probed in order of
//!   observed hits and periodically resorted so hot packs are tried first.
//! - [`ArchiveSetReconciler`] diffs the directory against the registry and
//!   adds or drops packs, skipping the scan entirely while the directory's
//!   mtime has not moved.
//! - [`PackedDb`] exposes the [`ObjectDbRead`] surface on top and rejects
//!   single-object writes.
//!
//! ```no_run
//! use packdb::{ObjectDbRead, PackedDb, PackedDbConfig};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = PackedDb::open(PackedDbConfig::new("objects/pack"))?;
//! let id = PackedDb::resolve(b"4d3c7f0c2b8a5e6d9f1a0b3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f70")?;
//! if !db.exists(&id) && db.refresh(false)? {
//!     // a repack may have produced the object since the last refresh
//! }
//! println!("{} objects in {} packs", db.object_count(), db.archives().len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod opener;
pub mod reconcile;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ArchiveNaming, ConfigError, PackedDbConfig, DEFAULT_SORT_INTERVAL};
pub use db::PackedDb;
pub use opener::{ArchiveOpener, PackOpener};
pub use reconcile::ArchiveSetReconciler;
pub use registry::{ArchiveRecord, Hit, PriorityRegistry, Records};

pub use packdb_store::{
    ArchiveUnit, Locate, Locator, ObjectDbRead, ObjectDbWrite, ObjectInfo, ObjectKind,
    ObjectStream, StoreError, StoreResult, StoredObject,
};
pub use packdb_types::ObjectId;
