//! Object model and archive contract for packdb.
//!
//! This crate defines what a packdb object looks like to a reader and the
//! contract every archive implementation must satisfy so the multiplexer can
//! route lookups through it without knowing its on-disk layout.
//!
//! # Object Types
//!
//! - [`ObjectKind`] -- blob, tree, commit or tag
//! - [`ObjectInfo`] -- id, kind and size, available without decompression
//! - [`ObjectStream`] -- lazily decoded object bytes
//! - [`StoredObject`] -- a fully materialized object
//!
//! # Archive Contract
//!
//! - [`Locate`] -- hash to [`Locator`] resolution bound to its archive
//! - [`ArchiveUnit`] -- metadata, streams and enumeration over one archive
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Archives are never mutated through this interface; single-object writes
//!    are rejected with [`StoreError::UnsupportedOperation`].
//! 3. Concurrent reads are always safe.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod archive;
pub mod error;
pub mod object;
pub mod traits;

pub use archive::{ArchiveUnit, Locate, Locator};
pub use error::{StoreError, StoreResult};
pub use object::{ObjectInfo, ObjectKind, ObjectStream, StoredObject};
pub use traits::{ObjectDbRead, ObjectDbWrite};
