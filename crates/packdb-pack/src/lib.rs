//! Pack archive format for packdb.
//!
//! A pack bundles many immutable objects into one zstd-compressed,
//! CRC-checked file with a sorted fan-out index beside it. [`PackReader`] is
//! the concrete [`ArchiveUnit`](packdb_store::ArchiveUnit) the multiplexer
//! registers for every `pack-*.pack` file it finds.
//!
//! # Architecture
//!
//! - **Pack file** (`.pack`): header, concatenated compressed objects, BLAKE3 trailer
//! - **Pack index** (`.idx`): fan-out table + sorted IDs for O(log n) lookups
//! - **PackWriter**: builds packs from objects (repack tooling, fixtures)
//! - **PackReader**: memory-mapped random-access reading using the index

pub mod entry;
pub mod error;
pub mod index;
pub mod reader;
pub mod writer;

pub use entry::PackEntry;
pub use error::{PackError, PackResult};
pub use index::PackIndex;
pub use reader::PackReader;
pub use writer::{PackFile, PackWriter};
