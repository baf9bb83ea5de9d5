//! Foundation types for packdb.
//!
//! Every object held by a packdb archive is addressed by an [`ObjectId`], the
//! 32-byte BLAKE3 hash of its kind-tagged content. Callers may hand ids around
//! in their compact binary form or as 64-character hex strings; both are
//! normalized to the binary form before any lookup.
//!
//! # Key Types
//!
//! - [`ObjectId`]: Content-addressed identifier (BLAKE3 hash)
//! - [`ContentHasher`]: Domain-separated hasher producing object ids
//! - [`TypeError`]: Parse and normalization failures

pub mod error;
pub mod hasher;
pub mod object;

pub use error::TypeError;
pub use hasher::ContentHasher;
pub use object::{ObjectId, OBJECT_ID_HEX_LEN, OBJECT_ID_LEN};
