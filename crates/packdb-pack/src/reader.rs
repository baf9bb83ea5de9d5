use std::fs::File;
use std::io::{self, Read};
use std::ops::{Deref, Range};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use packdb_store::{
    ArchiveUnit, Locate, Locator, ObjectInfo, ObjectKind, ObjectStream, StoreResult,
};
use packdb_types::ObjectId;

use crate::entry::kind_from_type_byte;
use crate::error::{PackError, PackResult};
use crate::index::PackIndex;
use crate::writer::{decode_varint, PACK_HEADER_LEN, PACK_MAGIC, PACK_TRAILER_LEN, PACK_VERSION};

/// Backing bytes of a pack: a read-only mapping or an owned buffer.
enum PackBytes {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for PackBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Mapped(map) => map,
            Self::Owned(buf) => buf,
        }
    }
}

/// Parsed entry header: everything needed to answer `info_at` without
/// touching the compressed body.
struct EntryHeader {
    kind: ObjectKind,
    size: u64,
    body: Range<usize>,
}

/// Reads objects from a pack file using an index for random access.
///
/// Opened from disk the pack is memory-mapped, so registering a reader costs
/// an index read plus a mapping, and object bodies are paged in on demand.
/// Objects are reached through [`Locate`] and [`ArchiveUnit`] only:
///
/// ```compile_fail
/// fn whole(reader: &packdb_pack::PackReader, id: &packdb_types::ObjectId) {
///     let _ = reader.read_object(id);
/// }
/// ```
pub struct PackReader {
    path: PathBuf,
    data: Arc<PackBytes>,
    index: PackIndex,
}

impl PackReader {
    /// Open from raw bytes.
    pub fn from_bytes(pack_data: Vec<u8>, index: PackIndex) -> PackResult<Self> {
        Self::new(PathBuf::new(), PackBytes::Owned(pack_data), index)
    }

    /// Open `pack-*.pack`, reading its sibling `.idx`.
    pub fn open(pack_path: &Path) -> PackResult<Self> {
        let index_data = std::fs::read(pack_path.with_extension("idx"))?;
        let index = PackIndex::from_bytes(&index_data)?;
        let file = File::open(pack_path)?;
        // SAFETY: pack files are immutable once renamed into place; repacking
        // removes old packs instead of rewriting them.
        let map = unsafe { Mmap::map(&file)? };
        Self::new(pack_path.to_path_buf(), PackBytes::Mapped(map), index)
    }

    fn new(path: PathBuf, pack: PackBytes, index: PackIndex) -> PackResult<Self> {
        let data: &[u8] = &pack;
        if data.len() < PACK_HEADER_LEN + PACK_TRAILER_LEN {
            return Err(PackError::CorruptEntry {
                offset: 0,
                reason: "pack data too short".into(),
            });
        }
        if &data[0..4] != PACK_MAGIC {
            return Err(PackError::InvalidMagic {
                expected: String::from_utf8_lossy(PACK_MAGIC).into(),
                actual: String::from_utf8_lossy(&data[0..4]).into(),
            });
        }
        let version = read_u32(data, 4);
        if version != PACK_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }
        let count = read_u32(data, 8);
        if count as usize != index.object_count() {
            return Err(PackError::CountMismatch {
                pack: count,
                index: index.object_count(),
            });
        }
        if data[data.len() - PACK_TRAILER_LEN..] != index.pack_checksum {
            return Err(PackError::ChecksumMismatch);
        }
        Ok(Self {
            path,
            data: Arc::new(pack),
            index,
        })
    }

    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn entry_header(&self, offset: u64) -> PackResult<EntryHeader> {
        let bytes = self.bytes();
        let data = &bytes[..bytes.len() - PACK_TRAILER_LEN];
        let mut pos = offset as usize;

        if pos < PACK_HEADER_LEN || pos >= data.len() {
            return Err(PackError::CorruptEntry {
                offset,
                reason: "offset outside pack body".into(),
            });
        }

        let type_byte = data[pos];
        pos += 1;
        let kind = kind_from_type_byte(type_byte).ok_or_else(|| PackError::CorruptEntry {
            offset,
            reason: format!("unknown type byte: {type_byte}"),
        })?;

        let (size, consumed) = decode_varint(&data[pos..])?;
        pos += consumed;
        let (compressed_size, consumed) = decode_varint(&data[pos..])?;
        pos += consumed;

        let end = pos
            .checked_add(compressed_size as usize)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| PackError::CorruptEntry {
                offset,
                reason: "compressed data extends beyond pack".into(),
            })?;

        Ok(EntryHeader {
            kind,
            size,
            body: pos..end,
        })
    }

    fn info_inner(&self, locator: Locator) -> PackResult<ObjectInfo> {
        let (offset, _) = self.index.entry_at(locator.position())?;
        let header = self.entry_header(offset)?;
        Ok(ObjectInfo {
            id: self.index.object_ids[locator.position()],
            kind: header.kind,
            size: header.size,
        })
    }

    fn stream_inner(&self, locator: Locator) -> PackResult<ObjectStream> {
        let (offset, expected_crc) = self.index.entry_at(locator.position())?;
        let header = self.entry_header(offset)?;
        let id = self.index.object_ids[locator.position()];

        if crc32fast::hash(&self.bytes()[header.body.clone()]) != expected_crc {
            return Err(PackError::CrcMismatch { id });
        }

        let body = PackSlice {
            data: Arc::clone(&self.data),
            pos: header.body.start,
            end: header.body.end,
        };
        let decoder = zstd::stream::read::Decoder::new(body)?;
        let info = ObjectInfo {
            id,
            kind: header.kind,
            size: header.size,
        };
        Ok(ObjectStream::new(info, Box::new(decoder)))
    }
}

/// Whole-object and whole-pack checks used by the format tests.
#[cfg(test)]
impl PackReader {
    pub(crate) fn read_object(
        &self,
        id: &ObjectId,
    ) -> StoreResult<Option<packdb_store::StoredObject>> {
        match self.locate(id) {
            Some(locator) => self.stream_at(locator)?.read_to_vec().map(Some),
            None => Ok(None),
        }
    }

    pub(crate) fn contains(&self, id: &ObjectId) -> bool {
        self.index.position(id).is_some()
    }

    pub(crate) fn object_ids(&self) -> &[ObjectId] {
        &self.index.object_ids
    }

    /// Recompute the BLAKE3 trailer over the whole pack.
    pub(crate) fn verify_checksum(&self) -> PackResult<()> {
        let bytes = self.bytes();
        let body = &bytes[..bytes.len() - PACK_TRAILER_LEN];
        if *blake3::hash(body).as_bytes() != self.index.pack_checksum {
            return Err(PackError::ChecksumMismatch);
        }
        Ok(())
    }
}

impl Locate for PackReader {
    fn locate(&self, id: &ObjectId) -> Option<Locator> {
        self.index.position(id).map(Locator)
    }
}

impl ArchiveUnit for PackReader {
    fn object_count(&self) -> usize {
        self.index.object_count()
    }

    fn size_bytes(&self) -> u64 {
        self.bytes().len() as u64
    }

    fn info_at(&self, locator: Locator) -> StoreResult<ObjectInfo> {
        self.info_inner(locator)
            .map_err(|e| e.into_store_error(&self.path))
    }

    fn stream_at(&self, locator: Locator) -> StoreResult<ObjectStream> {
        self.stream_inner(locator)
            .map_err(|e| e.into_store_error(&self.path))
    }

    fn backing_path(&self) -> &Path {
        &self.path
    }

    fn id_at(&self, index: usize) -> Option<ObjectId> {
        self.index.object_ids.get(index).copied()
    }
}

impl std::fmt::Debug for PackReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackReader")
            .field("path", &self.path)
            .field("objects", &self.index.object_count())
            .field("bytes", &self.bytes().len())
            .finish()
    }
}

/// Compressed body of one entry, read straight out of the shared pack bytes.
struct PackSlice {
    data: Arc<PackBytes>,
    pos: usize,
    end: usize,
}

impl Read for PackSlice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data: &[u8] = &self.data;
        let remaining = &data[self.pos..self.end];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

fn read_u32(data: &[u8], pos: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&data[pos..pos + 4]);
    u32::from_be_bytes(raw)
}
