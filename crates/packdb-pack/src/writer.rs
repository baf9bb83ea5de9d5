use std::collections::HashSet;
use std::path::{Path, PathBuf};

use packdb_store::{ObjectKind, StoredObject};
use packdb_types::ObjectId;

use crate::entry::{type_byte, PackEntry};
use crate::error::{PackError, PackResult};
use crate::index::PackIndex;

pub(crate) const PACK_MAGIC: &[u8; 4] = b"PDBP";
pub(crate) const PACK_VERSION: u32 = 1;
/// Magic + version + object count.
pub(crate) const PACK_HEADER_LEN: usize = 12;
pub(crate) const PACK_TRAILER_LEN: usize = 32;

const ZSTD_LEVEL: i32 = 3;

/// Files produced by [`PackWriter::finish`].
#[derive(Clone, Debug)]
pub struct PackFile {
    pub pack_path: PathBuf,
    pub index_path: PathBuf,
    pub object_count: usize,
    pub checksum: [u8; 32],
}

/// Collects objects and encodes them as a `.pack`/`.idx` pair.
///
/// Duplicate ids are stored once. The pack is written through a temporary
/// name and renamed into place after its index, so a directory scan never
/// sees a `.pack` without its `.idx`.
pub struct PackWriter {
    path: PathBuf,
    entries: Vec<PackEntry>,
    seen: HashSet<ObjectId>,
}

impl PackWriter {
    /// Target `base` without extension, e.g. `objects/pack/pack-1234`.
    pub fn new(base: &Path) -> Self {
        Self {
            path: base.to_path_buf(),
            entries: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Queue an object under a precomputed id. Repeated ids are ignored.
    pub fn add_object(&mut self, id: ObjectId, kind: ObjectKind, data: &[u8]) {
        if self.seen.insert(id) {
            self.entries.push(PackEntry {
                id,
                kind,
                data: data.to_vec(),
            });
        }
    }

    pub fn add_stored_object(&mut self, obj: &StoredObject) -> ObjectId {
        let id = obj.compute_id();
        self.add_object(id, obj.kind, &obj.data);
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write `<base>.idx`, then `<base>.pack`.
    pub fn finish(self) -> PackResult<PackFile> {
        let pack_path = self.path.with_extension("pack");
        let index_path = self.path.with_extension("idx");
        let staging_path = self.path.with_extension("pack.tmp");

        let (pack_data, index) = self.encode()?;

        std::fs::write(&index_path, index.to_bytes())?;
        std::fs::write(&staging_path, &pack_data)?;
        std::fs::rename(&staging_path, &pack_path)?;

        tracing::debug!(
            path = %pack_path.display(),
            objects = index.object_count(),
            bytes = pack_data.len(),
            "wrote pack"
        );

        Ok(PackFile {
            pack_path,
            index_path,
            object_count: index.object_count(),
            checksum: index.pack_checksum,
        })
    }

    /// Encode the pack and its index without touching the filesystem.
    pub fn finish_to_bytes(self) -> PackResult<(Vec<u8>, PackIndex)> {
        self.encode()
    }

    fn encode(self) -> PackResult<(Vec<u8>, PackIndex)> {
        let mut pack = Vec::with_capacity(PACK_HEADER_LEN + PACK_TRAILER_LEN);
        pack.extend_from_slice(PACK_MAGIC);
        pack.extend_from_slice(&PACK_VERSION.to_be_bytes());
        pack.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());

        let rows = self
            .entries
            .iter()
            .map(|entry| {
                let offset = pack.len() as u64;
                let crc = encode_entry(&mut pack, entry)?;
                Ok((entry.id, crc, offset))
            })
            .collect::<PackResult<Vec<_>>>()?;

        let checksum = *blake3::hash(&pack).as_bytes();
        pack.extend_from_slice(&checksum);
        Ok((pack, PackIndex::build(rows, checksum)))
    }
}

/// Append one entry to `out`: type byte, raw size, compressed size, zstd
/// frame. Returns the CRC32 of the frame.
fn encode_entry(out: &mut Vec<u8>, entry: &PackEntry) -> PackResult<u32> {
    let frame = zstd::encode_all(entry.data.as_slice(), ZSTD_LEVEL)
        .map_err(|e| PackError::CompressionFailed(e.to_string()))?;
    out.push(type_byte(entry.kind));
    encode_varint(out, entry.data.len() as u64);
    encode_varint(out, frame.len() as u64);
    out.extend_from_slice(&frame);
    Ok(crc32fast::hash(&frame))
}

/// Longest LEB128 encoding of a `u64`.
const MAX_VARINT_LEN: usize = 10;

/// LEB128: seven bits per byte, low bits first, high bit set on all but the last.
pub(crate) fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push(value as u8 | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Returns the value and the number of bytes it occupied.
pub(crate) fn decode_varint(data: &[u8]) -> PackResult<(u64, usize)> {
    let mut value = 0u64;
    for (i, &byte) in data.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    let reason = if data.len() >= MAX_VARINT_LEN {
        "varint overflow"
    } else {
        "truncated varint"
    };
    Err(PackError::CorruptEntry {
        offset: 0,
        reason: reason.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_roundtrip_small() {
        let mut buf = Vec::new();
        encode_varint(&mut buf, 42);
        let (val, consumed) = decode_varint(&buf).unwrap();
        assert_eq!(val, 42);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn varint_max_u64() {
        let mut buf = Vec::new();
        encode_varint(&mut buf, u64::MAX);
        let (val, consumed) = decode_varint(&buf).unwrap();
        assert_eq!(val, u64::MAX);
        assert_eq!(consumed, 10);
    }

    #[test]
    fn decode_varint_rejects_overlong_input() {
        let err = decode_varint(&[0xFF; 11]).unwrap_err();
        assert!(matches!(err, PackError::CorruptEntry { .. }));
    }

    #[test]
    fn decode_varint_truncated() {
        let err = decode_varint(&[0x80]).unwrap_err();
        assert!(matches!(err, PackError::CorruptEntry { .. }));
    }

    #[test]
    fn duplicate_objects_are_stored_once() {
        let obj = StoredObject::new(ObjectKind::Blob, b"twice".to_vec());
        let mut writer = PackWriter::new(Path::new("pack-dup"));
        let first = writer.add_stored_object(&obj);
        let second = writer.add_stored_object(&obj);
        assert_eq!(first, second);
        assert_eq!(writer.len(), 1);
    }

    #[test]
    fn finish_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = PackWriter::new(&dir.path().join("pack-staged"));
        writer.add_stored_object(&StoredObject::new(ObjectKind::Blob, b"x".to_vec()));
        let pack = writer.finish().unwrap();

        assert!(pack.pack_path.exists());
        assert!(pack.index_path.exists());
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names.len(), 2, "unexpected files: {names:?}");
    }
}
