use packdb_types::{ObjectId, OBJECT_ID_LEN};

use crate::error::{PackError, PackResult};

pub(crate) const INDEX_MAGIC: &[u8; 4] = b"PDBI";
const INDEX_VERSION: u32 = 1;
const FAN_OUT_LEN: usize = 256;

/// Per-object index row: id, CRC32 and pack offset.
const ROW_LEN: usize = OBJECT_ID_LEN + 4 + 8;

/// Sorted id table of one pack, with the CRC32 and offset of every entry.
///
/// On disk: magic, version, a 256-slot cumulative fan-out keyed by the
/// first id byte, then the ids, CRCs and offsets as parallel arrays, then
/// the BLAKE3 checksum of the pack the index belongs to.
///
/// Lookups go through [`position`](Self::position) and
/// [`entry_at`](Self::entry_at):
///
/// ```compile_fail
/// fn find(index: &packdb_pack::PackIndex, id: &packdb_types::ObjectId) {
///     let _ = index.lookup(id);
/// }
/// ```
#[derive(Clone, Debug)]
pub struct PackIndex {
    pub fan_out: [u32; FAN_OUT_LEN],
    pub object_ids: Vec<ObjectId>,
    pub crc32s: Vec<u32>,
    pub offsets: Vec<u64>,
    pub pack_checksum: [u8; 32],
}

impl PackIndex {
    /// Build an index from (id, crc32, offset) rows and the pack checksum.
    pub fn build(mut rows: Vec<(ObjectId, u32, u64)>, pack_checksum: [u8; 32]) -> Self {
        rows.sort_unstable_by_key(|row| row.0);

        let mut fan_out = [0u32; FAN_OUT_LEN];
        for (id, _, _) in &rows {
            fan_out[id.as_bytes()[0] as usize] += 1;
        }
        let mut running = 0;
        for slot in fan_out.iter_mut() {
            running += *slot;
            *slot = running;
        }

        Self {
            fan_out,
            object_ids: rows.iter().map(|row| row.0).collect(),
            crc32s: rows.iter().map(|row| row.1).collect(),
            offsets: rows.iter().map(|row| row.2).collect(),
            pack_checksum,
        }
    }

    /// Position of `id` in the sorted table, searching only its fan-out bucket.
    pub fn position(&self, id: &ObjectId) -> Option<usize> {
        let bucket = id.as_bytes()[0] as usize;
        let start = match bucket {
            0 => 0,
            b => self.fan_out[b - 1] as usize,
        };
        let end = self.fan_out[bucket] as usize;
        let found = self.object_ids[start..end].binary_search(id).ok()?;
        Some(start + found)
    }

    pub fn entry_at(&self, position: usize) -> PackResult<(u64, u32)> {
        match (self.offsets.get(position), self.crc32s.get(position)) {
            (Some(&offset), Some(&crc)) => Ok((offset, crc)),
            _ => Err(PackError::InvalidPosition(position)),
        }
    }

    pub fn object_count(&self) -> usize {
        self.object_ids.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let rows = self.object_ids.len();
        let mut buf = Vec::with_capacity(8 + FAN_OUT_LEN * 4 + rows * ROW_LEN + 32);
        buf.extend_from_slice(INDEX_MAGIC);
        buf.extend_from_slice(&INDEX_VERSION.to_be_bytes());
        buf.extend(self.fan_out.iter().flat_map(|n| n.to_be_bytes()));
        buf.extend(self.object_ids.iter().flat_map(|id| *id.as_bytes()));
        buf.extend(self.crc32s.iter().flat_map(|crc| crc.to_be_bytes()));
        buf.extend(self.offsets.iter().flat_map(|off| off.to_be_bytes()));
        buf.extend_from_slice(&self.pack_checksum);
        buf
    }

    /// Parse an `.idx` file, rejecting truncated or unordered tables.
    pub fn from_bytes(data: &[u8]) -> PackResult<Self> {
        let mut cursor = IndexCursor { data, pos: 0 };

        let magic = cursor.take(4, "header")?;
        if magic != INDEX_MAGIC {
            return Err(PackError::InvalidMagic {
                expected: String::from_utf8_lossy(INDEX_MAGIC).into(),
                actual: String::from_utf8_lossy(magic).into(),
            });
        }
        let version = cursor.u32("header")?;
        if version != INDEX_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }

        let mut fan_out = [0u32; FAN_OUT_LEN];
        for slot in fan_out.iter_mut() {
            *slot = cursor.u32("fan-out")?;
        }
        if fan_out.windows(2).any(|w| w[0] > w[1]) {
            return Err(PackError::IndexCorrupted("fan-out not monotonic".into()));
        }

        let count = fan_out[FAN_OUT_LEN - 1] as usize;
        if cursor.remaining() < count * ROW_LEN + 32 {
            return Err(PackError::IndexCorrupted("object table truncated".into()));
        }

        let object_ids = (0..count)
            .map(|_| {
                let mut hash = [0u8; OBJECT_ID_LEN];
                hash.copy_from_slice(cursor.take(OBJECT_ID_LEN, "object ids")?);
                Ok(ObjectId::from_hash(hash))
            })
            .collect::<PackResult<Vec<_>>>()?;
        if object_ids.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PackError::IndexCorrupted("object ids not sorted".into()));
        }
        let crc32s = (0..count)
            .map(|_| cursor.u32("crc table"))
            .collect::<PackResult<Vec<_>>>()?;
        let offsets = (0..count)
            .map(|_| cursor.u64("offset table"))
            .collect::<PackResult<Vec<_>>>()?;

        let mut pack_checksum = [0u8; 32];
        pack_checksum.copy_from_slice(cursor.take(32, "pack checksum")?);

        Ok(Self {
            fan_out,
            object_ids,
            crc32s,
            offsets,
            pack_checksum,
        })
    }
}

/// Forward-only reader over index bytes.
struct IndexCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> IndexCursor<'a> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize, section: &str) -> PackResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(PackError::IndexCorrupted(format!("{section} truncated")));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u32(&mut self, section: &str) -> PackResult<u32> {
        let raw = self.take(4, section)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn u64(&mut self, section: &str) -> PackResult<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8, section)?);
        Ok(u64::from_be_bytes(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(idx: &PackIndex, id: &ObjectId) -> Option<(u64, u32)> {
        idx.position(id).map(|pos| idx.entry_at(pos).unwrap())
    }

    /// `n` distinct ids spread over the fan-out buckets.
    fn make_ids(n: usize) -> Vec<ObjectId> {
        (0..n)
            .map(|i| {
                let mut data = [0u8; 32];
                data[0] = (i % 256) as u8;
                data[1] = (i / 256) as u8;
                ObjectId::from_hash(data)
            })
            .collect()
    }

    #[test]
    fn empty_index_has_flat_fan_out() {
        let idx = PackIndex::build(vec![], [0u8; 32]);
        assert_eq!(idx.object_count(), 0);
        assert!(idx.fan_out.iter().all(|&c| c == 0));
        assert!(idx.position(&ObjectId::null()).is_none());
    }

    #[test]
    fn single_row_lookup() {
        let id = ObjectId::from_bytes(b"hello world test data");
        let idx = PackIndex::build(vec![(id, 42u32, 100u64)], [0u8; 32]);
        assert_eq!(idx.object_count(), 1);
        assert_eq!(idx.position(&id), Some(0));
        assert_eq!(lookup(&idx, &id), Some((100, 42)));
    }

    #[test]
    fn lookup_missing_returns_none() {
        let id = ObjectId::from_bytes(b"present");
        let idx = PackIndex::build(vec![(id, 1, 10)], [0u8; 32]);
        assert!(lookup(&idx, &ObjectId::from_bytes(b"missing")).is_none());
    }

    #[test]
    fn positions_follow_sorted_order() {
        let ids = make_ids(300);
        let entries: Vec<_> = ids
            .iter()
            .rev()
            .enumerate()
            .map(|(i, id)| (*id, i as u32, (i * 100) as u64))
            .collect();
        let idx = PackIndex::build(entries, [0u8; 32]);
        assert_eq!(idx.object_count(), 300);
        assert_eq!(idx.fan_out[255], 300);

        for id in &ids {
            let pos = idx.position(id).unwrap();
            assert_eq!(&idx.object_ids[pos], id);
        }
    }

    #[test]
    fn entry_at_out_of_range() {
        let idx = PackIndex::build(vec![], [0u8; 32]);
        assert!(matches!(
            idx.entry_at(0).unwrap_err(),
            PackError::InvalidPosition(0)
        ));
    }

    #[test]
    fn encoded_index_parses_back() {
        let ids = make_ids(5);
        let entries: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, (i * 7) as u32, (i * 50) as u64))
            .collect();
        let checksum = [0xAB; 32];
        let idx = PackIndex::build(entries, checksum);

        let idx2 = PackIndex::from_bytes(&idx.to_bytes()).unwrap();

        assert_eq!(idx2.object_count(), idx.object_count());
        assert_eq!(idx2.pack_checksum, checksum);
        for id in &ids {
            assert_eq!(lookup(&idx, id), lookup(&idx2, id));
        }
    }

    #[test]
    fn from_bytes_bad_magic() {
        let err = PackIndex::from_bytes(b"BADMxxxxxxxx").unwrap_err();
        assert!(matches!(err, PackError::InvalidMagic { .. }));
    }

    #[test]
    fn from_bytes_bad_version() {
        let mut data = Vec::new();
        data.extend_from_slice(INDEX_MAGIC);
        data.extend_from_slice(&99u32.to_be_bytes());
        let err = PackIndex::from_bytes(&data).unwrap_err();
        assert!(matches!(err, PackError::UnsupportedVersion(99)));
    }

    #[test]
    fn from_bytes_truncated() {
        let err = PackIndex::from_bytes(INDEX_MAGIC).unwrap_err();
        assert!(matches!(err, PackError::IndexCorrupted(_)));
    }

    #[test]
    fn from_bytes_rejects_short_object_table() {
        let idx = PackIndex::build(make_ids(3).into_iter().map(|id| (id, 0, 0)).collect(), [0; 32]);
        let bytes = idx.to_bytes();
        let err = PackIndex::from_bytes(&bytes[..bytes.len() - 40]).unwrap_err();
        assert!(matches!(err, PackError::IndexCorrupted(_)));
    }

    #[test]
    fn from_bytes_rejects_unsorted_ids() {
        let ids = make_ids(2);
        let idx = PackIndex::build(vec![(ids[0], 0, 0), (ids[1], 0, 0)], [0u8; 32]);
        let mut bytes = idx.to_bytes();
        let ids_start = 8 + 256 * 4;
        let (first, second) = bytes[ids_start..ids_start + 64].split_at_mut(32);
        first.swap_with_slice(second);
        let err = PackIndex::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, PackError::IndexCorrupted(_)));
    }
}
