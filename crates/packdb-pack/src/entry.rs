use packdb_store::ObjectKind;
use packdb_types::ObjectId;

/// Serialize an object kind to its type byte in the pack format.
pub fn type_byte(kind: ObjectKind) -> u8 {
    match kind {
        ObjectKind::Blob => 1,
        ObjectKind::Tree => 2,
        ObjectKind::Commit => 3,
        ObjectKind::Tag => 4,
    }
}

/// Parse a type byte. Unknown bytes yield `None`.
pub fn kind_from_type_byte(byte: u8) -> Option<ObjectKind> {
    match byte {
        1 => Some(ObjectKind::Blob),
        2 => Some(ObjectKind::Tree),
        3 => Some(ObjectKind::Commit),
        4 => Some(ObjectKind::Tag),
        _ => None,
    }
}

/// A single object queued for a pack file.
#[derive(Clone, Debug)]
pub struct PackEntry {
    /// Content-addressed ID of the object.
    pub id: ObjectId,
    pub kind: ObjectKind,
    /// Uncompressed data.
    pub data: Vec<u8>,
}
