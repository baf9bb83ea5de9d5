use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Length of an [`ObjectId`] in its binary form.
pub const OBJECT_ID_LEN: usize = 32;

/// Length of an [`ObjectId`] in its hexadecimal form.
pub const OBJECT_ID_HEX_LEN: usize = OBJECT_ID_LEN * 2;

/// Content-addressed identifier for any stored object.
///
/// An `ObjectId` is the BLAKE3 hash of an object's content. Identical content
/// always produces the same `ObjectId`, so the id doubles as the primary key
/// of every archive index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// Compute an `ObjectId` from raw bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create an `ObjectId` from a pre-computed hash.
    pub fn from_hash(hash: [u8; OBJECT_ID_LEN]) -> Self {
        Self(hash)
    }

    /// The null object ID (all zeros). Represents "no object".
    pub const fn null() -> Self {
        Self([0u8; OBJECT_ID_LEN])
    }

    /// Returns `true` if this is the null object ID.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; OBJECT_ID_LEN]
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        Self::decode_hex(s.as_bytes())
    }

    /// Normalize a hash given in either of its two accepted forms.
    ///
    /// A 32-byte input is taken as the binary hash itself; a 64-byte input is
    /// decoded as hexadecimal. Every other length is rejected.
    pub fn from_raw_or_hex(input: &[u8]) -> Result<Self, TypeError> {
        match input.len() {
            OBJECT_ID_LEN => {
                let mut arr = [0u8; OBJECT_ID_LEN];
                arr.copy_from_slice(input);
                Ok(Self(arr))
            }
            OBJECT_ID_HEX_LEN => Self::decode_hex(input),
            actual => Err(TypeError::InvalidLength {
                expected: OBJECT_ID_LEN,
                actual,
            }),
        }
    }

    fn decode_hex(input: &[u8]) -> Result<Self, TypeError> {
        let bytes = hex::decode(input).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != OBJECT_ID_LEN {
            return Err(TypeError::InvalidLength {
                expected: OBJECT_ID_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; OBJECT_ID_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<&[u8]> for ObjectId {
    type Error = TypeError;

    fn try_from(input: &[u8]) -> Result<Self, Self::Error> {
        Self::from_raw_or_hex(input)
    }
}

impl From<[u8; OBJECT_ID_LEN]> for ObjectId {
    fn from(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<ObjectId> for [u8; OBJECT_ID_LEN] {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn null_id_is_all_zeros() {
        assert!(ObjectId::null().is_null());
        assert!(!ObjectId::from_bytes(b"content").is_null());
    }

    #[test]
    fn text_forms() {
        let id = ObjectId::from_bytes(b"text forms");
        let hex = id.to_string();
        assert_eq!(hex.len(), OBJECT_ID_HEX_LEN);
        assert!(hex.starts_with(&id.short_hex()));
        assert_eq!(hex.parse::<ObjectId>().unwrap(), id);
    }

    #[test]
    fn binary_input_is_taken_verbatim() {
        let id = ObjectId::from_bytes(b"binary");
        let normalized = ObjectId::from_raw_or_hex(id.as_bytes()).unwrap();
        assert_eq!(normalized, id);
    }

    #[test]
    fn hex_input_is_decoded() {
        let id = ObjectId::from_bytes(b"hex");
        let normalized = ObjectId::try_from(id.to_hex().as_bytes()).unwrap();
        assert_eq!(normalized, id);
    }

    #[test]
    fn uppercase_hex_is_accepted() {
        let id = ObjectId::from_bytes(b"upper");
        let upper = id.to_hex().to_uppercase();
        assert_eq!(ObjectId::from_raw_or_hex(upper.as_bytes()).unwrap(), id);
    }

    #[test]
    fn odd_lengths_are_rejected() {
        let err = ObjectId::from_raw_or_hex(&[0u8; 20]).unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 20
            }
        );
    }

    #[test]
    fn malformed_hex_is_rejected() {
        let bad = "zz".repeat(32);
        let err = ObjectId::from_raw_or_hex(bad.as_bytes()).unwrap_err();
        assert!(matches!(err, TypeError::InvalidHex(_)));
    }

    #[test]
    fn short_hex_string_is_rejected() {
        let err = ObjectId::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
    }

    #[test]
    fn serializes_as_its_hash_bytes() {
        let id = ObjectId::from_hash([7; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(serde_json::from_str::<ObjectId>(&json).unwrap(), id);
        assert!(ObjectId::from_hash([0; 32]) < id);
    }

    proptest! {
        #[test]
        fn both_forms_normalize_to_the_same_id(bytes in proptest::array::uniform32(any::<u8>())) {
            let id = ObjectId::from_hash(bytes);
            let from_binary = ObjectId::from_raw_or_hex(&bytes).unwrap();
            let from_hex = ObjectId::from_raw_or_hex(id.to_hex().as_bytes()).unwrap();
            prop_assert_eq!(from_binary, id);
            prop_assert_eq!(from_hex, id);
        }
    }
}
