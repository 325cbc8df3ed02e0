use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Raw length of a SHA-1 object identifier.
pub const SHA1_LEN: usize = 20;
/// Raw length of a SHA-256 object identifier.
pub const SHA256_LEN: usize = 32;

/// Content-addressed identifier of an object in the host database.
///
/// The host tool decides the hash function; this type only carries the
/// digest. Both SHA-1 (20 bytes) and SHA-256 (32 bytes) repositories are
/// supported, and identifiers of different lengths never compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    len: u8,
    bytes: [u8; SHA256_LEN],
}

impl ObjectId {
    /// Build an identifier from a raw digest of 20 or 32 bytes.
    pub fn from_raw(raw: &[u8]) -> Result<Self, TypeError> {
        if raw.len() != SHA1_LEN && raw.len() != SHA256_LEN {
            return Err(TypeError::InvalidLength {
                actual: raw.len() * 2,
            });
        }
        let mut bytes = [0u8; SHA256_LEN];
        bytes[..raw.len()].copy_from_slice(raw);
        Ok(Self {
            len: raw.len() as u8,
            bytes,
        })
    }

    /// Parse from hex digits (40 for SHA-1, 64 for SHA-256).
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        Self::from_hex_bytes(s.as_bytes())
    }

    /// Parse from hex digits held in a byte slice, as read from a pipe.
    pub fn from_hex_bytes(s: &[u8]) -> Result<Self, TypeError> {
        if s.len() != SHA1_LEN * 2 && s.len() != SHA256_LEN * 2 {
            return Err(TypeError::InvalidLength { actual: s.len() });
        }
        let raw = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_raw(&raw)
    }

    /// The null SHA-1 identifier, used by the host tool for "no object".
    pub const fn null_sha1() -> Self {
        Self {
            len: SHA1_LEN as u8,
            bytes: [0u8; SHA256_LEN],
        }
    }

    /// Returns `true` if every digest byte is zero.
    pub fn is_null(&self) -> bool {
        self.as_bytes().iter().all(|b| *b == 0)
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.bytes[..4])
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

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// The kind of an object in the host database.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// File content.
    Blob,
    /// Directory listing.
    Tree,
    /// Snapshot plus parents and metadata.
    Commit,
    /// Annotated tag.
    Tag,
}

impl ObjectKind {
    /// The kind word used by the host tool.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            "tag" => Ok(Self::Tag),
            other => Err(TypeError::UnknownKind(other.to_string())),
        }
    }
}

/// One catalog entry: identifier, kind and size in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub size: u64,
}

impl ObjectDescriptor {
    pub fn new(id: ObjectId, kind: ObjectKind, size: u64) -> Self {
        Self { id, kind, size }
    }

    /// Returns `true` for blobs strictly larger than `cutoff` bytes.
    pub fn is_large_blob(&self, cutoff: u64) -> bool {
        self.kind == ObjectKind::Blob && self.size > cutoff
    }
}
