use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Number of hex characters shown when a commit is named in progress output.
pub const SHORT_HEX_LEN: usize = 10;

/// Content-addressed identifier for any stored object.
///
/// An `ObjectId` is the 32-byte hash of an object's kind tag and content.
/// Identical content always produces the same `ObjectId`. Its textual form is
/// 64 lowercase hex characters; equality is byte equality.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; 32]);

/// Commits are objects like any other; the alias documents intent at call sites.
pub type CommitId = ObjectId;

impl ObjectId {
    /// Hash `data` under a domain-separating kind tag.
    pub fn compute(kind_tag: &str, data: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(kind_tag.as_bytes());
        hasher.update(&[0]);
        hasher.update(data);
        Self(*hasher.finalize().as_bytes())
    }

    /// Create an `ObjectId` from a pre-computed hash.
    pub const fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The 10-character prefix used when reporting progress.
    pub fn short_hex(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(SHORT_HEX_LEN);
        hex
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(format!("{s}: {e}")))?;
        Self::from_slice(&bytes)
    }

    /// Build from a byte slice that must be exactly 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
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

impl std::str::FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for ObjectId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A decoded commit.
///
/// Only `parent` matters to the delta planner; `root_tree` is followed by
/// reachability walks, the rest is carried for catalogs and summaries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Filled in by the store on load; not part of the hashed content.
    #[serde(skip)]
    pub id: CommitId,
    pub parent: Option<CommitId>,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    pub subject: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Root directory tree of the snapshot, if any.
    #[serde(default)]
    pub root_tree: Option<ObjectId>,
}

impl CommitRecord {
    /// A commit with no tree and no metadata.
    pub fn new(parent: Option<CommitId>, timestamp: u64, subject: impl Into<String>) -> Self {
        Self {
            id: CommitId::default(),
            parent,
            timestamp,
            subject: subject.into(),
            metadata: BTreeMap::new(),
            root_tree: None,
        }
    }
}
