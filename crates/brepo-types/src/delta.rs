//! Static delta names and their on-disk layout.
//!
//! A delta is named `"TO"` (full, from the empty state) or `"FROM-TO"`
//! (incremental), with both ids in hex. On disk each id is written in its
//! 43-character url-safe unpadded base64 form and the first id is sharded:
//!
//! ```text
//! deltas/<b64(TO)[0..2]>/<b64(TO)[2..]>                      full
//! deltas/<b64(FROM)[0..2]>/<b64(FROM)[2..]>-<b64(TO)>         incremental
//! ```
//!
//! The url-safe alphabet contains `-`, so on-disk names are split by
//! position, never by searching for the separator.

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::commit::CommitId;
use crate::error::TypeError;

/// Directory under the repository root holding every static delta.
pub const DELTAS_DIR: &str = "deltas";

/// Length of a 32-byte id in unpadded base64.
const B64_LEN: usize = 43;
const SHARD_LEN: usize = 2;

/// Identifier of one static delta.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeltaName {
    pub from: Option<CommitId>,
    pub to: CommitId,
}

impl DeltaName {
    /// A delta from the empty state to `to`.
    pub fn full(to: CommitId) -> Self {
        Self { from: None, to }
    }

    /// A delta from `from` to `to`.
    pub fn incremental(from: CommitId, to: CommitId) -> Self {
        Self { from: Some(from), to }
    }

    /// Parse `"TO"` or `"FROM-TO"`, splitting at the first `-`.
    pub fn parse(name: &str) -> Result<Self, TypeError> {
        let invalid = |e: TypeError| TypeError::InvalidDeltaName(format!("{name}: {e}"));
        match name.split_once('-') {
            None => Ok(Self::full(CommitId::from_hex(name).map_err(invalid)?)),
            Some((from, to)) => Ok(Self::incremental(
                CommitId::from_hex(from).map_err(invalid)?,
                CommitId::from_hex(to).map_err(invalid)?,
            )),
        }
    }

    /// Relative path of the delta directory, or of `target` inside it.
    pub fn path(&self, target: Option<&str>) -> String {
        let mut path = format!("{DELTAS_DIR}/");
        match &self.from {
            Some(from) => {
                path.push_str(&shard(from));
                path.push('-');
                path.push_str(&b64(&self.to));
            }
            None => path.push_str(&shard(&self.to)),
        }
        if let Some(target) = target {
            path.push('/');
            path.push_str(target);
        }
        path
    }

    /// Reverse of [`path`](Self::path) for a delta directory found on disk at
    /// `deltas/<prefix>/<rest>`.
    pub fn from_path_components(prefix: &str, rest: &str) -> Result<Self, TypeError> {
        let invalid = || TypeError::InvalidDeltaPath(format!("{prefix}/{rest}"));
        if prefix.len() != SHARD_LEN {
            return Err(invalid());
        }
        let head_len = B64_LEN - SHARD_LEN;
        if rest.len() == head_len {
            let to = from_b64(&format!("{prefix}{rest}")).map_err(|_| invalid())?;
            return Ok(Self::full(to));
        }
        if rest.len() != head_len + 1 + B64_LEN || rest.as_bytes()[head_len] != b'-' {
            return Err(invalid());
        }
        let from = from_b64(&format!("{prefix}{}", &rest[..head_len])).map_err(|_| invalid())?;
        let to = from_b64(&rest[head_len + 1..]).map_err(|_| invalid())?;
        Ok(Self::incremental(from, to))
    }
}

impl fmt::Display for DeltaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.from {
            Some(from) => write!(f, "{from}-{}", self.to),
            None => write!(f, "{}", self.to),
        }
    }
}

impl fmt::Debug for DeltaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.from {
            Some(from) => write!(f, "DeltaName({}-{})", from.short_hex(), self.to.short_hex()),
            None => write!(f, "DeltaName({})", self.to.short_hex()),
        }
    }
}

impl std::str::FromStr for DeltaName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Url-safe unpadded base64 of the binary id.
///
/// Panics if the encoding does not decode back to the same bytes: a wrong
/// alphabet or padding mode here would silently misplace every delta.
pub fn b64(id: &CommitId) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(id.as_bytes());
    let decoded = URL_SAFE_NO_PAD.decode(&encoded).ok();
    assert_eq!(decoded.as_deref(), Some(&id.as_bytes()[..]), "base64 round trip mismatch");
    assert_eq!(encoded.len(), B64_LEN);
    encoded
}

fn shard(id: &CommitId) -> String {
    let encoded = b64(id);
    format!("{}/{}", &encoded[..SHARD_LEN], &encoded[SHARD_LEN..])
}

fn from_b64(encoded: &str) -> Result<CommitId, TypeError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| TypeError::InvalidDeltaPath(format!("{encoded}: {e}")))?;
    CommitId::from_slice(&bytes)
}

/// Encoding profile requested from the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeltaProfile {
    /// Larger parts, faster compression. Used for all generated deltas.
    #[default]
    Major,
    /// Small parts, tighter compression.
    Minor,
}

/// Parameters passed to delta generation. Keys are opaque to everything but
/// the store that interprets them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaParams {
    pub profile: DeltaProfile,
    pub values: BTreeMap<String, String>,
}

impl DeltaParams {
    pub fn new(profile: DeltaProfile) -> Self {
        Self {
            profile,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.parse().ok())
    }
}
