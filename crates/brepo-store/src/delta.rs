//! Static delta encoding.
//!
//! A delta holds every object reachable from `to` that is not reachable from
//! `from`. Small objects are packed into zstd-compressed parts; objects of at
//! least `min-fallback-size` MiB are only listed as fallbacks, which clients
//! fetch individually. The superblock describes the whole artefact.
//!
//! Output is a pure function of the object set and the parameters, so
//! regenerating a delta yields byte-identical files.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use brepo_types::{CommitId, DeltaParams, DeltaProfile, ObjectId};

use crate::error::StoreResult;
use crate::object::{collect_commit_closure, read_commit, ObjectKind};
use crate::traits::ObjectAccess;

/// File name of the superblock inside a delta directory.
pub const SUPERBLOCK: &str = "superblock";

/// Objects at least this many MiB become fallbacks. `0` disables fallbacks.
pub const PARAM_MIN_FALLBACK_SIZE: &str = "min-fallback-size";
/// Upper bound, in MiB, on the uncompressed size of one part.
pub const PARAM_MAX_CHUNK_SIZE: &str = "max-chunk-size";
/// Store parts inside the superblock instead of as separate files.
pub const PARAM_INLINE_PARTS: &str = "inline-parts";

const MIB: u64 = 1024 * 1024;
const DEFAULT_MIN_FALLBACK_MIB: u64 = 4;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Superblock {
    pub from: Option<CommitId>,
    pub to: CommitId,
    /// Timestamp of the `to` commit.
    pub timestamp: u64,
    pub parts: Vec<PartEntry>,
    pub fallbacks: Vec<FallbackEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartEntry {
    /// BLAKE3 hex digest of the compressed part.
    pub digest: String,
    pub objects: u64,
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    /// Compressed payload when parts are inlined.
    pub inline: Option<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackEntry {
    pub kind: ObjectKind,
    pub id: ObjectId,
    pub size: u64,
}

impl Superblock {
    pub fn from_bytes(data: &[u8]) -> StoreResult<Self> {
        Ok(bincode::deserialize(data)?)
    }
}

/// An encoded delta ready to be written out.
#[derive(Debug)]
pub struct EncodedDelta {
    pub superblock: Vec<u8>,
    /// Non-inlined parts, written as files named by their index.
    pub parts: Vec<Vec<u8>>,
}

struct Encoding {
    max_chunk: u64,
    min_fallback: u64,
    level: i32,
    inline: bool,
}

impl Encoding {
    fn from_params(params: &DeltaParams) -> Self {
        let (default_chunk_mib, level) = match params.profile {
            DeltaProfile::Major => (32, 3),
            DeltaProfile::Minor => (8, 19),
        };
        Self {
            max_chunk: params
                .get_u64(PARAM_MAX_CHUNK_SIZE)
                .unwrap_or(default_chunk_mib)
                .max(1)
                * MIB,
            min_fallback: params
                .get_u64(PARAM_MIN_FALLBACK_SIZE)
                .unwrap_or(DEFAULT_MIN_FALLBACK_MIB)
                * MIB,
            level,
            inline: params.get_bool(PARAM_INLINE_PARTS).unwrap_or(false),
        }
    }

    fn is_fallback(&self, size: u64) -> bool {
        self.min_fallback > 0 && size >= self.min_fallback
    }
}

type PartObject = (ObjectKind, ObjectId, Vec<u8>);

/// Encode the delta `from -> to`.
pub fn encode_delta<A>(
    access: &A,
    from: Option<&CommitId>,
    to: &CommitId,
    params: &DeltaParams,
) -> StoreResult<EncodedDelta>
where
    A: ObjectAccess + ?Sized,
{
    let encoding = Encoding::from_params(params);
    let to_record = read_commit(access, to)?;

    let mut wanted = BTreeSet::new();
    collect_commit_closure(access, to, &mut wanted)?;
    if let Some(from) = from {
        let mut have = BTreeSet::new();
        collect_commit_closure(access, from, &mut have)?;
        wanted.retain(|entry| !have.contains(entry));
    }

    let mut superblock = Superblock {
        from: from.copied(),
        to: *to,
        timestamp: to_record.timestamp,
        parts: Vec::new(),
        fallbacks: Vec::new(),
    };
    let mut parts = Vec::new();
    let mut chunk: Vec<PartObject> = Vec::new();
    let mut chunk_size = 0u64;

    for (kind, id) in wanted {
        let data = access.read_object(kind, &id)?;
        let size = data.len() as u64;
        if encoding.is_fallback(size) {
            superblock.fallbacks.push(FallbackEntry { kind, id, size });
            continue;
        }
        if !chunk.is_empty() && chunk_size + size > encoding.max_chunk {
            flush_part(&encoding, &mut chunk, &mut superblock, &mut parts)?;
            chunk_size = 0;
        }
        chunk_size += size;
        chunk.push((kind, id, data));
    }
    if !chunk.is_empty() {
        flush_part(&encoding, &mut chunk, &mut superblock, &mut parts)?;
    }

    debug!(
        to = %to.short_hex(),
        parts = superblock.parts.len(),
        fallbacks = superblock.fallbacks.len(),
        "encoded static delta"
    );
    Ok(EncodedDelta {
        superblock: bincode::serialize(&superblock)?,
        parts,
    })
}

fn flush_part(
    encoding: &Encoding,
    chunk: &mut Vec<PartObject>,
    superblock: &mut Superblock,
    parts: &mut Vec<Vec<u8>>,
) -> StoreResult<()> {
    let objects = std::mem::take(chunk);
    let raw = bincode::serialize(&objects)?;
    let compressed = zstd::encode_all(&raw[..], encoding.level)?;
    let entry = PartEntry {
        digest: blake3::hash(&compressed).to_hex().to_string(),
        objects: objects.len() as u64,
        uncompressed_size: raw.len() as u64,
        compressed_size: compressed.len() as u64,
        inline: encoding.inline.then(|| compressed.clone()),
    };
    if !encoding.inline {
        parts.push(compressed);
    }
    superblock.parts.push(entry);
    Ok(())
}

/// Decompress one part back into its objects.
pub fn decode_part(compressed: &[u8]) -> StoreResult<Vec<(ObjectKind, ObjectId, Vec<u8>)>> {
    let raw = zstd::decode_all(compressed)?;
    Ok(bincode::deserialize(&raw)?)
}
