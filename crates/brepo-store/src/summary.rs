//! The summary index clients download to discover refs and deltas.
//!
//! `summary` is a bincode [`Summary`]. With the index enabled, one
//! subsummary per architecture is also written, named by its digest, and
//! `summary.idx` maps each architecture to its subsummary digest.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use brepo_types::refs::arch;
use brepo_types::CommitId;

use crate::error::StoreResult;
use crate::traits::{ObjectStore, RepoConfig};

pub const SUMMARY_FILE: &str = "summary";
pub const SUMMARY_INDEX_FILE: &str = "summary.idx";
pub const SUBSUMMARIES_DIR: &str = "summaries";
pub const SUBSUMMARY_EXT: &str = "sub";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRef {
    pub commit: CommitId,
    pub timestamp: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub refs: BTreeMap<String, SummaryRef>,
    /// Delta name mapped to the BLAKE3 hex digest of its superblock.
    pub deltas: BTreeMap<String, String>,
    /// Scalar repository configuration.
    pub metadata: BTreeMap<String, String>,
    pub last_modified: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryIndex {
    /// Architecture mapped to subsummary digest.
    pub subsummaries: BTreeMap<String, String>,
    pub last_modified: u64,
}

/// Serialized summary files ready to be stored.
#[derive(Debug, Default)]
pub struct RenderedSummary {
    pub summary: Vec<u8>,
    pub index: Option<Vec<u8>>,
    /// Subsummary digest mapped to its bytes.
    pub subsummaries: BTreeMap<String, Vec<u8>>,
}

impl Summary {
    /// Snapshot refs, deltas and metadata of `store`.
    ///
    /// Refs whose commit cannot be loaded and deltas whose superblock cannot
    /// be read are left out with a warning.
    pub fn collect<S>(store: &S, now: u64) -> StoreResult<Self>
    where
        S: ObjectStore + RepoConfig + ?Sized,
    {
        let mut summary = Summary {
            metadata: store.scalars()?,
            last_modified: now,
            ..Default::default()
        };
        for (name, commit) in store.list_refs()? {
            match store.load_commit(&commit) {
                Ok(record) => {
                    summary.refs.insert(
                        name,
                        SummaryRef {
                            commit,
                            timestamp: record.timestamp,
                        },
                    );
                }
                Err(e) => warn!(refname = %name, "leaving ref out of summary: {e}"),
            }
        }
        for delta in store.list_deltas()? {
            match store.delta_superblock(&delta) {
                Ok(superblock) => {
                    let digest = blake3::hash(&superblock).to_hex().to_string();
                    summary.deltas.insert(delta.to_string(), digest);
                }
                Err(e) => warn!(delta = %delta, "leaving delta out of summary: {e}"),
            }
        }
        Ok(summary)
    }

    /// The subset of refs for one architecture, with the deltas leading to
    /// their commits.
    pub fn for_arch(&self, wanted: &str) -> Summary {
        let refs: BTreeMap<String, SummaryRef> = self
            .refs
            .iter()
            .filter(|(name, _)| arch(name) == Some(wanted))
            .map(|(name, r)| (name.clone(), r.clone()))
            .collect();
        let commits: Vec<String> = refs.values().map(|r| r.commit.to_hex()).collect();
        let deltas = self
            .deltas
            .iter()
            .filter(|(name, _)| commits.iter().any(|c| name.ends_with(c.as_str())))
            .map(|(name, digest)| (name.clone(), digest.clone()))
            .collect();
        Summary {
            refs,
            deltas,
            metadata: self.metadata.clone(),
            last_modified: self.last_modified,
        }
    }

    pub fn arches(&self) -> Vec<String> {
        let mut arches: Vec<String> = self
            .refs
            .keys()
            .filter_map(|name| arch(name).map(str::to_string))
            .collect();
        arches.sort();
        arches.dedup();
        arches
    }

    pub fn render(&self, with_index: bool) -> StoreResult<RenderedSummary> {
        let mut rendered = RenderedSummary {
            summary: bincode::serialize(self)?,
            ..Default::default()
        };
        if !with_index {
            return Ok(rendered);
        }
        let mut index = SummaryIndex {
            last_modified: self.last_modified,
            ..Default::default()
        };
        for arch in self.arches() {
            let bytes = bincode::serialize(&self.for_arch(&arch))?;
            let digest = blake3::hash(&bytes).to_hex().to_string();
            index.subsummaries.insert(arch, digest.clone());
            rendered.subsummaries.insert(digest, bytes);
        }
        rendered.index = Some(bincode::serialize(&index)?);
        Ok(rendered)
    }

    pub fn from_bytes(data: &[u8]) -> StoreResult<Self> {
        Ok(bincode::deserialize(data)?)
    }
}

impl SummaryIndex {
    pub fn from_bytes(data: &[u8]) -> StoreResult<Self> {
        Ok(bincode::deserialize(data)?)
    }
}
