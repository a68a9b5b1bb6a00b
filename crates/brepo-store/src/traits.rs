use std::collections::BTreeMap;

use brepo_types::{CommitId, CommitRecord, DeltaName, DeltaParams, ObjectId};

use crate::config::ConfigKey;
use crate::error::StoreResult;
use crate::object::{DirTree, ObjectKind};

/// Refs, commits, static deltas and pruning of one repository.
///
/// Implementations must satisfy these invariants:
/// - Objects are immutable once written; the same content always has the
///   same id.
/// - Generating a delta is idempotent: the same `(from, to, params)` always
///   produces the same bytes under the same path.
/// - Concurrent generation of deltas with distinct names is safe.
/// - A delta is never visible under its final path until it is complete.
pub trait ObjectStore: Send + Sync {
    /// All refs and the commit each points to.
    fn list_refs(&self) -> StoreResult<BTreeMap<String, CommitId>>;

    /// Load a commit. Returns [`StoreError::CommitNotFound`] when absent.
    ///
    /// [`StoreError::CommitNotFound`]: crate::StoreError::CommitNotFound
    fn load_commit(&self, id: &CommitId) -> StoreResult<CommitRecord>;

    /// Names of every static delta currently on disk.
    fn list_deltas(&self) -> StoreResult<Vec<DeltaName>>;

    /// Generate the static delta `from -> to` (`None` = from empty).
    fn generate_delta(
        &self,
        from: Option<&CommitId>,
        to: &CommitId,
        params: &DeltaParams,
    ) -> StoreResult<()>;

    /// Recursively remove the delta directory at `path` (relative to the
    /// repository root, as produced by [`DeltaName::path`]).
    ///
    /// Returns [`StoreError::DeltaNotFound`] when nothing is there.
    ///
    /// [`StoreError::DeltaNotFound`]: crate::StoreError::DeltaNotFound
    fn delete_delta_tree(&self, path: &str) -> StoreResult<()>;

    /// Raw superblock bytes of an existing delta.
    fn delta_superblock(&self, name: &DeltaName) -> StoreResult<Vec<u8>>;

    /// Remove objects not reachable from refs within the requested depth.
    fn prune(&self, options: &PruneOptions) -> StoreResult<PruneStats>;
}

/// Raw object and ref access, used to build history and catalogs.
pub trait ObjectAccess: Send + Sync {
    fn read_object(&self, kind: ObjectKind, id: &ObjectId) -> StoreResult<Vec<u8>>;

    /// Store `data` and return its id. Writing existing content is a no-op.
    fn write_object(&self, kind: ObjectKind, data: &[u8]) -> StoreResult<ObjectId>;

    /// Point `name` at `target`, or delete the ref when `target` is `None`.
    fn set_ref(&self, name: &str, target: Option<&CommitId>) -> StoreResult<()>;

    fn write_file(&self, data: &[u8]) -> StoreResult<ObjectId> {
        self.write_object(ObjectKind::File, data)
    }

    fn write_dirtree(&self, tree: &DirTree) -> StoreResult<ObjectId> {
        self.write_object(ObjectKind::DirTree, &serde_json::to_vec(tree)?)
    }

    fn write_commit(&self, commit: &CommitRecord) -> StoreResult<CommitId> {
        self.write_object(ObjectKind::Commit, &serde_json::to_vec(commit)?)
    }
}

/// Scalar repository configuration.
pub trait RepoConfig: Send + Sync {
    fn get_scalar(&self, key: &ConfigKey) -> StoreResult<Option<String>>;

    /// Set `key` to `value`, or remove it when `value` is `None`.
    fn set_scalar(&self, key: &ConfigKey, value: Option<&str>) -> StoreResult<()>;

    /// Every configured scalar, keyed by its config name.
    fn scalars(&self) -> StoreResult<BTreeMap<String, String>>;

    fn collection_id(&self) -> StoreResult<Option<String>> {
        self.get_scalar(&ConfigKey::CollectionId)
    }
}

/// Repository-wide regeneration steps.
pub trait RepoOps: Send + Sync {
    /// Regenerate the `appstream2/<arch>` catalog refs.
    fn refresh_catalog(&self, options: &CatalogOptions) -> StoreResult<CatalogReport>;

    /// Rewrite the summary (and, optionally, the summary index).
    fn refresh_summary(&self, options: &SummaryOptions) -> StoreResult<SummaryReport>;
}

/// Everything the maintenance engine needs from a repository handle.
pub trait Repository: ObjectStore + ObjectAccess + RepoConfig + RepoOps {}

impl<T: ObjectStore + ObjectAccess + RepoConfig + RepoOps> Repository for T {}

/// Options for [`ObjectStore::prune`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PruneOptions {
    /// Only ref tips (and their history within `depth`) are roots. When
    /// false, every commit object is kept as a root.
    pub refs_only: bool,
    /// Parent links followed from each tip; `-1` walks the whole history.
    pub depth: i32,
    /// Count what would be removed without removing anything.
    pub dry_run: bool,
}

impl Default for PruneOptions {
    fn default() -> Self {
        Self {
            refs_only: true,
            depth: -1,
            dry_run: false,
        }
    }
}

/// Counters reported by a prune.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PruneStats {
    pub objects_total: u64,
    pub objects_pruned: u64,
    pub bytes_freed: u64,
}

#[derive(Clone, Debug, Default)]
pub struct CatalogOptions {
    /// Timestamp (seconds since the epoch) for new catalog commits.
    pub now: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogReport {
    /// Catalog refs that received a new commit.
    pub updated: Vec<String>,
    /// Catalog refs whose content was unchanged.
    pub unchanged: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct SummaryOptions {
    /// Also write per-arch subsummaries and `summary.idx`.
    pub index: bool,
    pub now: u64,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self { index: true, now: 0 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SummaryReport {
    pub refs: usize,
    pub deltas: usize,
    pub subsummaries: usize,
}
