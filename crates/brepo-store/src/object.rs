use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use brepo_types::{CommitId, CommitRecord, ObjectId};

use crate::error::{StoreError, StoreResult};
use crate::traits::{ObjectAccess, ObjectStore, PruneOptions};

/// Kind of a stored object. Part of the hashed content, and the file
/// extension of loose objects on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    Commit,
    DirTree,
    File,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Commit => "commit",
            ObjectKind::DirTree => "dirtree",
            ObjectKind::File => "file",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "commit" => Some(ObjectKind::Commit),
            "dirtree" => Some(ObjectKind::DirTree),
            "file" => Some(ObjectKind::File),
            _ => None,
        }
    }

    /// Content address of `data` stored as this kind.
    pub fn compute_id(&self, data: &[u8]) -> ObjectId {
        ObjectId::compute(self.as_str(), data)
    }
}

/// Directory listing: names mapped to file and subdirectory objects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirTree {
    #[serde(default)]
    pub files: BTreeMap<String, ObjectId>,
    #[serde(default)]
    pub dirs: BTreeMap<String, ObjectId>,
}

impl DirTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &str, id: ObjectId) -> Self {
        self.files.insert(name.to_string(), id);
        self
    }

    pub fn with_dir(mut self, name: &str, id: ObjectId) -> Self {
        self.dirs.insert(name.to_string(), id);
        self
    }
}

/// Decode a commit read from storage and stamp its id.
pub fn decode_commit(id: &CommitId, data: &[u8]) -> StoreResult<CommitRecord> {
    let mut record: CommitRecord =
        serde_json::from_slice(data).map_err(|e| StoreError::CorruptObject {
            id: *id,
            reason: e.to_string(),
        })?;
    record.id = *id;
    Ok(record)
}

/// Read and decode a commit, reporting a missing one as
/// [`StoreError::CommitNotFound`].
pub fn read_commit<A>(access: &A, id: &CommitId) -> StoreResult<CommitRecord>
where
    A: ObjectAccess + ?Sized,
{
    let data = access.read_object(ObjectKind::Commit, id).map_err(|e| match e {
        StoreError::ObjectNotFound(_) => StoreError::CommitNotFound(*id),
        other => other,
    })?;
    decode_commit(id, &data)
}

pub fn decode_dirtree(id: &ObjectId, data: &[u8]) -> StoreResult<DirTree> {
    serde_json::from_slice(data).map_err(|e| StoreError::CorruptObject {
        id: *id,
        reason: e.to_string(),
    })
}

/// Add `commit` and every object its tree references to `out`.
///
/// Trees already present in `out` are not walked again.
pub fn collect_commit_closure<A>(
    access: &A,
    commit: &CommitId,
    out: &mut BTreeSet<(ObjectKind, ObjectId)>,
) -> StoreResult<()>
where
    A: ObjectAccess + ?Sized,
{
    let record = read_commit(access, commit)?;
    out.insert((ObjectKind::Commit, *commit));

    let mut pending: Vec<ObjectId> = record.root_tree.into_iter().collect();
    while let Some(tree_id) = pending.pop() {
        if !out.insert((ObjectKind::DirTree, tree_id)) {
            continue;
        }
        let tree = decode_dirtree(&tree_id, &access.read_object(ObjectKind::DirTree, &tree_id)?)?;
        for file in tree.files.values() {
            out.insert((ObjectKind::File, *file));
        }
        pending.extend(tree.dirs.values().copied());
    }
    Ok(())
}

/// Commits reachable from `tip` following at most `depth` parent links
/// (`-1` = unbounded). The walk stops quietly at a missing ancestor, since
/// repositories may hold partial history.
pub fn history_within_depth<F>(tip: &CommitId, depth: i32, mut load_parent: F) -> StoreResult<Vec<CommitId>>
where
    F: FnMut(&CommitId) -> StoreResult<Option<Option<CommitId>>>,
{
    let mut out = Vec::new();
    let mut current = Some(*tip);
    let mut remaining = depth;
    while let Some(id) = current {
        let Some(parent) = load_parent(&id)? else {
            break;
        };
        out.push(id);
        if remaining == 0 {
            break;
        }
        if remaining > 0 {
            remaining -= 1;
        }
        current = parent;
    }
    Ok(out)
}

/// Every object kept by a prune with `options`.
///
/// Roots are each ref tip plus its history within `options.depth`, and
/// `extra_roots` (every commit, when pruning is not limited to refs).
pub fn reachable_objects<S, I>(
    store: &S,
    options: &PruneOptions,
    extra_roots: I,
) -> StoreResult<BTreeSet<(ObjectKind, ObjectId)>>
where
    S: ObjectStore + ObjectAccess + ?Sized,
    I: IntoIterator<Item = CommitId>,
{
    let mut roots = BTreeSet::new();
    for tip in store.list_refs()?.values() {
        roots.extend(history_within_depth(tip, options.depth, |id| {
            match store.load_commit(id) {
                Ok(record) => Ok(Some(record.parent)),
                Err(StoreError::CommitNotFound(_)) => Ok(None),
                Err(e) => Err(e),
            }
        })?);
    }
    if !options.refs_only {
        roots.extend(extra_roots);
    }

    let mut reachable = BTreeSet::new();
    for commit in &roots {
        collect_commit_closure(store, commit, &mut reachable)?;
    }
    Ok(reachable)
}
