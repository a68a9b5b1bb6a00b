//! On-disk repository.
//!
//! ```text
//! <root>/config                        TOML configuration
//! <root>/refs/<ref name>               64 hex chars + newline
//! <root>/objects/<xx>/<rest>.<kind>    loose objects, hex id split 2/62
//! <root>/deltas/...                    static deltas (see `DeltaName::path`)
//! <root>/summary, summary.idx, summaries/<digest>.sub
//! ```
//!
//! Every file is written to a temporary sibling and renamed into place.
//! Deltas are assembled in a temporary directory under `deltas/` and renamed
//! as a whole, so a reader never observes a partial delta.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use brepo_types::{CommitId, CommitRecord, DeltaName, DeltaParams, ObjectId, DELTAS_DIR};

use crate::catalog::refresh_catalogs;
use crate::config::{ConfigDocument, ConfigKey};
use crate::delta::{encode_delta, SUPERBLOCK};
use crate::error::{StoreError, StoreResult};
use crate::names::validate_ref_name;
use crate::object::{reachable_objects, read_commit, ObjectKind};
use crate::summary::{Summary, SUBSUMMARIES_DIR, SUBSUMMARY_EXT, SUMMARY_FILE, SUMMARY_INDEX_FILE};
use crate::traits::{
    CatalogOptions, CatalogReport, ObjectAccess, ObjectStore, PruneOptions, PruneStats, RepoConfig,
    RepoOps, SummaryOptions, SummaryReport,
};

const CONFIG_FILE: &str = "config";
const OBJECTS_DIR: &str = "objects";
const REFS_DIR: &str = "refs";
const STAGING_PREFIX: &str = ".tmp-";

/// A repository rooted at a directory on local disk.
#[derive(Debug)]
pub struct FsRepository {
    root: PathBuf,
    /// Serializes read-modify-write cycles of the config file.
    config_lock: Mutex<()>,
}

/// A loose object found while scanning `objects/`.
struct LooseObject {
    kind: ObjectKind,
    id: ObjectId,
    path: PathBuf,
    size: u64,
}

impl FsRepository {
    /// Create an empty repository at `root`.
    pub fn init(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        if root.join(CONFIG_FILE).exists() {
            return Err(StoreError::AlreadyExists(root));
        }
        for dir in [OBJECTS_DIR, REFS_DIR, DELTAS_DIR] {
            fs::create_dir_all(root.join(dir))?;
        }
        let repo = Self {
            root,
            config_lock: Mutex::new(()),
        };
        repo.write_config(&ConfigDocument::new_repository())?;
        info!(path = %repo.root.display(), "initialized repository");
        Ok(repo)
    }

    /// Open an existing repository.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.join(CONFIG_FILE).is_file() {
            return Err(StoreError::NotARepository(root));
        }
        let repo = Self {
            root,
            config_lock: Mutex::new(()),
        };
        repo.read_config()?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Remove delta staging directories left by workers that died mid-write.
    ///
    /// Must not run while workers are generating deltas in this repository.
    pub fn remove_staging_leftovers(&self) -> StoreResult<usize> {
        let deltas_dir = self.root.join(DELTAS_DIR);
        if !deltas_dir.is_dir() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in fs::read_dir(&deltas_dir)? {
            let entry = entry?;
            if !entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX) {
                continue;
            }
            let path = entry.path();
            let result = if entry.file_type()?.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match result {
                Ok(()) => {
                    debug!(path = %path.display(), "removed delta staging leftover");
                    removed += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    fn object_path(&self, kind: ObjectKind, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.root
            .join(OBJECTS_DIR)
            .join(&hex[..2])
            .join(format!("{}.{}", &hex[2..], kind.as_str()))
    }

    fn ref_path(&self, name: &str) -> StoreResult<PathBuf> {
        validate_ref_name(name)?;
        Ok(self.root.join(REFS_DIR).join(name))
    }

    fn read_config(&self) -> StoreResult<ConfigDocument> {
        ConfigDocument::parse(&fs::read_to_string(self.root.join(CONFIG_FILE))?)
    }

    fn write_config(&self, doc: &ConfigDocument) -> StoreResult<()> {
        write_atomic(&self.root.join(CONFIG_FILE), doc.render()?.as_bytes())
    }

    fn loose_objects(&self) -> StoreResult<Vec<LooseObject>> {
        let mut out = Vec::new();
        for entry in WalkDir::new(self.root.join(OBJECTS_DIR)).min_depth(2).max_depth(2) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let parsed = (|| {
                let prefix = path.parent()?.file_name()?.to_str()?;
                let stem = path.file_stem()?.to_str()?;
                let kind = ObjectKind::from_extension(path.extension()?.to_str()?)?;
                let id = ObjectId::from_hex(&format!("{prefix}{stem}")).ok()?;
                Some((kind, id))
            })();
            let Some((kind, id)) = parsed else {
                debug!(path = %path.display(), "ignoring unrecognized file in objects/");
                continue;
            };
            out.push(LooseObject {
                kind,
                id,
                path: path.to_path_buf(),
                size: entry.metadata().map_err(io::Error::from)?.len(),
            });
        }
        Ok(out)
    }

    fn write_summary_files(&self, options: &SummaryOptions) -> StoreResult<SummaryReport> {
        let summary = Summary::collect(self, options.now)?;
        let rendered = summary.render(options.index)?;
        let sub_dir = self.root.join(SUBSUMMARIES_DIR);

        // Subsummaries first, then the index naming them, then the summary.
        for (digest, bytes) in &rendered.subsummaries {
            let path = sub_dir.join(format!("{digest}.{SUBSUMMARY_EXT}"));
            if !path.exists() {
                write_atomic(&path, bytes)?;
            }
        }
        let index_path = self.root.join(SUMMARY_INDEX_FILE);
        match &rendered.index {
            Some(index) => write_atomic(&index_path, index)?,
            None => remove_if_exists(&index_path)?,
        }
        write_atomic(&self.root.join(SUMMARY_FILE), &rendered.summary)?;

        if sub_dir.is_dir() {
            for entry in fs::read_dir(&sub_dir)? {
                let path = entry?.path();
                let keep = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|digest| rendered.subsummaries.contains_key(digest));
                if !keep {
                    debug!(path = %path.display(), "removing stale subsummary");
                    remove_if_exists(&path)?;
                }
            }
        }

        Ok(SummaryReport {
            refs: summary.refs.len(),
            deltas: summary.deltas.len(),
            subsummaries: rendered.subsummaries.len(),
        })
    }
}

impl ObjectStore for FsRepository {
    fn list_refs(&self) -> StoreResult<BTreeMap<String, CommitId>> {
        let refs_dir = self.root.join(REFS_DIR);
        let mut refs = BTreeMap::new();
        for entry in WalkDir::new(&refs_dir).min_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() || entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&refs_dir) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let content = fs::read_to_string(entry.path())?;
            let target = CommitId::from_hex(content.trim()).map_err(|e| StoreError::InvalidRef {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            refs.insert(name, target);
        }
        Ok(refs)
    }

    fn load_commit(&self, id: &CommitId) -> StoreResult<CommitRecord> {
        read_commit(self, id)
    }

    fn list_deltas(&self) -> StoreResult<Vec<DeltaName>> {
        let deltas_dir = self.root.join(DELTAS_DIR);
        let mut names = Vec::new();
        if !deltas_dir.is_dir() {
            return Ok(names);
        }
        for shard in fs::read_dir(&deltas_dir)? {
            let shard = shard?;
            let prefix = shard.file_name().to_string_lossy().into_owned();
            if prefix.starts_with('.') || !shard.file_type()?.is_dir() {
                continue;
            }
            for entry in fs::read_dir(shard.path())? {
                let entry = entry?;
                let rest = entry.file_name().to_string_lossy().into_owned();
                match DeltaName::from_path_components(&prefix, &rest) {
                    Ok(name) => names.push(name),
                    Err(e) => debug!("ignoring entry in deltas/: {e}"),
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn generate_delta(
        &self,
        from: Option<&CommitId>,
        to: &CommitId,
        params: &DeltaParams,
    ) -> StoreResult<()> {
        let name = DeltaName { from: from.copied(), to: *to };
        let target = self.root.join(name.path(None));
        if target.exists() {
            debug!(delta = %name, "delta already present");
            return Ok(());
        }

        let encoded = encode_delta(self, from, to, params)?;

        let deltas_dir = self.root.join(DELTAS_DIR);
        fs::create_dir_all(&deltas_dir)?;
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&deltas_dir)?;
        fs::write(staging.path().join(SUPERBLOCK), &encoded.superblock)?;
        for (index, part) in encoded.parts.iter().enumerate() {
            fs::write(staging.path().join(index.to_string()), part)?;
        }
        make_world_readable(staging.path(), 0o755)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        match fs::rename(staging.path(), &target) {
            Ok(()) => {}
            // Another writer finished the same delta first; contents are identical.
            Err(_) if target.exists() => debug!(delta = %name, "delta generated concurrently"),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn delete_delta_tree(&self, path: &str) -> StoreResult<()> {
        let full = self.root.join(path);
        match fs::remove_dir_all(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::DeltaNotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delta_superblock(&self, name: &DeltaName) -> StoreResult<Vec<u8>> {
        let path = self.root.join(name.path(Some(SUPERBLOCK)));
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::DeltaNotFound(name.to_string()),
            _ => e.into(),
        })
    }

    fn prune(&self, options: &PruneOptions) -> StoreResult<PruneStats> {
        let loose = self.loose_objects()?;
        let commits = loose
            .iter()
            .filter(|o| o.kind == ObjectKind::Commit)
            .map(|o| o.id)
            .collect::<Vec<_>>();
        let reachable = reachable_objects(self, options, commits)?;

        let mut stats = PruneStats::default();
        for object in loose {
            stats.objects_total += 1;
            if reachable.contains(&(object.kind, object.id)) {
                continue;
            }
            stats.objects_pruned += 1;
            stats.bytes_freed += object.size;
            if !options.dry_run {
                remove_if_exists(&object.path)?;
            }
        }
        info!(
            total = stats.objects_total,
            pruned = stats.objects_pruned,
            freed = stats.bytes_freed,
            dry_run = options.dry_run,
            "prune finished"
        );
        Ok(stats)
    }
}

impl ObjectAccess for FsRepository {
    fn read_object(&self, kind: ObjectKind, id: &ObjectId) -> StoreResult<Vec<u8>> {
        fs::read(self.object_path(kind, id)).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::ObjectNotFound(*id),
            _ => e.into(),
        })
    }

    fn write_object(&self, kind: ObjectKind, data: &[u8]) -> StoreResult<ObjectId> {
        let id = kind.compute_id(data);
        let path = self.object_path(kind, &id);
        if !path.exists() {
            write_atomic(&path, data)?;
        }
        Ok(id)
    }

    fn set_ref(&self, name: &str, target: Option<&CommitId>) -> StoreResult<()> {
        let path = self.ref_path(name)?;
        match target {
            Some(id) => write_atomic(&path, format!("{id}\n").as_bytes()),
            None => remove_if_exists(&path),
        }
    }
}

impl RepoConfig for FsRepository {
    fn get_scalar(&self, key: &ConfigKey) -> StoreResult<Option<String>> {
        Ok(self.read_config()?.get(key))
    }

    fn set_scalar(&self, key: &ConfigKey, value: Option<&str>) -> StoreResult<()> {
        let _guard = self
            .config_lock
            .lock()
            .map_err(|e| StoreError::Config(format!("lock poisoned: {e}")))?;
        let mut doc = self.read_config()?;
        doc.set(key, value)?;
        self.write_config(&doc)
    }

    fn scalars(&self) -> StoreResult<BTreeMap<String, String>> {
        Ok(self.read_config()?.scalars())
    }
}

impl RepoOps for FsRepository {
    fn refresh_catalog(&self, options: &CatalogOptions) -> StoreResult<CatalogReport> {
        refresh_catalogs(self, options)
    }

    fn refresh_summary(&self, options: &SummaryOptions) -> StoreResult<SummaryReport> {
        let report = self.write_summary_files(options)?;
        info!(refs = report.refs, deltas = report.deltas, "summary updated");
        Ok(report)
    }
}

/// Write `data` to a temporary file next to `path`, then rename it over
/// `path`.
fn write_atomic(path: &Path, data: &[u8]) -> StoreResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    make_world_readable(tmp.path(), 0o644)?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> StoreResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            warn!(path = %path.display(), "failed to remove: {e}");
            Err(e.into())
        }
    }
}

/// Temporary files are created private; published repository content is not.
#[cfg(unix)]
fn make_world_readable(path: &Path, mode: u32) -> StoreResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_world_readable(_path: &Path, _mode: u32) -> StoreResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{decode_part, Superblock, PARAM_INLINE_PARTS, PARAM_MIN_FALLBACK_SIZE};
    use crate::object::DirTree;
    use crate::summary::SummaryIndex;
    use brepo_types::DeltaProfile;

    fn temp_repo() -> (tempfile::TempDir, FsRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsRepository::init(dir.path().join("repo")).unwrap();
        (dir, repo)
    }

    /// Commit a tree with one file whose content is `content`.
    fn commit(repo: &FsRepository, parent: Option<CommitId>, content: &str, ts: u64) -> CommitId {
        let file = repo.write_file(content.as_bytes()).unwrap();
        let shared = repo.write_file(b"shared runtime data").unwrap();
        let lib = repo.write_dirtree(&DirTree::new().with_file("libshared.so", shared)).unwrap();
        let tree = repo
            .write_dirtree(&DirTree::new().with_file("main", file).with_dir("lib", lib))
            .unwrap();
        let mut record = CommitRecord::new(parent, ts, format!("build {content}"));
        record.root_tree = Some(tree);
        repo.write_commit(&record).unwrap()
    }

    fn params() -> DeltaParams {
        DeltaParams::new(DeltaProfile::Major).with(PARAM_MIN_FALLBACK_SIZE, 1)
    }

    #[test]
    fn init_then_open() {
        let (dir, _repo) = temp_repo();
        let path = dir.path().join("repo");
        assert!(matches!(FsRepository::init(&path), Err(StoreError::AlreadyExists(_))));
        assert!(FsRepository::open(&path).is_ok());
        assert!(matches!(
            FsRepository::open(dir.path().join("missing")),
            Err(StoreError::NotARepository(_))
        ));
    }

    #[test]
    fn refs_roundtrip_with_nested_names() {
        let (_dir, repo) = temp_repo();
        let c = commit(&repo, None, "v1", 1);
        repo.set_ref("app/org.x.Tool/x86_64/stable", Some(&c)).unwrap();
        repo.set_ref("appstream2/x86_64", Some(&c)).unwrap();
        let refs = repo.list_refs().unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs["app/org.x.Tool/x86_64/stable"], c);

        repo.set_ref("appstream2/x86_64", None).unwrap();
        assert_eq!(repo.list_refs().unwrap().len(), 1);
        assert!(repo.set_ref("../escape", Some(&c)).is_err());
    }

    #[test]
    fn load_commit_reports_missing() {
        let (_dir, repo) = temp_repo();
        let missing = CommitId::from_hash([5; 32]);
        assert!(matches!(repo.load_commit(&missing), Err(StoreError::CommitNotFound(id)) if id == missing));
        let c = commit(&repo, None, "v1", 7);
        let record = repo.load_commit(&c).unwrap();
        assert_eq!(record.id, c);
        assert_eq!(record.timestamp, 7);
    }

    #[test]
    fn generate_list_and_delete_deltas() {
        let (_dir, repo) = temp_repo();
        let a = commit(&repo, None, "v1", 1);
        let b = commit(&repo, Some(a), "v2", 2);

        repo.generate_delta(None, &b, &params()).unwrap();
        repo.generate_delta(Some(&a), &b, &params()).unwrap();
        let listed = repo.list_deltas().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains(&DeltaName::full(b)));
        assert!(listed.contains(&DeltaName::incremental(a, b)));

        let path = DeltaName::incremental(a, b).path(None);
        repo.delete_delta_tree(&path).unwrap();
        assert!(matches!(repo.delete_delta_tree(&path), Err(StoreError::DeltaNotFound(_))));
        assert_eq!(repo.list_deltas().unwrap(), vec![DeltaName::full(b)]);
    }

    #[test]
    fn incremental_delta_carries_only_new_objects() {
        let (_dir, repo) = temp_repo();
        let a = commit(&repo, None, "v1", 1);
        let b = commit(&repo, Some(a), "v2", 2);
        repo.generate_delta(None, &b, &params()).unwrap();
        repo.generate_delta(Some(&a), &b, &params()).unwrap();

        let full = Superblock::from_bytes(&repo.delta_superblock(&DeltaName::full(b)).unwrap()).unwrap();
        let incr =
            Superblock::from_bytes(&repo.delta_superblock(&DeltaName::incremental(a, b)).unwrap()).unwrap();
        let count = |sb: &Superblock| sb.parts.iter().map(|p| p.objects).sum::<u64>();
        // commit, root tree, lib tree, main file, shared file
        assert_eq!(count(&full), 5);
        // commit, root tree, main file
        assert_eq!(count(&incr), 3);
        assert_eq!(incr.from, Some(a));
        assert_eq!(incr.timestamp, 2);

        let part_path = repo.path().join(DeltaName::full(b).path(Some("0")));
        let objects = decode_part(&fs::read(part_path).unwrap()).unwrap();
        assert!(objects.iter().any(|(kind, id, _)| *kind == ObjectKind::Commit && *id == b));
    }

    #[test]
    fn regeneration_is_byte_identical() {
        let (_dir, repo) = temp_repo();
        let a = commit(&repo, None, "v1", 1);
        repo.generate_delta(None, &a, &params()).unwrap();
        let first = repo.delta_superblock(&DeltaName::full(a)).unwrap();
        repo.delete_delta_tree(&DeltaName::full(a).path(None)).unwrap();
        repo.generate_delta(None, &a, &params()).unwrap();
        assert_eq!(repo.delta_superblock(&DeltaName::full(a)).unwrap(), first);
    }

    #[test]
    fn inline_parts_write_no_part_files() {
        let (_dir, repo) = temp_repo();
        let a = commit(&repo, None, "v1", 1);
        repo.generate_delta(None, &a, &params().with(PARAM_INLINE_PARTS, true)).unwrap();
        let sb = Superblock::from_bytes(&repo.delta_superblock(&DeltaName::full(a)).unwrap()).unwrap();
        assert!(sb.parts.iter().all(|p| p.inline.is_some()));
        assert!(!repo.path().join(DeltaName::full(a).path(Some("0"))).exists());
    }

    #[test]
    fn large_objects_become_fallbacks() {
        let (_dir, repo) = temp_repo();
        let big = vec![7u8; 1024 * 1024 + 1];
        let file = repo.write_file(&big).unwrap();
        let tree = repo.write_dirtree(&DirTree::new().with_file("big", file)).unwrap();
        let mut record = CommitRecord::new(None, 1, "big");
        record.root_tree = Some(tree);
        let c = repo.write_commit(&record).unwrap();

        repo.generate_delta(None, &c, &params()).unwrap();
        let sb = Superblock::from_bytes(&repo.delta_superblock(&DeltaName::full(c)).unwrap()).unwrap();
        assert_eq!(sb.fallbacks.len(), 1);
        assert_eq!(sb.fallbacks[0].id, file);
    }

    #[test]
    fn staging_leftovers_are_not_listed() {
        let (_dir, repo) = temp_repo();
        fs::create_dir_all(repo.path().join(DELTAS_DIR).join(".tmp-delta-abc")).unwrap();
        assert!(repo.list_deltas().unwrap().is_empty());
    }

    #[test]
    fn staging_leftovers_are_removed_and_deltas_kept() {
        let (_dir, repo) = temp_repo();
        assert_eq!(repo.remove_staging_leftovers().unwrap(), 0);

        let a = commit(&repo, None, "v1", 1);
        repo.generate_delta(None, &a, &params()).unwrap();
        let leftover = repo.path().join(DELTAS_DIR).join(".tmp-delta-abc");
        fs::create_dir_all(&leftover).unwrap();
        fs::write(leftover.join(SUPERBLOCK), b"partial").unwrap();

        assert_eq!(repo.remove_staging_leftovers().unwrap(), 1);
        assert!(!leftover.exists());
        assert_eq!(repo.list_deltas().unwrap(), vec![DeltaName::full(a)]);
    }

    #[test]
    fn prune_respects_depth() {
        let (_dir, repo) = temp_repo();
        let a = commit(&repo, None, "v1", 1);
        let b = commit(&repo, Some(a), "v2", 2);
        let c = commit(&repo, Some(b), "v3", 3);
        repo.set_ref("app/org.x.Tool/x86_64/stable", Some(&c)).unwrap();
        let orphan = repo.write_file(b"orphan").unwrap();

        let dry = repo
            .prune(&PruneOptions { refs_only: true, depth: 0, dry_run: true })
            .unwrap();
        // a, b, their main files, their root trees, the orphan file
        assert_eq!(dry.objects_pruned, 7);
        assert!(repo.read_object(ObjectKind::File, &orphan).is_ok());

        let unbounded = repo.prune(&PruneOptions::default()).unwrap();
        assert_eq!(unbounded.objects_pruned, 1);
        assert!(repo.read_object(ObjectKind::File, &orphan).is_err());
        assert!(repo.load_commit(&a).is_ok());

        let shallow = repo
            .prune(&PruneOptions { refs_only: true, depth: 0, dry_run: false })
            .unwrap();
        assert_eq!(shallow.objects_pruned, 6);
        assert!(repo.load_commit(&c).is_ok());
        assert!(repo.load_commit(&b).is_err());
        assert_eq!(shallow.objects_total, unbounded.objects_total - 1);
    }

    #[test]
    fn config_scalars_persist() {
        let (dir, repo) = temp_repo();
        repo.set_scalar(&ConfigKey::CollectionId, Some("org.example.A")).unwrap();
        repo.set_scalar(&ConfigKey::Title, Some("Example")).unwrap();
        let reopened = FsRepository::open(dir.path().join("repo")).unwrap();
        assert_eq!(reopened.collection_id().unwrap().as_deref(), Some("org.example.A"));
        assert_eq!(reopened.scalars().unwrap().len(), 2);
    }

    #[test]
    fn summary_lists_refs_and_deltas() {
        let (_dir, repo) = temp_repo();
        let a = commit(&repo, None, "v1", 1);
        repo.set_ref("app/org.x.Tool/x86_64/stable", Some(&a)).unwrap();
        repo.generate_delta(None, &a, &params()).unwrap();

        let report = repo
            .refresh_summary(&SummaryOptions { index: true, now: 10 })
            .unwrap();
        assert_eq!(report, SummaryReport { refs: 1, deltas: 1, subsummaries: 1 });
        let summary = Summary::from_bytes(&fs::read(repo.path().join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(summary.refs["app/org.x.Tool/x86_64/stable"].commit, a);
        assert!(summary.deltas.contains_key(&a.to_hex()));
        let index =
            SummaryIndex::from_bytes(&fs::read(repo.path().join(SUMMARY_INDEX_FILE)).unwrap()).unwrap();
        let digest = &index.subsummaries["x86_64"];
        assert!(repo.path().join(SUBSUMMARIES_DIR).join(format!("{digest}.sub")).exists());

        repo.refresh_summary(&SummaryOptions { index: false, now: 11 }).unwrap();
        assert!(!repo.path().join(SUMMARY_INDEX_FILE).exists());
        assert_eq!(fs::read_dir(repo.path().join(SUBSUMMARIES_DIR)).unwrap().count(), 0);
    }

    #[test]
    fn catalog_refresh_is_idempotent() {
        let (_dir, repo) = temp_repo();
        let a = commit(&repo, None, "v1", 1);
        repo.set_ref("app/org.x.Tool/x86_64/stable", Some(&a)).unwrap();

        let first = repo.refresh_catalog(&CatalogOptions { now: 100 }).unwrap();
        assert_eq!(first.updated, vec!["appstream2/x86_64".to_string()]);
        let tip = repo.list_refs().unwrap()["appstream2/x86_64"];

        let second = repo.refresh_catalog(&CatalogOptions { now: 200 }).unwrap();
        assert!(second.updated.is_empty());
        assert_eq!(second.unchanged, vec!["appstream2/x86_64".to_string()]);
        assert_eq!(repo.list_refs().unwrap()["appstream2/x86_64"], tip);

        let b = commit(&repo, Some(a), "v2", 2);
        repo.set_ref("app/org.x.Tool/x86_64/stable", Some(&b)).unwrap();
        repo.refresh_catalog(&CatalogOptions { now: 300 }).unwrap();
        let new_tip = repo.list_refs().unwrap()["appstream2/x86_64"];
        assert_ne!(new_tip, tip);
        assert_eq!(repo.load_commit(&new_tip).unwrap().parent, Some(tip));
    }
}
