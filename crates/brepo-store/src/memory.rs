use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use brepo_types::{CommitId, CommitRecord, DeltaName, DeltaParams, ObjectId};

use crate::catalog::refresh_catalogs;
use crate::config::{ConfigDocument, ConfigKey};
use crate::delta::encode_delta;
use crate::error::{StoreError, StoreResult};
use crate::names::validate_ref_name;
use crate::object::{reachable_objects, read_commit, ObjectKind};
use crate::summary::Summary;
use crate::traits::{
    CatalogOptions, CatalogReport, ObjectAccess, ObjectStore, PruneOptions, PruneStats, RepoConfig,
    RepoOps, SummaryOptions, SummaryReport,
};

/// A mutating call observed by [`InMemoryRepository`], in call order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RepoEvent {
    ConfigSet { key: String, value: Option<String> },
    CatalogRefreshed,
    DeltaGenerated { name: DeltaName, params: DeltaParams },
    DeltaDeleted(String),
    SummaryRefreshed { index: bool },
    Pruned(PruneOptions),
}

/// In-memory repository.
///
/// Intended for tests. Records every mutating call as a [`RepoEvent`] and can
/// be told to fail delta generation for chosen targets.
pub struct InMemoryRepository {
    objects: RwLock<HashMap<(ObjectKind, ObjectId), Vec<u8>>>,
    refs: RwLock<BTreeMap<String, CommitId>>,
    /// Delta name mapped to its superblock.
    deltas: RwLock<BTreeMap<DeltaName, Vec<u8>>>,
    config: RwLock<ConfigDocument>,
    events: RwLock<Vec<RepoEvent>>,
    failing_targets: RwLock<BTreeSet<CommitId>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            refs: RwLock::new(BTreeMap::new()),
            deltas: RwLock::new(BTreeMap::new()),
            config: RwLock::new(ConfigDocument::new_repository()),
            events: RwLock::new(Vec::new()),
            failing_targets: RwLock::new(BTreeSet::new()),
        }
    }

    /// Every mutating call so far.
    pub fn events(&self) -> Vec<RepoEvent> {
        self.events.read().expect("lock poisoned").clone()
    }

    pub fn clear_events(&self) {
        self.events.write().expect("lock poisoned").clear();
    }

    /// Make every later `generate_delta` whose target is `to` fail.
    pub fn fail_deltas_to(&self, to: CommitId) {
        self.failing_targets.write().expect("lock poisoned").insert(to);
    }

    /// Register a delta without encoding it, as if left by an earlier run.
    pub fn insert_delta(&self, name: DeltaName) {
        self.deltas
            .write()
            .expect("lock poisoned")
            .insert(name, Vec::new());
    }

    /// Write a commit with a one-file tree and return its id.
    pub fn commit(&self, parent: Option<CommitId>, timestamp: u64, content: &str) -> StoreResult<CommitId> {
        let file = self.write_file(content.as_bytes())?;
        let tree = self.write_dirtree(&crate::object::DirTree::new().with_file("content", file))?;
        let mut record = CommitRecord::new(parent, timestamp, content);
        record.root_tree = Some(tree);
        self.write_commit(&record)
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    fn record(&self, event: RepoEvent) {
        self.events.write().expect("lock poisoned").push(event);
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryRepository {
    fn list_refs(&self) -> StoreResult<BTreeMap<String, CommitId>> {
        Ok(self.refs.read().expect("lock poisoned").clone())
    }

    fn load_commit(&self, id: &CommitId) -> StoreResult<CommitRecord> {
        read_commit(self, id)
    }

    fn list_deltas(&self) -> StoreResult<Vec<DeltaName>> {
        Ok(self.deltas.read().expect("lock poisoned").keys().copied().collect())
    }

    fn generate_delta(
        &self,
        from: Option<&CommitId>,
        to: &CommitId,
        params: &DeltaParams,
    ) -> StoreResult<()> {
        if self.failing_targets.read().expect("lock poisoned").contains(to) {
            return Err(StoreError::Io(std::io::Error::other("injected delta failure")));
        }
        let encoded = encode_delta(self, from, to, params)?;
        let name = DeltaName { from: from.copied(), to: *to };
        self.deltas
            .write()
            .expect("lock poisoned")
            .entry(name)
            .or_insert(encoded.superblock);
        self.record(RepoEvent::DeltaGenerated {
            name,
            params: params.clone(),
        });
        Ok(())
    }

    fn delete_delta_tree(&self, path: &str) -> StoreResult<()> {
        let mut deltas = self.deltas.write().expect("lock poisoned");
        let name = deltas
            .keys()
            .find(|name| name.path(None) == path)
            .copied()
            .ok_or_else(|| StoreError::DeltaNotFound(path.to_string()))?;
        deltas.remove(&name);
        drop(deltas);
        self.record(RepoEvent::DeltaDeleted(path.to_string()));
        Ok(())
    }

    fn delta_superblock(&self, name: &DeltaName) -> StoreResult<Vec<u8>> {
        self.deltas
            .read()
            .expect("lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::DeltaNotFound(name.to_string()))
    }

    fn prune(&self, options: &PruneOptions) -> StoreResult<PruneStats> {
        let commits: Vec<CommitId> = self
            .objects
            .read()
            .expect("lock poisoned")
            .keys()
            .filter(|(kind, _)| *kind == ObjectKind::Commit)
            .map(|(_, id)| *id)
            .collect();
        let reachable = reachable_objects(self, options, commits)?;

        let mut objects = self.objects.write().expect("lock poisoned");
        let mut stats = PruneStats {
            objects_total: objects.len() as u64,
            ..Default::default()
        };
        let doomed: Vec<(ObjectKind, ObjectId)> = objects
            .keys()
            .filter(|key| !reachable.contains(key))
            .copied()
            .collect();
        for key in doomed {
            stats.objects_pruned += 1;
            stats.bytes_freed += objects.get(&key).map_or(0, |d| d.len() as u64);
            if !options.dry_run {
                objects.remove(&key);
            }
        }
        drop(objects);
        self.record(RepoEvent::Pruned(options.clone()));
        Ok(stats)
    }
}

impl ObjectAccess for InMemoryRepository {
    fn read_object(&self, kind: ObjectKind, id: &ObjectId) -> StoreResult<Vec<u8>> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(&(kind, *id))
            .cloned()
            .ok_or(StoreError::ObjectNotFound(*id))
    }

    fn write_object(&self, kind: ObjectKind, data: &[u8]) -> StoreResult<ObjectId> {
        let id = kind.compute_id(data);
        self.objects
            .write()
            .expect("lock poisoned")
            .entry((kind, id))
            .or_insert_with(|| data.to_vec());
        Ok(id)
    }

    fn set_ref(&self, name: &str, target: Option<&CommitId>) -> StoreResult<()> {
        validate_ref_name(name)?;
        let mut refs = self.refs.write().expect("lock poisoned");
        match target {
            Some(id) => {
                refs.insert(name.to_string(), *id);
            }
            None => {
                refs.remove(name);
            }
        }
        Ok(())
    }
}

impl RepoConfig for InMemoryRepository {
    fn get_scalar(&self, key: &ConfigKey) -> StoreResult<Option<String>> {
        Ok(self.config.read().expect("lock poisoned").get(key))
    }

    fn set_scalar(&self, key: &ConfigKey, value: Option<&str>) -> StoreResult<()> {
        self.config.write().expect("lock poisoned").set(key, value)?;
        self.record(RepoEvent::ConfigSet {
            key: key.to_string(),
            value: value.map(str::to_string),
        });
        Ok(())
    }

    fn scalars(&self) -> StoreResult<BTreeMap<String, String>> {
        Ok(self.config.read().expect("lock poisoned").scalars())
    }
}

impl RepoOps for InMemoryRepository {
    fn refresh_catalog(&self, options: &CatalogOptions) -> StoreResult<CatalogReport> {
        let report = refresh_catalogs(self, options)?;
        self.record(RepoEvent::CatalogRefreshed);
        Ok(report)
    }

    fn refresh_summary(&self, options: &SummaryOptions) -> StoreResult<SummaryReport> {
        let summary = Summary::collect(self, options.now)?;
        let rendered = summary.render(options.index)?;
        let report = SummaryReport {
            refs: summary.refs.len(),
            deltas: summary.deltas.len(),
            subsummaries: rendered.subsummaries.len(),
        };
        self.record(RepoEvent::SummaryRefreshed {
            index: options.index,
        });
        Ok(report)
    }
}
