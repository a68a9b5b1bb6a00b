//! Catalog streams describing the applications in a repository.
//!
//! One catalog ref `appstream2/<arch>` per architecture points at a commit
//! whose tree holds a single JSON document listing that architecture's
//! applications. A refresh that produces the same document leaves the ref
//! untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use brepo_types::refs::{arch, branch, bundle_id};
use brepo_types::{CommitId, CommitRecord, RefKind};

use crate::error::StoreResult;
use crate::object::DirTree;
use crate::traits::{CatalogOptions, CatalogReport, ObjectAccess, ObjectStore};

/// Name of the catalog document inside a catalog commit's tree.
pub const CATALOG_FILE: &str = "appstream.json";
const CATALOG_SUBJECT: &str = "Update catalog";

/// One application as described in a catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub branch: String,
    pub commit: CommitId,
    pub subject: String,
    pub timestamp: u64,
    /// Human-readable name from the commit metadata, if any.
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub arch: String,
    pub applications: Vec<CatalogEntry>,
}

/// Rebuild every catalog ref of `store`.
pub fn refresh_catalogs<S>(store: &S, options: &CatalogOptions) -> StoreResult<CatalogReport>
where
    S: ObjectStore + ObjectAccess + ?Sized,
{
    let refs = store.list_refs()?;
    let mut documents: BTreeMap<String, CatalogDocument> = BTreeMap::new();

    // Existing catalogs are rewritten even when their last application is gone.
    for name in refs.keys() {
        if RefKind::classify(name) == RefKind::Catalog {
            if let Some(a) = arch(name) {
                documents.entry(a.to_string()).or_insert_with(|| CatalogDocument {
                    arch: a.to_string(),
                    ..Default::default()
                });
            }
        }
    }

    for (name, commit) in &refs {
        if RefKind::classify(name) != RefKind::Application {
            continue;
        }
        let (Some(id), Some(a), Some(br)) = (bundle_id(name), arch(name), branch(name)) else {
            debug!(refname = %name, "skipping malformed application ref");
            continue;
        };
        let record = match store.load_commit(commit) {
            Ok(record) => record,
            Err(e) => {
                warn!(refname = %name, "leaving application out of catalog: {e}");
                continue;
            }
        };
        documents
            .entry(a.to_string())
            .or_insert_with(|| CatalogDocument {
                arch: a.to_string(),
                ..Default::default()
            })
            .applications
            .push(CatalogEntry {
                id: id.to_string(),
                branch: br.to_string(),
                commit: *commit,
                subject: record.subject.clone(),
                timestamp: record.timestamp,
                name: record.metadata.get("name").cloned(),
            });
    }

    let mut report = CatalogReport::default();
    for (a, document) in documents {
        let catalog_ref = RefKind::catalog_ref(&a);
        let file = store.write_file(&serde_json::to_vec_pretty(&document)?)?;
        let tree = store.write_dirtree(&DirTree::new().with_file(CATALOG_FILE, file))?;

        let parent = refs.get(&catalog_ref).copied();
        if let Some(parent) = parent {
            match store.load_commit(&parent) {
                Ok(previous) if previous.root_tree == Some(tree) => {
                    debug!(refname = %catalog_ref, "catalog unchanged");
                    report.unchanged.push(catalog_ref);
                    continue;
                }
                Ok(_) => {}
                Err(e) => warn!(refname = %catalog_ref, "previous catalog commit unreadable: {e}"),
            }
        }

        let mut commit = CommitRecord::new(parent, options.now, CATALOG_SUBJECT);
        commit.root_tree = Some(tree);
        let id = store.write_commit(&commit)?;
        store.set_ref(&catalog_ref, Some(&id))?;
        info!(refname = %catalog_ref, commit = %id.short_hex(), "updated catalog");
        report.updated.push(catalog_ref);
    }
    Ok(report)
}
