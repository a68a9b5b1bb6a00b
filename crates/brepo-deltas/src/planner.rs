//! Retention planning.
//!
//! For every kept ref with tip `T`, parent `P` and grandparent `G`:
//!
//! | name  | retained | generated when missing |
//! |-------|----------|------------------------|
//! | `T`   | yes      | yes                    |
//! | `P-T` | yes      | yes                    |
//! | `P`   | yes      | no                     |
//! | `G-P` | yes      | no                     |
//!
//! `P` and `G-P` are what the previous run generated. Keeping them lets a
//! client that started downloading them before the tip moved finish.
//! Existing deltas outside the retained set are unwanted.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use brepo_store::ObjectStore;
use brepo_types::{CommitId, DeltaName};

use crate::filter::RefFilter;
use crate::job::DeltaJob;

/// What a maintenance run should do with static deltas.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeltaPlan {
    /// Missing deltas to generate, full before incremental for each ref.
    pub generate: Vec<DeltaJob>,
    /// Every delta name that must survive this run.
    pub retain: BTreeSet<DeltaName>,
    /// Existing deltas outside `retain`.
    pub unwanted: BTreeSet<DeltaName>,
    /// Refs left out because a commit could not be loaded.
    pub warnings: Vec<String>,
}

/// Plan delta generation and retention for `refs`, given the deltas that
/// already `exist`.
///
/// A commit that cannot be loaded makes the planner skip the rest of that
/// ref with a warning. Its deltas then survive only if another ref retains
/// them.
pub fn plan_deltas<S>(
    store: &S,
    refs: &BTreeMap<String, CommitId>,
    existing: &BTreeSet<DeltaName>,
    filter: &RefFilter,
) -> DeltaPlan
where
    S: ObjectStore + ?Sized,
{
    let mut plan = DeltaPlan::default();
    let mut scheduled = BTreeSet::new();
    let mut schedule = |plan: &mut DeltaPlan, job: DeltaJob| {
        let name = job.name();
        if existing.contains(&name) || !scheduled.insert(name) {
            return;
        }
        debug!(delta = %name, refname = %job.refname, "scheduling static delta");
        plan.generate.push(job);
    };

    for (refname, tip) in refs {
        if filter.should_skip(refname) {
            continue;
        }
        let commit = match store.load_commit(tip) {
            Ok(commit) => commit,
            Err(e) => {
                warn!(refname = %refname, "cannot load tip {}: {e}", tip.short_hex());
                plan.warnings.push(format!("{refname}: {e}"));
                continue;
            }
        };

        schedule(&mut plan, DeltaJob::new(refname.as_str(), None, *tip));
        plan.retain.insert(DeltaName::full(*tip));

        let Some(parent) = commit.parent else {
            continue;
        };
        let parent_commit = match store.load_commit(&parent) {
            Ok(commit) => commit,
            Err(e) => {
                warn!(refname = %refname, "cannot load parent {}: {e}", parent.short_hex());
                plan.warnings.push(format!("{refname}: {e}"));
                continue;
            }
        };

        schedule(&mut plan, DeltaJob::new(refname.as_str(), Some(parent), *tip));
        plan.retain.insert(DeltaName::incremental(parent, *tip));
        plan.retain.insert(DeltaName::full(parent));
        if let Some(grandparent) = parent_commit.parent {
            plan.retain.insert(DeltaName::incremental(grandparent, parent));
        }
    }

    plan.unwanted = existing.difference(&plan.retain).copied().collect();
    debug!(
        generate = plan.generate.len(),
        retain = plan.retain.len(),
        unwanted = plan.unwanted.len(),
        "static delta plan ready"
    );
    plan
}
