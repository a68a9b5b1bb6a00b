use std::collections::BTreeSet;

use tracing::{info, warn};

use brepo_store::{ObjectStore, StoreError};
use brepo_types::DeltaName;

use crate::cancel::CancelToken;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteFailure {
    pub name: DeltaName,
    pub error: String,
    /// The delta was already gone.
    pub not_found: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: Vec<DeltaName>,
    pub failures: Vec<DeleteFailure>,
    pub cancelled: bool,
}

/// Remove every delta in `unwanted`. Failures are logged and reported; the
/// remaining deltas are still attempted.
pub fn delete_unwanted<S>(store: &S, unwanted: &BTreeSet<DeltaName>, cancel: &CancelToken) -> DeleteReport
where
    S: ObjectStore + ?Sized,
{
    let mut report = DeleteReport::default();
    for name in unwanted {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        info!("Deleting unwanted delta: {name}");
        match store.delete_delta_tree(&name.path(None)) {
            Ok(()) => report.deleted.push(*name),
            Err(e) => {
                let not_found = matches!(e, StoreError::DeltaNotFound(_));
                warn!("Unable to delete delta {name}: {e}");
                report.failures.push(DeleteFailure {
                    name: *name,
                    error: e.to_string(),
                    not_found,
                });
            }
        }
    }
    report
}
