//! Applying metadata changes to the repository configuration.

use tracing::info;

use brepo_store::{ConfigKey, RepoConfig};

use crate::error::{UpdateError, UpdateResult};
use crate::options::MetadataUpdates;

/// Check a collection-id transition. Once a repository has a collection id
/// it may be removed but never replaced by a different one.
pub fn check_collection_id(current: Option<&str>, requested: Option<&str>) -> UpdateResult<()> {
    match (current, requested) {
        (Some(current), Some(requested)) if !current.is_empty() && current != requested => {
            Err(UpdateError::Config(format!(
                "The collection ID of an existing repository cannot be changed. \
                 Recreate the repository to change the collection ID \
                 (current: {current}, requested: {requested})"
            )))
        }
        _ => Ok(()),
    }
}

/// Write every requested change to `repo`.
///
/// The collection-id rule is checked before anything is written, so a
/// rejected run leaves the configuration untouched. Returns the keys set.
pub fn apply_metadata<C>(repo: &C, updates: &MetadataUpdates) -> UpdateResult<Vec<ConfigKey>>
where
    C: RepoConfig + ?Sized,
{
    if let Some(requested) = updates.requested_collection_id() {
        let current = repo
            .collection_id()
            .map_err(|e| UpdateError::Config(format!("failed to read collection-id: {e}")))?;
        check_collection_id(current.as_deref(), requested)?;
    }

    let mut applied = Vec::new();
    for (key, value) in updates.changes() {
        repo.set_scalar(&key, value.as_deref())
            .map_err(|e| UpdateError::Config(format!("failed to set {key}: {e}")))?;
        match &value {
            Some(value) => info!("Set {key} to {value}"),
            None => info!("Unset {key}"),
        }
        applied.push(key);
    }
    Ok(applied)
}
