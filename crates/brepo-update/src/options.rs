//! Options of a maintenance run.
//!
//! Options can be loaded from a TOML file using the same kebab-case names
//! as the command-line flags:
//!
//! ```toml
//! generate-deltas = true
//! jobs = 4
//! ignore-ref = ["org.example.*.Debug"]
//! prune = true
//! prune-depth = 3
//!
//! [metadata]
//! title = "Example Apps"
//! collection-id = "org.example.Apps"
//!
//! [metadata.authenticator-options]
//! realm = "example"
//! ```

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::Path;

use serde::{Deserialize, Serialize};

use brepo_store::{ConfigKey, PruneOptions};
use brepo_types::CommitId;

use crate::error::{UpdateError, UpdateResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UpdateOptions {
    /// Plan, generate and delete static deltas.
    pub generate_deltas: bool,
    /// Concurrent delta workers. `None` or non-positive means one per
    /// processor.
    pub jobs: Option<i64>,
    /// Globs matched against the id segment of bundle refs to exclude them
    /// from delta generation.
    pub ignore_ref: Vec<String>,
    pub prune: bool,
    /// Report what pruning would remove without removing it. Implies `prune`.
    pub prune_dry_run: bool,
    /// Parent links kept below each ref tip when pruning; `-1` keeps all.
    pub prune_depth: i32,
    pub no_update_summary: bool,
    pub no_update_appstream: bool,
    pub no_summary_index: bool,
    pub metadata: MetadataUpdates,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            generate_deltas: false,
            jobs: None,
            ignore_ref: Vec::new(),
            prune: false,
            prune_dry_run: false,
            prune_depth: -1,
            no_update_summary: false,
            no_update_appstream: false,
            no_summary_index: false,
            metadata: MetadataUpdates::default(),
        }
    }
}

impl UpdateOptions {
    pub fn from_toml_str(text: &str) -> UpdateResult<Self> {
        let options: Self = toml::from_str(text).map_err(|e| UpdateError::Options(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Reject values no run can honour.
    pub fn validate(&self) -> UpdateResult<()> {
        if self.prune_depth < -1 {
            return Err(UpdateError::Options(format!(
                "prune depth must be -1 (unbounded) or at least 0, got {}",
                self.prune_depth
            )));
        }
        Ok(())
    }

    pub fn from_toml_file(path: &Path) -> UpdateResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| UpdateError::Options(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
            .map_err(|e| UpdateError::Options(format!("{}: {e}", path.display())))
    }

    /// Effective worker limit.
    pub fn resolved_jobs(&self) -> usize {
        match self.jobs {
            Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
            _ => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        }
    }

    pub fn should_prune(&self) -> bool {
        self.prune || self.prune_dry_run
    }

    pub fn prune_options(&self) -> PruneOptions {
        PruneOptions {
            refs_only: true,
            depth: self.prune_depth,
            dry_run: self.prune_dry_run,
        }
    }
}

/// Scalar repository metadata to change. `None` leaves a key alone; an
/// empty string removes it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MetadataUpdates {
    pub title: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub icon: Option<String>,
    pub default_branch: Option<String>,
    pub redirect_url: Option<String>,
    pub collection_id: Option<String>,
    pub deploy_collection_id: Option<bool>,
    pub authenticator_name: Option<String>,
    pub authenticator_install: Option<bool>,
    pub authenticator_options: BTreeMap<String, String>,
}

impl MetadataUpdates {
    /// Requested changes in application order; `None` values remove a key.
    pub fn changes(&self) -> Vec<(ConfigKey, Option<String>)> {
        let text = |v: &Option<String>| v.as_ref().map(|s| (!s.is_empty()).then(|| s.clone()));
        let flag = |v: &Option<bool>| v.map(|b| Some(b.to_string()));

        let mut changes = Vec::new();
        for key in ConfigKey::SCALARS {
            let value = match key {
                ConfigKey::Title => text(&self.title),
                ConfigKey::Comment => text(&self.comment),
                ConfigKey::Description => text(&self.description),
                ConfigKey::Homepage => text(&self.homepage),
                ConfigKey::Icon => text(&self.icon),
                ConfigKey::DefaultBranch => text(&self.default_branch),
                ConfigKey::RedirectUrl => text(&self.redirect_url),
                ConfigKey::CollectionId => text(&self.collection_id),
                ConfigKey::DeployCollectionId => flag(&self.deploy_collection_id),
                ConfigKey::AuthenticatorName => text(&self.authenticator_name),
                ConfigKey::AuthenticatorInstall => flag(&self.authenticator_install),
                ConfigKey::AuthenticatorOption(_) => None,
            };
            if let Some(value) = value {
                changes.push((key, value));
            }
        }
        for (name, value) in &self.authenticator_options {
            let value = (!value.is_empty()).then(|| value.clone());
            changes.push((ConfigKey::AuthenticatorOption(name.clone()), value));
        }
        changes
    }

    /// The requested collection id: `Some(None)` to clear it.
    pub fn requested_collection_id(&self) -> Option<Option<&str>> {
        self.collection_id
            .as_deref()
            .map(|s| (!s.is_empty()).then_some(s))
    }
}

/// The single delta a worker invocation generates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerRequest {
    pub refname: String,
    pub from: Option<CommitId>,
    pub to: CommitId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let o = UpdateOptions::default();
        assert_eq!(o.prune_depth, -1);
        assert!(!o.should_prune());
        assert!(o.metadata.changes().is_empty());
        assert!(o.resolved_jobs() >= 1);
    }

    #[test]
    fn non_positive_jobs_use_processor_count() {
        let auto = UpdateOptions::default().resolved_jobs();
        for jobs in [Some(0), Some(-3), None] {
            let o = UpdateOptions { jobs, ..Default::default() };
            assert_eq!(o.resolved_jobs(), auto);
        }
        let o = UpdateOptions { jobs: Some(7), ..Default::default() };
        assert_eq!(o.resolved_jobs(), 7);
    }

    #[test]
    fn dry_run_implies_prune() {
        let o = UpdateOptions { prune_dry_run: true, prune_depth: 2, ..Default::default() };
        assert!(o.should_prune());
        assert_eq!(
            o.prune_options(),
            PruneOptions { refs_only: true, depth: 2, dry_run: true }
        );
    }

    #[test]
    fn parses_toml() {
        let o = UpdateOptions::from_toml_str(
            r#"
            generate-deltas = true
            jobs = 4
            ignore-ref = ["org.example.*"]
            prune-depth = 0

            [metadata]
            title = "Apps"
            deploy-collection-id = true

            [metadata.authenticator-options]
            realm = "example"
            "#,
        )
        .unwrap();
        assert!(o.generate_deltas);
        assert_eq!(o.jobs, Some(4));
        assert_eq!(o.ignore_ref, vec!["org.example.*".to_string()]);
        assert_eq!(o.prune_depth, 0);
        assert_eq!(o.metadata.title.as_deref(), Some("Apps"));
        assert_eq!(o.metadata.authenticator_options["realm"], "example");
    }

    #[test]
    fn prune_depth_below_minus_one_is_rejected() {
        let err = UpdateOptions::from_toml_str("prune-depth = -2").unwrap_err();
        assert!(err.to_string().contains("prune depth"), "{err}");
        assert!(UpdateOptions { prune_depth: -7, ..Default::default() }.validate().is_err());
        for depth in [-1, 0, 3] {
            assert!(UpdateOptions { prune_depth: depth, ..Default::default() }.validate().is_ok());
        }
    }

    #[test]
    fn bad_type_fails() {
        assert!(UpdateOptions::from_toml_str("jobs = \"many\"").is_err());
    }

    #[test]
    fn empty_string_clears_key() {
        let updates = MetadataUpdates {
            title: Some(String::new()),
            homepage: Some("https://example.org".into()),
            authenticator_install: Some(false),
            authenticator_options: BTreeMap::from([("realm".to_string(), String::new())]),
            ..Default::default()
        };
        assert_eq!(
            updates.changes(),
            vec![
                (ConfigKey::Title, None),
                (ConfigKey::Homepage, Some("https://example.org".to_string())),
                (ConfigKey::AuthenticatorInstall, Some("false".to_string())),
                (ConfigKey::AuthenticatorOption("realm".into()), None),
            ]
        );
    }

    #[test]
    fn requested_collection_id() {
        let mut updates = MetadataUpdates::default();
        assert_eq!(updates.requested_collection_id(), None);
        updates.collection_id = Some(String::new());
        assert_eq!(updates.requested_collection_id(), Some(None));
        updates.collection_id = Some("org.example.A".into());
        assert_eq!(updates.requested_collection_id(), Some(Some("org.example.A")));
    }
}
