//! The `update-repo` sequence.
//!
//! 1. open the repository
//! 2. in worker mode, generate the one requested delta and stop
//! 3. apply metadata changes
//! 4. regenerate catalogs
//! 5. plan, generate, then delete static deltas
//! 6. regenerate the summary
//! 7. prune
//!
//! Steps 3, 4, 6 and 7 stop the run on failure. Inside step 5 individual
//! worker and deletion failures are only reported.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use brepo_deltas::{
    delete_unwanted, plan_deltas, CancelToken, DeleteReport, DriverReport, InProcessLauncher,
    JobDriver, RefFilter, SelfExecLauncher, WorkerLauncher,
};
use brepo_store::{
    CatalogOptions, CatalogReport, ConfigKey, FsRepository, Repository, SummaryOptions,
    SummaryReport,
};
use brepo_types::DeltaName;

use crate::error::{UpdateError, UpdateResult};
use crate::metadata::apply_metadata;
use crate::options::{UpdateOptions, WorkerRequest};
use crate::prune::{run_prune, PruneSummary};
use crate::worker::generate_single_delta;

/// What a run produced. Soft failures are listed here rather than returned
/// as errors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub metadata: Vec<ConfigKey>,
    pub catalog: Option<CatalogReport>,
    pub deltas: Option<DeltaReport>,
    pub summary: Option<SummaryReport>,
    pub prune: Option<PruneSummary>,
}

impl UpdateReport {
    /// Number of soft failures recorded during delta work.
    pub fn soft_failures(&self) -> usize {
        self.deltas.as_ref().map_or(0, |d| {
            d.warnings.len() + d.generation.failures.len() + d.deletion.failures.len()
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeltaReport {
    pub retained: BTreeSet<DeltaName>,
    /// Refs skipped because a commit could not be loaded.
    pub warnings: Vec<String>,
    pub generation: DriverReport,
    pub deletion: DeleteReport,
}

/// Runs the maintenance sequence against one open repository.
pub struct Orchestrator<R: ?Sized> {
    repo: Arc<R>,
    launcher: Arc<dyn WorkerLauncher>,
    cancel: CancelToken,
    now: u64,
}

impl<R> Orchestrator<R>
where
    R: Repository + ?Sized + 'static,
{
    pub fn new(repo: Arc<R>, launcher: Arc<dyn WorkerLauncher>) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            repo,
            launcher,
            cancel: CancelToken::new(),
            now,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Timestamp used for new catalog commits and the summary.
    pub fn with_timestamp(mut self, now: u64) -> Self {
        self.now = now;
        self
    }

    pub async fn run(&self, options: &UpdateOptions) -> UpdateResult<UpdateReport> {
        options.validate()?;
        let mut report = UpdateReport {
            metadata: apply_metadata(self.repo.as_ref(), &options.metadata)?,
            ..Default::default()
        };

        if !options.no_update_appstream {
            info!("Updating appstream branches");
            let catalog = self
                .repo
                .refresh_catalog(&CatalogOptions { now: self.now })
                .map_err(UpdateError::Catalog)?;
            report.catalog = Some(catalog);
        }

        if options.generate_deltas {
            report.deltas = Some(self.update_deltas(options).await?);
        }

        if !options.no_update_summary {
            info!("Updating summary");
            let summary = self
                .repo
                .refresh_summary(&SummaryOptions {
                    index: !options.no_summary_index,
                    now: self.now,
                })
                .map_err(UpdateError::Summary)?;
            report.summary = Some(summary);
        }

        if options.should_prune() {
            report.prune = Some(run_prune(self.repo.as_ref(), &options.prune_options())?);
        }

        Ok(report)
    }

    async fn update_deltas(&self, options: &UpdateOptions) -> UpdateResult<DeltaReport> {
        let filter = RefFilter::with_patterns(&options.ignore_ref).map_err(UpdateError::Plan)?;
        let refs = self
            .repo
            .list_refs()
            .map_err(|e| UpdateError::Plan(e.into()))?;
        let existing: BTreeSet<DeltaName> = self
            .repo
            .list_deltas()
            .map_err(|e| UpdateError::Plan(e.into()))?
            .into_iter()
            .collect();

        let plan = plan_deltas(self.repo.as_ref(), &refs, &existing, &filter);
        info!(
            generate = plan.generate.len(),
            unwanted = plan.unwanted.len(),
            "Planned static deltas"
        );

        let driver = JobDriver::new(Arc::clone(&self.launcher), options.resolved_jobs());
        let generation = driver.run(plan.generate, &self.cancel).await;
        if generation.cancelled {
            return Err(UpdateError::Cancelled);
        }
        for failure in &generation.failures {
            warn!("{failure}");
        }

        let deletion = delete_unwanted(self.repo.as_ref(), &plan.unwanted, &self.cancel);
        if deletion.cancelled {
            return Err(UpdateError::Cancelled);
        }

        Ok(DeltaReport {
            retained: plan.retain,
            warnings: plan.warnings,
            generation,
            deletion,
        })
    }
}

/// How delta jobs are executed by [`update_repo`].
#[derive(Clone, Debug, Default)]
pub enum LaunchMode {
    /// A worker process of the running executable per job.
    #[default]
    CurrentExe,
    /// A worker process of `program` per job, with `leading_args` placed
    /// before the subcommand.
    Program {
        program: PathBuf,
        leading_args: Vec<String>,
    },
    /// Blocking threads in this process.
    InProcess,
}

/// Result of [`update_repo`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Worker mode generated this delta.
    Worker(DeltaName),
    Maintenance(UpdateReport),
}

/// Open the repository at `path` and run either worker mode (when
/// `worker` is given) or the full maintenance sequence.
pub async fn update_repo(
    path: &Path,
    options: &UpdateOptions,
    worker: Option<&WorkerRequest>,
    launch: LaunchMode,
    cancel: CancelToken,
) -> UpdateResult<Outcome> {
    let repo = FsRepository::open(path).map_err(|source| UpdateError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(request) = worker {
        return generate_single_delta(&repo, request).map(Outcome::Worker);
    }

    match repo.remove_staging_leftovers() {
        Ok(0) => {}
        Ok(removed) => info!(removed, "Removed stale delta staging directories"),
        Err(e) => warn!("Unable to clean delta staging directories: {e}"),
    }

    let repo = Arc::new(repo);
    let launcher: Arc<dyn WorkerLauncher> = match launch {
        LaunchMode::CurrentExe => {
            Arc::new(SelfExecLauncher::current_exe(path).map_err(UpdateError::Launch)?)
        }
        LaunchMode::Program {
            program,
            leading_args,
        } => Arc::new(SelfExecLauncher::new(program, path).with_leading_args(leading_args)),
        LaunchMode::InProcess => Arc::new(InProcessLauncher::new(Arc::clone(&repo))),
    };

    Orchestrator::new(repo, launcher)
        .with_cancel(cancel)
        .run(options)
        .await
        .map(Outcome::Maintenance)
}
