//! Bounded-parallel execution of delta jobs.

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};

use brepo_types::DeltaName;

use crate::cancel::CancelToken;
use crate::error::DeltaResult;
use crate::job::DeltaJob;
use crate::launcher::WorkerLauncher;

/// A job whose worker did not succeed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerFailure {
    /// `ref (from-to)` of the failed job.
    pub job: String,
    pub error: String,
}

impl fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.job, self.error)
    }
}

/// Outcome of a batch. Failures are recorded, never raised.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DriverReport {
    pub generated: Vec<DeltaName>,
    pub failures: Vec<WorkerFailure>,
    /// Jobs never dispatched because the run was cancelled.
    pub skipped: usize,
    pub cancelled: bool,
}

/// Runs delta jobs through a [`WorkerLauncher`], at most `limit` at a time.
pub struct JobDriver {
    launcher: Arc<dyn WorkerLauncher>,
    limit: usize,
}

impl JobDriver {
    pub fn new(launcher: Arc<dyn WorkerLauncher>, limit: usize) -> Self {
        Self {
            launcher,
            limit: limit.max(1),
        }
    }

    /// Dispatch every job, then wait for all workers to finish.
    ///
    /// Once `cancel` fires no further jobs are dispatched. Workers already
    /// running are awaited, never killed.
    pub async fn run(&self, jobs: Vec<DeltaJob>, cancel: &CancelToken) -> DriverReport {
        let mut report = DriverReport::default();
        let mut pending = jobs.into_iter();
        let mut live: JoinSet<(DeltaJob, DeltaResult<()>)> = JoinSet::new();

        loop {
            if cancel.is_cancelled() {
                report.cancelled = true;
                report.skipped = pending.len();
                warn!(skipped = report.skipped, "cancelled; waiting for running workers");
                break;
            }
            if live.len() >= self.limit {
                if let Some(joined) = live.join_next().await {
                    record(&mut report, joined);
                }
                continue;
            }
            let Some(job) = pending.next() else {
                break;
            };
            info!("Generating delta: {job}");
            let launcher = Arc::clone(&self.launcher);
            live.spawn(async move {
                let result = launcher.run(&job).await;
                (job, result)
            });
        }

        while let Some(joined) = live.join_next().await {
            record(&mut report, joined);
        }
        report
    }
}

fn record(
    report: &mut DriverReport,
    joined: Result<(DeltaJob, DeltaResult<()>), tokio::task::JoinError>,
) {
    match joined {
        Ok((job, Ok(()))) => {
            info!("Generated delta: {job}");
            report.generated.push(job.name());
        }
        Ok((job, Err(e))) => {
            warn!("Failed to generate delta {job}: {e}");
            report.failures.push(WorkerFailure {
                job: job.to_string(),
                error: e.to_string(),
            });
        }
        Err(e) => {
            warn!("delta worker task failed: {e}");
            report.failures.push(WorkerFailure {
                job: "unknown job".into(),
                error: e.to_string(),
            });
        }
    }
}
