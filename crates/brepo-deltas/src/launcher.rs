//! How a single delta job is executed.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use brepo_store::ObjectStore;

use crate::error::{DeltaError, DeltaResult};
use crate::job::DeltaJob;

/// Subcommand and flags understood by the worker mode of the binary.
pub const UPDATE_REPO_COMMAND: &str = "update-repo";
pub const WORKER_REF_FLAG: &str = "--generate-static-delta-ref";
pub const WORKER_TO_FLAG: &str = "--generate-static-delta-to";
pub const WORKER_FROM_FLAG: &str = "--generate-static-delta-from";

/// Runs one delta job to completion.
#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    async fn run(&self, job: &DeltaJob) -> DeltaResult<()>;
}

/// Runs each job in a fresh process of the given program, which reopens
/// the repository and generates exactly one delta.
#[derive(Clone, Debug)]
pub struct SelfExecLauncher {
    program: PathBuf,
    repo: PathBuf,
    leading_args: Vec<OsString>,
}

impl SelfExecLauncher {
    pub fn new(program: impl Into<PathBuf>, repo: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            repo: repo.into(),
            leading_args: Vec::new(),
        }
    }

    /// Launch the currently running executable.
    pub fn current_exe(repo: impl Into<PathBuf>) -> DeltaResult<Self> {
        let program = std::env::current_exe().map_err(|e| DeltaError::Launch(e.to_string()))?;
        Ok(Self::new(program, repo))
    }

    /// Global arguments placed before the subcommand (e.g. `--verbose`).
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Arguments for the worker invocation of `job`.
    pub fn worker_args(&self, job: &DeltaJob) -> Vec<OsString> {
        let mut args = self.leading_args.clone();
        args.push(UPDATE_REPO_COMMAND.into());
        args.push(WORKER_REF_FLAG.into());
        args.push(job.refname.clone().into());
        args.push(WORKER_TO_FLAG.into());
        args.push(job.to.to_hex().into());
        if let Some(from) = &job.from {
            args.push(WORKER_FROM_FLAG.into());
            args.push(from.to_hex().into());
        }
        args.push(self.repo.clone().into_os_string());
        args
    }
}

#[async_trait]
impl WorkerLauncher for SelfExecLauncher {
    async fn run(&self, job: &DeltaJob) -> DeltaResult<()> {
        let args = self.worker_args(job);
        debug!(program = %self.program.display(), ?args, "spawning delta worker");
        let mut command = Command::new(&self.program);
        command.args(&args).stdin(Stdio::null());
        // A terminal Ctrl-C must reach only the parent, which lets running
        // workers finish their delta.
        #[cfg(unix)]
        command.process_group(0);
        let status = command
            .status()
            .await
            .map_err(|e| DeltaError::Launch(e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(DeltaError::WorkerExit(status.to_string()))
        }
    }
}

/// Generates deltas on the blocking thread pool of the current process.
///
/// Only for stores whose `generate_delta` is safe to call concurrently for
/// distinct deltas.
pub struct InProcessLauncher<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> InProcessLauncher<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S> WorkerLauncher for InProcessLauncher<S>
where
    S: ObjectStore + ?Sized + 'static,
{
    async fn run(&self, job: &DeltaJob) -> DeltaResult<()> {
        let store = Arc::clone(&self.store);
        let job = job.clone();
        tokio::task::spawn_blocking(move || {
            store.generate_delta(job.from.as_ref(), &job.to, &job.params)
        })
        .await
        .map_err(|e| DeltaError::Join(e.to_string()))??;
        Ok(())
    }
}
