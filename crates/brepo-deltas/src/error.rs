use brepo_store::StoreError;

/// Errors from delta planning and generation.
#[derive(Debug, thiserror::Error)]
pub enum DeltaError {
    /// A `--ignore-ref` pattern is not a valid glob.
    #[error("invalid ref pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A worker could not be started.
    #[error("failed to launch worker: {0}")]
    Launch(String),

    /// A worker process ran but did not succeed.
    #[error("worker exited with {0}")]
    WorkerExit(String),

    /// A worker task panicked or was aborted.
    #[error("worker task failed: {0}")]
    Join(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for delta operations.
pub type DeltaResult<T> = Result<T, DeltaError>;
