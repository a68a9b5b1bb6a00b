use std::path::PathBuf;

use brepo_deltas::DeltaError;
use brepo_store::StoreError;

/// Hard failures of a maintenance run. Each one stops the run.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// The repository could not be opened.
    #[error("failed to open repository {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    /// A metadata change was rejected or could not be written.
    #[error("{0}")]
    Config(String),

    /// The options file could not be read or parsed.
    #[error("invalid options: {0}")]
    Options(String),

    #[error("failed to update catalog: {0}")]
    Catalog(#[source] StoreError),

    #[error("failed to update summary: {0}")]
    Summary(#[source] StoreError),

    #[error("failed to prune: {0}")]
    Prune(#[source] StoreError),

    /// Refs or existing deltas could not be listed, or ref patterns are invalid.
    #[error("failed to plan static deltas: {0}")]
    Plan(#[source] DeltaError),

    /// The worker program could not be located.
    #[error("failed to prepare delta workers: {0}")]
    Launch(#[source] DeltaError),

    /// Single-delta worker mode failed. `job` is `ref (from-to)`.
    #[error("{job}: {source}")]
    Worker {
        job: String,
        #[source]
        source: StoreError,
    },

    #[error("cancelled")]
    Cancelled,
}

/// Result alias for maintenance operations.
pub type UpdateResult<T> = Result<T, UpdateError>;
