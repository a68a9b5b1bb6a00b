use std::path::PathBuf;

use brepo_types::{CommitId, ObjectId, TypeError};

/// Errors from repository storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The path does not hold a repository.
    #[error("not a repository: {}", .0.display())]
    NotARepository(PathBuf),

    /// A repository already exists where one was to be created.
    #[error("repository already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// The requested commit is not in the store.
    #[error("commit not found: {0}")]
    CommitNotFound(CommitId),

    /// A non-commit object reachable from a commit is missing.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// No delta directory exists at the given path.
    #[error("delta not found: {0}")]
    DeltaNotFound(String),

    /// The object data is malformed or cannot be decoded.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// The ref name is not usable as a path below `refs/`.
    #[error("invalid ref name {name:?}: {reason}")]
    InvalidRef { name: String, reason: String },

    /// The repository configuration could not be read or updated.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Type(#[from] TypeError),

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
