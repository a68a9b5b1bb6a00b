//! Repository maintenance for bundle repositories.
//!
//! [`update_repo`] is the `update-repo` operation: it refreshes metadata and
//! catalogs, keeps the set of static deltas current, rewrites the summary
//! and prunes unreachable objects, in that order. Delta jobs run in worker
//! processes that re-enter [`update_repo`] with a [`WorkerRequest`].

pub mod error;
pub mod metadata;
pub mod options;
pub mod orchestrator;
pub mod prune;
pub mod worker;

pub use error::{UpdateError, UpdateResult};
pub use metadata::{apply_metadata, check_collection_id};
pub use options::{MetadataUpdates, UpdateOptions, WorkerRequest};
pub use orchestrator::{update_repo, DeltaReport, LaunchMode, Orchestrator, Outcome, UpdateReport};
pub use prune::{run_prune, PruneSummary};
pub use worker::generate_single_delta;

pub use brepo_deltas::CancelToken;
