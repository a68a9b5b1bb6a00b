//! Foundation types for bundle repositories.
//!
//! Every other `brepo` crate depends on this one. It holds the identifiers
//! shared by the object store, the delta planner and the maintenance
//! orchestrator.
//!
//! # Key Types
//!
//! - [`CommitId`]: 32-byte content hash of a commit, rendered as 64 hex chars
//! - [`CommitRecord`]: decoded commit: parent pointer, subject, timestamp, metadata
//! - [`RefKind`]: classification of a ref name (application, runtime, catalog, ...)
//! - [`DeltaName`]: `"TO"` or `"FROM-TO"` static delta identifier and its on-disk path
//! - [`DeltaParams`]: tuning parameters handed to delta generation

pub mod commit;
pub mod delta;
pub mod error;
pub mod refs;

pub use commit::{CommitId, CommitRecord, ObjectId, SHORT_HEX_LEN};
pub use delta::{DeltaName, DeltaParams, DeltaProfile, DELTAS_DIR};
pub use error::TypeError;
pub use refs::RefKind;
