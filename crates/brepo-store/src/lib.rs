//! Repository storage for bundle repositories.
//!
//! A repository is a content-addressed store of commits, directory trees and
//! files, a set of refs pointing at commits, and the derived artefacts
//! clients download: static deltas, the summary and per-arch catalogs.
//!
//! # Backends
//!
//! All backends implement the [`Repository`] supertrait:
//!
//! - [`FsRepository`] -- on-disk repository rooted at a directory
//! - [`InMemoryRepository`] -- `RwLock`-guarded maps for tests, recording
//!   every mutating call as a [`RepoEvent`]
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written.
//! 2. Files are written to a temporary sibling and renamed into place.
//! 3. A static delta appears under its final path only once complete.
//! 4. Generating the same delta twice yields byte-identical output.

pub mod catalog;
pub mod config;
pub mod delta;
pub mod error;
pub mod fs;
pub mod memory;
pub mod names;
pub mod object;
pub mod summary;
pub mod traits;

pub use config::{ConfigDocument, ConfigKey};
pub use error::{StoreError, StoreResult};
pub use fs::FsRepository;
pub use memory::{InMemoryRepository, RepoEvent};
pub use object::{DirTree, ObjectKind};
pub use traits::{
    CatalogOptions, CatalogReport, ObjectAccess, ObjectStore, PruneOptions, PruneStats, RepoConfig,
    RepoOps, Repository, SummaryOptions, SummaryReport,
};
