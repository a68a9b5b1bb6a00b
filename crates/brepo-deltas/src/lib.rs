//! Static delta maintenance for bundle repositories.
//!
//! A maintenance run decides which deltas should exist, generates the
//! missing ones in parallel worker processes, and only then removes the
//! deltas nothing wants any more.
//!
//! # Pipeline
//!
//! 1. [`RefFilter`] drops refs that must not be deltaed.
//! 2. [`plan_deltas`] builds the [`DeltaPlan`]: jobs to run, names to
//!    retain, and existing names that are unwanted.
//! 3. [`JobDriver`] runs the jobs through a [`WorkerLauncher`], at most N
//!    at a time.
//! 4. [`delete_unwanted`] removes the unwanted deltas.
//!
//! Per-job failures in steps 3 and 4 are reported, never raised.

pub mod cancel;
pub mod deleter;
pub mod driver;
pub mod error;
pub mod filter;
pub mod job;
pub mod launcher;
pub mod planner;

pub use cancel::CancelToken;
pub use deleter::{delete_unwanted, DeleteFailure, DeleteReport};
pub use driver::{DriverReport, JobDriver, WorkerFailure};
pub use error::{DeltaError, DeltaResult};
pub use filter::RefFilter;
pub use job::DeltaJob;
pub use launcher::{InProcessLauncher, SelfExecLauncher, WorkerLauncher};
pub use planner::{plan_deltas, DeltaPlan};
