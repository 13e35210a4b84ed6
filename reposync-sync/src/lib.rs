//! # reposync-sync
//!
//! The sync orchestrator: a per-repository step machine and the global FIFO
//! queue that runs one job at a time.
//!
//! This crate decides *what* happens and in which order; it never runs a git
//! command or sleeps. [`Orchestrator`] emits [`Directive`]s, and the daemon's
//! control loop carries them out (see `reposync-daemon`).

pub mod error;
pub mod job;
pub mod machine;
pub mod orchestrator;
pub mod runtime;
pub mod snapshot;

pub use error::{FailureKind, JobFailure};
pub use job::{JobId, JobReport, JobState, Outcome, SyncJob};
pub use orchestrator::{Directive, Orchestrator};
pub use runtime::RepositoryRuntime;
pub use snapshot::{schedule_text, OverallStatus, RepoSnapshot, RepoStatus};
