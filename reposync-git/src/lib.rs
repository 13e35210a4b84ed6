//! # reposync-git
//!
//! Everything reposync knows about git:
//!
//! - [`probe`]: filesystem-only repository classification (no subprocess)
//! - [`ops`]: the exact argument shapes of every git subcommand issued
//! - [`executor`]: the blocking [`CommandExecutor`] boundary and [`GitExecutor`]
//! - [`parse`]: mapping a [`CommandResult`] onto a typed result
//! - [`repo`]: [`GitRepo`], a synchronous convenience wrapper over all of the above

pub mod executor;
pub mod ops;
pub mod parse;
pub mod probe;
pub mod repo;

pub use executor::{default_git_command, CommandExecutor, CommandResult, GitExecutor};
pub use ops::GitOp;
pub use parse::{CompareOutcome, GitFailure};
pub use probe::{is_bare, is_repository, ongoing_operation, OngoingOperation};
pub use repo::GitRepo;
