//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! # Architecture
//!
//! Commands are dispatched via [`CommandDispatcher`], which routes CLI
//! subcommands to their implementations. The deploying commands (`init`,
//! `update`, `status`, `resolve`, `module`) share template loading, parameter
//! resolution and summary output through [`workflow`].

pub mod completions;
pub mod dispatcher;
pub mod init;
pub mod module;
pub mod resolve;
pub mod status;
pub mod update;
pub mod workflow;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};
