//! Modules: extra template sets pulled in as git subtrees.
//!
//! A module lives at `.acforge/modules/<name>` inside the target repository
//! and is managed with `git subtree add/pull --squash`. Every git call runs
//! through [`GitRunner`], which kills the process after a timeout.

pub mod git;
pub mod manager;

pub use git::{GitRunner, DEFAULT_GIT_TIMEOUT};
pub use manager::{ModuleManager, ModuleOperation, MODULES_DIR};
