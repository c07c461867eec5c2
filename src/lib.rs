//! acforge - Template deployment and merge reconciliation.
//!
//! acforge deploys a bundle of Claude Code configuration templates
//! (agents, commands, guidelines, devcontainer and git settings) into a
//! target repository, substitutes project parameters, and on every later
//! run reconciles the new templates with whatever the user has changed
//! locally.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Project configuration loading and merging
//! - [`deploy`] - Deployment orchestration and atomic writes
//! - [`error`] - Error types and result aliases
//! - [`merge`] - Merge strategies and drift detection
//! - [`modules`] - Template modules vendored as git subtrees
//! - [`parameters`] - Parameter resolution and `{{KEY}}` substitution
//! - [`state`] - Persisted deployment state and checksums
//! - [`templates`] - Bundled and on-disk template sources
//! - [`ui`] - Prompts, spinners, and terminal output
//!
//! # Example
//!
//! ```
//! use acforge::parameters::{substitute, ParameterSet};
//!
//! let params = ParameterSet::from_pairs([("PROJECT_NAME", "widget")]);
//! let text = substitute("templates/README.md", "# {{PROJECT_NAME}}\n", &params).unwrap();
//! assert_eq!(text, "# widget\n");
//! ```
//!
//! For end-to-end deployments, see the integration tests.

pub mod cli;
pub mod config;
pub mod deploy;
pub mod error;
pub mod merge;
pub mod modules;
pub mod parameters;
pub mod state;
pub mod templates;
pub mod ui;

pub use error::{ForgeError, Result};
