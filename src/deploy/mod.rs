//! Deployment orchestration.
//!
//! For each resolved template, in logical path order:
//! 1. substitute parameters (parameterized templates only)
//! 2. select a merge strategy for the target path
//! 3. merge against the file on disk and the state recorded for it
//! 4. write atomically and update the in-memory state entry
//!
//! One template's failure never stops the others; it is captured as an
//! `error` record.

pub mod deployer;
pub mod record;
pub mod writer;

pub use deployer::{target_key, DeployProgress, Deployer, RunContext, BUNDLE_SOURCE};
pub use record::{DeployOutcome, DeploymentRecord, DeploymentResult};
pub use writer::write_atomic;
