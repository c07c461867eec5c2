//! State management for deployed files.
//!
//! This module provides persistent state stored inside each target
//! repository, tracking the checksum of every file acforge deployed so that
//! re-runs are idempotent and user edits are detected.

pub mod checksum;
pub mod store;

pub use checksum::{content_checksum, file_checksum, CHECKSUM_PREFIX};
pub use store::{
    FileEntry, ModuleRecord, ModuleState, StateStore, BACKUPS_DIR, STATE_DIR, STATE_FILE,
};
