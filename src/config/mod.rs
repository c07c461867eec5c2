//! Optional project configuration for acforge.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Deep merging in [`merger`]
//!
//! # Example
//!
//! ```
//! use acforge::config::load_config;
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let dir = temp.path().join(".acforge");
//! fs::create_dir_all(&dir).unwrap();
//! fs::write(dir.join("config.yml"), "parameters:\n  GITHUB_OWNER: acme\n").unwrap();
//!
//! let config = load_config(temp.path()).unwrap();
//! assert_eq!(config.parameters["GITHUB_OWNER"], "acme");
//! ```
//!
//! # Configuration File Locations
//!
//! acforge merges configuration in this order:
//! 1. Project config (`.acforge/config.yml`)
//! 2. Local overrides (`.acforge/config.local.yml`)

pub mod loader;
pub mod merger;
pub mod schema;

pub use loader::{load_config, load_config_value, ConfigPaths, CONFIG_FILE, LOCAL_CONFIG_FILE};
pub use merger::{deep_merge, merge_configs};
pub use schema::{ForgeConfig, ModuleConfig};
