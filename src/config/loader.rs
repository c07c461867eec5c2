//! Configuration file discovery and loading.
//!
//! Configuration is optional. A target without `.acforge/config.yml` gets
//! [`ForgeConfig::default`].

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::merger::merge_configs;
use crate::config::schema::ForgeConfig;
use crate::error::{ForgeError, Result};

/// Project config file, relative to the target root.
pub const CONFIG_FILE: &str = ".acforge/config.yml";

/// Local override file, relative to the target root.
pub const LOCAL_CONFIG_FILE: &str = ".acforge/config.local.yml";

/// Paths to configuration files in priority order (later overrides earlier).
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project config: .acforge/config.yml
    pub project: Option<PathBuf>,

    /// Local overrides: .acforge/config.local.yml
    pub project_local: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover config files for the given target root.
    pub fn discover(target: &Path) -> Self {
        Self {
            project: existing(target.join(CONFIG_FILE)),
            project_local: existing(target.join(LOCAL_CONFIG_FILE)),
        }
    }

    /// Returns all existing config paths in merge order.
    pub fn all_existing(&self) -> Vec<&PathBuf> {
        self.project.iter().chain(self.project_local.iter()).collect()
    }
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    if path.exists() {
        Some(path)
    } else {
        None
    }
}

/// Load a config file as raw YAML Value (for merging).
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid.
pub fn load_config_value(path: &Path) -> Result<serde_yaml::Value> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ForgeError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ForgeError::Io(e)
        }
    })?;

    serde_yaml::from_str(&content).map_err(|e| ForgeError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load and merge the project config and local overrides.
///
/// # Errors
///
/// Returns `ConfigParseError` if a file is invalid YAML or does not match the
/// schema, and `ConfigValidationError` for out-of-range values.
pub fn load_config(target: &Path) -> Result<ForgeConfig> {
    let paths = ConfigPaths::discover(target);
    let files = paths.all_existing();
    if files.is_empty() {
        return Ok(ForgeConfig::default());
    }

    let mut values = Vec::new();
    for path in files {
        tracing::debug!("Loading config from {}", path.display());
        values.push(load_config_value(path)?);
    }

    let merged = merge_configs(&values);
    let config: ForgeConfig =
        serde_yaml::from_value(merged).map_err(|e| ForgeError::ConfigParseError {
            path: target.join(CONFIG_FILE),
            message: format!("Failed to parse merged config: {}", e),
        })?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &ForgeConfig) -> Result<()> {
    if config.git_timeout_secs == 0 {
        return Err(ForgeError::ConfigValidationError {
            message: "git_timeout_secs must be greater than zero".to_string(),
        });
    }
    let empty_url = config
        .modules
        .iter()
        .find(|(_, m)| m.url.trim().is_empty())
        .map(|(n, _)| n);
    if let Some(name) = empty_url {
        return Err(ForgeError::ConfigValidationError {
            message: format!("module '{}' has an empty url", name),
        });
    }
    Ok(())
}
