//! Module lifecycle: adding and updating git subtrees.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ForgeError, Result};

use super::git::GitRunner;

/// Directory holding module subtrees inside a target repository.
pub const MODULES_DIR: &str = ".acforge/modules";

/// Result of adding or updating a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOperation {
    /// Module name.
    pub name: String,
    /// Subtree prefix relative to the repository root.
    pub prefix: String,
    /// `HEAD` after the operation.
    pub commit: Option<String>,
    /// Files under the prefix that changed.
    pub changed_files: Vec<String>,
}

/// Adds and updates modules as squashed git subtrees.
#[derive(Debug, Clone)]
pub struct ModuleManager {
    target: PathBuf,
}

impl ModuleManager {
    /// Create a manager for a target repository.
    pub fn new(target: &Path) -> Self {
        Self {
            target: target.to_path_buf(),
        }
    }

    /// Subtree prefix for a module.
    pub fn prefix_for(name: &str) -> String {
        format!("{}/{}", MODULES_DIR, name)
    }

    /// Absolute path of a module's subtree.
    pub fn module_root(&self, name: &str) -> PathBuf {
        self.target.join(Self::prefix_for(name))
    }

    /// Add a module with `git subtree add --squash`.
    ///
    /// # Errors
    ///
    /// Returns `GitOperation` verbatim when git fails or times out, and
    /// `ConfigValidationError` for an invalid name or an existing prefix.
    pub fn add_module(
        &self,
        name: &str,
        url: &str,
        git_ref: &str,
        timeout: Duration,
    ) -> Result<ModuleOperation> {
        validate_name(name)?;
        if self.module_root(name).exists() {
            return Err(ForgeError::ConfigValidationError {
                message: format!(
                    "module '{}' already exists at {}; use `acforge module update {}`",
                    name,
                    Self::prefix_for(name),
                    name
                ),
            });
        }

        let prefix = Self::prefix_for(name);
        let message = format!("chore: add acforge module {}", name);
        self.subtree(
            name,
            &[
                "subtree",
                "add",
                &format!("--prefix={}", prefix),
                url,
                git_ref,
                "--squash",
                "-m",
                &message,
            ],
            timeout,
        )
    }

    /// Pull new changes into a module with `git subtree pull --squash`.
    pub fn update_module(
        &self,
        name: &str,
        url: &str,
        git_ref: &str,
        timeout: Duration,
    ) -> Result<ModuleOperation> {
        validate_name(name)?;
        if !self.module_root(name).exists() {
            return Err(ForgeError::ConfigValidationError {
                message: format!("module '{}' is not installed", name),
            });
        }

        let prefix = Self::prefix_for(name);
        let message = format!("chore: update acforge module {}", name);
        self.subtree(
            name,
            &[
                "subtree",
                "pull",
                &format!("--prefix={}", prefix),
                url,
                git_ref,
                "--squash",
                "-m",
                &message,
            ],
            timeout,
        )
    }

    fn subtree(&self, name: &str, args: &[&str], timeout: Duration) -> Result<ModuleOperation> {
        let git = GitRunner::new(&self.target, timeout);
        let prefix = Self::prefix_for(name);

        let before = git.head()?;
        git.run(args)?;
        let after = git.head()?;

        let changed_files = if before == after {
            Vec::new()
        } else {
            git.changed_files(&before, &after, &prefix)?
        };

        tracing::info!(
            "Module {}: {} file(s) changed at {}",
            name,
            changed_files.len(),
            after
        );

        Ok(ModuleOperation {
            name: name.to_string(),
            prefix,
            commit: Some(after),
            changed_files,
        })
    }
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ForgeError::ConfigValidationError {
            message: format!(
                "invalid module name '{}': use letters, digits, '-', '_' or '.'",
                name
            ),
        })
    }
}
