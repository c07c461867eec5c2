//! Persistent deployment state.
//!
//! One JSON document per target repository at `.acforge/state.json`,
//! recording every deployed file with its checksum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{ForgeError, Result};
use crate::merge::MergeStrategy;

/// Directory holding acforge state inside a target repository.
pub const STATE_DIR: &str = ".acforge";

/// State file name inside [`STATE_DIR`].
pub const STATE_FILE: &str = "state.json";

/// Directory inside [`STATE_DIR`] holding copies of replaced local files.
pub const BACKUPS_DIR: &str = "backups";

/// Persistent state for a target repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleState {
    /// Schema version for migration.
    pub version: u32,

    /// acforge version that last wrote this state.
    pub tool_version: String,

    /// Checksum of the template bundle last deployed.
    pub bundle_checksum: String,

    /// Short form of `bundle_checksum`.
    pub template_version: String,

    /// When the first deployment happened.
    pub created_at: DateTime<Utc>,

    /// When state was last saved.
    pub updated_at: DateTime<Utc>,

    /// Parameter values reused by later runs.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,

    /// Deployed files keyed by target path.
    #[serde(default)]
    pub files: BTreeMap<String, FileEntry>,

    /// Installed modules keyed by name.
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleRecord>,
}

/// State for a single deployed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Checksum of the content acforge last wrote or accepted.
    pub checksum: String,

    /// Strategy that produced the content.
    pub strategy: MergeStrategy,

    /// Template version that produced the content.
    pub template_version: String,

    /// Template source (`bundle` or `module:<name>`).
    pub source: String,

    /// Per-key value hashes for structured files.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub keys: BTreeMap<String, String>,

    /// The user chose to keep their version; deployments leave the file alone.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub keep_local: bool,
}

impl FileEntry {
    /// Create an entry without key hashes.
    pub fn new(
        checksum: impl Into<String>,
        strategy: MergeStrategy,
        template_version: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            checksum: checksum.into(),
            strategy,
            template_version: template_version.into(),
            source: source.into(),
            keys: BTreeMap::new(),
            keep_local: false,
        }
    }
}

/// An installed module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Repository URL.
    pub url: String,

    /// Branch or tag tracked.
    #[serde(rename = "ref")]
    pub git_ref: String,

    /// Subtree prefix inside the target repository.
    pub prefix: String,

    /// Commit that last added or updated the subtree.
    pub commit: Option<String>,

    /// When the module was last added or updated.
    pub updated_at: DateTime<Utc>,
}

impl ModuleState {
    /// Current schema version.
    pub const CURRENT_VERSION: u32 = 1;

    /// Create empty state for a bundle.
    pub fn new(bundle_checksum: &str) -> Self {
        let now = Utc::now();
        Self {
            version: Self::CURRENT_VERSION,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            bundle_checksum: bundle_checksum.to_string(),
            template_version: crate::templates::template_version(bundle_checksum),
            created_at: now,
            updated_at: now,
            parameters: BTreeMap::new(),
            files: BTreeMap::new(),
            modules: BTreeMap::new(),
        }
    }

    /// Get the entry for a target path.
    pub fn file(&self, target_path: &str) -> Option<&FileEntry> {
        self.files.get(target_path)
    }

    /// Record a deployed file.
    pub fn record_file(&mut self, target_path: &str, entry: FileEntry) {
        self.files.insert(target_path.to_string(), entry);
    }

    /// Mark the state as produced by `bundle_checksum`.
    pub fn set_bundle(&mut self, bundle_checksum: &str) {
        self.bundle_checksum = bundle_checksum.to_string();
        self.template_version = crate::templates::template_version(bundle_checksum);
        self.tool_version = env!("CARGO_PKG_VERSION").to_string();
    }
}

/// Reads and writes [`ModuleState`] for a target repository.
#[derive(Debug, Clone)]
pub struct StateStore {
    target: PathBuf,
}

impl StateStore {
    /// Create a store for a target repository.
    pub fn new(target: &Path) -> Self {
        Self {
            target: target.to_path_buf(),
        }
    }

    /// Get the state directory.
    pub fn state_dir(&self) -> PathBuf {
        self.target.join(STATE_DIR)
    }

    /// Get the state file path.
    pub fn state_file(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    /// Backup directory for a run started at `at`.
    pub fn backup_dir(&self, at: DateTime<Utc>) -> PathBuf {
        self.state_dir()
            .join(BACKUPS_DIR)
            .join(at.format("%Y%m%d_%H%M%S").to_string())
    }

    /// Whether a state file exists.
    pub fn exists(&self) -> bool {
        self.state_file().exists()
    }

    /// Load state from disk.
    ///
    /// Returns `None` when no state file exists (first deployment).
    ///
    /// # Errors
    ///
    /// Returns `StateCorruption` when the file exists but cannot be read or
    /// parsed. State is never reset silently.
    pub fn load(&self) -> Result<Option<ModuleState>> {
        let path = self.state_file();

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ForgeError::StateCorruption {
                    path,
                    message: e.to_string(),
                })
            }
        };

        let state: ModuleState =
            serde_json::from_str(&content).map_err(|e| ForgeError::StateCorruption {
                path: path.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!(
            "Loaded state with {} files from {}",
            state.files.len(),
            path.display()
        );
        Ok(Some(state))
    }

    /// Save state to disk using atomic write.
    ///
    /// The whole document is serialized in memory, written to a temp file
    /// next to the state file, then renamed over it.
    pub fn save(&self, state: &ModuleState) -> Result<()> {
        let dir = self.state_dir();
        fs::create_dir_all(&dir)?;

        let mut state = state.clone();
        state.updated_at = Utc::now();

        let content = serde_json::to_string_pretty(&state).map_err(|e| {
            ForgeError::ConfigValidationError {
                message: format!("Failed to serialize state: {}", e),
            }
        })?;

        let path = self.state_file();
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content + "\n")?;
        fs::rename(&temp_path, &path)?;

        tracing::debug!("Saved state to {}", path.display());
        Ok(())
    }
}
