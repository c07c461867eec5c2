//! Template source resolution.
//!
//! A template root contains:
//! - `manifest.yml` mapping template paths to target paths
//! - `templates/` with parameterized content (run through substitution)
//! - `static/` with content copied verbatim (scripts, helpers)
//!
//! Two [`TemplateSource`] implementations exist: [`BundledSource`] for the
//! copy compiled into the binary and [`DirectorySource`] for a template root
//! on disk. [`SourceMode::detect`] picks one per run; downstream code only
//! ever sees [`TemplateAsset`]s.

pub mod bundled;
pub mod directory;
pub mod manifest;
pub mod mode;

pub use bundled::BundledSource;
pub use directory::DirectorySource;
pub use manifest::{BundleManifest, Mapping};
pub use mode::{SourceMode, TEMPLATE_SOURCE_ENV};

use sha2::{Digest, Sha256};
use std::path::PathBuf;

use crate::error::{ForgeError, Result};

/// Directory holding parameterized templates.
pub const TEMPLATES_DIR: &str = "templates";

/// Directory holding verbatim assets.
pub const STATIC_DIR: &str = "static";

/// Manifest file name at the template root.
pub const MANIFEST_FILE: &str = "manifest.yml";

/// A resolved template, ready for deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateAsset {
    /// Path inside the template root, e.g. `templates/guidelines/CLAUDE.md.template`.
    pub logical_path: String,
    /// Target path relative to the repository root.
    pub target_path: PathBuf,
    /// Raw content.
    pub content: Vec<u8>,
    /// Whether placeholders are substituted.
    pub parameterized: bool,
}

impl TemplateAsset {
    /// Build an asset from a logical path using the manifest mappings.
    pub fn from_logical(
        manifest: &BundleManifest,
        logical_path: &str,
        content: Vec<u8>,
    ) -> Result<Self> {
        let (root, relative) = logical_path.split_once('/').ok_or_else(|| {
            ForgeError::TemplateResolution {
                message: format!(
                    "template path '{}' is outside templates/ and static/",
                    logical_path
                ),
            }
        })?;

        let parameterized = match root {
            TEMPLATES_DIR => true,
            STATIC_DIR => false,
            _ => {
                return Err(ForgeError::TemplateResolution {
                    message: format!(
                        "template path '{}' is outside templates/ and static/",
                        logical_path
                    ),
                })
            }
        };

        Ok(Self {
            logical_path: logical_path.to_string(),
            target_path: PathBuf::from(manifest.target_for(relative)),
            content,
            parameterized,
        })
    }

    /// Whether the deployed file should be executable.
    pub fn is_executable(&self) -> bool {
        !self.parameterized
            && (self.logical_path.starts_with("static/scripts/")
                || self.logical_path.ends_with(".sh"))
    }
}

/// A place templates can be read from.
pub trait TemplateSource {
    /// Human-readable origin, used in logs and status output.
    fn describe(&self) -> String;

    /// All logical paths, sorted lexicographically.
    fn list_all(&self) -> Result<Vec<String>>;

    /// Resolve a single logical path.
    fn resolve(&self, logical_path: &str) -> Result<TemplateAsset>;

    /// Resolve every template in `list_all` order.
    ///
    /// Fails when the source yields nothing, so that an empty or broken
    /// source never reaches the deployment stage.
    fn resolve_all(&self) -> Result<Vec<TemplateAsset>> {
        let paths = self.list_all()?;
        if paths.is_empty() {
            return Err(ForgeError::TemplateResolution {
                message: format!("no templates found in {}", self.describe()),
            });
        }
        paths.iter().map(|p| self.resolve(p)).collect()
    }

    /// SHA-256 over every logical path and its content.
    fn checksum(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        for path in self.list_all()? {
            let asset = self.resolve(&path)?;
            hasher.update(path.as_bytes());
            hasher.update([0u8]);
            hasher.update(&asset.content);
            hasher.update([0u8]);
        }
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Short template version derived from a bundle checksum.
pub fn template_version(checksum: &str) -> String {
    checksum.chars().take(8).collect()
}
