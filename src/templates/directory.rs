//! Templates read from a directory on disk.
//!
//! Used when running from a development checkout (so template edits take
//! effect without a rebuild) and for installed modules.

use std::fs;
use std::path::{Path, PathBuf};

use super::manifest::BundleManifest;
use super::{TemplateAsset, TemplateSource, MANIFEST_FILE, STATIC_DIR, TEMPLATES_DIR};
use crate::error::{ForgeError, Result};

/// Template source backed by a template root on disk.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    manifest: BundleManifest,
}

impl DirectorySource {
    /// Open a template root. The manifest is required.
    pub fn open(root: &Path) -> Result<Self> {
        let manifest_path = root.join(MANIFEST_FILE);
        let content = fs::read_to_string(&manifest_path).map_err(|e| {
            ForgeError::TemplateResolution {
                message: format!("cannot read {}: {}", manifest_path.display(), e),
            }
        })?;

        Ok(Self {
            root: root.to_path_buf(),
            manifest: BundleManifest::parse(&content, &manifest_path.display().to_string())?,
        })
    }

    /// Open a template root, treating a missing manifest as identity mapping.
    ///
    /// Modules fetched from third-party repositories often carry no manifest.
    pub fn open_lenient(root: &Path) -> Result<Self> {
        if root.join(MANIFEST_FILE).exists() {
            return Self::open(root);
        }
        if !root.is_dir() {
            return Err(ForgeError::TemplateResolution {
                message: format!("template directory {} does not exist", root.display()),
            });
        }
        Ok(Self {
            root: root.to_path_buf(),
            manifest: BundleManifest::default(),
        })
    }

    /// Get the template root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collect_recursive(&self, dir: &Path, out: &mut Vec<String>) -> Result<()> {
        if !dir.is_dir() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                self.collect_recursive(&path, out)?;
            } else if let Ok(relative) = path.strip_prefix(&self.root) {
                let logical = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push(logical);
            }
        }

        Ok(())
    }
}

impl TemplateSource for DirectorySource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn list_all(&self) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        for sub in [STATIC_DIR, TEMPLATES_DIR] {
            self.collect_recursive(&self.root.join(sub), &mut paths)?;
        }
        paths.sort();
        Ok(paths)
    }

    fn resolve(&self, logical_path: &str) -> Result<TemplateAsset> {
        let path = self.root.join(logical_path);
        let content = fs::read(&path).map_err(|e| ForgeError::TemplateResolution {
            message: format!("cannot read template {}: {}", path.display(), e),
        })?;

        TemplateAsset::from_logical(&self.manifest, logical_path, content)
    }
}
