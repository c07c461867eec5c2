//! Templates embedded at compile time.

use include_dir::{include_dir, Dir};

use super::manifest::BundleManifest;
use super::{TemplateAsset, TemplateSource, MANIFEST_FILE, STATIC_DIR, TEMPLATES_DIR};
use crate::error::{ForgeError, Result};

/// Embedded template bundle.
static BUNDLE_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/bundle");

/// Template source backed by the bundle compiled into the binary.
#[derive(Debug, Clone)]
pub struct BundledSource {
    dir: &'static Dir<'static>,
    manifest: BundleManifest,
}

impl BundledSource {
    /// Open the embedded bundle.
    pub fn new() -> Result<Self> {
        Self::from_dir(&BUNDLE_DIR)
    }

    fn from_dir(dir: &'static Dir<'static>) -> Result<Self> {
        let manifest_file =
            dir.get_file(MANIFEST_FILE)
                .ok_or_else(|| ForgeError::TemplateResolution {
                    message: format!("embedded bundle has no {}", MANIFEST_FILE),
                })?;

        let content =
            manifest_file
                .contents_utf8()
                .ok_or_else(|| ForgeError::TemplateResolution {
                    message: format!("embedded {} is not valid UTF-8", MANIFEST_FILE),
                })?;

        Ok(Self {
            dir,
            manifest: BundleManifest::parse(content, "embedded bundle")?,
        })
    }

    /// Get the manifest.
    pub fn manifest(&self) -> &BundleManifest {
        &self.manifest
    }
}

fn collect_files(dir: &Dir<'_>, out: &mut Vec<String>) {
    for file in dir.files() {
        out.push(file.path().to_string_lossy().replace('\\', "/"));
    }
    for sub in dir.dirs() {
        collect_files(sub, out);
    }
}

impl TemplateSource for BundledSource {
    fn describe(&self) -> String {
        "embedded bundle".to_string()
    }

    fn list_all(&self) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        for root in [STATIC_DIR, TEMPLATES_DIR] {
            if let Some(sub) = self.dir.get_dir(root) {
                collect_files(sub, &mut paths);
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn resolve(&self, logical_path: &str) -> Result<TemplateAsset> {
        let file = self
            .dir
            .get_file(logical_path)
            .ok_or_else(|| ForgeError::TemplateResolution {
                message: format!("template '{}' not found in embedded bundle", logical_path),
            })?;

        TemplateAsset::from_logical(&self.manifest, logical_path, file.contents().to_vec())
    }
}
