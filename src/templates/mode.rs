//! Template source mode detection.
//!
//! Normal installs read the bundle compiled into the binary. When acforge
//! runs from (or against) its own development checkout, the live `bundle/`
//! directory is used instead so that template edits are exercised without
//! a rebuild.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::{BundledSource, DirectorySource, TemplateSource, MANIFEST_FILE};
use crate::error::{ForgeError, Result};

/// Environment variable forcing a template source (`bundled` or a directory).
pub const TEMPLATE_SOURCE_ENV: &str = "ACFORGE_TEMPLATE_SOURCE";

/// Name of the bundle directory in a development checkout.
const BUNDLE_DIR_NAME: &str = "bundle";

/// Matches the package name line of acforge's own `Cargo.toml`.
static ACFORGE_PACKAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*name\s*=\s*"acforge"\s*$"#).expect("ACFORGE_PACKAGE must compile")
});

/// Where templates are read from for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMode {
    /// The bundle compiled into the binary.
    Bundled,
    /// A template root on disk.
    Source { root: PathBuf },
}

impl SourceMode {
    /// Detect the source mode.
    ///
    /// An explicit `requested` value wins: `bundled` selects the embedded
    /// bundle, anything else is a template root directory. Otherwise the
    /// ancestors of `start` and of the running executable are searched for
    /// an acforge checkout.
    pub fn detect(start: &Path, requested: Option<&str>) -> Result<Self> {
        if let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) {
            if requested.eq_ignore_ascii_case("bundled") {
                return Ok(Self::Bundled);
            }
            let root = PathBuf::from(requested);
            if !root.join(MANIFEST_FILE).is_file() {
                return Err(ForgeError::TemplateResolution {
                    message: format!(
                        "{} has no {}; cannot use it as a template source",
                        root.display(),
                        MANIFEST_FILE
                    ),
                });
            }
            return Ok(Self::Source { root });
        }

        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf));

        let candidates = std::iter::once(start.to_path_buf()).chain(exe_dir);
        for candidate in candidates {
            if let Some(root) = find_checkout_bundle(&candidate) {
                tracing::debug!("Using live templates from {}", root.display());
                return Ok(Self::Source { root });
            }
        }

        Ok(Self::Bundled)
    }

    /// Open the template source for this mode.
    pub fn open(&self) -> Result<Box<dyn TemplateSource>> {
        match self {
            Self::Bundled => Ok(Box::new(BundledSource::new()?)),
            Self::Source { root } => Ok(Box::new(DirectorySource::open(root)?)),
        }
    }

    /// Short label for status output.
    pub fn label(&self) -> String {
        match self {
            Self::Bundled => "bundled".to_string(),
            Self::Source { root } => format!("source ({})", root.display()),
        }
    }
}

/// Walk up from `start` looking for an acforge checkout with a bundle.
fn find_checkout_bundle(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if is_acforge_checkout(&current) {
            let bundle = current.join(BUNDLE_DIR_NAME);
            if bundle.join(MANIFEST_FILE).is_file() {
                return Some(bundle);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}

fn is_acforge_checkout(dir: &Path) -> bool {
    let Ok(manifest) = fs::read_to_string(dir.join("Cargo.toml")) else {
        return false;
    };
    ACFORGE_PACKAGE.is_match(&manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_checkout(root: &Path) {
        fs::write(
            root.join("Cargo.toml"),
            "[package]\nname = \"acforge\"\nversion = \"0.1.0\"\n",
        )
        .unwrap();
        fs::create_dir_all(root.join("bundle/templates")).unwrap();
        fs::write(root.join("bundle/manifest.yml"), "version: 1\n").unwrap();
        fs::write(root.join("bundle/templates/a.md"), "a").unwrap();
    }

    #[test]
    fn explicit_bundled_wins() {
        let temp = TempDir::new().unwrap();
        make_checkout(temp.path());
        let mode = SourceMode::detect(temp.path(), Some("bundled")).unwrap();
        assert_eq!(mode, SourceMode::Bundled);
    }

    #[test]
    fn explicit_directory_requires_manifest() {
        let temp = TempDir::new().unwrap();
        let requested = temp.path().to_string_lossy();
        let err = SourceMode::detect(temp.path(), Some(&requested)).unwrap_err();
        assert!(matches!(err, ForgeError::TemplateResolution { .. }));
    }

    #[test]
    fn explicit_directory_is_used() {
        let temp = TempDir::new().unwrap();
        make_checkout(temp.path());
        let bundle = temp.path().join("bundle");
        let mode = SourceMode::detect(temp.path(), Some(&bundle.to_string_lossy())).unwrap();
        assert_eq!(mode, SourceMode::Source { root: bundle });
    }

    #[test]
    fn detects_checkout_from_nested_directory() {
        let temp = TempDir::new().unwrap();
        make_checkout(temp.path());
        let nested = temp.path().join("src/deep");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(
            find_checkout_bundle(&nested),
            Some(temp.path().join("bundle"))
        );
    }

    #[test]
    fn other_crates_are_not_checkouts() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("Cargo.toml"), "[package]\nname = \"other\"\n").unwrap();
        fs::create_dir_all(temp.path().join("bundle")).unwrap();
        fs::write(temp.path().join("bundle/manifest.yml"), "version: 1\n").unwrap();
        assert!(!is_acforge_checkout(temp.path()));
    }

    #[test]
    fn checkout_without_bundle_is_ignored() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("Cargo.toml"), "[package]\nname = \"acforge\"\n").unwrap();
        assert_eq!(find_checkout_bundle(temp.path()), None);
    }

    #[test]
    fn source_mode_opens_directory() {
        let temp = TempDir::new().unwrap();
        make_checkout(temp.path());
        let mode = SourceMode::Source {
            root: temp.path().join("bundle"),
        };
        let source = mode.open().unwrap();
        assert_eq!(source.list_all().unwrap(), vec!["templates/a.md".to_string()]);
    }
}
