//! Bundle manifest definitions.
//!
//! The manifest maps paths inside a template root to their location in a
//! target repository.

use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, Result};

/// Suffix stripped from deployed file names.
pub const TEMPLATE_SUFFIX: &str = ".template";

/// Manifest describing how a template root is laid out in a target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleManifest {
    /// Manifest version.
    #[serde(default = "default_manifest_version")]
    pub version: u32,

    /// Path mappings from template root to target repository.
    #[serde(default)]
    pub mappings: Vec<Mapping>,
}

fn default_manifest_version() -> u32 {
    1
}

/// A single prefix mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    /// Prefix relative to `templates/` or `static/`.
    pub from: String,
    /// Replacement prefix in the target repository.
    pub to: String,
}

impl BundleManifest {
    /// Parse a manifest from YAML text.
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| ForgeError::TemplateResolution {
            message: format!("invalid manifest {}: {}", origin, e),
        })
    }

    /// Compute the target-relative path for a path inside the template root.
    ///
    /// `relative` is the path below `templates/` or `static/`. The longest
    /// matching `from` prefix is replaced by its `to`, then a trailing
    /// `.template` suffix is removed.
    pub fn target_for(&self, relative: &str) -> String {
        let mapped = self
            .mappings
            .iter()
            .filter(|m| relative.starts_with(m.from.as_str()))
            .max_by_key(|m| m.from.len())
            .map(|m| format!("{}{}", m.to, &relative[m.from.len()..]))
            .unwrap_or_else(|| relative.to_string());

        match mapped.strip_suffix(TEMPLATE_SUFFIX) {
            Some(stripped) if !stripped.is_empty() && !stripped.ends_with('/') => {
                stripped.to_string()
            }
            _ => mapped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> BundleManifest {
        BundleManifest::parse(
            r#"
version: 1
mappings:
  - from: guidelines/
    to: ""
  - from: claude/
    to: .claude/
  - from: claude/special/
    to: .special/
  - from: git/gitignore
    to: .gitignore
"#,
            "test",
        )
        .unwrap()
    }

    #[test]
    fn parse_manifest() {
        let m = manifest();
        assert_eq!(m.version, 1);
        assert_eq!(m.mappings.len(), 4);
    }

    #[test]
    fn empty_mapping_moves_to_root() {
        assert_eq!(manifest().target_for("guidelines/CLAUDE.md.template"), "CLAUDE.md");
    }

    #[test]
    fn prefix_mapping_rewrites_directory() {
        assert_eq!(
            manifest().target_for("claude/agents/researcher.md.template"),
            ".claude/agents/researcher.md"
        );
    }

    #[test]
    fn longest_prefix_wins() {
        assert_eq!(manifest().target_for("claude/special/x.md"), ".special/x.md");
    }

    #[test]
    fn exact_file_mapping() {
        assert_eq!(manifest().target_for("git/gitignore"), ".gitignore");
    }

    #[test]
    fn unmapped_paths_are_kept() {
        assert_eq!(manifest().target_for("docs/readme.md"), "docs/readme.md");
    }

    #[test]
    fn bare_suffix_is_not_stripped_to_nothing() {
        let m = BundleManifest::default();
        assert_eq!(m.target_for(".template"), ".template");
    }

    #[test]
    fn invalid_manifest_is_resolution_error() {
        let err = BundleManifest::parse("mappings: [1, 2", "bad").unwrap_err();
        assert!(matches!(err, ForgeError::TemplateResolution { .. }));
    }
}
