//! Project configuration schema.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Project configuration from `.acforge/config.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// Parameter values, below CLI flags and above inferred values.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,

    /// Timeout for every git subprocess, in seconds.
    #[serde(default = "default_git_timeout_secs")]
    pub git_timeout_secs: u64,

    /// Template source (`bundled` or a directory), below the CLI flag.
    #[serde(default)]
    pub template_source: Option<String>,

    /// Modules known to the project, used by `module update` when the
    /// module is missing from state.
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleConfig>,
}

fn default_git_timeout_secs() -> u64 {
    120
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            parameters: BTreeMap::new(),
            git_timeout_secs: default_git_timeout_secs(),
            template_source: None,
            modules: BTreeMap::new(),
        }
    }
}

impl ForgeConfig {
    /// Git timeout as a duration.
    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs)
    }
}

/// A module declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Repository URL.
    pub url: String,

    /// Branch or tag.
    #[serde(default = "default_ref", rename = "ref")]
    pub git_ref: String,
}

fn default_ref() -> String {
    "main".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_mapping() {
        let config: ForgeConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ForgeConfig::default());
        assert_eq!(config.git_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn parses_modules_with_default_ref() {
        let config: ForgeConfig = serde_yaml::from_str(
            r#"
modules:
  extra:
    url: https://github.com/acme/extra.git
  pinned:
    url: https://github.com/acme/pinned.git
    ref: v1.2.0
"#,
        )
        .unwrap();

        assert_eq!(config.modules["extra"].git_ref, "main");
        assert_eq!(config.modules["pinned"].git_ref, "v1.2.0");
    }
}
