//! Parameter resolution for a target repository.
//!
//! Values are resolved in priority order:
//! 1. Explicit overrides (command-line flags, prompt answers, and overrides
//!    recorded by an earlier `init`)
//! 2. The project config `parameters:` map
//! 3. Values inferred from the target (git `origin` remote, directory name)
//! 4. Tool metadata (`ACF_VERSION`, `TEMPLATE_VERSION`)
//! 5. Persisted values and defaults (`CREATION_DATE`, `GITHUB_OWNER=unknown`,
//!    `REPO_URL` built from owner and project name)

use chrono::Utc;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use super::remote::{detect_origin_url, parse_github_remote};
use super::{
    ParameterSet, ACF_VERSION, CREATION_DATE, GITHUB_OWNER, PROJECT_NAME, REPO_URL,
    TEMPLATE_VERSION,
};
use crate::error::{ForgeError, Result};
use crate::modules::DEFAULT_GIT_TIMEOUT;

/// Keys every deployment must be able to resolve.
pub const REQUIRED_KEYS: &[&str] = &[
    GITHUB_OWNER,
    PROJECT_NAME,
    REPO_URL,
    CREATION_DATE,
    ACF_VERSION,
    TEMPLATE_VERSION,
];

/// Explicitly supplied parameter values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterOverrides {
    values: BTreeMap<String, String>,
}

impl ParameterOverrides {
    /// Create an empty set of overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value. Empty values are ignored.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.values.insert(key.into(), value);
        }
    }

    /// Builder-style [`set`](Self::set) for optional values.
    pub fn with(mut self, key: &str, value: Option<String>) -> Self {
        if let Some(v) = value {
            self.set(key, v);
        }
        self
    }

    /// Look up an override.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// All overrides.
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

/// Builds a [`ParameterSet`] for a target directory.
#[derive(Debug, Clone)]
pub struct ParameterResolver {
    overrides: ParameterOverrides,
    config: BTreeMap<String, String>,
    persisted: BTreeMap<String, String>,
    template_checksum: String,
    remote_url: Option<Option<String>>,
    git_timeout: Duration,
    today: Option<String>,
}

impl ParameterResolver {
    /// Create a resolver for a template bundle with the given checksum.
    pub fn new(template_checksum: impl Into<String>) -> Self {
        Self {
            overrides: ParameterOverrides::default(),
            config: BTreeMap::new(),
            persisted: BTreeMap::new(),
            template_checksum: template_checksum.into(),
            remote_url: None,
            git_timeout: DEFAULT_GIT_TIMEOUT,
            today: None,
        }
    }

    /// Apply explicit overrides.
    pub fn with_overrides(mut self, overrides: ParameterOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Apply the project config `parameters:` map.
    pub fn with_config(mut self, config: BTreeMap<String, String>) -> Self {
        self.config = config;
        self
    }

    /// Apply values recorded in state by an earlier deployment.
    pub fn with_persisted(mut self, persisted: BTreeMap<String, String>) -> Self {
        self.persisted = persisted;
        self
    }

    /// Use a fixed remote URL instead of asking git.
    pub fn with_remote_url(mut self, url: Option<String>) -> Self {
        self.remote_url = Some(url);
        self
    }

    /// Bound how long the `origin` lookup may take.
    pub fn with_git_timeout(mut self, timeout: Duration) -> Self {
        self.git_timeout = timeout;
        self
    }

    /// Use a fixed date instead of today.
    pub fn with_today(mut self, today: impl Into<String>) -> Self {
        self.today = Some(today.into());
        self
    }

    /// Values inferred from the target repository.
    pub fn infer(&self, target: &Path) -> BTreeMap<String, String> {
        let mut inferred = BTreeMap::new();

        let remote_url = match &self.remote_url {
            Some(url) => url.clone(),
            None => detect_origin_url(target, self.git_timeout),
        };

        if let Some(remote) = remote_url.as_deref().and_then(parse_github_remote) {
            inferred.insert(REPO_URL.to_string(), remote.url());
            inferred.insert(GITHUB_OWNER.to_string(), remote.owner);
            inferred.insert(PROJECT_NAME.to_string(), remote.repo);
        } else if let Some(name) = directory_name(target) {
            inferred.insert(PROJECT_NAME.to_string(), name);
        }

        inferred
    }

    /// Resolve the full parameter set for `target`.
    ///
    /// # Errors
    ///
    /// Returns `ParameterMissing` when a required key has no value.
    pub fn resolve(&self, target: &Path) -> Result<ParameterSet> {
        let mut values: BTreeMap<String, String> = BTreeMap::new();

        // Lowest priority first; each layer overwrites the previous one.
        values.insert(GITHUB_OWNER.to_string(), "unknown".to_string());
        let creation_date = self
            .persisted
            .get(CREATION_DATE)
            .cloned()
            .or_else(|| self.today.clone())
            .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());
        values.insert(CREATION_DATE.to_string(), creation_date);

        values.insert(
            ACF_VERSION.to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        if !self.template_checksum.is_empty() {
            values.insert(
                TEMPLATE_VERSION.to_string(),
                crate::templates::template_version(&self.template_checksum),
            );
        }

        values.extend(self.infer(target));
        values.extend(non_empty(&self.config));
        values.extend(
            non_empty(&self.persisted).filter(|(k, _)| k.as_str() != CREATION_DATE),
        );
        values.extend(self.overrides.values().clone());

        // REPO_URL follows the final owner and project name unless set explicitly.
        if !self.has_explicit(REPO_URL) {
            if let (Some(owner), Some(name)) =
                (values.get(GITHUB_OWNER), values.get(PROJECT_NAME))
            {
                let derived = format!("https://github.com/{}/{}", owner, name);
                values.insert(REPO_URL.to_string(), derived);
            }
        }

        for key in REQUIRED_KEYS {
            if !values.contains_key(*key) {
                return Err(ForgeError::ParameterMissing {
                    path: String::new(),
                    key: (*key).to_string(),
                    line: 0,
                });
            }
        }

        tracing::debug!("Resolved {} parameters for {}", values.len(), target.display());
        Ok(ParameterSet::new(values))
    }

    /// Values worth recording in state so later runs resolve the same set.
    ///
    /// This is the creation date plus every explicit override.
    pub fn persistable(&self, resolved: &ParameterSet) -> BTreeMap<String, String> {
        let mut out: BTreeMap<String, String> = self
            .persisted
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.extend(self.overrides.values().clone());
        if let Some(date) = resolved.get(CREATION_DATE) {
            out.insert(CREATION_DATE.to_string(), date.to_string());
        }
        out
    }

    fn has_explicit(&self, key: &str) -> bool {
        self.overrides.get(key).is_some()
            || self.config.get(key).is_some_and(|v| !v.trim().is_empty())
            || self.persisted.get(key).is_some_and(|v| !v.trim().is_empty())
    }
}

fn non_empty(map: &BTreeMap<String, String>) -> impl Iterator<Item = (String, String)> + '_ {
    map.iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| (k.clone(), v.clone()))
}

fn directory_name(path: &Path) -> Option<String> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    canonical
        .file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::git::test_support::{git, init_repo, GIT_LOCK};
    use tempfile::TempDir;

    fn resolver() -> ParameterResolver {
        ParameterResolver::new("abcdef0123456789")
            .with_remote_url(None)
            .with_today("2026-01-02")
    }

    #[test]
    fn defaults_without_remote() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("my-project");
        std::fs::create_dir(&dir).unwrap();

        let params = resolver().resolve(&dir).unwrap();
        assert_eq!(params.get(GITHUB_OWNER), Some("unknown"));
        assert_eq!(params.get(PROJECT_NAME), Some("my-project"));
        assert_eq!(
            params.get(REPO_URL),
            Some("https://github.com/unknown/my-project")
        );
        assert_eq!(params.get(CREATION_DATE), Some("2026-01-02"));
        assert_eq!(params.get(TEMPLATE_VERSION), Some("abcdef01"));
        assert_eq!(params.get(ACF_VERSION), Some(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn remote_inference_beats_directory_name() {
        let temp = TempDir::new().unwrap();
        let params = resolver()
            .with_remote_url(Some("git@github.com:acme/widgets.git".into()))
            .resolve(temp.path())
            .unwrap();
        assert_eq!(params.get(GITHUB_OWNER), Some("acme"));
        assert_eq!(params.get(PROJECT_NAME), Some("widgets"));
        assert_eq!(params.get(REPO_URL), Some("https://github.com/acme/widgets"));
    }

    #[test]
    fn origin_remote_is_read_from_git() {
        let _lock = GIT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let temp = TempDir::new().unwrap();
        init_repo(temp.path(), &[("README.md", "hi\n")]);
        git(
            temp.path(),
            &["remote", "add", "origin", "https://github.com/acme/gadgets.git"],
        );

        let inferred = ParameterResolver::new("")
            .with_git_timeout(Duration::from_secs(30))
            .infer(temp.path());
        assert_eq!(inferred.get(GITHUB_OWNER).map(String::as_str), Some("acme"));
        assert_eq!(inferred.get(PROJECT_NAME).map(String::as_str), Some("gadgets"));
    }

    #[test]
    fn overrides_beat_inference() {
        let temp = TempDir::new().unwrap();
        let overrides = ParameterOverrides::new().with(GITHUB_OWNER, Some("me".into()));
        let params = resolver()
            .with_remote_url(Some("https://github.com/acme/widgets".into()))
            .with_overrides(overrides)
            .resolve(temp.path())
            .unwrap();
        assert_eq!(params.get(GITHUB_OWNER), Some("me"));
        assert_eq!(params.get(REPO_URL), Some("https://github.com/me/widgets"));
    }

    #[test]
    fn config_sits_between_overrides_and_inference() {
        let temp = TempDir::new().unwrap();
        let mut config = BTreeMap::new();
        config.insert(PROJECT_NAME.to_string(), "from-config".to_string());
        config.insert("TEAM".to_string(), "platform".to_string());

        let params = resolver()
            .with_config(config.clone())
            .resolve(temp.path())
            .unwrap();
        assert_eq!(params.get(PROJECT_NAME), Some("from-config"));
        assert_eq!(params.get("TEAM"), Some("platform"));

        let overrides = ParameterOverrides::new().with(PROJECT_NAME, Some("cli".into()));
        let params = resolver()
            .with_config(config)
            .with_overrides(overrides)
            .resolve(temp.path())
            .unwrap();
        assert_eq!(params.get(PROJECT_NAME), Some("cli"));
    }

    #[test]
    fn persisted_creation_date_is_reused() {
        let temp = TempDir::new().unwrap();
        let mut persisted = BTreeMap::new();
        persisted.insert(CREATION_DATE.to_string(), "2020-05-05".to_string());
        let params = resolver()
            .with_persisted(persisted)
            .resolve(temp.path())
            .unwrap();
        assert_eq!(params.get(CREATION_DATE), Some("2020-05-05"));
    }

    #[test]
    fn explicit_repo_url_is_kept() {
        let temp = TempDir::new().unwrap();
        let overrides = ParameterOverrides::new()
            .with(GITHUB_OWNER, Some("me".into()))
            .with(REPO_URL, Some("https://example.com/repo".into()));
        let params = resolver()
            .with_overrides(overrides)
            .resolve(temp.path())
            .unwrap();
        assert_eq!(params.get(REPO_URL), Some("https://example.com/repo"));
    }

    #[test]
    fn empty_override_is_ignored() {
        let mut overrides = ParameterOverrides::new();
        overrides.set(GITHUB_OWNER, "  ");
        assert!(overrides.get(GITHUB_OWNER).is_none());
    }

    #[test]
    fn missing_template_version_is_reported() {
        let temp = TempDir::new().unwrap();
        let err = ParameterResolver::new("")
            .with_remote_url(None)
            .resolve(temp.path())
            .unwrap_err();
        match err {
            ForgeError::ParameterMissing { key, .. } => assert_eq!(key, TEMPLATE_VERSION),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn persistable_records_date_and_overrides() {
        let temp = TempDir::new().unwrap();
        let overrides = ParameterOverrides::new().with(GITHUB_OWNER, Some("me".into()));
        let resolver = resolver().with_overrides(overrides);
        let params = resolver.resolve(temp.path()).unwrap();
        let persisted = resolver.persistable(&params);
        assert_eq!(persisted.get(CREATION_DATE).map(String::as_str), Some("2026-01-02"));
        assert_eq!(persisted.get(GITHUB_OWNER).map(String::as_str), Some("me"));
        assert!(!persisted.contains_key(TEMPLATE_VERSION));
    }
}
