//! Repository identity inferred from the git `origin` remote.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use crate::modules::GitRunner;

static GITHUB_REMOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com[:/]([^/]+)/([^/]+?)(?:\.git)?/?$")
        .expect("GITHUB_REMOTE must compile")
});

/// Owner and repository parsed from a GitHub remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubRemote {
    pub owner: String,
    pub repo: String,
}

impl GitHubRemote {
    /// Canonical HTTPS URL of the repository.
    pub fn url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }
}

/// Parse `owner/repo` out of an SSH or HTTPS GitHub remote.
///
/// Accepts `git@github.com:owner/repo.git`, `https://github.com/owner/repo`
/// and the same with a trailing `.git` or `/`.
pub fn parse_github_remote(url: &str) -> Option<GitHubRemote> {
    let caps = GITHUB_REMOTE.captures(url.trim())?;
    Some(GitHubRemote {
        owner: caps.get(1)?.as_str().to_string(),
        repo: caps.get(2)?.as_str().to_string(),
    })
}

/// Read the `origin` remote URL of the repository containing `path`.
///
/// Returns `None` when `path` is not a git repository, has no origin, git is
/// not installed, or git does not answer within `timeout`.
pub fn detect_origin_url(path: &Path, timeout: Duration) -> Option<String> {
    let url = GitRunner::new(path, timeout)
        .run(&["remote", "get-url", "origin"])
        .ok()?;
    let url = url.trim();
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}
