//! Template parameters.
//!
//! This module provides:
//! - [`ParameterSet`], the immutable key/value map handed to substitution
//! - [`ParameterResolver`], which derives the set from the target repository
//! - [`substitute`], the `{{KEY}}` substitution pass

pub mod remote;
pub mod resolver;
pub mod substitute;

pub use remote::{parse_github_remote, GitHubRemote};
pub use resolver::{ParameterOverrides, ParameterResolver};
pub use substitute::{parse_placeholders, referenced_keys, substitute, Segment};

use std::collections::BTreeMap;

/// Repository owner or organization.
pub const GITHUB_OWNER: &str = "GITHUB_OWNER";
/// Project (repository) name.
pub const PROJECT_NAME: &str = "PROJECT_NAME";
/// Repository URL.
pub const REPO_URL: &str = "REPO_URL";
/// Date of the first deployment.
pub const CREATION_DATE: &str = "CREATION_DATE";
/// Version of acforge that produced the files.
pub const ACF_VERSION: &str = "ACF_VERSION";
/// Short checksum of the template bundle.
pub const TEMPLATE_VERSION: &str = "TEMPLATE_VERSION";

/// Immutable mapping from placeholder key to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    values: BTreeMap<String, String>,
}

impl ParameterSet {
    /// Build a set from an owned map.
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    /// Build a set from key/value pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Check whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
