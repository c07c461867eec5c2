//! Key-level merging for JSON and YAML documents.
//!
//! # Merge Rules
//!
//! - Mappings are merged recursively, key by key
//! - Keys missing from the existing document are added, unless an earlier
//!   deployment wrote them; those were removed by the user and stay removed
//! - Keys whose current value still matches the hash recorded at the last
//!   deployment are updated to the template value
//! - Keys changed by the user are kept and reported
//! - Keys only present in the existing document are preserved
//! - Existing key order is kept; new keys follow in template order
//! - Non-mapping values, including arrays, are compared as a whole

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

/// Structured document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Pick the format from a file extension.
    pub fn for_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "yml" | "yaml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Parse a document. Blank text parses as an empty mapping.
    pub fn parse(&self, text: &str) -> Result<Value, String> {
        if text.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        match self {
            Self::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
        }
    }

    /// Render a document, ending with a newline.
    pub fn render(&self, value: &Value) -> Result<String, String> {
        match self {
            Self::Json => serde_json::to_string_pretty(value)
                .map(|s| s + "\n")
                .map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        }
    }
}

/// Result of merging two documents.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredMerge {
    /// The merged document.
    pub value: Value,
    /// Key paths added from the template.
    pub added: Vec<String>,
    /// Key paths updated to the template value.
    pub updated: Vec<String>,
    /// Key paths left untouched because the user changed them.
    pub kept: Vec<String>,
}

impl StructuredMerge {
    /// Whether the merged document differs from the existing one.
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty()
    }
}

/// Merge `incoming` into `existing` at the key level.
///
/// `recorded` maps key paths to the value hashes written by the previous
/// deployment (see [`key_hashes`]).
pub fn merge_documents(
    existing: &Value,
    incoming: &Value,
    recorded: &BTreeMap<String, String>,
) -> StructuredMerge {
    let mut result = StructuredMerge {
        value: Value::Null,
        added: Vec::new(),
        updated: Vec::new(),
        kept: Vec::new(),
    };
    let mut value = existing.clone();
    merge_at(&mut value, incoming, "", recorded, &mut result);
    result.value = value;
    result
}

fn merge_at(
    existing: &mut Value,
    incoming: &Value,
    path: &str,
    recorded: &BTreeMap<String, String>,
    report: &mut StructuredMerge,
) {
    match (existing, incoming) {
        (Value::Object(existing_map), Value::Object(incoming_map)) => {
            merge_maps(existing_map, incoming_map, path, recorded, report)
        }
        (existing, incoming) => {
            if *existing == *incoming {
                return;
            }
            if recorded.get(path) == Some(&value_hash(existing)) {
                *existing = incoming.clone();
                report.updated.push(display_path(path));
            } else {
                report.kept.push(display_path(path));
            }
        }
    }
}

fn merge_maps(
    existing: &mut Map<String, Value>,
    incoming: &Map<String, Value>,
    path: &str,
    recorded: &BTreeMap<String, String>,
    report: &mut StructuredMerge,
) {
    for (key, incoming_value) in incoming {
        let child = join_path(path, key);
        match existing.get_mut(key) {
            Some(existing_value) => {
                merge_at(existing_value, incoming_value, &child, recorded, report)
            }
            None if was_deployed(recorded, &child) => report.kept.push(child),
            None => {
                existing.insert(key.clone(), incoming_value.clone());
                report.added.push(child);
            }
        }
    }
}

/// Whether `path` or anything below it was recorded by a deployment.
fn was_deployed(recorded: &BTreeMap<String, String>, path: &str) -> bool {
    if recorded.contains_key(path) {
        return true;
    }
    let prefix = format!("{}.", path);
    recorded
        .range(prefix.clone()..)
        .next()
        .is_some_and(|(key, _)| key.starts_with(&prefix))
}

/// Hash every leaf of a document by dotted key path.
///
/// Mappings are descended into; every other value is a leaf.
pub fn key_hashes(value: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    collect_hashes(value, "", &mut out);
    out
}

fn collect_hashes(value: &Value, path: &str, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                collect_hashes(child, &join_path(path, key), out);
            }
        }
        other => {
            out.insert(path.to_string(), value_hash(other));
        }
    }
}

/// Stable hash of a single value.
pub fn value_hash(value: &Value) -> String {
    let canonical = serde_json::to_string(value).unwrap_or_default();
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(&digest[..12])
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "(document)".to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn adds_new_keys_after_existing_ones() {
        let existing = json!({"b": 1, "a": 2});
        let incoming = json!({"c": 3, "a": 2});
        let merged = merge_documents(&existing, &incoming, &BTreeMap::new());

        assert_eq!(merged.added, vec!["c".to_string()]);
        let keys: Vec<_> = merged.value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn updates_keys_unchanged_since_last_deploy() {
        let previous = json!({"model": "old"});
        let recorded = key_hashes(&previous);
        let merged = merge_documents(&previous, &json!({"model": "new"}), &recorded);

        assert_eq!(merged.updated, vec!["model".to_string()]);
        assert_eq!(merged.value["model"], "new");
    }

    #[test]
    fn keeps_user_edited_keys() {
        let recorded = key_hashes(&json!({"model": "old"}));
        let existing = json!({"model": "mine"});
        let merged = merge_documents(&existing, &json!({"model": "new"}), &recorded);

        assert_eq!(merged.kept, vec!["model".to_string()]);
        assert_eq!(merged.value["model"], "mine");
        assert!(!merged.changed());
    }

    #[test]
    fn without_record_differing_values_are_kept() {
        let merged = merge_documents(&json!({"a": 1}), &json!({"a": 2}), &BTreeMap::new());
        assert_eq!(merged.kept, vec!["a".to_string()]);
        assert_eq!(merged.value["a"], 1);
    }

    #[test]
    fn nested_mappings_merge_recursively() {
        let existing = json!({"permissions": {"allow": ["x"], "custom": true}});
        let incoming = json!({"permissions": {"allow": ["x"], "deny": ["y"]}});
        let merged = merge_documents(&existing, &incoming, &BTreeMap::new());

        assert_eq!(merged.added, vec!["permissions.deny".to_string()]);
        assert_eq!(merged.value["permissions"]["custom"], true);
        assert_eq!(merged.value["permissions"]["deny"][0], "y");
    }

    #[test]
    fn keys_removed_by_the_user_stay_removed() {
        let template = json!({"a": 1, "b": 2, "nested": {"c": 3}});
        let recorded = key_hashes(&template);
        let existing = json!({"a": 1});

        let merged = merge_documents(&existing, &template, &recorded);

        assert_eq!(merged.value, json!({"a": 1}));
        assert_eq!(merged.kept, vec!["b".to_string(), "nested".to_string()]);
        assert!(merged.added.is_empty());
        assert!(!merged.changed());
    }

    #[test]
    fn new_sibling_of_a_recorded_key_is_added() {
        let recorded = key_hashes(&json!({"permissions": {"allow": []}}));
        let existing = json!({"permissions": {"allow": []}});
        let incoming = json!({"permissions": {"allow": [], "deny": []}, "permissions_extra": 1});

        let merged = merge_documents(&existing, &incoming, &recorded);

        assert_eq!(
            merged.added,
            vec!["permissions.deny".to_string(), "permissions_extra".to_string()]
        );
    }

    #[test]
    fn arrays_are_leaves() {
        let recorded = key_hashes(&json!({"list": [1, 2]}));
        assert!(recorded.contains_key("list"));
        let merged = merge_documents(
            &json!({"list": [1, 2]}),
            &json!({"list": [1, 2, 3]}),
            &recorded,
        );
        assert_eq!(merged.value["list"], json!([1, 2, 3]));
    }

    #[test]
    fn user_only_keys_are_preserved() {
        let merged = merge_documents(&json!({"mine": 1}), &json!({"theirs": 2}), &BTreeMap::new());
        assert_eq!(merged.value, json!({"mine": 1, "theirs": 2}));
    }

    #[test]
    fn identical_documents_do_not_change() {
        let doc = json!({"a": {"b": 1}});
        let merged = merge_documents(&doc, &doc, &BTreeMap::new());
        assert!(!merged.changed());
        assert!(merged.kept.is_empty());
    }

    #[test]
    fn key_hashes_flatten_nested_paths() {
        let hashes = key_hashes(&json!({"a": {"b": 1, "c": {"d": "x"}}, "e": []}));
        let keys: Vec<_> = hashes.keys().cloned().collect();
        assert_eq!(keys, vec!["a.b", "a.c.d", "e"]);
    }

    #[test]
    fn yaml_round_trip_keeps_order() {
        let value = Format::Yaml.parse("zeta: 1\nalpha: 2\n").unwrap();
        let rendered = Format::Yaml.render(&value).unwrap();
        assert!(rendered.find("zeta").unwrap() < rendered.find("alpha").unwrap());
    }

    #[test]
    fn blank_document_is_empty_mapping() {
        assert_eq!(Format::Json.parse("  \n").unwrap(), json!({}));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(Format::Json.parse("{not json").is_err());
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::for_path(Path::new("a.json")), Some(Format::Json));
        assert_eq!(Format::for_path(Path::new("a.yaml")), Some(Format::Yaml));
        assert_eq!(Format::for_path(Path::new("a.md")), None);
    }
}
