//! Deep merge algorithm for YAML configuration values.
//!
//! `.acforge/config.local.yml` is layered over `.acforge/config.yml`. This
//! module implements the merge semantics.
//!
//! # Merge Rules
//!
//! - Objects are merged recursively
//! - Arrays are replaced entirely (not merged)
//! - Null values in overlay delete the corresponding key from base
//! - Scalars in overlay replace scalars in base

use serde_yaml::Value;

/// Deep merge two YAML values.
///
/// Later values override earlier values at the point of conflict.
/// Objects are merged recursively. Arrays are replaced entirely.
/// Null values in overlay delete the corresponding key from base.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            let mut result = base_map.clone();

            for (key, overlay_value) in overlay_map {
                if overlay_value.is_null() {
                    result.remove(key);
                } else if let Some(base_value) = base_map.get(key) {
                    result.insert(key.clone(), deep_merge(base_value, overlay_value));
                } else {
                    result.insert(key.clone(), overlay_value.clone());
                }
            }

            Value::Mapping(result)
        }

        (_, overlay) => overlay.clone(),
    }
}

/// Merge multiple configs in order (later overrides earlier).
///
/// Empty documents (null) are skipped.
pub fn merge_configs(configs: &[Value]) -> Value {
    configs
        .iter()
        .filter(|config| !config.is_null())
        .fold(Value::Mapping(Default::default()), |acc, config| {
            deep_merge(&acc, config)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn local_parameters_override_project_parameters() {
        let base = yaml(
            r#"
parameters:
  GITHUB_OWNER: acme
  PROJECT_NAME: widget
"#,
        );
        let overlay = yaml(
            r#"
parameters:
  GITHUB_OWNER: me
"#,
        );

        let result = deep_merge(&base, &overlay);

        assert_eq!(result["parameters"]["GITHUB_OWNER"], "me");
        assert_eq!(result["parameters"]["PROJECT_NAME"], "widget");
    }

    #[test]
    fn arrays_are_replaced_not_merged() {
        let base = yaml("list:\n  - a\n  - b\n");
        let overlay = yaml("list:\n  - c\n");

        let result = deep_merge(&base, &overlay);
        let list = result["list"].as_sequence().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0], "c");
    }

    #[test]
    fn null_removes_inherited_value() {
        let base = yaml("modules:\n  extra:\n    url: x\n  other:\n    url: y\n");
        let overlay = yaml("modules:\n  extra: ~\n");

        let result = deep_merge(&base, &overlay);
        assert!(result["modules"].get("extra").is_none());
        assert_eq!(result["modules"]["other"]["url"], "y");
    }

    #[test]
    fn merge_configs_applies_in_order_and_skips_empty() {
        let configs = vec![
            yaml("git_timeout_secs: 10"),
            Value::Null,
            yaml("git_timeout_secs: 30"),
        ];
        let result = merge_configs(&configs);
        assert_eq!(result["git_timeout_secs"], 30);
    }

    #[test]
    fn scalar_overlay_replaces_mapping_base() {
        let result = deep_merge(&yaml("a:\n  b: 1\n"), &yaml("a: 2\n"));
        assert_eq!(result["a"], 2);
    }
}
