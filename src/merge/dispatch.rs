//! Path-based strategy selection.

use std::path::{Component, Path};

use super::MergeStrategy;

/// Select the merge strategy for a target path.
///
/// Rules are checked in order:
/// 1. ignore-style files (`.gitignore`, `.dockerignore`, `*.ignore`) → `Union`
/// 2. anything under `.acforge/` → `Overwrite`
/// 3. `.json`, `.yml`, `.yaml` → `StructuredMerge`
/// 4. anything under `.claude/agents/` or `.claude/commands/` → `Append`
/// 5. everything else → `UserResolve`
pub fn select(target_path: &Path) -> MergeStrategy {
    let components: Vec<String> = target_path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let Some(file_name) = components.last() else {
        return MergeStrategy::UserResolve;
    };

    if is_ignore_file(file_name) {
        return MergeStrategy::Union;
    }

    if components.first().map(String::as_str) == Some(".acforge") {
        return MergeStrategy::Overwrite;
    }

    let extension = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    if matches!(extension.as_deref(), Some("json" | "yml" | "yaml")) {
        return MergeStrategy::StructuredMerge;
    }

    if components.len() > 2
        && components[0] == ".claude"
        && matches!(components[1].as_str(), "agents" | "commands")
    {
        return MergeStrategy::Append;
    }

    MergeStrategy::UserResolve
}

fn is_ignore_file(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    lower.ends_with(".ignore") || (lower.starts_with('.') && lower.ends_with("ignore"))
}
