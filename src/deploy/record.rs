//! Per-file deployment records.

use std::fmt;

use crate::merge::{ConflictDetail, MergeStrategy};

/// What happened to one target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeployOutcome {
    /// Created or replaced with template content.
    Written,
    /// Combined with existing content.
    Merged,
    /// Nothing to do.
    SkippedUnchanged,
    /// Needs human resolution; file left untouched.
    Conflict,
    /// Failed; file left untouched.
    Error,
}

impl DeployOutcome {
    /// Short name used in output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Written => "written",
            Self::Merged => "merged",
            Self::SkippedUnchanged => "skipped-unchanged",
            Self::Conflict => "conflict",
            Self::Error => "error",
        }
    }

    /// Whether the outcome fails the run.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Conflict | Self::Error)
    }

    /// Whether the file on disk was (or would be) modified.
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Written | Self::Merged)
    }
}

impl fmt::Display for DeployOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of deploying a single template.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentRecord {
    /// Target path relative to the repository root, `/`-separated.
    pub target_path: String,
    /// Path of the template inside its source.
    pub logical_path: String,
    /// Strategy that decided the outcome.
    pub strategy: MergeStrategy,
    /// Outcome.
    pub outcome: DeployOutcome,
    /// Checksum of the content written or left on disk.
    pub checksum: Option<String>,
    /// Short explanation.
    pub reason: Option<String>,
    /// Both versions, for conflicts.
    pub conflict: Option<ConflictDetail>,
    /// Non-fatal notes, e.g. user-edited keys that were kept.
    pub warnings: Vec<String>,
}

impl DeploymentRecord {
    pub(crate) fn new(target_path: &str, logical_path: &str, strategy: MergeStrategy) -> Self {
        Self {
            target_path: target_path.to_string(),
            logical_path: logical_path.to_string(),
            strategy,
            outcome: DeployOutcome::SkippedUnchanged,
            checksum: None,
            reason: None,
            conflict: None,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn error(
        target_path: &str,
        logical_path: &str,
        strategy: MergeStrategy,
        message: String,
    ) -> Self {
        Self {
            outcome: DeployOutcome::Error,
            reason: Some(message),
            ..Self::new(target_path, logical_path, strategy)
        }
    }
}

/// Records for every template in a run, in logical path order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentResult {
    /// One record per template.
    pub records: Vec<DeploymentRecord>,
    /// Whether nothing was written.
    pub dry_run: bool,
}

impl DeploymentResult {
    /// True when no record is an error or conflict.
    pub fn is_success(&self) -> bool {
        !self.records.iter().any(|r| r.outcome.is_failure())
    }

    /// Number of records with `outcome`.
    pub fn count(&self, outcome: DeployOutcome) -> usize {
        self.records.iter().filter(|r| r.outcome == outcome).count()
    }

    /// Records that need human resolution.
    pub fn conflicts(&self) -> impl Iterator<Item = &DeploymentRecord> {
        self.records
            .iter()
            .filter(|r| r.outcome == DeployOutcome::Conflict)
    }

    /// Target paths that were written or merged.
    pub fn changed_paths(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| r.outcome.is_change())
            .map(|r| r.target_path.clone())
            .collect()
    }

    /// Look up the record for a target path.
    pub fn record(&self, target_path: &str) -> Option<&DeploymentRecord> {
        self.records.iter().find(|r| r.target_path == target_path)
    }

    /// One-line summary, e.g. `2 written, 1 merged, 0 unchanged`.
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("{} written", self.count(DeployOutcome::Written)),
            format!("{} merged", self.count(DeployOutcome::Merged)),
            format!("{} unchanged", self.count(DeployOutcome::SkippedUnchanged)),
        ];
        let conflicts = self.count(DeployOutcome::Conflict);
        if conflicts > 0 {
            parts.push(format!("{} conflict{}", conflicts, if conflicts == 1 { "" } else { "s" }));
        }
        let errors = self.count(DeployOutcome::Error);
        if errors > 0 {
            parts.push(format!("{} error{}", errors, if errors == 1 { "" } else { "s" }));
        }
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, outcome: DeployOutcome) -> DeploymentRecord {
        DeploymentRecord {
            outcome,
            ..DeploymentRecord::new(path, path, MergeStrategy::UserResolve)
        }
    }

    #[test]
    fn success_requires_no_conflicts_or_errors() {
        let mut result = DeploymentResult {
            records: vec![
                record("a", DeployOutcome::Written),
                record("b", DeployOutcome::SkippedUnchanged),
            ],
            dry_run: false,
        };
        assert!(result.is_success());

        result.records.push(record("c", DeployOutcome::Conflict));
        assert!(!result.is_success());
        assert_eq!(result.conflicts().count(), 1);
    }

    #[test]
    fn summary_mentions_failures_only_when_present() {
        let result = DeploymentResult {
            records: vec![
                record("a", DeployOutcome::Written),
                record("b", DeployOutcome::Error),
            ],
            dry_run: false,
        };
        assert_eq!(result.summary(), "1 written, 0 merged, 0 unchanged, 1 error");
    }

    #[test]
    fn changed_paths_lists_written_and_merged() {
        let result = DeploymentResult {
            records: vec![
                record("a", DeployOutcome::Written),
                record("b", DeployOutcome::Merged),
                record("c", DeployOutcome::SkippedUnchanged),
            ],
            dry_run: false,
        };
        assert_eq!(result.changed_paths(), vec!["a", "b"]);
    }

    #[test]
    fn outcome_names() {
        assert_eq!(DeployOutcome::SkippedUnchanged.to_string(), "skipped-unchanged");
        assert!(DeployOutcome::Error.is_failure());
        assert!(!DeployOutcome::Merged.is_failure());
    }
}
