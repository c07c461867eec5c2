//! Merge strategies for reconciling templates with existing files.
//!
//! This module provides:
//! - [`MergeStrategy`], the closed set of strategies
//! - [`select`], the pure path-to-strategy dispatcher
//! - [`apply`], which combines existing content with new template content
//!
//! # Drift
//!
//! A file is *modified* when it is tracked in state and its on-disk checksum
//! differs from both the recorded checksum and the new content. Whole-file
//! strategies never overwrite modified files: `Overwrite` routes them to
//! `UserResolve`, `Append` leaves them in place. `Union` and
//! `StructuredMerge` always merge around user content.

pub mod dispatch;
pub mod structured;
pub mod union;

pub use dispatch::select;
pub use structured::{key_hashes, merge_documents, Format, StructuredMerge};
pub use union::union_lines;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::state::{content_checksum, FileEntry};

/// How a template is combined with an existing target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// Always write the template content.
    Overwrite,
    /// Line-set union for ignore-style files.
    Union,
    /// Key-level merge of JSON or YAML documents.
    StructuredMerge,
    /// File-level presence for directories of independent files.
    Append,
    /// Hand anything ambiguous to a human.
    UserResolve,
}

impl MergeStrategy {
    /// Short name used in state and output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::Union => "union",
            Self::StructuredMerge => "structured-merge",
            Self::Append => "append",
            Self::UserResolve => "user-resolve",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Both sides of a conflict, for presentation to a human.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictDetail {
    /// Content currently on disk.
    pub existing: String,
    /// Content the template would produce.
    pub incoming: String,
}

/// What a strategy decided to do with one file.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// Write `content`, replacing or creating the file.
    Write { content: Vec<u8>, reason: String },
    /// Write `content` that combines existing and template content.
    Merged {
        content: Vec<u8>,
        reason: String,
        warnings: Vec<String>,
    },
    /// Leave the file as it is.
    Unchanged { reason: String, warnings: Vec<String> },
    /// Needs human resolution.
    Conflict {
        reason: String,
        detail: ConflictDetail,
    },
}

impl MergeOutcome {
    fn unchanged(reason: impl Into<String>) -> Self {
        Self::Unchanged {
            reason: reason.into(),
            warnings: Vec::new(),
        }
    }

    fn write(content: &[u8], reason: impl Into<String>) -> Self {
        Self::Write {
            content: content.to_vec(),
            reason: reason.into(),
        }
    }

    fn conflict(existing: &[u8], incoming: &[u8], reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
            detail: ConflictDetail {
                existing: String::from_utf8_lossy(existing).into_owned(),
                incoming: String::from_utf8_lossy(incoming).into_owned(),
            },
        }
    }
}

/// Inputs for a single merge decision.
#[derive(Debug, Clone, Copy)]
pub struct MergeInput<'a> {
    /// Target path relative to the repository root.
    pub target_path: &'a Path,
    /// Current content on disk, if the file exists.
    pub existing: Option<&'a [u8]>,
    /// Content produced from the template.
    pub incoming: &'a [u8],
    /// State recorded by the previous deployment of this file.
    pub prior: Option<&'a FileEntry>,
}

/// Relationship between the file on disk and what acforge last wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// No file on disk.
    Absent,
    /// On-disk content equals the new content.
    Identical,
    /// Tracked and unchanged since the last deployment.
    Pristine,
    /// Tracked and changed since the last deployment.
    Modified,
    /// Exists but was never deployed by acforge.
    Untracked,
}

impl FileStatus {
    /// Classify a file.
    pub fn classify(input: &MergeInput<'_>) -> Self {
        let Some(existing) = input.existing else {
            return Self::Absent;
        };
        if existing == input.incoming {
            return Self::Identical;
        }
        match input.prior {
            Some(prior) if prior.checksum == content_checksum(existing) => Self::Pristine,
            Some(_) => Self::Modified,
            None => Self::Untracked,
        }
    }
}

/// Apply `strategy` to one file.
///
/// Returns the strategy that actually decided the outcome, which differs
/// from `strategy` when a modified `Overwrite` file is routed to
/// `UserResolve` or an unparsable structured file falls back to it.
pub fn apply(strategy: MergeStrategy, input: &MergeInput<'_>) -> (MergeStrategy, MergeOutcome) {
    let status = FileStatus::classify(input);

    match strategy {
        MergeStrategy::Overwrite => match status {
            FileStatus::Modified => user_resolve(input, status),
            _ => (strategy, overwrite(input, status)),
        },
        MergeStrategy::Union => (strategy, union(input, status)),
        MergeStrategy::StructuredMerge => structured(input, status),
        MergeStrategy::Append => (strategy, append(input, status)),
        MergeStrategy::UserResolve => user_resolve(input, status),
    }
}

fn overwrite(input: &MergeInput<'_>, status: FileStatus) -> MergeOutcome {
    match status {
        FileStatus::Absent => MergeOutcome::write(input.incoming, "new file"),
        FileStatus::Identical => MergeOutcome::unchanged("up to date"),
        _ => MergeOutcome::write(input.incoming, "replaced"),
    }
}

fn append(input: &MergeInput<'_>, status: FileStatus) -> MergeOutcome {
    match status {
        FileStatus::Absent => MergeOutcome::write(input.incoming, "new file"),
        FileStatus::Identical => MergeOutcome::unchanged("up to date"),
        FileStatus::Pristine => MergeOutcome::write(input.incoming, "updated"),
        FileStatus::Modified | FileStatus::Untracked => {
            MergeOutcome::unchanged("user-owned, left in place")
        }
    }
}

fn user_resolve(input: &MergeInput<'_>, status: FileStatus) -> (MergeStrategy, MergeOutcome) {
    let outcome = match status {
        FileStatus::Absent => MergeOutcome::write(input.incoming, "new file"),
        FileStatus::Identical => MergeOutcome::unchanged("up to date"),
        FileStatus::Pristine => MergeOutcome::write(input.incoming, "updated"),
        FileStatus::Modified => MergeOutcome::conflict(
            input.existing.unwrap_or_default(),
            input.incoming,
            "modified since last deployment",
        ),
        FileStatus::Untracked => MergeOutcome::conflict(
            input.existing.unwrap_or_default(),
            input.incoming,
            "exists and differs from template",
        ),
    };
    (MergeStrategy::UserResolve, outcome)
}

fn union(input: &MergeInput<'_>, status: FileStatus) -> MergeOutcome {
    if status == FileStatus::Identical {
        return MergeOutcome::unchanged("up to date");
    }

    let existing = String::from_utf8_lossy(input.existing.unwrap_or_default());
    let incoming = String::from_utf8_lossy(input.incoming);

    match union_lines(&existing, &incoming) {
        None => MergeOutcome::unchanged("all lines present"),
        Some(content) if status == FileStatus::Absent => MergeOutcome::Write {
            content: content.into_bytes(),
            reason: "new file".to_string(),
        },
        Some(content) => {
            let added = content.lines().count() - existing.lines().count();
            MergeOutcome::Merged {
                content: content.into_bytes(),
                reason: format!("{} line{} added", added, plural(added)),
                warnings: Vec::new(),
            }
        }
    }
}

fn structured(input: &MergeInput<'_>, status: FileStatus) -> (MergeStrategy, MergeOutcome) {
    let strategy = MergeStrategy::StructuredMerge;
    match status {
        FileStatus::Absent => return (strategy, MergeOutcome::write(input.incoming, "new file")),
        FileStatus::Identical => return (strategy, MergeOutcome::unchanged("up to date")),
        _ => {}
    }

    let Some(format) = Format::for_path(input.target_path) else {
        return user_resolve(input, status);
    };

    let existing_text = String::from_utf8_lossy(input.existing.unwrap_or_default());
    let incoming_text = String::from_utf8_lossy(input.incoming);
    let (existing, incoming) = match (format.parse(&existing_text), format.parse(&incoming_text)) {
        (Ok(e), Ok(i)) => (e, i),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(
                "Cannot parse {}: {}; needs manual resolution",
                input.target_path.display(),
                e
            );
            return user_resolve(input, status);
        }
    };

    let empty = BTreeMap::new();
    let recorded = input.prior.map(|p| &p.keys).unwrap_or(&empty);
    let merged = merge_documents(&existing, &incoming, recorded);
    let warnings: Vec<String> = merged
        .kept
        .iter()
        .map(|k| format!("kept local value for '{}'", k))
        .collect();

    if !merged.changed() {
        let reason = if warnings.is_empty() {
            "all keys present".to_string()
        } else {
            format!("{} local key{} kept", warnings.len(), plural(warnings.len()))
        };
        return (strategy, MergeOutcome::Unchanged { reason, warnings });
    }

    match format.render(&merged.value) {
        Ok(content) => {
            let mut parts = Vec::new();
            if !merged.added.is_empty() {
                let added = merged.added.len();
                parts.push(format!("{} key{} added", added, plural(added)));
            }
            if !merged.updated.is_empty() {
                parts.push(format!("{} updated", merged.updated.len()));
            }
            if !merged.kept.is_empty() {
                parts.push(format!("{} kept", merged.kept.len()));
            }
            (
                strategy,
                MergeOutcome::Merged {
                    content: content.into_bytes(),
                    reason: parts.join(", "),
                    warnings,
                },
            )
        }
        Err(e) => {
            tracing::warn!("Cannot render {}: {}", input.target_path.display(), e);
            user_resolve(input, status)
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
