//! Deployment summaries.

use crate::deploy::{DeployOutcome, DeploymentRecord, DeploymentResult};
use crate::error::ForgeError;
use crate::merge::ConflictDetail;

use super::table::Table;
use super::theme::ForgeTheme;

/// Lines of each side shown in a conflict preview.
const PREVIEW_LINES: usize = 12;

/// Render the per-file summary table.
///
/// With `details`, warnings are appended to the reason column.
pub fn deployment_table(result: &DeploymentResult, theme: &ForgeTheme, details: bool) -> String {
    let mut table = Table::new(vec!["Path", "Outcome", "Strategy", "Reason"]);

    for record in &result.records {
        let mut reason = record.reason.clone().unwrap_or_default();
        if details && !record.warnings.is_empty() {
            if !reason.is_empty() {
                reason.push_str("; ");
            }
            reason.push_str(&record.warnings.join("; "));
        }

        table.add_row(vec![
            record.target_path.clone(),
            theme.format_outcome(record.outcome),
            record.strategy.to_string(),
            reason,
        ]);
    }

    table.render()
}

/// One-line summary shown under the table.
pub fn deployment_footer(result: &DeploymentResult) -> String {
    if result.dry_run {
        format!("{} (dry run, nothing written)", result.summary())
    } else {
        result.summary()
    }
}

/// Short description of each failed record.
pub fn failure_lines(result: &DeploymentResult) -> Vec<String> {
    result
        .records
        .iter()
        .filter(|r| r.outcome.is_failure())
        .map(failure_line)
        .collect()
}

fn failure_line(record: &DeploymentRecord) -> String {
    let reason = record.reason.clone().unwrap_or_default();
    match record.outcome {
        DeployOutcome::Conflict => ForgeError::MergeConflict {
            path: record.target_path.clone(),
            reason,
        }
        .to_string(),
        _ => format!("{}: {}", record.target_path, reason),
    }
}

/// Path and preview lines for every conflict in `result`.
pub fn conflict_previews(result: &DeploymentResult) -> Vec<(String, Vec<String>)> {
    result
        .conflicts()
        .filter_map(|record| {
            let detail = record.conflict.as_ref()?;
            Some((record.target_path.clone(), conflict_preview(detail)))
        })
        .collect()
}

/// Line-level preview of a conflict.
///
/// Lines only present locally are prefixed with `-`, lines only present in
/// the template with `+`.
pub fn conflict_preview(detail: &ConflictDetail) -> Vec<String> {
    let local: Vec<&str> = detail.existing.lines().collect();
    let template: Vec<&str> = detail.incoming.lines().collect();

    let removed = local
        .iter()
        .filter(|l| !template.contains(l))
        .take(PREVIEW_LINES)
        .map(|l| format!("- {}", l));
    let added = template
        .iter()
        .filter(|l| !local.contains(l))
        .take(PREVIEW_LINES)
        .map(|l| format!("+ {}", l));

    removed.chain(added).collect()
}
