//! Deployment orchestration.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use anyhow::anyhow;

use crate::error::{ForgeError, Result};
use crate::merge::{self, key_hashes, FileStatus, Format, MergeInput, MergeOutcome, MergeStrategy};
use crate::parameters::{substitute, ParameterSet};
use crate::state::{content_checksum, FileEntry, ModuleState};
use crate::templates::TemplateAsset;

use super::record::{DeployOutcome, DeploymentRecord, DeploymentResult};
use super::writer::write_atomic;

/// Source label for templates from the main bundle.
pub const BUNDLE_SOURCE: &str = "bundle";

const LOCAL_KEPT: &str = "local version kept";
const LOCAL_BACKED_UP: &str = "replaced; local copy backed up";

/// Where a run deploys to and what it deploys.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Target repository root.
    pub target: PathBuf,
    /// Label recorded in state for each file (`bundle`, `module:<name>`).
    pub source: String,
    /// Template version recorded in state for each file.
    pub template_version: String,
    /// When set, conflicting files are copied here and then replaced with
    /// the template version.
    pub backups: Option<PathBuf>,
}

impl RunContext {
    /// Create a context for the main bundle.
    pub fn new(target: &Path, template_version: impl Into<String>) -> Self {
        Self {
            target: target.to_path_buf(),
            source: BUNDLE_SOURCE.to_string(),
            template_version: template_version.into(),
            backups: None,
        }
    }

    /// Use a different source label.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Replace conflicting files, keeping copies under `dir`.
    pub fn with_backups(mut self, dir: PathBuf) -> Self {
        self.backups = Some(dir);
        self
    }
}

/// Progress events emitted during deployment.
#[derive(Debug)]
pub enum DeployProgress<'a> {
    /// A template is about to be processed.
    Starting {
        path: &'a str,
        index: usize,
        total: usize,
    },
    /// A template was processed.
    Finished { record: &'a DeploymentRecord },
}

/// Deploys resolved templates into a target repository.
pub struct Deployer<'a> {
    ctx: &'a RunContext,
}

impl<'a> Deployer<'a> {
    /// Create a deployer for a run.
    pub fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    /// Deploy `assets`, updating `state` in memory.
    ///
    /// The caller persists `state` afterwards. Nothing is written to disk
    /// and `state` is left untouched when `dry_run` is set.
    pub fn deploy(
        &self,
        assets: &[TemplateAsset],
        params: &ParameterSet,
        state: &mut ModuleState,
        dry_run: bool,
    ) -> DeploymentResult {
        self.deploy_with_progress(assets, params, state, dry_run, |_| {})
    }

    /// Deploy `assets` with a progress callback.
    pub fn deploy_with_progress(
        &self,
        assets: &[TemplateAsset],
        params: &ParameterSet,
        state: &mut ModuleState,
        dry_run: bool,
        mut on_progress: impl FnMut(DeployProgress<'_>),
    ) -> DeploymentResult {
        let mut ordered: Vec<&TemplateAsset> = assets.iter().collect();
        ordered.sort_by(|a, b| a.logical_path.cmp(&b.logical_path));

        let total = ordered.len();
        let mut result = DeploymentResult {
            records: Vec::with_capacity(total),
            dry_run,
        };

        tracing::info!(
            "Deploying {} templates into {}{}",
            total,
            self.ctx.target.display(),
            if dry_run { " (dry run)" } else { "" }
        );

        for (index, asset) in ordered.into_iter().enumerate() {
            let target = target_key(&asset.target_path);
            on_progress(DeployProgress::Starting {
                path: &target,
                index,
                total,
            });

            let record = self.deploy_asset(asset, &target, params, state, dry_run);
            tracing::debug!(
                "{} -> {} ({}, {})",
                record.logical_path,
                record.target_path,
                record.strategy,
                record.outcome
            );

            on_progress(DeployProgress::Finished { record: &record });
            result.records.push(record);
        }

        tracing::info!("Deployment finished: {}", result.summary());
        result
    }

    /// Pin the file on disk for `asset` as the user's version.
    ///
    /// Later deployments report it as unchanged and leave it alone until
    /// [`Deployer::take_template`] is used on it.
    pub fn keep_local(
        &self,
        asset: &TemplateAsset,
        state: &mut ModuleState,
        dry_run: bool,
    ) -> DeploymentRecord {
        let target = target_key(&asset.target_path);
        let strategy = merge::select(&asset.target_path);
        let mut record = DeploymentRecord::new(&target, &asset.logical_path, strategy);

        let path = self.ctx.target.join(&asset.target_path);
        let existing = match read_existing(&path) {
            Ok(Some(existing)) => existing,
            Ok(None) => {
                return DeploymentRecord::error(
                    &target,
                    &asset.logical_path,
                    strategy,
                    "file does not exist; nothing to keep".to_string(),
                )
            }
            Err(e) => {
                let message = e.to_string();
                return DeploymentRecord::error(&target, &asset.logical_path, strategy, message);
            }
        };

        let checksum = content_checksum(&existing);
        if !dry_run {
            let mut entry = state.file(&target).cloned().unwrap_or_else(|| {
                FileEntry::new(
                    checksum.clone(),
                    strategy,
                    &self.ctx.template_version,
                    &self.ctx.source,
                )
            });
            entry.checksum = checksum.clone();
            entry.keep_local = true;
            state.record_file(&target, entry);
        }
        tracing::info!("Keeping local version of {}", target);

        record.checksum = Some(checksum);
        record.reason = Some(LOCAL_KEPT.to_string());
        record
    }

    /// Replace the file for `asset` with its template version.
    ///
    /// A differing file on disk is first copied to the run's backup
    /// directory, which must be set. Clears any earlier
    /// [`Deployer::keep_local`] pin.
    pub fn take_template(
        &self,
        asset: &TemplateAsset,
        params: &ParameterSet,
        state: &mut ModuleState,
        dry_run: bool,
    ) -> DeploymentRecord {
        let target = target_key(&asset.target_path);
        let strategy = merge::select(&asset.target_path);
        match self.try_take_template(asset, &target, strategy, params, state, dry_run) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("{}: {}", target, e);
                DeploymentRecord::error(&target, &asset.logical_path, strategy, e.to_string())
            }
        }
    }

    fn try_take_template(
        &self,
        asset: &TemplateAsset,
        target: &str,
        strategy: MergeStrategy,
        params: &ParameterSet,
        state: &mut ModuleState,
        dry_run: bool,
    ) -> Result<DeploymentRecord> {
        check_contained(&asset.target_path)?;
        let incoming = render(asset, params)?;
        let path = self.ctx.target.join(&asset.target_path);
        let existing = read_existing(&path)?;

        let mut record = DeploymentRecord::new(target, &asset.logical_path, strategy);
        record.checksum = Some(content_checksum(&incoming));

        if existing.as_deref() == Some(incoming.as_slice()) {
            if !dry_run {
                state.record_file(target, self.entry(&incoming, strategy, asset, &incoming));
            }
            record.reason = Some("up to date".to_string());
            return Ok(record);
        }

        if !dry_run {
            if let Some(existing) = &existing {
                self.back_up(target, existing)?;
            }
            write_atomic(&path, &incoming, asset.is_executable())?;
            state.record_file(target, self.entry(&incoming, strategy, asset, &incoming));
        }

        record.outcome = DeployOutcome::Written;
        record.reason = Some(
            if existing.is_some() {
                LOCAL_BACKED_UP
            } else {
                "new file"
            }
            .to_string(),
        );
        Ok(record)
    }

    /// Copy `content` of `target` into the backup directory.
    fn back_up(&self, target: &str, content: &[u8]) -> Result<PathBuf> {
        let dir = self
            .ctx
            .backups
            .as_ref()
            .ok_or_else(|| anyhow!("no backup directory to save {} into", target))?;
        let path = dir.join(target);
        write_atomic(&path, content, false)?;
        tracing::info!("Backed up {} to {}", target, path.display());
        Ok(path)
    }

    fn deploy_asset(
        &self,
        asset: &TemplateAsset,
        target: &str,
        params: &ParameterSet,
        state: &mut ModuleState,
        dry_run: bool,
    ) -> DeploymentRecord {
        let strategy = merge::select(&asset.target_path);
        match self.try_deploy(asset, target, strategy, params, state, dry_run) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("{}: {}", target, e);
                DeploymentRecord::error(target, &asset.logical_path, strategy, e.to_string())
            }
        }
    }

    fn try_deploy(
        &self,
        asset: &TemplateAsset,
        target: &str,
        strategy: MergeStrategy,
        params: &ParameterSet,
        state: &mut ModuleState,
        dry_run: bool,
    ) -> Result<DeploymentRecord> {
        check_contained(&asset.target_path)?;

        let path = self.ctx.target.join(&asset.target_path);
        let existing = read_existing(&path)?;
        let prior = state.file(target).cloned();

        if let (Some(entry), Some(existing)) = (&prior, &existing) {
            if entry.keep_local {
                let mut record = DeploymentRecord::new(target, &asset.logical_path, entry.strategy);
                record.checksum = Some(content_checksum(existing));
                record.reason = Some(LOCAL_KEPT.to_string());
                return Ok(record);
            }
        }

        let incoming = render(asset, params)?;

        let input = MergeInput {
            target_path: &asset.target_path,
            existing: existing.as_deref(),
            incoming: &incoming,
            prior: prior.as_ref(),
        };
        let status = FileStatus::classify(&input);
        let (effective, outcome) = merge::apply(strategy, &input);

        let mut record = DeploymentRecord::new(target, &asset.logical_path, effective);

        match outcome {
            MergeOutcome::Write { content, reason } => {
                if !dry_run {
                    write_atomic(&path, &content, asset.is_executable())?;
                    state.record_file(target, self.entry(&content, effective, asset, &incoming));
                }
                record.outcome = DeployOutcome::Written;
                record.checksum = Some(content_checksum(&content));
                record.reason = Some(reason);
            }
            MergeOutcome::Merged {
                content,
                reason,
                warnings,
            } => {
                if !dry_run {
                    write_atomic(&path, &content, asset.is_executable())?;
                    state.record_file(target, self.entry(&content, effective, asset, &incoming));
                }
                for warning in &warnings {
                    tracing::warn!("{}: {}", target, warning);
                }
                record.outcome = DeployOutcome::Merged;
                record.checksum = Some(content_checksum(&content));
                record.reason = Some(reason);
                record.warnings = warnings;
            }
            MergeOutcome::Unchanged { reason, warnings } => {
                if !dry_run {
                    let refreshed = self.refreshed_entry(
                        status,
                        effective,
                        asset,
                        existing.as_deref(),
                        prior,
                        &incoming,
                    );
                    if let Some(entry) = refreshed {
                        state.record_file(target, entry);
                    }
                }
                record.outcome = DeployOutcome::SkippedUnchanged;
                record.checksum = existing.as_deref().map(content_checksum);
                record.reason = Some(reason);
                record.warnings = warnings;
            }
            MergeOutcome::Conflict { .. } if self.ctx.backups.is_some() => {
                if !dry_run {
                    if let Some(existing) = &existing {
                        self.back_up(target, existing)?;
                    }
                    write_atomic(&path, &incoming, asset.is_executable())?;
                    state.record_file(target, self.entry(&incoming, strategy, asset, &incoming));
                }
                record.strategy = strategy;
                record.outcome = DeployOutcome::Written;
                record.checksum = Some(content_checksum(&incoming));
                record.reason = Some(LOCAL_BACKED_UP.to_string());
            }
            MergeOutcome::Conflict { reason, detail } => {
                let conflict = ForgeError::MergeConflict {
                    path: target.to_string(),
                    reason: reason.clone(),
                };
                tracing::warn!("{}", conflict);
                record.outcome = DeployOutcome::Conflict;
                record.checksum = existing.as_deref().map(content_checksum);
                record.reason = Some(reason);
                record.conflict = Some(detail);
            }
        }

        Ok(record)
    }

    fn entry(
        &self,
        on_disk: &[u8],
        strategy: MergeStrategy,
        asset: &TemplateAsset,
        incoming: &[u8],
    ) -> FileEntry {
        let mut entry = FileEntry::new(
            content_checksum(on_disk),
            strategy,
            &self.ctx.template_version,
            &self.ctx.source,
        );
        if strategy == MergeStrategy::StructuredMerge {
            entry.keys = structured_keys(&asset.target_path, incoming);
        }
        entry
    }

    /// State entry for a file left unchanged.
    ///
    /// Files whose content acforge owns (identical to the template, or
    /// maintained by a merging strategy) are tracked at their current
    /// checksum. Otherwise only the template version of an existing entry is
    /// refreshed, and untracked user files stay untracked.
    fn refreshed_entry(
        &self,
        status: FileStatus,
        strategy: MergeStrategy,
        asset: &TemplateAsset,
        existing: Option<&[u8]>,
        prior: Option<FileEntry>,
        incoming: &[u8],
    ) -> Option<FileEntry> {
        let existing = existing?;
        let merging = matches!(strategy, MergeStrategy::Union | MergeStrategy::StructuredMerge);
        if status == FileStatus::Identical || merging {
            return Some(self.entry(existing, strategy, asset, incoming));
        }

        let mut entry = prior?;
        entry.template_version = self.ctx.template_version.clone();
        Some(entry)
    }
}

/// Render an asset's content, substituting parameters if needed.
fn render(asset: &TemplateAsset, params: &ParameterSet) -> Result<Vec<u8>> {
    if !asset.parameterized {
        return Ok(asset.content.clone());
    }

    let text = std::str::from_utf8(&asset.content).map_err(|e| ForgeError::Substitution {
        path: asset.logical_path.clone(),
        line: 0,
        message: format!("template is not valid UTF-8: {}", e),
    })?;

    Ok(substitute(&asset.logical_path, text, params)?.into_bytes())
}

fn read_existing(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn check_contained(target_path: &Path) -> Result<()> {
    let escapes = target_path.as_os_str().is_empty()
        || target_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(anyhow!(
            "target path '{}' escapes the target directory",
            target_path.display()
        )
        .into());
    }
    Ok(())
}

fn structured_keys(target_path: &Path, incoming: &[u8]) -> BTreeMap<String, String> {
    Format::for_path(target_path)
        .and_then(|format| format.parse(&String::from_utf8_lossy(incoming)).ok())
        .map(|value| key_hashes(&value))
        .unwrap_or_default()
}

/// State key for a target path: `/`-separated, relative.
pub fn target_key(target_path: &Path) -> String {
    target_path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
