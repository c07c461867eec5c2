//! Steps shared by the deploying commands.

use std::path::Path;
use std::time::Duration;

use crate::config::ForgeConfig;
use crate::deploy::{DeployProgress, Deployer, DeploymentResult, RunContext};
use crate::error::Result;
use crate::modules::GitRunner;
use crate::parameters::{ParameterOverrides, ParameterResolver, ParameterSet};
use crate::state::{ModuleState, STATE_DIR, STATE_FILE};
use crate::templates::{template_version, SourceMode, TemplateAsset, TemplateSource};
use crate::ui::UserInterface;

use super::dispatcher::CommandResult;

/// A fully resolved template set.
pub struct TemplateSet {
    pub mode: SourceMode,
    pub assets: Vec<TemplateAsset>,
    pub checksum: String,
}

impl TemplateSet {
    /// Locate and read every template.
    ///
    /// The `--template-source` flag (or its environment variable) wins over
    /// the config file.
    pub fn load(target: &Path, requested: Option<&str>, config: &ForgeConfig) -> Result<Self> {
        let requested = requested.or(config.template_source.as_deref());
        let mode = SourceMode::detect(target, requested)?;
        let source = mode.open()?;
        Self::from_source(mode, source.as_ref())
    }

    /// Read every template from an already opened source.
    pub fn from_source(mode: SourceMode, source: &dyn TemplateSource) -> Result<Self> {
        let assets = source.resolve_all()?;
        let checksum = source.checksum()?;
        tracing::debug!("Loaded {} templates from {}", assets.len(), source.describe());
        Ok(Self {
            mode,
            assets,
            checksum,
        })
    }

    /// Short version shown to users and recorded in state.
    pub fn version(&self) -> String {
        template_version(&self.checksum)
    }
}

/// Turn `--param` pairs into overrides.
pub fn overrides_from(params: &[(String, String)]) -> ParameterOverrides {
    let mut overrides = ParameterOverrides::new();
    for (key, value) in params {
        overrides.set(key.clone(), value.clone());
    }
    overrides
}

/// Resolver seeded with config and previously persisted values.
pub fn resolver_for(
    checksum: &str,
    overrides: ParameterOverrides,
    config: &ForgeConfig,
    state: &ModuleState,
) -> ParameterResolver {
    ParameterResolver::new(checksum)
        .with_overrides(overrides)
        .with_config(config.parameters.clone())
        .with_persisted(state.parameters.clone())
        .with_git_timeout(config.git_timeout())
}

/// Deploy with a spinner and print the summary table.
pub fn run_deployment(
    ui: &mut dyn UserInterface,
    ctx: &RunContext,
    assets: &[TemplateAsset],
    params: &ParameterSet,
    state: &mut ModuleState,
    dry_run: bool,
) -> DeploymentResult {
    let mut spinner = ui.start_spinner("Deploying templates");
    let result = Deployer::new(ctx).deploy_with_progress(assets, params, state, dry_run, |event| {
        if let DeployProgress::Starting { path, index, total } = event {
            spinner.set_message(&format!("Deploying {} ({}/{})", path, index + 1, total));
        }
    });
    spinner.finish_and_clear();

    ui.show_deployment(&result);
    if result.conflicts().next().is_some() {
        ui.show_hint(RESOLVE_HINT);
    }
    result
}

/// How to settle conflicts, shown after a deployment that has any.
pub const RESOLVE_HINT: &str = "settle conflicts with `acforge resolve <path> --keep-local` or \
`--take-template`, or rerun `acforge update --force` to take every template";

/// Exit status for a deployment: 1 when anything failed or conflicted.
pub fn exit_for(result: &DeploymentResult) -> CommandResult {
    if result.is_success() {
        CommandResult::success()
    } else {
        CommandResult::failure(1)
    }
}

/// Commit the files a deployment changed plus the acforge state file.
pub fn commit_deployment(
    ui: &mut dyn UserInterface,
    target: &Path,
    timeout: Duration,
    result: &DeploymentResult,
    command: &str,
    version: &str,
) -> Result<()> {
    let git = GitRunner::new(target, timeout);
    if !git.is_repository() {
        ui.warning(&format!(
            "{} is not a git repository; skipping commit",
            target.display()
        ));
        return Ok(());
    }

    let mut paths = result.changed_paths();
    paths.push(format!("{}/{}", STATE_DIR, STATE_FILE));

    let message = format!("chore: acforge {} configuration (v{})", command, version);
    match git.commit_paths(&paths, &message)? {
        Some(commit) => ui.success(&format!("Committed {}", short_sha(&commit))),
        None => ui.message("Nothing to commit"),
    }
    Ok(())
}

/// First eight characters of a commit id.
pub fn short_sha(commit: &str) -> &str {
    commit.get(..8).unwrap_or(commit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::{DeployOutcome, DeploymentRecord};
    use crate::merge::MergeStrategy;
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    fn bundle(root: &Path) {
        fs::create_dir_all(root.join("templates")).unwrap();
        fs::write(root.join("manifest.yml"), "mappings: []\n").unwrap();
        fs::write(root.join("templates/A.md.template"), "hello {{PROJECT_NAME}}\n").unwrap();
    }

    #[test]
    fn flag_beats_config_source() {
        let flag = TempDir::new().unwrap();
        let configured = TempDir::new().unwrap();
        bundle(flag.path());
        let config = ForgeConfig {
            template_source: Some(configured.path().display().to_string()),
            ..Default::default()
        };

        let set = TemplateSet::load(
            flag.path(),
            Some(flag.path().to_str().unwrap()),
            &config,
        )
        .unwrap();
        assert_eq!(set.assets.len(), 1);
        assert_eq!(set.version().len(), 8);
    }

    #[test]
    fn overrides_skip_empty_values() {
        let overrides = overrides_from(&[
            ("TEAM".to_string(), "core".to_string()),
            ("EMPTY".to_string(), " ".to_string()),
        ]);
        assert_eq!(overrides.get("TEAM"), Some("core"));
        assert_eq!(overrides.get("EMPTY"), None);
    }

    #[test]
    fn deployment_is_shown_and_spinner_started() {
        let target = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        bundle(source.path());
        let set = TemplateSet::load(
            target.path(),
            Some(source.path().to_str().unwrap()),
            &ForgeConfig::default(),
        )
        .unwrap();

        let mut state = ModuleState::new(&set.checksum);
        let params = ParameterSet::from_pairs([("PROJECT_NAME", "demo")]);
        let ctx = RunContext::new(target.path(), set.version());
        let mut ui = MockUI::new();

        let result = run_deployment(&mut ui, &ctx, &set.assets, &params, &mut state, false);

        assert_eq!(result.count(DeployOutcome::Written), 1);
        assert_eq!(ui.spinners(), &["Deploying templates"]);
        assert_eq!(ui.deployments().len(), 1);
        assert!(exit_for(&result).success);
    }

    #[test]
    fn failures_exit_with_one() {
        let mut record =
            DeploymentRecord::new("A.md", "templates/A.md", MergeStrategy::UserResolve);
        record.outcome = DeployOutcome::Conflict;
        let result = DeploymentResult {
            records: vec![record],
            dry_run: false,
        };
        assert_eq!(exit_for(&result).exit_code, 1);
    }

    #[test]
    fn short_sha_truncates() {
        assert_eq!(short_sha("0123456789abcdef"), "01234567");
        assert_eq!(short_sha("abc"), "abc");
    }
}
