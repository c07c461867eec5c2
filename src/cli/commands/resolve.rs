//! Resolve command implementation.
//!
//! The `acforge resolve` command settles files that deployments report as
//! conflicts. `--keep-local` pins the user's version so later runs leave it
//! alone; `--take-template` backs the local file up under
//! `.acforge/backups/<timestamp>/` and writes the template version.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::cli::args::ResolveArgs;
use crate::config::load_config;
use crate::deploy::{target_key, Deployer, DeploymentResult, RunContext};
use crate::error::Result;
use crate::parameters::ParameterOverrides;
use crate::state::StateStore;
use crate::templates::TemplateAsset;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};
use super::workflow::{exit_for, resolver_for, TemplateSet};

/// The resolve command implementation.
pub struct ResolveCommand {
    project_root: PathBuf,
    template_source: Option<String>,
    args: ResolveArgs,
}

impl ResolveCommand {
    /// Create a new resolve command.
    pub fn new(project_root: &Path, args: ResolveArgs) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            template_source: None,
            args,
        }
    }

    /// Read templates from `source` instead of auto-detecting.
    pub fn with_template_source(mut self, source: Option<String>) -> Self {
        self.template_source = source;
        self
    }

    /// Match the requested paths against the templates' target paths.
    ///
    /// Returns the matching assets, or the paths no template deploys.
    fn select<'a>(
        &self,
        assets: &'a [TemplateAsset],
    ) -> std::result::Result<Vec<&'a TemplateAsset>, Vec<String>> {
        let mut selected = Vec::new();
        let mut unknown = Vec::new();
        for path in &self.args.paths {
            let key = target_key(Path::new(path));
            match assets.iter().find(|a| target_key(&a.target_path) == key) {
                Some(asset) => selected.push(asset),
                None => unknown.push(path.clone()),
            }
        }
        if unknown.is_empty() {
            Ok(selected)
        } else {
            Err(unknown)
        }
    }
}

impl Command for ResolveCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let store = StateStore::new(&self.project_root);
        let Some(mut state) = store.load()? else {
            ui.error(&format!(
                "acforge is not initialized in {}",
                self.project_root.display()
            ));
            ui.show_hint("run `acforge init` first");
            return Ok(CommandResult::failure(2));
        };

        let config = load_config(&self.project_root)?;
        let templates =
            TemplateSet::load(&self.project_root, self.template_source.as_deref(), &config)?;

        let selected = match self.select(&templates.assets) {
            Ok(selected) => selected,
            Err(unknown) => {
                for path in unknown {
                    ui.error(&format!("{} is not deployed by the current templates", path));
                }
                ui.show_hint("run `acforge status` to see every deployed path");
                return Ok(CommandResult::failure(1));
            }
        };

        ui.show_header("acforge resolve");

        let ctx = RunContext::new(&self.project_root, templates.version())
            .with_backups(store.backup_dir(Utc::now()));
        let deployer = Deployer::new(&ctx);
        let dry_run = self.args.dry_run;

        let mut result = DeploymentResult {
            records: Vec::with_capacity(selected.len()),
            dry_run,
        };
        if self.args.take_template {
            let resolver = resolver_for(
                &templates.checksum,
                ParameterOverrides::new(),
                &config,
                &state,
            );
            let params = resolver.resolve(&self.project_root)?;
            for asset in selected {
                result
                    .records
                    .push(deployer.take_template(asset, &params, &mut state, dry_run));
            }
        } else {
            for asset in selected {
                result.records.push(deployer.keep_local(asset, &mut state, dry_run));
            }
        }

        ui.show_deployment(&result);

        if !dry_run {
            store.save(&state)?;
            if let Some(dir) = ctx.backups.as_ref().filter(|dir| dir.exists()) {
                ui.message(&format!("Local copies saved under {}", dir.display()));
            }
        }

        Ok(exit_for(&result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::{InitArgs, UpdateArgs};
    use crate::cli::commands::init::InitCommand;
    use crate::cli::commands::update::UpdateCommand;
    use crate::deploy::DeployOutcome;
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    fn template_root(body: &str) -> TempDir {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("templates")).unwrap();
        fs::write(root.path().join("manifest.yml"), "mappings: []\n").unwrap();
        fs::write(root.path().join("templates/NOTES.md.template"), body).unwrap();
        root
    }

    fn source_arg(root: &TempDir) -> Option<String> {
        Some(root.path().display().to_string())
    }

    /// An initialized target whose NOTES.md was edited after a template change.
    fn conflicted(source: &TempDir) -> TempDir {
        let target = TempDir::new().unwrap();
        let mut ui = MockUI::new();
        InitCommand::new(target.path(), InitArgs::default())
            .with_template_source(source_arg(source))
            .execute(&mut ui)
            .unwrap();
        fs::write(target.path().join("NOTES.md"), "my notes\n").unwrap();
        fs::write(
            source.path().join("templates/NOTES.md.template"),
            "{{PROJECT_NAME}} v2\n",
        )
        .unwrap();
        target
    }

    fn resolve(target: &Path, source: &TempDir, args: ResolveArgs) -> (CommandResult, MockUI) {
        let mut ui = MockUI::new();
        let result = ResolveCommand::new(target, args)
            .with_template_source(source_arg(source))
            .execute(&mut ui)
            .unwrap();
        (result, ui)
    }

    fn update(target: &Path, source: &TempDir) -> CommandResult {
        let mut ui = MockUI::new();
        UpdateCommand::new(target, UpdateArgs::default())
            .with_template_source(source_arg(source))
            .execute(&mut ui)
            .unwrap()
    }

    #[test]
    fn keep_local_clears_the_conflict_for_later_updates() {
        let source = template_root("v1\n");
        let target = conflicted(&source);
        assert_eq!(update(target.path(), &source).exit_code, 1);

        let args = ResolveArgs {
            paths: vec!["NOTES.md".to_string()],
            keep_local: true,
            ..Default::default()
        };
        let (result, ui) = resolve(target.path(), &source, args);

        assert!(result.success);
        assert_eq!(
            ui.deployments()[0].records[0].outcome,
            DeployOutcome::SkippedUnchanged
        );
        assert!(update(target.path(), &source).success);
        assert_eq!(
            fs::read_to_string(target.path().join("NOTES.md")).unwrap(),
            "my notes\n"
        );
    }

    #[test]
    fn take_template_writes_template_and_backs_up() {
        let source = template_root("v1\n");
        let target = conflicted(&source);

        let args = ResolveArgs {
            paths: vec!["./NOTES.md".to_string()],
            take_template: true,
            ..Default::default()
        };
        let (result, ui) = resolve(target.path(), &source, args);

        assert!(result.success);
        let notes = fs::read_to_string(target.path().join("NOTES.md")).unwrap();
        assert!(notes.ends_with(" v2\n"));
        assert!(!notes.contains("{{"));
        assert!(ui.has_message("Local copies saved under"));

        let backups: Vec<_> = fs::read_dir(target.path().join(".acforge/backups"))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(
            fs::read_to_string(backups[0].join("NOTES.md")).unwrap(),
            "my notes\n"
        );
        assert!(update(target.path(), &source).success);
    }

    #[test]
    fn dry_run_changes_nothing() {
        let source = template_root("v1\n");
        let target = conflicted(&source);
        let state_before = fs::read(target.path().join(".acforge/state.json")).unwrap();

        let args = ResolveArgs {
            paths: vec!["NOTES.md".to_string()],
            take_template: true,
            dry_run: true,
            ..Default::default()
        };
        let (result, ui) = resolve(target.path(), &source, args);

        assert!(result.success);
        assert!(ui.deployments()[0].dry_run);
        assert_eq!(
            fs::read_to_string(target.path().join("NOTES.md")).unwrap(),
            "my notes\n"
        );
        assert!(!target.path().join(".acforge/backups").exists());
        assert_eq!(
            fs::read(target.path().join(".acforge/state.json")).unwrap(),
            state_before
        );
    }

    #[test]
    fn unknown_path_is_rejected() {
        let source = template_root("v1\n");
        let target = conflicted(&source);

        let args = ResolveArgs {
            paths: vec!["NOTES.md".to_string(), "OTHER.md".to_string()],
            keep_local: true,
            ..Default::default()
        };
        let (result, ui) = resolve(target.path(), &source, args);

        assert_eq!(result.exit_code, 1);
        assert!(ui.has_error("OTHER.md"));
        assert!(ui.deployments().is_empty());
        let state: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(target.path().join(".acforge/state.json")).unwrap(),
        )
        .unwrap();
        assert!(state["files"]["NOTES.md"].get("keep_local").is_none());
    }

    #[test]
    fn requires_initialized_state() {
        let source = template_root("v1\n");
        let target = TempDir::new().unwrap();

        let args = ResolveArgs {
            paths: vec!["NOTES.md".to_string()],
            keep_local: true,
            ..Default::default()
        };
        let (result, ui) = resolve(target.path(), &source, args);

        assert_eq!(result.exit_code, 2);
        assert!(ui.has_hint("acforge init"));
    }
}
