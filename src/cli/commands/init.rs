//! Init command implementation.
//!
//! The `acforge init` command performs the first deployment into a
//! repository and records the resulting state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::args::InitArgs;
use crate::config::load_config;
use crate::deploy::RunContext;
use crate::error::Result;
use crate::parameters::{ParameterOverrides, ParameterResolver, GITHUB_OWNER, PROJECT_NAME};
use crate::state::{ModuleState, StateStore};
use crate::ui::{Prompt, UserInterface};

use super::dispatcher::{Command, CommandResult};
use super::workflow::{
    commit_deployment, exit_for, overrides_from, resolver_for, run_deployment, TemplateSet,
};

/// The init command implementation.
pub struct InitCommand {
    project_root: PathBuf,
    template_source: Option<String>,
    args: InitArgs,
}

impl InitCommand {
    /// Create a new init command.
    pub fn new(project_root: &Path, args: InitArgs) -> Self {
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

    /// Get the project root path.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get the command arguments.
    pub fn args(&self) -> &InitArgs {
        &self.args
    }

    fn overrides(&self) -> ParameterOverrides {
        overrides_from(&self.args.params)
            .with(GITHUB_OWNER, self.args.github_owner.clone())
            .with(PROJECT_NAME, self.args.project_name.clone())
    }

    /// Ask for owner and project name, pre-filled from the repository.
    fn prompt_identity(
        &self,
        ui: &mut dyn UserInterface,
        mut overrides: ParameterOverrides,
        git_timeout: Duration,
    ) -> Result<ParameterOverrides> {
        let inferred = ParameterResolver::new("")
            .with_git_timeout(git_timeout)
            .infer(&self.project_root);

        for (key, question) in [
            (GITHUB_OWNER, "GitHub owner"),
            (PROJECT_NAME, "Project name"),
        ] {
            if overrides.get(key).is_some() {
                continue;
            }
            let default = inferred
                .get(key)
                .cloned()
                .or_else(|| (key == GITHUB_OWNER).then(|| "unknown".to_string()));
            let answer = ui.prompt(&Prompt::input(&key.to_lowercase(), question, default))?;
            overrides.set(key, answer.as_string());
        }

        Ok(overrides)
    }
}

impl Command for InitCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let store = StateStore::new(&self.project_root);
        if store.exists() && !self.args.force {
            ui.error(&format!(
                "acforge is already initialized in {}",
                self.project_root.display()
            ));
            ui.show_hint(
                "Use `acforge update` to redeploy, or `acforge init --force` to start over",
            );
            return Ok(CommandResult::failure(1));
        }

        let config = load_config(&self.project_root)?;
        let templates =
            TemplateSet::load(&self.project_root, self.template_source.as_deref(), &config)?;

        // With --force the old state still drives drift detection.
        let mut state = match store.load()? {
            Some(existing) => existing,
            None => ModuleState::new(&templates.checksum),
        };

        let mut overrides = self.overrides();
        if self.args.interactive {
            overrides = self.prompt_identity(ui, overrides, config.git_timeout())?;
        }

        let resolver = resolver_for(&templates.checksum, overrides, &config, &state);
        let params = resolver.resolve(&self.project_root)?;

        ui.show_header(&format!("acforge init (templates v{})", templates.version()));
        ui.message(&format!("Template source: {}", templates.mode.label()));

        let ctx = RunContext::new(&self.project_root, templates.version());
        state.set_bundle(&templates.checksum);
        let result = run_deployment(
            ui,
            &ctx,
            &templates.assets,
            &params,
            &mut state,
            self.args.dry_run,
        );

        if self.args.dry_run {
            return Ok(exit_for(&result));
        }

        state.parameters = resolver.persistable(&params);
        store.save(&state)?;
        tracing::info!("Saved state to {}", store.state_file().display());

        if self.args.git {
            if result.is_success() {
                commit_deployment(
                    ui,
                    &self.project_root,
                    config.git_timeout(),
                    &result,
                    "init",
                    &templates.version(),
                )?;
            } else {
                ui.warning("Skipping commit because some files need attention");
            }
        }

        Ok(exit_for(&result))
    }
}
