//! Update command implementation.
//!
//! The `acforge update` command redeploys the current templates over an
//! initialized repository. Drift detection decides per file whether the new
//! version is written, merged, skipped, or left for manual resolution.

use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::cli::args::UpdateArgs;
use crate::config::load_config;
use crate::deploy::RunContext;
use crate::error::Result;
use crate::state::StateStore;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};
use super::workflow::{
    commit_deployment, exit_for, overrides_from, resolver_for, run_deployment, TemplateSet,
};

/// The update command implementation.
pub struct UpdateCommand {
    project_root: PathBuf,
    template_source: Option<String>,
    args: UpdateArgs,
}

impl UpdateCommand {
    /// Create a new update command.
    pub fn new(project_root: &Path, args: UpdateArgs) -> Self {
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
}

impl Command for UpdateCommand {
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

        let installed = state.template_version.clone();
        ui.show_header(&format!(
            "acforge update (v{} -> v{})",
            installed,
            templates.version()
        ));
        if state.bundle_checksum == templates.checksum {
            ui.message("Templates unchanged; checking for drift");
        }

        let resolver = resolver_for(
            &templates.checksum,
            overrides_from(&self.args.params),
            &config,
            &state,
        );
        let params = resolver.resolve(&self.project_root)?;

        let mut ctx = RunContext::new(&self.project_root, templates.version());
        if self.args.force {
            ctx = ctx.with_backups(store.backup_dir(Utc::now()));
        }
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

        if let Some(dir) = ctx.backups.as_ref().filter(|dir| dir.exists()) {
            ui.message(&format!("Local copies saved under {}", dir.display()));
        }

        state.parameters = resolver.persistable(&params);
        store.save(&state)?;

        if self.args.git {
            if result.is_success() {
                commit_deployment(
                    ui,
                    &self.project_root,
                    config.git_timeout(),
                    &result,
                    "update",
                    &templates.version(),
                )?;
            } else {
                ui.warning("Skipping commit because some files need attention");
            }
        }

        Ok(exit_for(&result))
    }
}
