//! Status command implementation.
//!
//! The `acforge status` command reports what is installed and projects what
//! an update would do, without writing anything.

use std::path::{Path, PathBuf};

use crate::cli::args::StatusArgs;
use crate::config::load_config;
use crate::deploy::RunContext;
use crate::error::Result;
use crate::parameters::ParameterOverrides;
use crate::state::{ModuleState, StateStore};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};
use super::workflow::{exit_for, resolver_for, run_deployment, TemplateSet};

/// Installation state relative to the available templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    NotInitialized,
    UpToDate,
    UpdateAvailable,
}

impl InstallStatus {
    /// Compare recorded state with the available bundle checksum.
    pub fn of(state: Option<&ModuleState>, available_checksum: &str) -> Self {
        match state {
            None => Self::NotInitialized,
            Some(s) if s.bundle_checksum == available_checksum => Self::UpToDate,
            Some(_) => Self::UpdateAvailable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitialized => "not initialized",
            Self::UpToDate => "up to date",
            Self::UpdateAvailable => "update available",
        }
    }
}

/// The status command implementation.
pub struct StatusCommand {
    project_root: PathBuf,
    template_source: Option<String>,
    args: StatusArgs,
}

impl StatusCommand {
    /// Create a new status command.
    pub fn new(project_root: &Path, args: StatusArgs) -> Self {
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

    /// Get the command arguments.
    pub fn args(&self) -> &StatusArgs {
        &self.args
    }
}

impl Command for StatusCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let store = StateStore::new(&self.project_root);
        let state = store.load()?;

        let config = load_config(&self.project_root)?;
        let templates =
            TemplateSet::load(&self.project_root, self.template_source.as_deref(), &config)?;
        let status = InstallStatus::of(state.as_ref(), &templates.checksum);

        ui.show_header("acforge status");
        ui.message(&format!("Target:          {}", self.project_root.display()));
        ui.message(&format!("Template source: {}", templates.mode.label()));
        ui.message(&format!("Available:       v{}", templates.version()));

        match &state {
            Some(s) => {
                ui.message(&format!(
                    "Installed:       v{} (tool {}, updated {})",
                    s.template_version,
                    s.tool_version,
                    s.updated_at.format("%Y-%m-%d %H:%M")
                ));
                ui.message(&format!("Tracked files:   {}", s.files.len()));
                if !s.modules.is_empty() {
                    let names: Vec<&str> = s.modules.keys().map(String::as_str).collect();
                    ui.message(&format!("Modules:         {}", names.join(", ")));
                }
            }
            None => ui.message("Installed:       none"),
        }
        ui.message(&format!("Status:          {}", status.as_str()));
        ui.message("");

        let mut projected = state
            .clone()
            .unwrap_or_else(|| ModuleState::new(&templates.checksum));
        let resolver = resolver_for(
            &templates.checksum,
            ParameterOverrides::new(),
            &config,
            &projected,
        );
        let params = resolver.resolve(&self.project_root)?;
        let ctx = RunContext::new(&self.project_root, templates.version());
        let result = run_deployment(ui, &ctx, &templates.assets, &params, &mut projected, true);

        match status {
            InstallStatus::NotInitialized => ui.show_hint("run `acforge init` to deploy templates"),
            InstallStatus::UpdateAvailable => ui.show_hint("run `acforge update` to apply"),
            InstallStatus::UpToDate => {}
        }

        Ok(exit_for(&result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::InitArgs;
    use crate::cli::commands::init::InitCommand;
    use crate::deploy::DeployOutcome;
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    fn template_root() -> TempDir {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("templates")).unwrap();
        fs::write(root.path().join("manifest.yml"), "mappings: []\n").unwrap();
        fs::write(root.path().join("templates/NOTES.md"), "notes\n").unwrap();
        root
    }

    fn status(target: &Path, source: &TempDir, ui: &mut MockUI) -> CommandResult {
        StatusCommand::new(target, StatusArgs::default())
            .with_template_source(Some(source.path().display().to_string()))
            .execute(ui)
            .unwrap()
    }

    #[test]
    fn install_status_strings() {
        assert_eq!(InstallStatus::of(None, "x").as_str(), "not initialized");
        let state = ModuleState::new("abc");
        assert_eq!(InstallStatus::of(Some(&state), "abc"), InstallStatus::UpToDate);
        assert_eq!(
            InstallStatus::of(Some(&state), "def"),
            InstallStatus::UpdateAvailable
        );
    }

    #[test]
    fn uninitialized_target_projects_writes() {
        let target = TempDir::new().unwrap();
        let source = template_root();
        let mut ui = MockUI::new();

        let result = status(target.path(), &source, &mut ui);

        assert!(result.success);
        assert!(ui.has_message("not initialized"));
        assert!(ui.has_hint("acforge init"));
        let projection = &ui.deployments()[0];
        assert!(projection.dry_run);
        assert_eq!(projection.count(DeployOutcome::Written), 1);
        assert!(!target.path().join("NOTES.md").exists());
        assert!(!StateStore::new(target.path()).exists());
    }

    #[test]
    fn initialized_target_is_up_to_date() {
        let target = TempDir::new().unwrap();
        let source = template_root();
        let mut ui = MockUI::new();
        InitCommand::new(target.path(), InitArgs::default())
            .with_template_source(Some(source.path().display().to_string()))
            .execute(&mut ui)
            .unwrap();
        let before = fs::read(target.path().join(".acforge/state.json")).unwrap();

        let mut ui = MockUI::new();
        let result = status(target.path(), &source, &mut ui);

        assert!(result.success);
        assert!(ui.has_message("up to date"));
        assert!(ui.has_message("Tracked files:   1"));
        assert_eq!(
            fs::read(target.path().join(".acforge/state.json")).unwrap(),
            before
        );
    }

    #[test]
    fn projected_conflict_fails() {
        let target = TempDir::new().unwrap();
        let source = template_root();
        fs::write(target.path().join("NOTES.md"), "mine\n").unwrap();
        let mut ui = MockUI::new();

        let result = status(target.path(), &source, &mut ui);

        assert_eq!(result.exit_code, 1);
        assert_eq!(ui.deployments()[0].count(DeployOutcome::Conflict), 1);
    }
}
