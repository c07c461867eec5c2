//! Module command implementation.
//!
//! `acforge module add|update|list` vendors template modules as squashed git
//! subtrees under `.acforge/modules/<name>` and deploys their templates
//! through the same orchestrator as the main bundle.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::args::{ModuleAddArgs, ModuleArgs, ModuleCommands, ModuleUpdateArgs};
use crate::config::{load_config, ForgeConfig};
use crate::deploy::RunContext;
use crate::error::{ForgeError, Result};
use crate::modules::{ModuleManager, ModuleOperation};
use crate::parameters::ParameterOverrides;
use crate::state::{ModuleRecord, ModuleState, StateStore};
use crate::templates::{DirectorySource, SourceMode};
use crate::ui::{Table, UserInterface};

use super::dispatcher::{Command, CommandResult};
use super::workflow::{exit_for, resolver_for, run_deployment, short_sha, TemplateSet};

/// The module command implementation.
pub struct ModuleCommand {
    project_root: PathBuf,
    args: ModuleArgs,
}

impl ModuleCommand {
    /// Create a new module command.
    pub fn new(project_root: &Path, args: ModuleArgs) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            args,
        }
    }

    fn load_state(&self, ui: &mut dyn UserInterface) -> Result<Option<(StateStore, ModuleState)>> {
        let store = StateStore::new(&self.project_root);
        match store.load()? {
            Some(state) => Ok(Some((store, state))),
            None => {
                ui.error(&format!(
                    "acforge is not initialized in {}",
                    self.project_root.display()
                ));
                ui.show_hint("run `acforge init` first");
                Ok(None)
            }
        }
    }

    fn add(&self, args: &ModuleAddArgs, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some((store, mut state)) = self.load_state(ui)? else {
            return Ok(CommandResult::failure(2));
        };
        let config = load_config(&self.project_root)?;
        let timeout = timeout_for(args.timeout, &config);

        let manager = ModuleManager::new(&self.project_root);
        let mut spinner = ui.start_spinner(&format!("Adding module {}", args.name));
        let op = match manager.add_module(&args.name, &args.url, &args.git_ref, timeout) {
            Ok(op) => op,
            Err(e) => {
                spinner.finish_error(&format!("Could not add module {}", args.name));
                return Err(e);
            }
        };
        spinner.finish_success(&format!(
            "Added module {} ({} files)",
            args.name,
            op.changed_files.len()
        ));

        record_module(&mut state, &op, &args.url, &args.git_ref);
        self.finish(ui, &store, state, &config, &manager, &op, args.no_deploy)
    }

    fn update(&self, args: &ModuleUpdateArgs, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some((store, mut state)) = self.load_state(ui)? else {
            return Ok(CommandResult::failure(2));
        };
        let config = load_config(&self.project_root)?;
        let timeout = timeout_for(args.timeout, &config);

        let (url, recorded_ref) = match state.modules.get(&args.name) {
            Some(record) => (record.url.clone(), record.git_ref.clone()),
            None => match config.modules.get(&args.name) {
                Some(declared) => (declared.url.clone(), declared.git_ref.clone()),
                None => {
                    return Err(ForgeError::ConfigValidationError {
                        message: format!(
                            "module '{}' is not recorded in state or declared in config",
                            args.name
                        ),
                    })
                }
            },
        };
        let git_ref = args.git_ref.clone().unwrap_or(recorded_ref);

        let manager = ModuleManager::new(&self.project_root);
        let mut spinner = ui.start_spinner(&format!("Updating module {}", args.name));
        let op = match manager.update_module(&args.name, &url, &git_ref, timeout) {
            Ok(op) => op,
            Err(e) => {
                spinner.finish_error(&format!("Could not update module {}", args.name));
                return Err(e);
            }
        };
        spinner.finish_success(&format!(
            "Updated module {} ({} files changed)",
            args.name,
            op.changed_files.len()
        ));

        record_module(&mut state, &op, &url, &git_ref);
        self.finish(ui, &store, state, &config, &manager, &op, args.no_deploy)
    }

    /// Deploy the module's templates (unless disabled) and save state.
    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        ui: &mut dyn UserInterface,
        store: &StateStore,
        mut state: ModuleState,
        config: &ForgeConfig,
        manager: &ModuleManager,
        op: &ModuleOperation,
        no_deploy: bool,
    ) -> Result<CommandResult> {
        if no_deploy {
            store.save(&state)?;
            return Ok(CommandResult::success());
        }

        let root = manager.module_root(&op.name);
        let source = DirectorySource::open_lenient(&root)?;
        let templates = TemplateSet::from_source(SourceMode::Source { root }, &source)?;

        let params = resolver_for(&templates.checksum, ParameterOverrides::new(), config, &state)
            .resolve(&self.project_root)?;
        let ctx = RunContext::new(&self.project_root, templates.version())
            .with_source(format!("module:{}", op.name));
        let result = run_deployment(ui, &ctx, &templates.assets, &params, &mut state, false);

        store.save(&state)?;
        Ok(exit_for(&result))
    }

    fn list(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let state = StateStore::new(&self.project_root).load()?;
        let config = load_config(&self.project_root)?;

        let mut table = Table::new(vec!["Module", "Ref", "Commit", "Updated", "URL"]);
        if let Some(state) = &state {
            for (name, record) in &state.modules {
                table.add_row(vec![
                    name.clone(),
                    record.git_ref.clone(),
                    record.commit.as_deref().map(short_sha).unwrap_or("-").to_string(),
                    record.updated_at.format("%Y-%m-%d").to_string(),
                    record.url.clone(),
                ]);
            }
        }
        for (name, declared) in &config.modules {
            let installed = state.as_ref().is_some_and(|s| s.modules.contains_key(name));
            if !installed {
                table.add_row(vec![
                    name.clone(),
                    declared.git_ref.clone(),
                    "-".to_string(),
                    "not installed".to_string(),
                    declared.url.clone(),
                ]);
            }
        }

        if table.is_empty() {
            ui.message("No modules installed");
            ui.show_hint("add one with `acforge module add <name> <url>`");
        } else {
            ui.message(&table.render());
        }
        Ok(CommandResult::success())
    }
}

impl Command for ModuleCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        match &self.args.command {
            ModuleCommands::Add(args) => self.add(args, ui),
            ModuleCommands::Update(args) => self.update(args, ui),
            ModuleCommands::List => self.list(ui),
        }
    }
}

fn timeout_for(flag: Option<u64>, config: &ForgeConfig) -> Duration {
    flag.map(Duration::from_secs)
        .unwrap_or_else(|| config.git_timeout())
}

fn record_module(state: &mut ModuleState, op: &ModuleOperation, url: &str, git_ref: &str) {
    state.modules.insert(
        op.name.clone(),
        ModuleRecord {
            url: url.to_string(),
            git_ref: git_ref.to_string(),
            prefix: op.prefix.clone(),
            commit: op.commit.clone(),
            updated_at: Utc::now(),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::git::test_support::*;
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    fn module_cmd(target: &Path, command: ModuleCommands) -> ModuleCommand {
        ModuleCommand::new(target, ModuleArgs { command })
    }

    #[test]
    fn flag_timeout_beats_config() {
        let config = ForgeConfig {
            git_timeout_secs: 30,
            ..Default::default()
        };
        assert_eq!(timeout_for(Some(5), &config), Duration::from_secs(5));
        assert_eq!(timeout_for(None, &config), Duration::from_secs(30));
    }

    #[test]
    fn list_without_modules() {
        let target = TempDir::new().unwrap();
        let mut ui = MockUI::new();

        let result = module_cmd(target.path(), ModuleCommands::List)
            .execute(&mut ui)
            .unwrap();

        assert!(result.success);
        assert!(ui.has_message("No modules installed"));
    }

    #[test]
    fn list_shows_recorded_and_declared_modules() {
        let target = TempDir::new().unwrap();
        let mut state = ModuleState::new("abc");
        state.modules.insert(
            "extras".to_string(),
            ModuleRecord {
                url: "https://example.com/extras.git".to_string(),
                git_ref: "v1".to_string(),
                prefix: ".acforge/modules/extras".to_string(),
                commit: Some("0123456789abcdef".to_string()),
                updated_at: Utc::now(),
            },
        );
        StateStore::new(target.path()).save(&state).unwrap();
        fs::write(
            target.path().join(".acforge/config.yml"),
            "modules:\n  planned:\n    url: https://example.com/planned.git\n",
        )
        .unwrap();
        let mut ui = MockUI::new();

        module_cmd(target.path(), ModuleCommands::List)
            .execute(&mut ui)
            .unwrap();

        assert!(ui.has_message("extras"));
        assert!(ui.has_message("01234567"));
        assert!(ui.has_message("planned"));
        assert!(ui.has_message("not installed"));
    }

    #[test]
    fn add_requires_initialized_target() {
        let target = TempDir::new().unwrap();
        let mut ui = MockUI::new();
        let args = ModuleAddArgs {
            name: "extras".to_string(),
            url: "https://example.com/extras.git".to_string(),
            git_ref: "main".to_string(),
            timeout: None,
            no_deploy: false,
        };

        let result = module_cmd(target.path(), ModuleCommands::Add(args))
            .execute(&mut ui)
            .unwrap();

        assert_eq!(result.exit_code, 2);
        assert!(ui.has_hint("acforge init"));
    }

    #[test]
    fn update_of_unknown_module_fails() {
        let target = TempDir::new().unwrap();
        StateStore::new(target.path())
            .save(&ModuleState::new("abc"))
            .unwrap();
        let mut ui = MockUI::new();
        let args = ModuleUpdateArgs {
            name: "ghost".to_string(),
            git_ref: None,
            timeout: None,
            no_deploy: false,
        };

        let err = module_cmd(target.path(), ModuleCommands::Update(args))
            .execute(&mut ui)
            .unwrap_err();

        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn add_vendors_and_deploys_module_templates() {
        let _lock = GIT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        if !subtree_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        init_repo(&target, &[("README.md", "project\n")]);
        let module = temp.path().join("module");
        init_repo(
            &module,
            &[("templates/AGENTS.md", "agents for {{PROJECT_NAME}}\n")],
        );
        StateStore::new(&target).save(&ModuleState::new("abc")).unwrap();
        let mut ui = MockUI::new();
        let args = ModuleAddArgs {
            name: "extras".to_string(),
            url: module.to_string_lossy().into_owned(),
            git_ref: "main".to_string(),
            timeout: Some(60),
            no_deploy: false,
        };

        let result = module_cmd(&target, ModuleCommands::Add(args))
            .execute(&mut ui)
            .unwrap();

        assert!(result.success);
        assert_eq!(
            fs::read_to_string(target.join("AGENTS.md")).unwrap(),
            "agents for target\n"
        );
        let state = StateStore::new(&target).load().unwrap().unwrap();
        let record = &state.modules["extras"];
        assert_eq!(record.prefix, ".acforge/modules/extras");
        assert!(record.commit.is_some());
        assert_eq!(state.files["AGENTS.md"].source, "module:extras");
    }
}
