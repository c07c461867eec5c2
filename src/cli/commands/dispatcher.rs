//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands, StatusArgs};
use crate::error::Result;
use crate::ui::UserInterface;

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command.
    ///
    /// # Returns
    ///
    /// A [`CommandResult`] indicating success/failure and exit code.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    project_root: PathBuf,
}

impl CommandDispatcher {
    /// Create a new dispatcher for the given project root.
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    /// Get the project root path.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Dispatch and execute a command.
    ///
    /// Without a subcommand, `status` runs.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let source = cli.template_source.clone();
        match &cli.command {
            Some(Commands::Init(args)) => {
                super::init::InitCommand::new(&self.project_root, args.clone())
                    .with_template_source(source)
                    .execute(ui)
            }
            Some(Commands::Status(args)) => {
                super::status::StatusCommand::new(&self.project_root, args.clone())
                    .with_template_source(source)
                    .execute(ui)
            }
            Some(Commands::Update(args)) => {
                super::update::UpdateCommand::new(&self.project_root, args.clone())
                    .with_template_source(source)
                    .execute(ui)
            }
            Some(Commands::Resolve(args)) => {
                super::resolve::ResolveCommand::new(&self.project_root, args.clone())
                    .with_template_source(source)
                    .execute(ui)
            }
            Some(Commands::Module(args)) => {
                super::module::ModuleCommand::new(&self.project_root, args.clone()).execute(ui)
            }
            Some(Commands::Completions(args)) => {
                super::completions::CompletionsCommand::new(args.clone()).execute(ui)
            }
            None => super::status::StatusCommand::new(&self.project_root, StatusArgs::default())
                .with_template_source(source)
                .execute(ui),
        }
    }
}
