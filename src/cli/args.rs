//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::templates::TEMPLATE_SOURCE_ENV;

/// acforge - Deploy and reconcile Claude Code configuration templates.
#[derive(Debug, Parser)]
#[command(name = "acforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the target repository (overrides current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Template source: `bundled` or a template root directory
    #[arg(long, global = true, env = TEMPLATE_SOURCE_ENV, value_name = "bundled|DIR")]
    pub template_source: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Deploy templates into a repository for the first time
    Init(InitArgs),

    /// Show installation state and what an update would change (default)
    Status(StatusArgs),

    /// Redeploy templates, reconciling local changes
    Update(UpdateArgs),

    /// Settle conflicts by keeping local files or taking the template
    Resolve(ResolveArgs),

    /// Manage template modules vendored as git subtrees
    Module(ModuleArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `init` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct InitArgs {
    /// GitHub owner (user or organization)
    #[arg(long)]
    pub github_owner: Option<String>,

    /// Project name
    #[arg(long)]
    pub project_name: Option<String>,

    /// Extra parameter value (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Redeploy even if acforge state already exists
    #[arg(short, long)]
    pub force: bool,

    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Prompt for owner and project name
    #[arg(short, long)]
    pub interactive: bool,

    /// Commit deployed files afterwards
    #[arg(long)]
    pub git: bool,
}

/// Arguments for the `status` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct StatusArgs {}

/// Arguments for the `update` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct UpdateArgs {
    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Override a parameter value (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Replace conflicting files, backing up local copies under .acforge/backups
    #[arg(short, long)]
    pub force: bool,

    /// Commit deployed files afterwards
    #[arg(long)]
    pub git: bool,
}

/// Arguments for the `resolve` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ResolveArgs {
    /// Target paths to resolve, relative to the repository root
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<String>,

    /// Keep the local file and stop updating it from the template
    #[arg(long, conflicts_with = "take_template", required_unless_present = "take_template")]
    pub keep_local: bool,

    /// Replace the local file with the template, backing it up first
    #[arg(long)]
    pub take_template: bool,

    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `module` command.
#[derive(Debug, Clone, clap::Args)]
pub struct ModuleArgs {
    #[command(subcommand)]
    pub command: ModuleCommands,
}

/// Module subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum ModuleCommands {
    /// Add a module as a squashed subtree and deploy its templates
    Add(ModuleAddArgs),

    /// Pull a module's upstream changes and redeploy its templates
    Update(ModuleUpdateArgs),

    /// List installed modules
    List,
}

/// Arguments for `module add`.
#[derive(Debug, Clone, clap::Args)]
pub struct ModuleAddArgs {
    /// Module name (directory under .acforge/modules)
    pub name: String,

    /// Repository URL
    pub url: String,

    /// Branch or tag to vendor
    #[arg(long = "ref", default_value = "main")]
    pub git_ref: String,

    /// Git timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Only vendor the module, do not deploy its templates
    #[arg(long)]
    pub no_deploy: bool,
}

/// Arguments for `module update`.
#[derive(Debug, Clone, clap::Args)]
pub struct ModuleUpdateArgs {
    /// Module name
    pub name: String,

    /// Branch or tag to pull (defaults to the recorded one)
    #[arg(long = "ref")]
    pub git_ref: Option<String>,

    /// Git timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Only pull the module, do not deploy its templates
    #[arg(long)]
    pub no_deploy: bool,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}

/// Parse a `KEY=VALUE` parameter.
fn parse_param(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}
