//! Command-line interface for claude-code-quickstart.
//!
//! # Commands
//!
//! - `setup` - Walk through the catalog and register MCP servers interactively
//! - `add` - Register one server non-interactively (`--env NAME=VALUE`)
//! - `remove` - Unregister a server
//! - `list` - Show the catalog and what is configured in a scope
//! - `check-url` - Run the SSE URL validator on a URL
//! - `init` - Scaffold `CLAUDE.md`, a review command and `.mcp.json`
//!
//! # Global Options
//!
//! - `--verbose` / `--quiet` - Log level (`RUST_LOG` takes precedence)
//! - `--config <PATH>` - Settings file (also `CLAUDE_QUICKSTART_CONFIG`)
//! - `--project-dir <DIR>` - Project root for local and project scopes
//!
//! # Examples
//!
//! ```bash
//! claude-code-quickstart setup
//! claude-code-quickstart setup github context7 --scope user
//! claude-code-quickstart add github --env GITHUB_PERSONAL_ACCESS_TOKEN=ghp_xxx
//! claude-code-quickstart list --format json
//! ```

mod add;
mod check_url;
mod init;
mod list;
mod remove;
mod setup;

use crate::catalog::Catalog;
use crate::constants::SETTINGS_PATH_ENV;
use crate::core::QuickstartError;
use crate::scope::RegistrationScope;
use crate::settings::Settings;
use crate::setup::{RegistrationMode, SetupOptions};
use crate::validation::UrlValidator;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Main CLI structure.
///
/// Options marked `global = true` are accepted before or after the subcommand.
#[derive(Parser)]
#[command(
    name = "claude-code-quickstart",
    about = "Register MCP servers with Claude Code and scaffold project files",
    version,
    long_about = "Installs Model Context Protocol server entries into Claude Code's \
                  configuration (through the `claude` CLI, or by editing the JSON files \
                  directly) and scaffolds starter files into a project."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the settings file
    #[arg(long, global = true, env = SETTINGS_PATH_ENV)]
    config: Option<PathBuf>,

    /// Project root used by the local and project scopes (default: current directory)
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactively register MCP servers from the catalog
    Setup(setup::SetupCommand),

    /// Register one MCP server without prompting
    Add(add::AddCommand),

    /// Unregister an MCP server
    Remove(remove::RemoveCommand),

    /// Show catalog servers and their status
    List(list::ListCommand),

    /// Check whether a URL would be accepted as an SSE endpoint
    CheckUrl(check_url::CheckUrlCommand),

    /// Scaffold CLAUDE.md, a review command and .mcp.json into a project
    Init(init::InitCommand),
}

/// Shared state resolved once per invocation.
pub struct CliContext {
    pub settings: Settings,
    pub project_dir: PathBuf,
    pub catalog: Catalog,
}

impl CliContext {
    /// Load settings and check the built-in catalog.
    pub async fn load(config: Option<&Path>, project_dir: Option<PathBuf>) -> Result<Self> {
        let settings = Settings::load_with_optional(config).await?;
        let project_dir = match project_dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };

        let catalog = Catalog::builtin();
        if let Err(problems) = catalog.validate(&UrlValidator::default()) {
            return Err(QuickstartError::Other(format!(
                "Built-in server catalog is invalid:\n  {}",
                problems.join("\n  ")
            ))
            .into());
        }

        Ok(Self {
            settings,
            project_dir,
            catalog,
        })
    }

    /// `--scope` if given, else the configured default.
    #[must_use]
    pub fn scope(&self, flag: Option<RegistrationScope>) -> RegistrationScope {
        flag.unwrap_or(self.settings.default_scope)
    }

    #[must_use]
    pub fn setup_options(&self, scope: RegistrationScope, force_direct: bool) -> SetupOptions {
        let mode = RegistrationMode::detect(force_direct || self.settings.direct);
        SetupOptions::new(scope, mode, &self.project_dir, &self.settings)
    }
}

impl Cli {
    /// Log filter directive for the verbosity flags.
    ///
    /// `RUST_LOG`, when set, replaces this entirely.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }

    pub async fn execute(self) -> Result<()> {
        // check-url needs neither settings nor a project
        if let Commands::CheckUrl(cmd) = &self.command {
            return cmd.execute();
        }

        let ctx = CliContext::load(self.config.as_deref(), self.project_dir).await?;
        match self.command {
            Commands::Setup(cmd) => cmd.execute(&ctx).await,
            Commands::Add(cmd) => cmd.execute(&ctx).await,
            Commands::Remove(cmd) => cmd.execute(&ctx).await,
            Commands::List(cmd) => cmd.execute(&ctx),
            Commands::Init(cmd) => cmd.execute(&ctx),
            Commands::CheckUrl(cmd) => cmd.execute(),
        }
    }
}
