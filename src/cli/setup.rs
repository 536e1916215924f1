//! `setup`: the interactive walk through the catalog.

use super::CliContext;
use crate::catalog::ServerSpec;
use crate::core::QuickstartError;
use crate::process::ProcessInvoker;
use crate::prompt::TerminalPrompter;
use crate::scope::RegistrationScope;
use crate::setup::{Orchestrator, RegistrationMode, SetupOutcome};
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

/// Register MCP servers from the catalog, asking before each one.
#[derive(Args)]
pub struct SetupCommand {
    /// Servers to set up (default: every catalog server)
    keys: Vec<String>,

    /// Where to register the servers
    #[arg(long, value_enum)]
    scope: Option<RegistrationScope>,

    /// Process the whole catalog; required when stdin is not a terminal and no keys are given
    #[arg(long, conflicts_with = "keys")]
    all: bool,

    /// Write configuration files directly instead of running `claude mcp add`
    #[arg(long)]
    direct: bool,

    /// Show what would be done without changing anything
    #[arg(long)]
    dry_run: bool,

    /// Answer yes to every confirmation
    #[arg(short, long)]
    yes: bool,

    /// Re-register servers that are already configured
    #[arg(long)]
    force: bool,
}

impl SetupCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let specs: Vec<&ServerSpec> = if self.keys.is_empty() {
            ctx.catalog.iter().collect()
        } else {
            self.keys.iter().map(|k| ctx.catalog.get(k)).collect::<Result<_, _>>()?
        };

        let prompter = TerminalPrompter::new(self.yes);
        if self.keys.is_empty() && !self.all && !self.yes && !prompter.is_interactive() {
            bail!("stdin is not a terminal; name the servers to set up or pass --all");
        }

        let scope = ctx.scope(self.scope);
        let mut options = ctx.setup_options(scope, self.direct);
        options.dry_run = self.dry_run;
        options.force = self.force;

        let target = scope.config_target(&ctx.project_dir)?;
        let how = match options.mode {
            RegistrationMode::Cli => "via claude mcp add",
            RegistrationMode::Direct => "by editing the file directly",
        };
        println!(
            "{} {} server(s) into {} scope ({}), {how}",
            (if self.dry_run { "Dry run:" } else { "Setting up" }).cyan().bold(),
            specs.len(),
            scope,
            target
        );

        let runner = ProcessInvoker::new(ctx.settings.process_timeout());
        let mut orchestrator = Orchestrator::new(runner, prompter, options);
        let summary = orchestrator.run(specs).await;
        summary.print();

        let failed = summary.count(SetupOutcome::is_failure);
        if failed > 0 {
            return Err(QuickstartError::Other(format!(
                "{failed} of {} server(s) failed to register",
                summary.results.len()
            ))
            .into());
        }
        Ok(())
    }
}
