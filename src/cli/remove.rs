//! `remove`: unregister a server.

use super::CliContext;
use crate::process::ProcessInvoker;
use crate::prompt::TerminalPrompter;
use crate::scope::RegistrationScope;
use crate::setup::Orchestrator;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Remove a server registration from one scope.
///
/// Any key is accepted, not only catalog keys, so manually added entries can
/// be cleaned up too.
#[derive(Args)]
pub struct RemoveCommand {
    /// Key of the registered server
    key: String,

    /// Scope to remove it from
    #[arg(long, value_enum)]
    scope: Option<RegistrationScope>,

    /// Edit the configuration file directly instead of running `claude mcp remove`
    #[arg(long)]
    direct: bool,
}

impl RemoveCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let scope = ctx.scope(self.scope);
        let options = ctx.setup_options(scope, self.direct);
        let runner = ProcessInvoker::new(ctx.settings.process_timeout());
        let orchestrator = Orchestrator::new(runner, TerminalPrompter::new(true), options);

        if orchestrator.remove(&self.key).await? {
            println!("{} Removed {} from {} scope", "✓".green(), self.key.bold(), scope);
        } else {
            println!("{} {} is not registered in {} scope", "!".yellow(), self.key, scope);
        }
        Ok(())
    }
}
