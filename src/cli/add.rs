//! `add`: register a single server without prompting.

use super::CliContext;
use crate::core::QuickstartError;
use crate::process::ProcessInvoker;
use crate::prompt::TerminalPrompter;
use crate::scope::RegistrationScope;
use crate::setup::{Orchestrator, SetupOutcome};
use crate::validation::parse_env_assignment;
use anyhow::Result;
use clap::Args;

/// Register one catalog server.
///
/// Env vars come from `--env`, then from the process environment. A missing
/// value is an error; nothing is asked interactively.
#[derive(Args)]
pub struct AddCommand {
    /// Catalog key of the server
    key: String,

    /// Where to register the server
    #[arg(long, value_enum)]
    scope: Option<RegistrationScope>,

    /// Environment variable for the server, as NAME=VALUE (repeatable)
    #[arg(long = "env", value_name = "NAME=VALUE", value_parser = parse_env_arg)]
    env: Vec<(String, String)>,

    /// Write the configuration file directly instead of running `claude mcp add`
    #[arg(long)]
    direct: bool,

    /// Show what would be done without changing anything
    #[arg(long)]
    dry_run: bool,
}

fn parse_env_arg(raw: &str) -> Result<(String, String), String> {
    parse_env_assignment(raw).map_err(|e| e.to_string())
}

impl AddCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let spec = ctx.catalog.get(&self.key)?;

        let mut options = ctx.setup_options(ctx.scope(self.scope), self.direct);
        options.dry_run = self.dry_run;
        options.force = true;
        options.env = self.env.into_iter().collect();

        for name in spec.required_env() {
            let from_env = std::env::var(name).ok().filter(|v| !v.is_empty());
            match (options.env.contains_key(name), from_env) {
                (true, _) => {}
                (false, Some(value)) => {
                    options.env.insert(name.to_string(), value);
                }
                (false, None) => {
                    return Err(QuickstartError::MissingEnvVar {
                        server: spec.key.clone(),
                        name: name.to_string(),
                    }
                    .into());
                }
            }
        }

        let runner = ProcessInvoker::new(ctx.settings.process_timeout());
        let mut orchestrator = Orchestrator::new(runner, TerminalPrompter::new(true), options);
        match orchestrator.setup_server(spec).await {
            SetupOutcome::Installed | SetupOutcome::Planned | SetupOutcome::AlreadyConfigured => {
                Ok(())
            }
            SetupOutcome::Skipped(reason) => {
                Err(QuickstartError::Other(format!("{} was not registered: {reason}", spec.key))
                    .into())
            }
            SetupOutcome::Failed(message) => Err(QuickstartError::Other(format!(
                "Failed to register {}: {message}",
                spec.key
            ))
            .into()),
        }
    }
}
