//! The interactive setup flow.
//!
//! For each requested server the [`Orchestrator`]:
//!
//! 1. checks whether the scope's configuration file already has it
//! 2. asks for confirmation and whatever the server's [`PromptKind`] needs
//! 3. validates the answers
//! 4. registers it, either through `claude mcp add` or by merging the
//!    configuration file directly
//!
//! Every server ends with a [`SetupOutcome`]. A failure is recorded and the
//! run moves on to the next server; the [`SetupSummary`] decides the exit
//! status at the end.

use crate::catalog::{EnvVarMap, PromptKind, ServerSpec, TransportSpec};
use crate::command::{CommandBuilder, CommandVector};
use crate::config_store::{ConfigStore, server_state};
use crate::core::{QuickstartError, user_friendly_error};
use crate::process::{CommandRunner, ProcessInvoker};
use crate::prompt::Prompter;
use crate::scope::{ConfigTarget, RegistrationScope};
use crate::settings::Settings;
use crate::validation::{UrlValidator, validate_env_value};
use anyhow::Result;
use colored::Colorize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How a registration reaches Claude Code's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationMode {
    /// Run `claude mcp add` / `claude mcp remove`
    Cli,
    /// Read-merge-write the JSON configuration file ourselves
    Direct,
}

impl RegistrationMode {
    /// `Cli` when `claude` is on PATH and nothing forces direct mode.
    #[must_use]
    pub fn detect(force_direct: bool) -> Self {
        if force_direct {
            return Self::Direct;
        }
        match ProcessInvoker::locate() {
            Ok(path) => {
                debug!(target: "setup", "Using Claude Code CLI at {}", path.display());
                Self::Cli
            }
            Err(e) => {
                warn!(target: "setup", "{e}; writing configuration files directly");
                Self::Direct
            }
        }
    }
}

/// Pre-prompt status of one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    /// An entry with this key is present
    pub exists: bool,
    /// The entry matches the catalog's transport
    pub configured: bool,
    /// Short human-readable state
    pub status: String,
    /// Why the status could not be determined reliably
    pub error: Option<String>,
}

/// Look up `spec` in `store` without modifying anything.
///
/// Also runs the URL validator in boolean mode for SSE servers, so a catalog
/// entry that would be refused shows up before any prompting.
#[must_use]
pub fn check_server_status(
    spec: &ServerSpec,
    store: &ConfigStore,
    validator: &UrlValidator,
) -> ServerStatus {
    if let TransportSpec::Sse(sse) = &spec.transport
        && !validator.is_valid(&sse.url)
    {
        return ServerStatus {
            exists: false,
            configured: false,
            status: "invalid URL".to_string(),
            error: validator.validate(&sse.url).err().map(|e| e.to_string()),
        };
    }

    match store.read() {
        Ok(doc) => {
            let state = server_state(&doc, &spec.key, spec.transport());
            let status = match (state.exists, state.configured) {
                (true, true) => "configured",
                (true, false) => "needs update",
                _ => "not configured",
            };
            ServerStatus {
                exists: state.exists,
                configured: state.configured,
                status: status.to_string(),
                error: None,
            }
        }
        Err(e) => ServerStatus {
            exists: false,
            configured: false,
            status: "unreadable".to_string(),
            error: Some(format!("{e:#}")),
        },
    }
}

/// Result of processing one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    Installed,
    /// Dry run: would have been installed
    Planned,
    AlreadyConfigured,
    /// Not installed on purpose; carries the reason
    Skipped(String),
    /// Registration failed; carries the rendered error
    Failed(String),
}

impl SetupOutcome {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    fn label(&self) -> colored::ColoredString {
        match self {
            Self::Installed => "installed".green(),
            Self::Planned => "would install".cyan(),
            Self::AlreadyConfigured => "already configured".cyan(),
            Self::Skipped(_) => "skipped".yellow(),
            Self::Failed(_) => "failed".red().bold(),
        }
    }
}

/// Outcomes of a run, in processing order.
#[derive(Debug, Default)]
pub struct SetupSummary {
    pub results: Vec<(String, SetupOutcome)>,
}

impl SetupSummary {
    pub fn record(&mut self, key: &str, outcome: SetupOutcome) {
        self.results.push((key.to_string(), outcome));
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|(_, o)| o.is_failure())
    }

    #[must_use]
    pub fn count(&self, pred: impl Fn(&SetupOutcome) -> bool) -> usize {
        self.results.iter().filter(|(_, o)| pred(o)).count()
    }

    /// Print the end-of-run table.
    pub fn print(&self) {
        if self.results.is_empty() {
            println!("{}", "No servers processed.".yellow());
            return;
        }
        let width = self.results.iter().map(|(k, _)| k.len()).max().unwrap_or(0);

        println!();
        println!("{}", "Setup summary".bold());
        for (key, outcome) in &self.results {
            let detail = match outcome {
                SetupOutcome::Skipped(reason) | SetupOutcome::Failed(reason) => {
                    format!("  {}", reason.lines().next().unwrap_or_default().dimmed())
                }
                _ => String::new(),
            };
            println!("  {key:<width$}  {}{detail}", outcome.label());
        }
        let planned = self.count(|o| matches!(o, SetupOutcome::Planned));
        if planned > 0 {
            println!("\n{planned} would be installed (dry run, nothing was changed)");
        }
        println!(
            "{}{} installed, {} already configured, {} skipped, {} failed",
            if planned > 0 { "" } else { "\n" },
            self.count(|o| matches!(o, SetupOutcome::Installed)),
            self.count(|o| matches!(o, SetupOutcome::AlreadyConfigured)),
            self.count(|o| matches!(o, SetupOutcome::Skipped(_))),
            self.count(SetupOutcome::is_failure),
        );
    }
}

impl fmt::Display for SetupSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, outcome) in &self.results {
            writeln!(f, "{key}: {outcome:?}")?;
        }
        Ok(())
    }
}

/// Knobs for one run.
#[derive(Debug, Clone)]
pub struct SetupOptions {
    pub scope: RegistrationScope,
    pub mode: RegistrationMode,
    pub project_dir: PathBuf,
    /// Print what would happen without running or writing anything
    pub dry_run: bool,
    /// Re-register servers that are already configured
    pub force: bool,
    /// Values given up front (`--env`); used without prompting
    pub env: EnvVarMap,
    pub lock_timeout: Duration,
    pub stale_lock_threshold: Duration,
    /// Configuration to read and edit instead of the scope's usual one
    pub target: Option<ConfigTarget>,
}

impl SetupOptions {
    /// Options for `scope` with timeouts from `settings`.
    #[must_use]
    pub fn new(
        scope: RegistrationScope,
        mode: RegistrationMode,
        project_dir: &Path,
        settings: &Settings,
    ) -> Self {
        Self {
            scope,
            mode,
            project_dir: project_dir.to_path_buf(),
            dry_run: false,
            force: false,
            env: EnvVarMap::new(),
            lock_timeout: settings.lock_timeout(),
            stale_lock_threshold: settings.stale_lock_threshold(),
            target: None,
        }
    }
}

/// Drives the per-server flow.
pub struct Orchestrator<R, P> {
    runner: R,
    prompter: P,
    builder: CommandBuilder,
    validator: UrlValidator,
    options: SetupOptions,
}

impl<R: CommandRunner, P: Prompter> Orchestrator<R, P> {
    pub fn new(runner: R, prompter: P, options: SetupOptions) -> Self {
        let validator = UrlValidator::default();
        Self {
            runner,
            prompter,
            builder: CommandBuilder::new(validator.clone()),
            validator,
            options,
        }
    }

    #[must_use]
    pub const fn options(&self) -> &SetupOptions {
        &self.options
    }

    #[must_use]
    pub const fn runner(&self) -> &R {
        &self.runner
    }

    /// Configuration for the selected scope.
    ///
    /// For `local` this is the project's entry in `~/.claude.json`, which is
    /// also where `claude mcp add` records it.
    pub fn store(&self) -> Result<ConfigStore> {
        let target = match &self.options.target {
            Some(target) => target.clone(),
            None => self.options.scope.config_target(&self.options.project_dir)?,
        };
        Ok(ConfigStore::for_target(target)
            .with_lock_timeout(self.options.lock_timeout)
            .with_stale_after(self.options.stale_lock_threshold))
    }

    /// Process every spec in order; failures never stop the run.
    pub async fn run<'a, I>(&mut self, specs: I) -> SetupSummary
    where
        I: IntoIterator<Item = &'a ServerSpec>,
    {
        let mut summary = SetupSummary::default();
        for spec in specs {
            let outcome = self.setup_server(spec).await;
            summary.record(&spec.key, outcome);
        }
        summary
    }

    /// Full flow for one server.
    pub async fn setup_server(&mut self, spec: &ServerSpec) -> SetupOutcome {
        println!("\n{} {}", "▸".cyan(), spec.title.bold());
        match self.try_setup_server(spec).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let ctx = user_friendly_error(e);
                if ctx.error.is_url_rejection() {
                    warn!(target: "setup", server = %spec.key, "Endpoint rejected: {}", ctx.error);
                } else {
                    warn!(target: "setup", server = %spec.key, "Setup failed: {}", ctx.error);
                }
                ctx.display();
                SetupOutcome::Failed(ctx.error.to_string())
            }
        }
    }

    async fn try_setup_server(&mut self, spec: &ServerSpec) -> Result<SetupOutcome> {
        let store = self.store()?;
        let status = check_server_status(spec, &store, &self.validator);
        debug!(target: "setup", server = %spec.key, status = %status.status, "Status checked");

        if let Some(error) = &status.error {
            println!("  {} {}", "!".yellow(), error);
        }
        if status.configured && !self.options.force {
            println!("  {}", "Already configured".cyan());
            return Ok(SetupOutcome::AlreadyConfigured);
        }

        let question = if status.exists {
            format!("Re-register {} ({})?", spec.title, status.status)
        } else {
            format!("Install {}?", spec.title)
        };
        if !self.prompter.confirm(&question, true).await? {
            return Ok(SetupOutcome::Skipped("declined".to_string()));
        }

        let env = match self.collect_answers(spec).await? {
            Answers::Ready(env) => env,
            Answers::Skip(reason) => {
                println!("  {} {}", "Skipping:".yellow(), reason);
                return Ok(SetupOutcome::Skipped(reason));
            }
        };

        self.register(spec, &env, status.exists, &store).await?;

        if let TransportSpec::Sse(sse) = &spec.transport
            && !self.options.dry_run
        {
            println!(
                "  {} authenticate in the browser the first time Claude Code connects; see {}",
                "Note:".cyan(),
                sse.help_url
            );
        }
        if self.options.dry_run {
            return Ok(SetupOutcome::Planned);
        }
        Ok(SetupOutcome::Installed)
    }

    async fn collect_answers(&mut self, spec: &ServerSpec) -> Result<Answers> {
        match (spec.prompt_kind(), &spec.transport) {
            (PromptKind::NoConfig | PromptKind::Sse, _) => Ok(Answers::Ready(EnvVarMap::new())),
            (PromptKind::WrapperCli, TransportSpec::Stdio(stdio)) => {
                let wrapper = stdio.wrapper.as_deref().unwrap_or(stdio.command.as_str());
                if ProcessInvoker::is_available(wrapper) {
                    Ok(Answers::Ready(EnvVarMap::new()))
                } else {
                    Ok(Answers::Skip(format!("requires '{wrapper}' on PATH")))
                }
            }
            _ => {
                let mut env = EnvVarMap::new();
                for name in spec.required_env() {
                    let value = match self.options.env.get(name) {
                        Some(given) => given.clone(),
                        None => {
                            let current = std::env::var(name).ok().filter(|v| !v.is_empty());
                            self.prompter.ask_secret(name, current.as_deref()).await?
                        }
                    };
                    if value.is_empty() {
                        return Ok(Answers::Skip(format!("{name} not provided")));
                    }
                    validate_env_value(name, &value)?;
                    env.insert(name.to_string(), value);
                }
                Ok(Answers::Ready(env))
            }
        }
    }

    async fn register(
        &self,
        spec: &ServerSpec,
        env: &EnvVarMap,
        replace_existing: bool,
        store: &ConfigStore,
    ) -> Result<()> {
        match self.options.mode {
            RegistrationMode::Cli => {
                let add = self.builder.build_add(spec, self.options.scope, env)?;
                if self.options.dry_run {
                    print_dry_run(&add);
                    return Ok(());
                }
                if replace_existing {
                    let remove = self.builder.build_remove(&spec.key, self.options.scope);
                    if let Err(e) = self.runner.run(&remove).await {
                        debug!(target: "setup", "Removing stale entry failed: {e:#}");
                    }
                }
                self.runner.run(&add).await?;
            }
            RegistrationMode::Direct => {
                // Same validation as the CLI path before anything touches disk
                self.builder.build_add(spec, self.options.scope, env)?;
                if self.options.dry_run {
                    println!("  would write mcpServers.{} to {}", spec.key, store.target());
                    return Ok(());
                }
                let outcome = store.merge_server(&spec.key, &spec.record(env)).await?;
                if let Some(backup) = outcome.recovered_from {
                    println!(
                        "  {} corrupt configuration moved to {}",
                        "!".yellow(),
                        backup.display()
                    );
                }
            }
        }
        info!(
            target: "setup",
            server = %spec.key,
            scope = %self.options.scope,
            "Registered MCP server"
        );
        println!("  {} {}", "✓".green(), "Installed".green());
        Ok(())
    }

    /// Unregister `key` from the selected scope. Returns whether anything was removed.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        match self.options.mode {
            RegistrationMode::Cli => {
                let cmd = self.builder.build_remove(key, self.options.scope);
                if self.options.dry_run {
                    print_dry_run(&cmd);
                    return Ok(false);
                }
                self.runner.run(&cmd).await?;
                Ok(true)
            }
            RegistrationMode::Direct => {
                let store = self.store()?;
                if self.options.dry_run {
                    println!("  would remove mcpServers.{key} from {}", store.target());
                    return Ok(false);
                }
                store.remove_server(key).await
            }
        }
    }
}

enum Answers {
    Ready(EnvVarMap),
    Skip(String),
}

fn print_dry_run(cmd: &CommandVector) {
    match cmd.to_shell_string() {
        Ok(_) => println!("  would run: {}", cmd.redacted()),
        Err(QuickstartError::UnsafeShellString { found }) => println!(
            "  would run: {} (argument vector only; '{}' rules out a shell string)",
            cmd.redacted(),
            found.escape_default()
        ),
        Err(e) => println!("  would run: {} ({e})", cmd.redacted()),
    }
}
