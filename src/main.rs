//! claude-code-quickstart entry point
//!
//! Parses arguments, sets up logging on stderr, runs the command and turns
//! errors into the colored error/details/suggestion display.
//!
//! Exit status: 0 on success, 1 on any error (including a setup run where a
//! server failed), 130 when interrupted with Ctrl-C.

use anyhow::Result;
use claude_code_quickstart::cli;
use claude_code_quickstart::constants::INTERRUPTED_EXIT_CODE;
use claude_code_quickstart::core::user_friendly_error;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();

    // The command future is dropped before exiting, which releases any held
    // configuration lock and deletes any temp file not yet renamed.
    let outcome = tokio::select! {
        result = cli.execute() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    let Some(result) = outcome else {
        eprintln!("\n{}", "Interrupted".yellow());
        std::process::exit(INTERRUPTED_EXIT_CODE);
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
