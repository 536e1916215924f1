//! claude-code-quickstart
//!
//! Registers Model Context Protocol (MCP) servers with Claude Code and
//! scaffolds starter files into a project.
//!
//! # Architecture Overview
//!
//! A registration flows through four stages:
//!
//! 1. the setup orchestrator asks the user what each server needs
//! 2. the command builder turns the answers into a `claude mcp add` argument
//!    vector, validating SSE URLs on the way
//! 3. the process invoker runs that vector (no shell involved)
//! 4. when `claude` is unavailable, the configuration store merges the entry
//!    into the JSON file directly, under a cross-process lock
//!
//! ## Key Properties
//!
//! - **Injection-safe**: commands stay argument vectors; joining into a shell
//!   string is an explicit, checked step
//! - **Allow-listed endpoints**: SSE servers must be HTTPS on a trusted host
//! - **Non-destructive merges**: unrelated keys in configuration files survive,
//!   corrupt files are backed up rather than discarded
//! - **Concurrent-safe**: parallel runs serialize on a lock file beside the
//!   configuration they edit
//!
//! # Core Modules
//!
//! - [`catalog`] - The servers this tool can install
//! - [`validation`] - URL allow-listing and env var checks
//! - [`command`] - Argument vector construction
//! - [`process`] - Running `claude` with a timeout
//! - [`config_store`] - Reading and merging Claude Code configuration files
//! - [`lock`] - Cross-process lock for configuration updates
//! - [`setup`] - The per-server prompt and registration flow
//! - [`prompt`] - Terminal questions
//! - [`scope`] - Registration scopes and their files
//! - [`scaffold`] - Template files written by `init`
//! - [`settings`] - This tool's own TOML settings
//! - [`cli`] - Command-line interface
//! - [`core`] - Error types and user-facing error rendering
//!
//! # Example
//!
//! ```rust,no_run
//! use claude_code_quickstart::catalog::{Catalog, EnvVarMap};
//! use claude_code_quickstart::command::build_add_command;
//! use claude_code_quickstart::scope::RegistrationScope;
//!
//! let catalog = Catalog::builtin();
//! let spec = catalog.get("cloudflare-bindings")?;
//! let cmd = build_add_command(spec, RegistrationScope::User, &EnvVarMap::new())?;
//! assert_eq!(cmd.program(), "claude");
//! # Ok::<(), claude_code_quickstart::core::QuickstartError>(())
//! ```

pub mod catalog;
pub mod cli;
pub mod command;
pub mod config_store;
pub mod constants;
pub mod core;
pub mod lock;
pub mod process;
pub mod prompt;
pub mod scaffold;
pub mod scope;
pub mod settings;
pub mod setup;
pub mod validation;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
