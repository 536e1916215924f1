//! Test utilities for claude-code-quickstart
//!
//! Helpers shared by unit tests and the integration suite:
//! - [`ScriptedPrompter`] answers setup questions from a fixed script
//! - [`RecordingRunner`] records command vectors instead of spawning `claude`
//! - [`TestProject`] is a throwaway project directory with its own fake home
//!
//! # Example
//!
//! ```rust,no_run
//! use claude_code_quickstart::test_utils::{RecordingRunner, ScriptedPrompter, TestProject};
//!
//! let project = TestProject::new().unwrap();
//! let prompter = ScriptedPrompter::new(["y", "ghp_token"]);
//! let runner = RecordingRunner::default();
//! ```

pub mod environment;
pub mod fixtures;

pub use environment::TestProject;
pub use fixtures::{RecordingRunner, ScriptedPrompter};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`. Without either, tests run
/// without a subscriber. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=lock=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
