//! Global constants used throughout the quickstart codebase.
//!
//! Timeouts, retry parameters and file names that are shared across modules
//! live here so the magic numbers stay discoverable.

use std::time::Duration;

/// Invocation name of the external Claude Code CLI.
///
/// Every registration command starts with this token. It is deliberately not
/// configurable: the vector prefix is part of the injection-safety contract.
pub const CLAUDE_PROGRAM: &str = "claude";

/// Default timeout for one external `claude` invocation (120 seconds).
///
/// `claude mcp add` for an npm-backed server may resolve packages on first
/// run, so this stays generous.
pub fn default_process_timeout() -> Duration {
    Duration::from_secs(120)
}

/// Default timeout for acquiring the configuration file lock (30 seconds).
pub fn default_lock_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Age after which a lock holder record is considered abandoned (60 seconds).
///
/// A single read-modify-write cycle takes milliseconds; a holder older than
/// this has crashed or hung.
pub fn default_stale_lock_threshold() -> Duration {
    Duration::from_secs(60)
}

/// Maximum backoff delay for exponential backoff (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Starting delay for exponential backoff (10ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Directory (under the home directory) holding this tool's own settings.
pub const SETTINGS_DIR_NAME: &str = ".claude-code-quickstart";

/// File name of the settings file inside [`SETTINGS_DIR_NAME`].
pub const SETTINGS_FILE_NAME: &str = "config.toml";

/// Environment variable overriding the settings file location.
pub const SETTINGS_PATH_ENV: &str = "CLAUDE_QUICKSTART_CONFIG";

/// Suffix appended to a configuration path to form its lock file path.
pub const LOCK_FILE_SUFFIX: &str = "lock";

/// Exit status used when the user interrupts a run with Ctrl-C.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;
