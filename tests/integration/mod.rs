//! Integration test suite for claude-code-quickstart
//!
//! End-to-end tests that run the compiled binary against throwaway project
//! and home directories.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **check_url**: The `check-url` command and the SSE allow-list
//! - **init**: Template scaffolding and `.gitignore` handling
//! - **registration**: `add`, `remove` and `list` in direct mode, including
//!   corrupt-file recovery and concurrent writers
//!
//! No test needs the `claude` binary: registration tests pass `--direct`.

mod check_url;
mod init;
mod registration;

use assert_cmd::Command;
use claude_code_quickstart::test_utils::TestProject;

/// Binary invocation isolated from the developer's machine.
///
/// `HOME` points at the project's fake home, the settings file points at a
/// path that does not exist, and tokens that would satisfy env prompts are
/// cleared.
pub fn quickstart(project: &TestProject) -> Command {
    let mut cmd = Command::cargo_bin("claude-code-quickstart").unwrap();
    cmd.current_dir(&project.project_dir)
        .env("HOME", &project.home_dir)
        .env("USERPROFILE", &project.home_dir)
        .env("CLAUDE_QUICKSTART_CONFIG", project.temp_dir.path().join("no-settings.toml"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("GITHUB_PERSONAL_ACCESS_TOKEN")
        .env_remove("BRAVE_API_KEY")
        .arg("--project-dir")
        .arg(&project.project_dir);
    cmd
}
