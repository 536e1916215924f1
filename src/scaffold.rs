//! Starter files written into a project by `init`.
//!
//! Existing files are kept unless `force` is set. `.mcp.json` is the
//! exception: it holds project-scope registrations, so it is only created,
//! never replaced.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Line added to `.gitignore` so local-scope secrets stay out of git.
pub const GITIGNORE_ENTRY: &str = ".claude/settings.local.json";

const CLAUDE_MD: &str = r"# Project guide for Claude Code

## Overview
<!-- What this project does, in two or three sentences. -->

## Commands
<!-- How to build, test and lint. -->

## Conventions
<!-- Code style, naming, directory layout, anything a new contributor trips over. -->

## MCP servers
Project-wide MCP servers are registered in `.mcp.json`. Personal ones
(`--scope local`) are kept per project in `~/.claude.json`, outside the repository.
";

const REVIEW_COMMAND: &str = r"Review the staged changes (`git diff --cached`).

For each file:
1. Point out bugs, missing error handling and unclear names.
2. Flag anything that leaks secrets or weakens input validation.
3. Suggest tests that are missing.

Finish with a short list of the changes you would block the merge on.
";

const EMPTY_MCP_JSON: &str = "{\n  \"mcpServers\": {}\n}\n";

/// One template file.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    /// Path relative to the project root
    pub relative: &'static str,
    pub content: &'static str,
    /// Whether `force` may replace an existing copy
    pub replaceable: bool,
}

/// Every file `init` knows how to write.
pub const TEMPLATES: &[Template] = &[
    Template {
        relative: "CLAUDE.md",
        content: CLAUDE_MD,
        replaceable: true,
    },
    Template {
        relative: ".claude/commands/review.md",
        content: REVIEW_COMMAND,
        replaceable: true,
    },
    Template {
        relative: ".mcp.json",
        content: EMPTY_MCP_JSON,
        replaceable: false,
    },
];

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Created,
    Overwritten,
    Kept,
}

/// Result of [`scaffold_project`].
#[derive(Debug, Default)]
pub struct ScaffoldReport {
    pub files: Vec<(PathBuf, FileAction)>,
    pub gitignore_updated: bool,
}

impl ScaffoldReport {
    #[must_use]
    pub fn action_for(&self, relative: &str) -> Option<FileAction> {
        self.files.iter().find(|(p, _)| p.ends_with(relative)).map(|(_, a)| *a)
    }
}

/// Write the templates into `target`, creating it if needed.
pub fn scaffold_project(target: &Path, force: bool) -> Result<ScaffoldReport> {
    fs::create_dir_all(target)
        .with_context(|| format!("Failed to create directory: {}", target.display()))?;

    let mut report = ScaffoldReport::default();
    for template in TEMPLATES {
        let path = target.join(template.relative);
        let exists = path.exists();
        let action = match (exists, force && template.replaceable) {
            (false, _) => FileAction::Created,
            (true, true) => FileAction::Overwritten,
            (true, false) => FileAction::Kept,
        };

        if action != FileAction::Kept {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
            fs::write(&path, template.content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        tracing::debug!(path = %path.display(), ?action, "Scaffolded file");
        report.files.push((path, action));
    }

    report.gitignore_updated = ensure_gitignore_entry(target, GITIGNORE_ENTRY)?;
    Ok(report)
}

/// Append `entry` to `<target>/.gitignore` unless a line already matches.
///
/// Returns whether the file changed.
pub fn ensure_gitignore_entry(target: &Path, entry: &str) -> Result<bool> {
    let path = target.join(".gitignore");
    let mut content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };

    let wanted = entry.trim_start_matches('/');
    if content.lines().any(|line| line.trim().trim_start_matches('/') == wanted) {
        return Ok(false);
    }

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(entry);
    content.push('\n');
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_all_templates() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("new-project");

        let report = scaffold_project(&target, false).unwrap();
        assert!(report.files.iter().all(|(_, a)| *a == FileAction::Created));
        assert!(report.gitignore_updated);

        let mcp: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(target.join(".mcp.json")).unwrap()).unwrap();
        assert_eq!(mcp, serde_json::json!({"mcpServers": {}}));
        assert!(target.join(".claude/commands/review.md").is_file());
    }

    #[test]
    fn test_existing_files_kept_without_force() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("CLAUDE.md"), "mine").unwrap();

        let report = scaffold_project(temp.path(), false).unwrap();
        assert_eq!(report.action_for("CLAUDE.md"), Some(FileAction::Kept));
        assert_eq!(fs::read_to_string(temp.path().join("CLAUDE.md")).unwrap(), "mine");
    }

    #[test]
    fn test_force_never_replaces_mcp_json() {
        let temp = TempDir::new().unwrap();
        let registered = r#"{"mcpServers": {"github": {"command": "npx"}}}"#;
        fs::write(temp.path().join(".mcp.json"), registered).unwrap();
        fs::write(temp.path().join("CLAUDE.md"), "old").unwrap();

        let report = scaffold_project(temp.path(), true).unwrap();
        assert_eq!(report.action_for("CLAUDE.md"), Some(FileAction::Overwritten));
        assert_eq!(report.action_for(".mcp.json"), Some(FileAction::Kept));
        assert_eq!(fs::read_to_string(temp.path().join(".mcp.json")).unwrap(), registered);
    }

    #[test]
    fn test_gitignore_entry_added_once() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".gitignore"), "node_modules/").unwrap();

        assert!(ensure_gitignore_entry(temp.path(), GITIGNORE_ENTRY).unwrap());
        assert!(!ensure_gitignore_entry(temp.path(), GITIGNORE_ENTRY).unwrap());

        let content = fs::read_to_string(temp.path().join(".gitignore")).unwrap();
        assert_eq!(content, "node_modules/\n.claude/settings.local.json\n");
    }

    #[test]
    fn test_gitignore_accepts_rooted_variant() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".gitignore"), "/.claude/settings.local.json\n").unwrap();
        assert!(!ensure_gitignore_entry(temp.path(), GITIGNORE_ENTRY).unwrap());
    }
}
