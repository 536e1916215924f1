//! Registration scopes and where each one persists MCP server entries.
//!
//! | Scope     | File                  | Map                                 |
//! |-----------|-----------------------|-------------------------------------|
//! | `local`   | `~/.claude.json`      | `projects.<abs project>.mcpServers` |
//! | `project` | `<project>/.mcp.json` | `mcpServers`                        |
//! | `user`    | `~/.claude.json`      | `mcpServers`                        |
//!
//! `local` is what `claude mcp add` writes by default: a per-project entry in
//! the user's file, keyed by the absolute project path.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Persistence tier for a registration.
///
/// `Local` is the external tool's default, so it is never spelled out on the
/// command line.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationScope {
    /// Private to this project checkout
    #[default]
    Local,
    /// Shared with every project of this user
    User,
    /// Checked into the project (`.mcp.json`)
    Project,
}

impl RegistrationScope {
    /// Lowercase name as understood by `claude mcp add --scope`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::User => "user",
            Self::Project => "project",
        }
    }

    /// Whether the scope must be passed explicitly to the external tool.
    #[must_use]
    pub const fn needs_flag(self) -> bool {
        !matches!(self, Self::Local)
    }

    /// Where this scope's `mcpServers` map lives.
    pub fn config_target(self, project_dir: &Path) -> Result<ConfigTarget> {
        Ok(match self {
            Self::Local => ConfigTarget {
                path: user_config_path()?,
                project: Some(project_key(project_dir)),
            },
            Self::Project => ConfigTarget {
                path: project_dir.join(".mcp.json"),
                project: None,
            },
            Self::User => ConfigTarget {
                path: user_config_path()?,
                project: None,
            },
        })
    }

    /// Configuration file that holds this scope's `mcpServers` map.
    pub fn config_path(self, project_dir: &Path) -> Result<PathBuf> {
        Ok(self.config_target(project_dir)?.path)
    }
}

fn user_config_path() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .context("Unable to determine home directory for user-scoped configuration")?
        .join(".claude.json"))
}

/// Key of `project_dir` under `projects` in `~/.claude.json`.
///
/// Claude Code records projects by absolute path, so symlinks are resolved
/// when the directory exists.
#[must_use]
pub fn project_key(project_dir: &Path) -> String {
    fs::canonicalize(project_dir)
        .or_else(|_| std::path::absolute(project_dir))
        .unwrap_or_else(|_| project_dir.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// A configuration file, plus the project entry inside it for `local` scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigTarget {
    pub path: PathBuf,
    /// Key under the file's top-level `projects` object
    pub project: Option<String>,
}

impl fmt::Display for ConfigTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        if let Some(project) = &self.project {
            write!(f, " [projects.\"{project}\"]")?;
        }
        Ok(())
    }
}

impl fmt::Display for RegistrationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "user" => Ok(Self::User),
            "project" => Ok(Self::Project),
            other => Err(anyhow::anyhow!(
                "Invalid scope '{other}'. Expected one of: local, user, project"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_local_omits_flag() {
        assert!(!RegistrationScope::Local.needs_flag());
        assert!(RegistrationScope::User.needs_flag());
        assert!(RegistrationScope::Project.needs_flag());
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("USER".parse::<RegistrationScope>().unwrap(), RegistrationScope::User);
        assert_eq!(" project ".parse::<RegistrationScope>().unwrap(), RegistrationScope::Project);
        assert!("global".parse::<RegistrationScope>().is_err());
    }

    #[test]
    fn test_project_scope_is_project_relative() {
        let root = Path::new("/work/app");
        let target = RegistrationScope::Project.config_target(root).unwrap();
        assert_eq!(target.path, root.join(".mcp.json"));
        assert_eq!(target.project, None);
    }

    #[test]
    fn test_local_scope_is_a_project_entry_in_user_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let local = RegistrationScope::Local.config_target(temp.path()).unwrap();
        let user = RegistrationScope::User.config_target(temp.path()).unwrap();

        assert_eq!(local.path, user.path);
        assert!(local.path.ends_with(".claude.json"));
        assert_eq!(user.project, None);

        let key = local.project.unwrap();
        assert!(Path::new(&key).is_absolute());
        assert_eq!(key, project_key(temp.path()));
    }

    #[test]
    fn test_project_key_of_relative_path_is_absolute() {
        let key = project_key(Path::new("does-not-exist/app"));
        assert!(Path::new(&key).is_absolute());
        assert!(key.ends_with("app"));
    }

    #[test]
    fn test_target_display_names_project_entry() {
        let target = ConfigTarget {
            path: PathBuf::from("/home/u/.claude.json"),
            project: Some("/work/app".to_string()),
        };
        assert_eq!(target.to_string(), "/home/u/.claude.json [projects.\"/work/app\"]");
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&RegistrationScope::User).unwrap();
        assert_eq!(json, "\"user\"");
    }
}
