//! Throwaway project directories for tests.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temp dir holding a project directory and a separate fake home.
///
/// Integration tests point `HOME` at [`TestProject::home_dir`] so user-scope
/// writes never reach the real `~/.claude.json`.
pub struct TestProject {
    pub temp_dir: TempDir,
    pub project_dir: PathBuf,
    pub home_dir: PathBuf,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        super::init_test_logging(None);

        let temp_dir = TempDir::new()?;
        let project_dir = temp_dir.path().join("project");
        let home_dir = temp_dir.path().join("home");
        fs::create_dir_all(&project_dir)?;
        fs::create_dir_all(&home_dir)?;

        Ok(Self {
            temp_dir,
            project_dir,
            home_dir,
        })
    }

    /// Path of a file relative to the project directory.
    #[must_use]
    pub fn path(&self, relative: &str) -> PathBuf {
        self.project_dir.join(relative)
    }

    /// Write `content` to a project-relative file, creating directories.
    pub fn write(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    /// Parse a JSON file (project-relative, or absolute).
    pub fn read_json(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = self.project_dir.join(path);
        let text =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Files in `dir` whose names start with `prefix`, sorted.
    pub fn files_with_prefix(&self, dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with(prefix) {
                found.push(entry.path());
            }
        }
        found.sort();
        Ok(found)
    }
}
