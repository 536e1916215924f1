//! User settings for this tool (`~/.claude-code-quickstart/config.toml`).
//!
//! Every key is optional:
//!
//! ```toml
//! default_scope = "user"       # local | user | project
//! process_timeout_secs = 120   # per `claude` invocation
//! lock_timeout_secs = 30       # waiting for another setup run
//! stale_lock_secs = 60         # age at which a lock holder counts as abandoned
//! direct = false               # write configuration files instead of calling `claude`
//! ```
//!
//! Lookup order for the file: `--config`, then `CLAUDE_QUICKSTART_CONFIG`,
//! then the default location. A missing file means all defaults; a file
//! that does not parse is an error rather than being ignored.

use crate::constants::{
    SETTINGS_DIR_NAME, SETTINGS_FILE_NAME, SETTINGS_PATH_ENV, default_lock_timeout,
    default_process_timeout, default_stale_lock_threshold,
};
use crate::core::QuickstartError;
use crate::scope::RegistrationScope;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Parsed settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Scope used when `--scope` is not given
    #[serde(default)]
    pub default_scope: RegistrationScope,

    /// Timeout for one `claude` invocation
    #[serde(default = "default_process_timeout_secs")]
    pub process_timeout_secs: u64,

    /// How long to wait for the configuration lock
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    /// Age after which a lock holder is treated as abandoned
    #[serde(default = "default_stale_lock_secs")]
    pub stale_lock_secs: u64,

    /// Always register by writing configuration files directly
    #[serde(default)]
    pub direct: bool,
}

fn default_process_timeout_secs() -> u64 {
    default_process_timeout().as_secs()
}

fn default_lock_timeout_secs() -> u64 {
    default_lock_timeout().as_secs()
}

fn default_stale_lock_secs() -> u64 {
    default_stale_lock_threshold().as_secs()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_scope: RegistrationScope::default(),
            process_timeout_secs: default_process_timeout_secs(),
            lock_timeout_secs: default_lock_timeout_secs(),
            stale_lock_secs: default_stale_lock_secs(),
            direct: false,
        }
    }
}

impl Settings {
    /// Default settings path: `~/.claude-code-quickstart/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
            .join(SETTINGS_DIR_NAME)
            .join(SETTINGS_FILE_NAME))
    }

    /// Settings path after applying the explicit path and the environment
    /// override.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        match std::env::var_os(SETTINGS_PATH_ENV) {
            Some(value) if !value.is_empty() => Ok(PathBuf::from(value)),
            _ => Self::default_path(),
        }
    }

    /// Load from `explicit`, the environment override, or the default path.
    pub async fn load_with_optional(explicit: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_path(explicit)?;
        if fs::try_exists(&path).await.unwrap_or(false) {
            Self::load_from(&path).await
        } else {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load a specific settings file.
    ///
    /// # Errors
    ///
    /// I/O errors, or [`QuickstartError::SettingsError`] for invalid TOML or
    /// out-of-range values.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let settings: Self = toml::from_str(&content).map_err(|e| QuickstartError::SettingsError {
            path: path.display().to_string(),
            reason: e.message().to_string(),
        })?;
        settings.check(path)?;
        Ok(settings)
    }

    fn check(&self, path: &Path) -> Result<(), QuickstartError> {
        for (name, value) in [
            ("process_timeout_secs", self.process_timeout_secs),
            ("lock_timeout_secs", self.lock_timeout_secs),
            ("stale_lock_secs", self.stale_lock_secs),
        ] {
            if value == 0 {
                return Err(QuickstartError::SettingsError {
                    path: path.display().to_string(),
                    reason: format!("{name} must be greater than zero"),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub const fn process_timeout(&self) -> Duration {
        Duration::from_secs(self.process_timeout_secs)
    }

    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    #[must_use]
    pub const fn stale_lock_threshold(&self) -> Duration {
        Duration::from_secs(self.stale_lock_secs)
    }
}
