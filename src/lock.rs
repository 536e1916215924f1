//! Cross-process locking for configuration file updates.
//!
//! Two terminals running setup at the same time must not interleave their
//! read-modify-write cycles on the same JSON file. Before touching a
//! configuration file, the writer takes an exclusive OS advisory lock on a
//! sentinel file beside it (`<config>.lock`).
//!
//! The sentinel also carries a small JSON holder record (pid and acquisition
//! time) so a waiting process can name whoever blocks it. The OS drops the
//! lock of a crashed process; when a new writer then finds a leftover holder
//! record it reclaims the lock and logs it. A holder that stays past the
//! staleness threshold while still holding the OS lock is reported as stale
//! in the [`QuickstartError::LockTimeout`] error.
//!
//! All blocking file operations run under `spawn_blocking`.

use crate::constants::{
    LOCK_FILE_SUFFIX, MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS, default_lock_timeout,
    default_stale_lock_threshold,
};
use crate::core::QuickstartError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, warn};

/// Who holds (or last held) a configuration lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    /// Process id of the holder
    pub pid: u32,
    /// When the lock was taken
    pub acquired_at: DateTime<Utc>,
}

impl LockHolder {
    fn current() -> Self {
        Self {
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }

    /// Whether the record is older than `threshold`.
    #[must_use]
    pub fn is_stale(&self, threshold: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.acquired_at);
        age.to_std().is_ok_and(|age| age > threshold)
    }

    fn describe(&self, threshold: Duration) -> String {
        let mut text = format!("pid {} since {}", self.pid, self.acquired_at.to_rfc3339());
        if self.is_stale(threshold) {
            text.push_str(&format!(
                " (stale: held longer than {}s, the process may be hung)",
                threshold.as_secs()
            ));
        }
        text
    }
}

/// Exclusive lock guarding one configuration file.
///
/// Released when dropped, including when the owning future is cancelled.
#[derive(Debug)]
pub struct ConfigLock {
    file: Arc<File>,
    lock_path: PathBuf,
}

impl ConfigLock {
    /// Sentinel path for `config_path`: the same name with `.lock` appended.
    #[must_use]
    pub fn lock_path_for(config_path: &Path) -> PathBuf {
        let mut name = config_path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".");
        name.push(LOCK_FILE_SUFFIX);
        config_path.with_file_name(name)
    }

    /// Acquire with the default timeout and staleness threshold.
    pub async fn acquire(config_path: &Path) -> Result<Self> {
        Self::acquire_with_timeout(
            config_path,
            default_lock_timeout(),
            default_stale_lock_threshold(),
        )
        .await
    }

    /// Acquire the lock, retrying with exponential backoff (10ms up to 500ms)
    /// until `timeout` elapses.
    ///
    /// # Errors
    ///
    /// [`QuickstartError::LockTimeout`] naming the holder when it can be read,
    /// or an I/O error if the sentinel cannot be created.
    pub async fn acquire_with_timeout(
        config_path: &Path,
        timeout: Duration,
        stale_after: Duration,
    ) -> Result<Self> {
        let lock_path = Self::lock_path_for(config_path);
        debug!(target: "lock", path = %lock_path.display(), "Waiting for configuration lock");

        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let open_path = lock_path.clone();
        let file = tokio::task::spawn_blocking(move || {
            OpenOptions::new().create(true).read(true).write(true).truncate(false).open(&open_path)
        })
        .await
        .context("spawn_blocking panicked")?
        .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;
        let file = Arc::new(file);

        let start = Instant::now();
        let backoff = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS));

        for delay in backoff {
            let attempt_file = Arc::clone(&file);
            let acquired = tokio::task::spawn_blocking(move || try_take(&attempt_file))
                .await
                .context("spawn_blocking panicked")?;

            match acquired {
                Ok(Some(previous)) => {
                    if let Some(previous) = previous {
                        if previous.is_stale(stale_after) {
                            warn!(
                                target: "lock",
                                path = %lock_path.display(),
                                "Reclaimed abandoned lock left by {}",
                                previous.describe(stale_after)
                            );
                        } else {
                            debug!(
                                target: "lock",
                                pid = previous.pid,
                                "Previous holder exited without clearing its record"
                            );
                        }
                    }
                    debug!(
                        target: "lock",
                        path = %lock_path.display(),
                        wait_ms = start.elapsed().as_millis(),
                        "Configuration lock acquired"
                    );
                    return Ok(Self { file, lock_path });
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(target: "lock", error = %e, "Lock attempt failed");
                }
            }

            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(delay.min(remaining)).await;
        }

        let holder = read_holder(&lock_path).map(|h| h.describe(stale_after));
        Err(QuickstartError::LockTimeout {
            path: lock_path.display().to_string(),
            waited_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            holder,
        }
        .into())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for ConfigLock {
    fn drop(&mut self) {
        // The sentinel stays on disk: unlinking a file other processes may
        // already have open would split the lock.
        if let Err(e) = self.file.set_len(0) {
            debug!(target: "lock", error = %e, "Failed to clear lock holder record");
        }
        if let Err(e) = FileExt::unlock(&*self.file) {
            debug!(
                target: "lock",
                path = %self.lock_path.display(),
                error = %e,
                "Failed to unlock"
            );
        }
        debug!(target: "lock", path = %self.lock_path.display(), "Configuration lock released");
    }
}

/// Tries the OS lock once.
///
/// `Ok(None)` when someone else holds it. `Ok(Some(previous))` on success,
/// where `previous` is a leftover holder record, if any.
fn try_take(file: &File) -> std::io::Result<Option<Option<LockHolder>>> {
    if !FileExt::try_lock_exclusive(file)? {
        return Ok(None);
    }

    let mut handle = file;
    let mut content = String::new();
    handle.seek(SeekFrom::Start(0))?;
    handle.read_to_string(&mut content)?;
    let previous = serde_json::from_str::<LockHolder>(content.trim()).ok();

    let record = serde_json::to_vec(&LockHolder::current()).map_err(std::io::Error::other)?;
    file.set_len(0)?;
    handle.seek(SeekFrom::Start(0))?;
    handle.write_all(&record)?;
    handle.sync_data()?;

    Ok(Some(previous))
}

/// Reads the holder record of a lock file without locking it.
#[must_use]
pub fn read_holder(lock_path: &Path) -> Option<LockHolder> {
    let content = std::fs::read_to_string(lock_path).ok()?;
    serde_json::from_str(content.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_path_appends_suffix() {
        assert_eq!(
            ConfigLock::lock_path_for(Path::new("/p/.mcp.json")),
            PathBuf::from("/p/.mcp.json.lock")
        );
    }

    #[tokio::test]
    async fn test_acquire_writes_holder_and_release_clears_it() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join(".mcp.json");

        let lock = ConfigLock::acquire(&config).await.unwrap();
        let holder = read_holder(lock.path()).unwrap();
        assert_eq!(holder.pid, std::process::id());

        let lock_path = lock.path().to_path_buf();
        drop(lock);
        assert!(lock_path.exists());
        assert!(read_holder(&lock_path).is_none());
    }

    #[tokio::test]
    async fn test_creates_missing_parent_directory() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join(".claude").join("settings.local.json");
        let lock = ConfigLock::acquire(&config).await.unwrap();
        assert!(temp.path().join(".claude").is_dir());
        drop(lock);
    }

    #[tokio::test]
    async fn test_second_acquire_times_out_and_names_holder() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join(".mcp.json");
        let _held = ConfigLock::acquire(&config).await.unwrap();

        let start = Instant::now();
        let err = ConfigLock::acquire_with_timeout(
            &config,
            Duration::from_millis(150),
            Duration::from_secs(60),
        )
        .await
        .unwrap_err();
        let elapsed = start.elapsed();

        assert!(!err.to_string().contains("after 0s"), "{err}");
        let typed = err.downcast_ref::<QuickstartError>().unwrap();
        match typed {
            QuickstartError::LockTimeout { holder, waited_ms, .. } => {
                assert!(*waited_ms >= 100, "{waited_ms}");
                let holder = holder.as_deref().unwrap();
                assert!(holder.contains(&format!("pid {}", std::process::id())), "{holder}");
                assert!(!holder.contains("stale"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(elapsed >= Duration::from_millis(100), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_long_held_lock_reported_stale() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join(".mcp.json");
        let _held = ConfigLock::acquire(&config).await.unwrap();

        let err =
            ConfigLock::acquire_with_timeout(&config, Duration::from_millis(50), Duration::ZERO)
                .await
            .unwrap_err();
        assert!(err.to_string().contains("stale"), "{err}");
    }

    #[tokio::test]
    async fn test_leftover_record_is_reclaimed() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join(".mcp.json");
        let lock_path = ConfigLock::lock_path_for(&config);

        // Record left behind by a crashed process; nobody holds the OS lock.
        let abandoned = LockHolder {
            pid: 999_999,
            acquired_at: Utc::now() - chrono::Duration::minutes(10),
        };
        std::fs::write(&lock_path, serde_json::to_vec(&abandoned).unwrap()).unwrap();

        let lock = ConfigLock::acquire_with_timeout(
            &config,
            Duration::from_millis(500),
            Duration::from_secs(60),
        )
        .await
        .unwrap();
        assert_eq!(read_holder(lock.path()).unwrap().pid, std::process::id());
    }

    #[tokio::test]
    async fn test_waiter_proceeds_after_release() {
        let temp = TempDir::new().unwrap();
        let config = Arc::new(temp.path().join(".mcp.json"));

        let first = ConfigLock::acquire(&config).await.unwrap();
        let waiter_config = Arc::clone(&config);
        let waiter = tokio::spawn(async move {
            ConfigLock::acquire_with_timeout(
                &waiter_config,
                Duration::from_secs(5),
                Duration::from_secs(60),
            )
            .await
            .map(|_| ())
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(first);
        waiter.await.unwrap().unwrap();
    }

    #[test]
    fn test_staleness_threshold() {
        let fresh = LockHolder::current();
        assert!(!fresh.is_stale(Duration::from_secs(60)));
        let old = LockHolder {
            pid: 1,
            acquired_at: Utc::now() - chrono::Duration::seconds(120),
        };
        assert!(old.is_stale(Duration::from_secs(60)));
    }
}
