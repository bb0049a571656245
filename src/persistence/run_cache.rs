//! Same-day dedup cache.
//!
//! A one-field JSON file, `{"last_logged_date":"YYYY-MM-DD"}`, guarded by an
//! advisory lock on `<cache>.lock` so overlapping scheduled runs cannot race.
//! Only today's date is ever deduplicated; backfills always proceed.

use crate::config::CacheConfig;
use crate::error::BalanceError;
use crate::persistence::{sibling_with_suffix, write_atomic};
use chrono::NaiveDate;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Persisted cache content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheState {
    pub last_logged_date: NaiveDate,
}

/// Lock-protected record of the last date logged.
#[derive(Debug, Clone)]
pub struct RunCache {
    path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
}

/// Exclusive hold on the cache lock file, released on drop.
struct CacheLock {
    file: File,
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl RunCache {
    pub fn new<P: AsRef<Path>>(path: P, lock_timeout: Duration) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            lock_path: sibling_with_suffix(&path, ".lock"),
            path,
            lock_timeout,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(&config.file, config.lock_timeout())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Whether `date` was already logged during `today`.
    ///
    /// Unreadable or corrupt cache content counts as "not logged".
    pub fn already_logged(&self, today: NaiveDate, date: NaiveDate) -> Result<bool, BalanceError> {
        if date != today {
            return Ok(false);
        }

        let _lock = self.lock()?;
        let state = match self.read_state() {
            Ok(Some(state)) => state,
            Ok(None) => {
                debug!(path = %self.path.display(), "No cache file yet");
                return Ok(false);
            }
            Err(reason) => {
                warn!(path = %self.path.display(), %reason, "Failed to read cache file");
                return Ok(false);
            }
        };

        Ok(state.last_logged_date == date)
    }

    /// Remember that `date` has been logged. No-op for backfill dates.
    pub fn mark_logged(&self, today: NaiveDate, date: NaiveDate) -> Result<(), BalanceError> {
        if date != today {
            return Ok(());
        }

        let _lock = self.lock()?;
        let bytes = serde_json::to_vec(&CacheState {
            last_logged_date: date,
        })
        .map_err(|e| self.access_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        write_atomic(&self.path, &bytes).map_err(|e| self.access_error(e))?;
        debug!(path = %self.path.display(), %date, "Cache updated");
        Ok(())
    }

    /// Current cache content; `Ok(None)` when the file does not exist yet.
    fn read_state(&self) -> Result<Option<CacheState>, String> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.to_string()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| e.to_string())
    }

    /// Take the exclusive lock, polling until `lock_timeout` runs out.
    fn lock(&self) -> Result<CacheLock, BalanceError> {
        if let Some(parent) = self.lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.access_error(e))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| self.access_error(e))?;

        let started = Instant::now();
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => return Ok(CacheLock { file }),
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    if started.elapsed() >= self.lock_timeout {
                        return Err(BalanceError::LockTimeout {
                            path: self.lock_path.clone(),
                            waited: started.elapsed(),
                        });
                    }
                    std::thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(e) => return Err(self.access_error(e)),
            }
        }
    }

    fn access_error(&self, source: io::Error) -> BalanceError {
        BalanceError::CacheAccess {
            path: self.path.clone(),
            source,
        }
    }
}
