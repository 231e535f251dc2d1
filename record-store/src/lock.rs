use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use sync_core::{CoreError, StoreError};
use tracing::{debug, warn};

/// A lock older than this is taken over even if its pid looks alive.
pub const STALE_AFTER_SECONDS: i64 = 6 * 60 * 60;

/// Contents of the lock file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
}

impl LockInfo {
    pub fn current() -> Self {
        Self {
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }

    /// The holder died, or has held the lock for longer than any run takes.
    pub fn is_stale(&self) -> bool {
        if !pid_is_alive(self.pid) {
            return true;
        }
        Utc::now()
            .signed_duration_since(self.acquired_at)
            .num_seconds()
            > STALE_AFTER_SECONDS
    }
}

/// Exclusive marker for one sync run. Removed on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Takes the lock. A lock left by a run that was killed is taken over.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let file = match create_lock_file(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !take_over_if_stale(&path)? {
                    return Err(CoreError::Store(StoreError::Locked {
                        path: path.display().to_string(),
                    }));
                }
                create_lock_file(&path).map_err(|e| match e.kind() {
                    ErrorKind::AlreadyExists => CoreError::Store(StoreError::Locked {
                        path: path.display().to_string(),
                    }),
                    _ => CoreError::Io(e),
                })?
            }
            Err(e) => return Err(CoreError::Io(e)),
        };

        write_info(file, &LockInfo::current())?;
        debug!("Acquired run lock {}", path.display());
        Ok(Self { path })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove run lock {}: {}", self.path.display(), e);
        }
    }
}

fn create_lock_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

fn write_info(mut file: File, info: &LockInfo) -> Result<(), CoreError> {
    file.write_all(serde_json::to_string(info)?.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

/// Removes the lock at `path` when its holder is gone. Returns whether it did.
fn take_over_if_stale(path: &Path) -> Result<bool, CoreError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        // Released between our attempt and this read
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(CoreError::Io(e)),
    };
    // Created but not yet written by its holder, unless that was long ago
    if contents.trim().is_empty() && !is_old(path)? {
        return Ok(false);
    }

    match serde_json::from_str::<LockInfo>(&contents) {
        Ok(info) if info.is_stale() => warn!(
            "Taking over run lock {} left by pid {} at {}",
            path.display(),
            info.pid,
            info.acquired_at
        ),
        Ok(info) => {
            debug!(
                "Run lock {} is held by live pid {} since {}",
                path.display(),
                info.pid,
                info.acquired_at
            );
            return Ok(false);
        }
        Err(e) => warn!(
            "Run lock {} is unreadable ({}), taking it over",
            path.display(),
            e
        ),
    }

    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
        Err(e) => Err(CoreError::Io(e)),
    }
}

fn is_old(path: &Path) -> Result<bool, CoreError> {
    let modified: DateTime<Utc> = fs::metadata(path)?.modified()?.into();
    Ok(Utc::now().signed_duration_since(modified).num_seconds() > STALE_AFTER_SECONDS)
}

#[cfg(target_os = "linux")]
fn pid_is_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

#[cfg(not(target_os = "linux"))]
fn pid_is_alive(_pid: u32) -> bool {
    true
}
