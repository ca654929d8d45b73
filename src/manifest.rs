//! Durable manifest of installed skills, with cross-process locking.
//!
//! The manifest is one JSON file; writers hold a marker-file lock for the
//! whole read-modify-write cycle, and saves go through write-temp-then-rename
//! so the file on disk is always either the previous or the next complete
//! JSON. A lock older than the staleness timeout is treated as abandoned by a
//! crashed process and reclaimed by the next acquirer.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SkError};
use crate::utils::write_atomic;

/// Current manifest schema version.
pub const MANIFEST_VERSION: &str = "1";

const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(10);
const DEFAULT_LOCK_STALE: Duration = Duration::from_secs(30);
const DEFAULT_LOCK_POLL: Duration = Duration::from_millis(100);

/// One installed skill record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillEntry {
    pub id: String,
    pub name: String,
    pub version: String,
    /// Canonical source URL the skill was installed from.
    pub source: String,
    pub install_path: PathBuf,
    pub installed_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Hash of the primary file as written at install/update time; the
    /// baseline for local-modification detection.
    pub content_hash: String,
}

/// The whole manifest document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: String,
    /// Monotonic write counter, bumped by writers inside `update_safely`.
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub installed_skills: BTreeMap<String, SkillEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            revision: 0,
            installed_skills: BTreeMap::new(),
        }
    }
}

/// Recorded owner of the manifest lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockHolder {
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// Held manifest lock; releasing deletes the marker file and swallows any
/// error (the lock may already have been reclaimed).
#[derive(Debug)]
pub struct ManifestLock {
    path: PathBuf,
}

impl Drop for ManifestLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %err, "lock already released");
        }
    }
}

/// Store handle for the manifest file. Cheap to clone; every operation is a
/// method so tests can construct stores with short timeouts.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    manifest_path: PathBuf,
    lock_wait: Duration,
    lock_stale: Duration,
    lock_poll: Duration,
}

impl ManifestStore {
    #[must_use]
    pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            lock_wait: DEFAULT_LOCK_WAIT,
            lock_stale: DEFAULT_LOCK_STALE,
            lock_poll: DEFAULT_LOCK_POLL,
        }
    }

    /// Override lock timings (tests use millisecond-scale values).
    #[must_use]
    pub fn with_lock_timings(mut self, wait: Duration, stale: Duration, poll: Duration) -> Self {
        self.lock_wait = wait;
        self.lock_stale = stale;
        self.lock_poll = poll;
        self
    }

    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .manifest_path
            .file_name()
            .map_or_else(|| "manifest.json".into(), |n| n.to_os_string());
        name.push(".lock");
        self.manifest_path.with_file_name(name)
    }

    /// Load the manifest; an absent file is a first run and yields the empty
    /// default, never an error.
    pub fn load(&self) -> Result<Manifest> {
        match fs::read_to_string(&self.manifest_path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Manifest::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Save via write-temp-then-rename, creating parent directories first.
    pub fn save(&self, manifest: &Manifest) -> Result<()> {
        let json = serde_json::to_string_pretty(manifest)?;
        write_atomic(&self.manifest_path, &json)
    }

    /// Serialized read-modify-write: acquire the lock, load, apply, save,
    /// release. Concurrent callers are applied in some serial order.
    pub fn update_safely<T>(
        &self,
        apply: impl FnOnce(&mut Manifest) -> Result<T>,
    ) -> Result<T> {
        let _lock = self.acquire_lock()?;
        let mut manifest = self.load()?;
        let value = apply(&mut manifest)?;
        self.save(&manifest)?;
        Ok(value)
    }

    /// Acquire the manifest lock: exclusive non-overwriting create, stale
    /// reclamation by age, bounded poll-wait.
    pub fn acquire_lock(&self) -> Result<ManifestLock> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let deadline = Instant::now() + self.lock_wait;
        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(mut file) => {
                    let holder = LockHolder {
                        pid: std::process::id(),
                        acquired_at: Utc::now(),
                    };
                    // Holder info is diagnostic only; existence is the lock.
                    if let Ok(json) = serde_json::to_string(&holder) {
                        let _ = file.write_all(json.as_bytes());
                    }
                    debug!(path = %lock_path.display(), "acquired manifest lock");
                    return Ok(ManifestLock { path: lock_path });
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    if self.lock_is_stale(&lock_path) {
                        warn!(path = %lock_path.display(), "reclaiming stale manifest lock");
                        // Losing the removal race is fine; the next create
                        // attempt arbitrates.
                        let _ = fs::remove_file(&lock_path);
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(SkError::LockTimeout(format!(
                            "gave up waiting for {} after {:?}",
                            lock_path.display(),
                            self.lock_wait
                        )));
                    }
                    std::thread::sleep(self.lock_poll);
                }
                Err(err) => {
                    return Err(SkError::LockFailed(format!(
                        "cannot create {}: {err}",
                        lock_path.display()
                    )));
                }
            }
        }
    }

    fn lock_is_stale(&self, lock_path: &Path) -> bool {
        let Ok(metadata) = fs::metadata(lock_path) else {
            // Lock vanished between attempts; let the create retry decide.
            return true;
        };
        metadata
            .modified()
            .ok()
            .and_then(|mtime| mtime.elapsed().ok())
            .is_some_and(|age| age > self.lock_stale)
    }
}
