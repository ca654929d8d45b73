//! Backup snapshots for installed skills.
//!
//! Every destructive update is preceded by a timestamped, reason-tagged copy
//! of the full install directory under `.backups/{skill}/`. A distinguished
//! `.original/` snapshot holds the exact content fetched at install time plus
//! a metadata sidecar; it is the merge base for three-way reconciliation and
//! is never pruned. Regular snapshots are pruned oldest-first to the N most
//! recent.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, SkError};
use crate::fetcher::PRIMARY_FILE;
use crate::utils::timestamp_slug;

/// Name of the immutable install-time baseline snapshot.
pub const ORIGINAL_DIR: &str = ".original";
const SIDECAR_FILE: &str = ".metadata.json";

/// Default number of timestamped snapshots retained per skill.
pub const DEFAULT_KEEP: usize = 3;

/// Sidecar describing the `.original` baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineMetadata {
    pub skill: String,
    pub source: String,
    pub content_hash: String,
    pub installed_at: DateTime<Utc>,
}

/// A listed snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    /// Directory name, `{timestamp}_{reason}`.
    pub name: String,
    pub reason: String,
    pub path: PathBuf,
}

/// Manages the `.backups` tree beside the install root.
#[derive(Debug, Clone)]
pub struct BackupManager {
    backups_root: PathBuf,
    keep: usize,
}

impl BackupManager {
    #[must_use]
    pub fn new(backups_root: impl Into<PathBuf>, keep: usize) -> Self {
        Self {
            backups_root: backups_root.into(),
            keep,
        }
    }

    fn skill_root(&self, skill: &str) -> PathBuf {
        self.backups_root.join(skill)
    }

    /// Snapshot the full install directory before a destructive step. A
    /// failure here is fatal to the caller: no backup, no overwrite.
    pub fn snapshot(&self, skill: &str, install_dir: &Path, reason: &str) -> Result<PathBuf> {
        if !install_dir.is_dir() {
            return Err(SkError::Backup(format!(
                "install directory missing: {}",
                install_dir.display()
            )));
        }

        let base = format!("{}_{reason}", timestamp_slug(Utc::now()));
        let mut dest = self.skill_root(skill).join(&base);
        // Same-second snapshots get a numeric suffix.
        let mut counter = 1;
        while dest.exists() {
            dest = self.skill_root(skill).join(format!("{base}-{counter}"));
            counter += 1;
        }

        copy_dir(install_dir, &dest)
            .map_err(|err| SkError::Backup(format!("snapshot {skill}: {err}")))?;
        debug!(skill, dest = %dest.display(), "created backup snapshot");

        self.prune(skill)?;
        Ok(dest)
    }

    /// Persist the install-time baseline. Only written once; later installs
    /// of the same skill never replace it.
    pub fn write_original(
        &self,
        skill: &str,
        files: &[(String, String)],
        metadata: &BaselineMetadata,
    ) -> Result<()> {
        let original = self.skill_root(skill).join(ORIGINAL_DIR);
        if original.exists() {
            debug!(skill, "baseline already present, keeping it");
            return Ok(());
        }

        fs::create_dir_all(&original)?;
        for (name, content) in files {
            fs::write(original.join(name), content)?;
        }
        let sidecar = serde_json::to_string_pretty(metadata)?;
        fs::write(original.join(SIDECAR_FILE), sidecar)?;
        Ok(())
    }

    /// Read the baseline primary content, the merge base for reconciliation.
    pub fn original_primary(&self, skill: &str) -> Result<Option<String>> {
        let path = self.skill_root(skill).join(ORIGINAL_DIR).join(PRIMARY_FILE);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Read the baseline metadata sidecar.
    pub fn baseline_metadata(&self, skill: &str) -> Result<Option<BaselineMetadata>> {
        let path = self.skill_root(skill).join(ORIGINAL_DIR).join(SIDECAR_FILE);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// List timestamped snapshots, newest first. `.original` is not listed.
    pub fn list(&self, skill: &str) -> Result<Vec<BackupInfo>> {
        let root = self.skill_root(skill);
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == ORIGINAL_DIR || !entry.path().is_dir() {
                continue;
            }
            let reason = name
                .split_once('_')
                .map_or(String::new(), |(_, reason)| reason.to_string());
            backups.push(BackupInfo {
                name,
                reason,
                path: entry.path(),
            });
        }
        // Timestamp prefixes order lexicographically.
        backups.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(backups)
    }

    /// Remove timestamped snapshots beyond the retention count, oldest
    /// first. Never touches `.original`.
    pub fn prune(&self, skill: &str) -> Result<()> {
        let backups = self.list(skill)?;
        for stale in backups.iter().skip(self.keep) {
            debug!(skill, backup = %stale.name, "pruning old backup");
            if let Err(err) = fs::remove_dir_all(&stale.path) {
                warn!(backup = %stale.path.display(), error = %err, "prune failed");
            }
        }
        Ok(())
    }

    /// Replace the install directory with a named snapshot's content.
    pub fn restore(&self, skill: &str, backup_name: &str, install_dir: &Path) -> Result<()> {
        let source = self.skill_root(skill).join(backup_name);
        if !source.is_dir() {
            return Err(SkError::Backup(format!(
                "no backup named '{backup_name}' for {skill}"
            )));
        }
        if install_dir.exists() {
            fs::remove_dir_all(install_dir)?;
        }
        copy_dir(&source, install_dir)
            .map_err(|err| SkError::Backup(format!("restore {skill}: {err}")))?;
        Ok(())
    }
}

/// Recursive directory copy. Not atomic; snapshots are write-once and only
/// read after the copying call returns.
fn copy_dir(from: &Path, to: &Path) -> std::io::Result<()> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(std::io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(std::io::Error::other)?;
        let dest = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}
