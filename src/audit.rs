//! Pack drift auditing.
//!
//! Compares a directory of bundled skills (one subdirectory each) against
//! the newest recorded version in history. Version comparison is strict
//! three-component numeric semver; anything else is treated as absent, not
//! best-effort parsed.

use std::path::Path;

use semver::Version;
use serde::Serialize;

use crate::error::Result;
use crate::fetcher::PRIMARY_FILE;
use crate::history::HistoryDb;
use crate::utils::parse_frontmatter;

/// Drift classification for one bundled skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftStatus {
    /// Bundle equals the newest recorded version.
    Current,
    /// Registry history is newer than the bundle.
    Outdated,
    /// Bundle is newer than anything recorded (unreleased local work).
    Ahead,
    /// Skill name has no history records.
    NoRegistryData,
    /// Bundle has no valid `version` field.
    MissingVersion,
}

impl std::fmt::Display for DriftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Outdated => write!(f, "outdated"),
            Self::Ahead => write!(f, "ahead"),
            Self::NoRegistryData => write!(f, "no_registry_data"),
            Self::MissingVersion => write!(f, "missing_version"),
        }
    }
}

/// Audit result for one bundled skill.
#[derive(Debug, Clone, Serialize)]
pub struct PackEntry {
    pub skill_name: String,
    pub bundled_version: Option<String>,
    pub registry_version: Option<String>,
    pub status: DriftStatus,
}

/// Parse a strict `x.y.z` version. Pre-release tags, build metadata, or any
/// other non-conforming shape yield `None`.
#[must_use]
pub fn strict_semver(raw: &str) -> Option<Version> {
    let version = Version::parse(raw.trim()).ok()?;
    if version.pre.is_empty() && version.build.is_empty() {
        Some(version)
    } else {
        None
    }
}

/// Audit each skill subdirectory of `pack_dir` against the history store.
pub fn audit_pack(pack_dir: &Path, db: &HistoryDb) -> Result<Vec<PackEntry>> {
    let mut entries = Vec::new();

    let mut dirs: Vec<_> = std::fs::read_dir(pack_dir)?
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.path().is_dir())
        .collect();
    dirs.sort_by_key(std::fs::DirEntry::file_name);

    for dir in dirs {
        let skill_name = dir.file_name().to_string_lossy().into_owned();
        if skill_name.starts_with('.') {
            continue;
        }
        entries.push(audit_skill_dir(&skill_name, &dir.path(), db)?);
    }
    Ok(entries)
}

fn audit_skill_dir(skill_name: &str, dir: &Path, db: &HistoryDb) -> Result<PackEntry> {
    let declared = std::fs::read_to_string(dir.join(PRIMARY_FILE))
        .ok()
        .and_then(|content| parse_frontmatter(&content).version);
    let bundled = declared.as_deref().and_then(strict_semver);

    let latest = db.latest_version(skill_name)?;
    let registry_version = latest.as_ref().map(|record| record.semver.clone());
    let registry = registry_version.as_deref().and_then(strict_semver);

    let status = match (&bundled, &registry) {
        // An invalid bundle version is missing_version even when a registry
        // record exists.
        (None, _) => DriftStatus::MissingVersion,
        (Some(_), None) => DriftStatus::NoRegistryData,
        (Some(bundled), Some(registry)) => {
            if bundled < registry {
                DriftStatus::Outdated
            } else if bundled > registry {
                DriftStatus::Ahead
            } else {
                DriftStatus::Current
            }
        }
    };

    Ok(PackEntry {
        skill_name: skill_name.to_string(),
        bundled_version: bundled.map(|version| version.to_string()),
        registry_version,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::VersionRecord;
    use chrono::Utc;
    use tempfile::tempdir;

    fn write_bundle(root: &Path, name: &str, version: Option<&str>) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        let frontmatter = version.map_or(String::new(), |v| format!("---\nversion: {v}\n---\n"));
        std::fs::write(
            dir.join(PRIMARY_FILE),
            format!("{frontmatter}# {name}\ncontent"),
        )
        .unwrap();
    }

    fn record(skill: &str, semver: &str) -> VersionRecord {
        VersionRecord {
            skill_id: skill.to_string(),
            content_hash: "h".to_string(),
            semver: semver.to_string(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn strict_semver_shapes() {
        assert!(strict_semver("1.2.3").is_some());
        assert!(strict_semver(" 1.2.3 ").is_some());
        assert!(strict_semver("1.2").is_none());
        assert!(strict_semver("1.2.3-beta").is_none());
        assert!(strict_semver("1.2.3+build5").is_none());
        assert!(strict_semver("v1.2.3").is_none());
        assert!(strict_semver("latest").is_none());
    }

    #[test]
    fn audit_classifies_all_states() {
        let dir = tempdir().unwrap();
        let db = HistoryDb::open_in_memory().unwrap();

        write_bundle(dir.path(), "current-skill", Some("1.1.0"));
        write_bundle(dir.path(), "outdated-skill", Some("1.0.0"));
        write_bundle(dir.path(), "ahead-skill", Some("1.2.0"));
        write_bundle(dir.path(), "unknown-skill", Some("1.0.0"));
        write_bundle(dir.path(), "versionless-skill", None);

        for skill in ["current-skill", "outdated-skill", "ahead-skill"] {
            db.record_version(&record(skill, "1.1.0")).unwrap();
        }

        let entries = audit_pack(dir.path(), &db).unwrap();
        let status_of = |name: &str| {
            entries
                .iter()
                .find(|entry| entry.skill_name == name)
                .unwrap()
                .status
        };

        assert_eq!(status_of("current-skill"), DriftStatus::Current);
        assert_eq!(status_of("outdated-skill"), DriftStatus::Outdated);
        assert_eq!(status_of("ahead-skill"), DriftStatus::Ahead);
        assert_eq!(status_of("unknown-skill"), DriftStatus::NoRegistryData);
        assert_eq!(status_of("versionless-skill"), DriftStatus::MissingVersion);
    }

    #[test]
    fn invalid_version_is_missing_even_with_registry_data() {
        let dir = tempdir().unwrap();
        let db = HistoryDb::open_in_memory().unwrap();
        write_bundle(dir.path(), "fuzzy-skill", Some("1.2.3-beta"));
        db.record_version(&record("fuzzy-skill", "1.1.0")).unwrap();

        let entries = audit_pack(dir.path(), &db).unwrap();
        assert_eq!(entries[0].status, DriftStatus::MissingVersion);
    }

    #[test]
    fn hidden_directories_are_skipped() {
        let dir = tempdir().unwrap();
        let db = HistoryDb::open_in_memory().unwrap();
        write_bundle(dir.path(), ".backups", Some("1.0.0"));
        write_bundle(dir.path(), "real-skill", Some("1.0.0"));

        let entries = audit_pack(dir.path(), &db).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].skill_name, "real-skill");
    }
}
