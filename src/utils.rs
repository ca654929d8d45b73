//! Shared helpers: hashing, atomic writes, frontmatter parsing.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{Result, SkError};

/// SHA-256 of a string, as 64 lowercase hex characters.
#[must_use]
pub fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Write a file atomically: write to a `.tmp` sibling, then rename over the
/// target. Parent directories are created first.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Frontmatter fields we care about from a SKILL.md header.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SkillFrontmatter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Parse the YAML frontmatter block (`---` delimited) at the top of a skill
/// file. Missing or malformed frontmatter yields the default (all `None`);
/// a malformed header is not worth failing an install over.
#[must_use]
pub fn parse_frontmatter(content: &str) -> SkillFrontmatter {
    let Some(rest) = content.strip_prefix("---") else {
        return SkillFrontmatter::default();
    };
    let Some(end) = rest.find("\n---") else {
        return SkillFrontmatter::default();
    };
    serde_yaml::from_str(&rest[..end]).unwrap_or_default()
}

/// Filesystem-safe timestamp for backup directory names (UTC, second
/// resolution, no separators that bother any platform).
#[must_use]
pub fn timestamp_slug(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y%m%dT%H%M%S").to_string()
}

/// Derive the installed skill name from a source path: the last non-empty
/// path segment, or the repo name for a repo-root source.
pub fn skill_name_from_source(repo: &str, path: &str) -> Result<String> {
    let name = path
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(repo)
        .trim_end_matches(".md");
    if name.is_empty() {
        return Err(SkError::Format(
            "cannot derive a skill name from an empty source".to_string(),
        ));
    }
    Ok(name.to_string())
}
