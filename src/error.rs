//! Error handling for sk.
//!
//! [`SkError`] covers the whole taxonomy: format errors are never retried,
//! not-found errors carry remediation text, validation errors carry every
//! violation, security failures carry finding counts, and lock/network
//! failures are safe for the caller to retry.

use std::io;

use thiserror::Error;

/// Main error type for sk operations.
#[derive(Error, Debug)]
pub enum SkError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid skill identifier: {0}")]
    Format(String),

    #[error("Invalid source URL: {0}")]
    InvalidSourceUrl(String),

    #[error("Skill not found: {0}")]
    SkillNotFound(String),

    #[error("Skill '{0}' exists in the registry but has no installable source")]
    DiscoveryOnly(String),

    #[error("Skill validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error(
        "Security scan blocked '{skill}': {critical} critical, {high} high ({total} finding(s) total)"
    )]
    SecurityBlocked {
        skill: String,
        critical: usize,
        high: usize,
        total: usize,
    },

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Lock timeout: {0}")]
    LockTimeout(String),

    #[error("Lock failed: {0}")]
    LockFailed(String),

    #[error("Backup failed: {0}")]
    Backup(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Not installed: {0}")]
    NotInstalled(String),

    #[error("Already installed: {0}")]
    AlreadyInstalled(String),
}

impl SkError {
    /// Actionable remediation text for user-facing failure classes.
    #[must_use]
    pub fn remediation(&self) -> Option<String> {
        match self {
            Self::Format(_) => Some(
                "Use 'author/skill-name' for registry skills, 'owner/repo/path' for \
                 direct GitHub paths, or a full github.com URL"
                    .to_string(),
            ),
            Self::SkillNotFound(id) => Some(format!(
                "Check the spelling of '{id}', or pass a direct owner/repo/path source"
            )),
            Self::DiscoveryOnly(id) => Some(format!(
                "'{id}' is a discovery-only registry entry; ask its author to publish \
                 a source, or install from a direct GitHub path"
            )),
            Self::Fetch(_) => Some(
                "Verify the repository, branch, and path exist and are public".to_string(),
            ),
            Self::LockTimeout(_) => Some(
                "Another sk process may be running; retry, or remove a stale \
                 manifest .lock file if no other process exists"
                    .to_string(),
            ),
            Self::NotInstalled(name) => Some(format!(
                "Run 'sk install {name}' first, or 'sk list' to see installed skills"
            )),
            Self::AlreadyInstalled(name) => Some(format!(
                "Run 'sk update {name}' to refresh it, or reinstall with --force"
            )),
            _ => None,
        }
    }

    /// Whether the caller can reasonably retry the same call.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Registry(_) | Self::Fetch(_) | Self::LockTimeout(_)
        )
    }
}

/// Result type alias using SkError.
pub type Result<T> = std::result::Result<T, SkError>;
