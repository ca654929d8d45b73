//! Configuration for sk.
//!
//! Defaults, overridden by an optional `config.toml` (explicit path, else
//! the per-user config directory), overridden by `SK_*` environment
//! variables. Base URLs are configurable so tests can point at local mock
//! servers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkError};

const DEFAULT_REGISTRY_URL: &str = "https://api.skillregistry.dev";
const DEFAULT_RAW_CONTENT_URL: &str = "https://raw.githubusercontent.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Per-user state root holding skills, backups, manifest, and history.
    pub state_root: PathBuf,
    pub registry_url: String,
    pub raw_content_url: String,
    /// Timestamped backups retained per skill.
    pub backup_keep: usize,
    pub lock_wait_ms: u64,
    pub lock_stale_ms: u64,
    pub lock_poll_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_root: default_state_root(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            raw_content_url: DEFAULT_RAW_CONTENT_URL.to_string(),
            backup_keep: crate::backup::DEFAULT_KEEP,
            lock_wait_ms: 10_000,
            lock_stale_ms: 30_000,
            lock_poll_ms: 100,
        }
    }
}

fn default_state_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sk")
}

/// Partial config as read from a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    state_root: Option<PathBuf>,
    registry_url: Option<String>,
    raw_content_url: Option<String>,
    backup_keep: Option<usize>,
    lock_wait_ms: Option<u64>,
    lock_stale_ms: Option<u64>,
    lock_poll_ms: Option<u64>,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("SK_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            }
        } else if let Some(global) = Self::load_global()? {
            config.merge_patch(global);
        }

        config.apply_env_overrides()?;
        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&config_dir.join("sk/config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|err| SkError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| SkError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(value) = patch.state_root {
            self.state_root = value;
        }
        if let Some(value) = patch.registry_url {
            self.registry_url = value;
        }
        if let Some(value) = patch.raw_content_url {
            self.raw_content_url = value;
        }
        if let Some(value) = patch.backup_keep {
            self.backup_keep = value;
        }
        if let Some(value) = patch.lock_wait_ms {
            self.lock_wait_ms = value;
        }
        if let Some(value) = patch.lock_stale_ms {
            self.lock_stale_ms = value;
        }
        if let Some(value) = patch.lock_poll_ms {
            self.lock_poll_ms = value;
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("SK_ROOT") {
            self.state_root = PathBuf::from(value);
        }
        if let Ok(value) = std::env::var("SK_REGISTRY_URL") {
            self.registry_url = value;
        }
        if let Ok(value) = std::env::var("SK_RAW_CONTENT_URL") {
            self.raw_content_url = value;
        }
        if let Ok(value) = std::env::var("SK_BACKUP_KEEP") {
            self.backup_keep = value.parse().map_err(|_| {
                SkError::Config(format!("SK_BACKUP_KEEP must be a number: {value}"))
            })?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Derived paths
    // ------------------------------------------------------------------

    #[must_use]
    pub fn skills_dir(&self) -> PathBuf {
        self.state_root.join("skills")
    }

    #[must_use]
    pub fn backups_dir(&self) -> PathBuf {
        self.state_root.join(".backups")
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.state_root.join("manifest.json")
    }

    #[must_use]
    pub fn history_db_path(&self) -> PathBuf {
        self.state_root.join("history.db")
    }

    #[must_use]
    pub fn registry_cache_path(&self) -> PathBuf {
        self.state_root.join("registry-cache.json")
    }

    #[must_use]
    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }

    #[must_use]
    pub fn lock_stale(&self) -> Duration {
        Duration::from_millis(self.lock_stale_ms)
    }

    #[must_use]
    pub fn lock_poll(&self) -> Duration {
        Duration::from_millis(self.lock_poll_ms)
    }
}
