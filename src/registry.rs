//! Registry lookup client with a local fallback cache.
//!
//! A two-segment `author/name` key is resolved against the remote registry
//! first. Transport failures and a service-reported offline state fall back
//! to the local cache. A registry hit that carries no installable source URL
//! (metadata-only seed entries) fails with the distinct discovery-only error
//! and is never retried against the cache: the cache would only reproduce
//! the same negative result.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SkError};
use crate::utils::write_atomic;

const USER_AGENT: &str = "sk-cli";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Provenance confidence for a skill source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    Verified,
    Community,
    Experimental,
    #[default]
    Unverified,
}

impl std::fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified => write!(f, "verified"),
            Self::Community => write!(f, "community"),
            Self::Experimental => write!(f, "experimental"),
            Self::Unverified => write!(f, "unverified"),
        }
    }
}

/// A successful registry resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSkill {
    pub source_url: String,
    pub display_name: String,
    pub trust: TrustLevel,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    skill: Option<LookupSkill>,
}

#[derive(Debug, Deserialize)]
struct LookupSkill {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    source_url: Option<String>,
    #[serde(default)]
    trust: TrustLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedLookup {
    source_url: String,
    display_name: String,
    trust: TrustLevel,
    cached_at: DateTime<Utc>,
}

/// Registry client: remote lookup plus write-through JSON file cache.
pub struct RegistryClient {
    base_url: String,
    cache_path: PathBuf,
    client: reqwest::blocking::Client,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>, cache_path: impl Into<PathBuf>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache_path: cache_path.into(),
            client,
        })
    }

    /// Resolve an `author/name` registry key to an installable source.
    pub fn lookup(&self, author: &str, name: &str) -> Result<ResolvedSkill> {
        let key = format!("{author}/{name}");

        match self.remote_lookup(author, name) {
            Ok(RemoteLookup::Found(resolved)) => {
                self.cache_store(&key, &resolved);
                Ok(resolved)
            }
            // Affirmative but not installable: do not consult the cache.
            Ok(RemoteLookup::DiscoveryOnly) => Err(SkError::DiscoveryOnly(key)),
            Ok(RemoteLookup::NotFound) => self
                .cache_lookup(&key)
                .ok_or(SkError::SkillNotFound(key)),
            Ok(RemoteLookup::Offline) | Err(_) => {
                warn!(key = %key, "registry unavailable, trying local cache");
                self.cache_lookup(&key).ok_or_else(|| {
                    SkError::Registry(format!(
                        "registry unavailable and '{key}' is not in the local cache"
                    ))
                })
            }
        }
    }

    fn remote_lookup(&self, author: &str, name: &str) -> Result<RemoteLookup> {
        let url = format!("{}/api/v1/skills/{author}/{name}", self.base_url);
        debug!(url = %url, "registry lookup");

        let response = self.client.get(&url).send()?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(RemoteLookup::NotFound);
        }
        if status.is_server_error() {
            return Ok(RemoteLookup::Offline);
        }
        if !status.is_success() {
            return Err(SkError::Registry(format!("registry lookup failed: HTTP {status}")));
        }

        let body: LookupResponse = response
            .json()
            .map_err(|err| SkError::Registry(format!("malformed registry response: {err}")))?;

        if body.status.as_deref() == Some("offline") {
            return Ok(RemoteLookup::Offline);
        }
        let Some(skill) = body.skill else {
            return Ok(RemoteLookup::NotFound);
        };
        match skill.source_url {
            Some(source_url) if !source_url.is_empty() => Ok(RemoteLookup::Found(ResolvedSkill {
                source_url,
                display_name: skill
                    .display_name
                    .unwrap_or_else(|| format!("{author}/{name}")),
                trust: skill.trust,
            })),
            _ => Ok(RemoteLookup::DiscoveryOnly),
        }
    }

    fn cache_lookup(&self, key: &str) -> Option<ResolvedSkill> {
        let cache = load_cache(&self.cache_path);
        cache.get(key).map(|entry| ResolvedSkill {
            source_url: entry.source_url.clone(),
            display_name: entry.display_name.clone(),
            trust: entry.trust,
        })
    }

    fn cache_store(&self, key: &str, resolved: &ResolvedSkill) {
        let mut cache = load_cache(&self.cache_path);
        cache.insert(
            key.to_string(),
            CachedLookup {
                source_url: resolved.source_url.clone(),
                display_name: resolved.display_name.clone(),
                trust: resolved.trust,
                cached_at: Utc::now(),
            },
        );
        match serde_json::to_string_pretty(&cache) {
            Ok(json) => {
                if let Err(err) = write_atomic(&self.cache_path, &json) {
                    warn!(error = %err, "failed to update registry cache");
                }
            }
            Err(err) => warn!(error = %err, "failed to serialize registry cache"),
        }
    }
}

enum RemoteLookup {
    Found(ResolvedSkill),
    DiscoveryOnly,
    NotFound,
    Offline,
}

fn load_cache(path: &Path) -> BTreeMap<String, CachedLookup> {
    let Ok(raw) = std::fs::read_to_string(path) else {
        return BTreeMap::new();
    };
    serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!(path = %path.display(), error = %err, "ignoring corrupt registry cache");
        BTreeMap::new()
    })
}
