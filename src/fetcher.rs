//! Raw content fetching for resolved skill sources.
//!
//! The primary definition file (`SKILL.md`) is required; failing to fetch it
//! fails the install with remediation text. A fixed set of auxiliary files is
//! fetched best-effort and silently skipped on failure. When the source uses
//! the conventional default branch and the primary fetch misses, one retry is
//! made against the alternate conventional branch name; many repositories use
//! either convention and one extra request is cheap.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Result, SkError};
use crate::resolver::{DEFAULT_BRANCH, FALLBACK_BRANCH, SourceRef};

const USER_AGENT: &str = "sk-cli";
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Required primary definition file.
pub const PRIMARY_FILE: &str = "SKILL.md";

/// Auxiliary files fetched best-effort alongside the primary.
pub const AUXILIARY_FILES: &[&str] = &["reference.md", "examples.md", "CHANGELOG.md"];

/// An auxiliary file that fetched successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxFile {
    pub name: String,
    pub content: String,
}

/// Fetched skill content prior to validation and scanning.
#[derive(Debug, Clone)]
pub struct FetchedSkill {
    pub primary: String,
    pub auxiliary: Vec<AuxFile>,
    /// Branch the content was actually served from (after any fallback).
    pub branch_used: String,
}

impl FetchedSkill {
    /// Whether a changelog was fetched; feeds the update-policy table.
    #[must_use]
    pub fn has_changelog(&self) -> bool {
        self.auxiliary.iter().any(|aux| aux.name == "CHANGELOG.md")
    }
}

/// Fetcher over a raw-content host (raw.githubusercontent.com in production,
/// an httpmock server in tests).
pub struct ContentFetcher {
    raw_base: String,
    client: reqwest::blocking::Client,
}

impl ContentFetcher {
    pub fn new(raw_base: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            raw_base: raw_base.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Fetch the primary file and any available auxiliary files.
    pub fn fetch(&self, source: &SourceRef) -> Result<FetchedSkill> {
        let (primary, branch_used) = self.fetch_primary(source)?;

        let mut auxiliary = Vec::new();
        for name in AUXILIARY_FILES {
            match self.fetch_file(source, &branch_used, name) {
                Ok(Some(content)) => auxiliary.push(AuxFile {
                    name: (*name).to_string(),
                    content,
                }),
                Ok(None) => debug!(file = name, "auxiliary file absent, skipping"),
                Err(err) => warn!(file = name, error = %err, "auxiliary fetch failed, skipping"),
            }
        }

        Ok(FetchedSkill {
            primary,
            auxiliary,
            branch_used,
        })
    }

    fn fetch_primary(&self, source: &SourceRef) -> Result<(String, String)> {
        match self.fetch_file(source, &source.branch, PRIMARY_FILE)? {
            Some(content) => return Ok((content, source.branch.clone())),
            None if source.branch == DEFAULT_BRANCH => {
                debug!(
                    owner = %source.owner,
                    repo = %source.repo,
                    "primary missing on '{DEFAULT_BRANCH}', retrying '{FALLBACK_BRANCH}'"
                );
            }
            None => {
                return Err(SkError::Fetch(format!(
                    "{PRIMARY_FILE} not found at {}/{} (branch '{}', path '{}')",
                    source.owner, source.repo, source.branch, source.path
                )));
            }
        }

        match self.fetch_file(source, FALLBACK_BRANCH, PRIMARY_FILE)? {
            Some(content) => Ok((content, FALLBACK_BRANCH.to_string())),
            None => Err(SkError::Fetch(format!(
                "{PRIMARY_FILE} not found at {}/{} on '{DEFAULT_BRANCH}' or '{FALLBACK_BRANCH}' (path '{}')",
                source.owner, source.repo, source.path
            ))),
        }
    }

    /// GET one file; `Ok(None)` on any non-2xx status.
    fn fetch_file(&self, source: &SourceRef, branch: &str, file: &str) -> Result<Option<String>> {
        let url = self.file_url(source, branch, file);
        debug!(url = %url, "fetching");

        let response = self.client.get(&url).send()?;
        if !response.status().is_success() {
            return Ok(None);
        }
        Ok(Some(response.text()?))
    }

    fn file_url(&self, source: &SourceRef, branch: &str, file: &str) -> String {
        // A path that already names a markdown file is itself the primary;
        // auxiliary files live beside it.
        if source.path.ends_with(".md") {
            if file == PRIMARY_FILE {
                return format!(
                    "{}/{}/{}/{branch}/{}",
                    self.raw_base, source.owner, source.repo, source.path
                );
            }
            let parent = source
                .path
                .rsplit_once('/')
                .map_or("", |(parent, _)| parent);
            return if parent.is_empty() {
                format!("{}/{}/{}/{branch}/{file}", self.raw_base, source.owner, source.repo)
            } else {
                format!(
                    "{}/{}/{}/{branch}/{parent}/{file}",
                    self.raw_base, source.owner, source.repo
                )
            };
        }

        if source.path.is_empty() {
            format!("{}/{}/{}/{branch}/{file}", self.raw_base, source.owner, source.repo)
        } else {
            format!(
                "{}/{}/{}/{branch}/{}/{file}",
                self.raw_base, source.owner, source.repo, source.path
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn source(path: &str, branch: &str) -> SourceRef {
        SourceRef {
            owner: "alice".to_string(),
            repo: "skills".to_string(),
            path: path.to_string(),
            branch: branch.to_string(),
        }
    }

    #[test]
    fn fetches_primary_and_auxiliary() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/alice/skills/main/rust-testing/SKILL.md");
            then.status(200).body("# Rust Testing\ncontent");
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/alice/skills/main/rust-testing/CHANGELOG.md");
            then.status(200).body("## 1.0.0");
        });

        let fetcher = ContentFetcher::new(server.base_url()).unwrap();
        let fetched = fetcher.fetch(&source("rust-testing", "main")).unwrap();
        assert!(fetched.primary.starts_with("# Rust Testing"));
        assert_eq!(fetched.branch_used, "main");
        assert_eq!(fetched.auxiliary.len(), 1);
        assert!(fetched.has_changelog());
    }

    #[test]
    fn falls_back_to_master_once() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/alice/skills/main/SKILL.md");
            then.status(404);
        });
        server.mock(|when, then| {
            when.method(GET).path("/alice/skills/master/SKILL.md");
            then.status(200).body("# Root Skill\ncontent");
        });

        let fetcher = ContentFetcher::new(server.base_url()).unwrap();
        let fetched = fetcher.fetch(&source("", "main")).unwrap();
        assert_eq!(fetched.branch_used, "master");
    }

    #[test]
    fn no_fallback_for_explicit_branch() {
        let server = MockServer::start();
        let miss = server.mock(|when, then| {
            when.method(GET).path("/alice/skills/dev/SKILL.md");
            then.status(404);
        });

        let fetcher = ContentFetcher::new(server.base_url()).unwrap();
        let err = fetcher.fetch(&source("", "dev")).unwrap_err();
        assert!(matches!(err, SkError::Fetch(_)));
        miss.assert_hits(1);
    }

    #[test]
    fn missing_primary_on_both_branches_fails() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.any_request();
            then.status(404);
        });

        let fetcher = ContentFetcher::new(server.base_url()).unwrap();
        let err = fetcher.fetch(&source("rust-testing", "main")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("master"));
    }

    #[test]
    fn md_path_is_the_primary_itself() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/alice/skills/main/docs/custom.md");
            then.status(200).body("# Custom\ncontent");
        });
        server.mock(|when, then| {
            when.method(GET).path("/alice/skills/main/docs/examples.md");
            then.status(200).body("examples");
        });

        let fetcher = ContentFetcher::new(server.base_url()).unwrap();
        let fetched = fetcher.fetch(&source("docs/custom.md", "main")).unwrap();
        assert!(fetched.primary.starts_with("# Custom"));
        assert_eq!(fetched.auxiliary.len(), 1);
        assert_eq!(fetched.auxiliary[0].name, "examples.md");
    }

    #[test]
    fn auxiliary_failure_is_silent() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/alice/skills/main/SKILL.md");
            then.status(200).body("# Skill\ncontent");
        });
        server.mock(|when, then| {
            when.any_request();
            then.status(500);
        });

        let fetcher = ContentFetcher::new(server.base_url()).unwrap();
        let fetched = fetcher.fetch(&source("", "main")).unwrap();
        assert!(fetched.auxiliary.is_empty());
    }
}
