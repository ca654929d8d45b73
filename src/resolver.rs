//! Skill identifier resolution and source URL parsing.
//!
//! A raw identifier is classified as either a registry key (`author/name`,
//! exactly two segments) or a direct GitHub source (full URL or a path with
//! three or more segments). A two-segment string is structurally ambiguous
//! between "registry author/skill" and "GitHub owner/repo at its root", so
//! classification defers the decision to the registry lookup rather than
//! guessing.

use crate::error::{Result, SkError};

/// Hosts accepted for resolved sources. Anything else is a hard rejection:
/// these URLs are used verbatim to construct outbound fetch requests.
const ALLOWED_HOSTS: &[&str] = &["github.com", "www.github.com"];

/// Conventional default branch, tried first when the source names none.
pub const DEFAULT_BRANCH: &str = "main";
/// Alternate conventional branch, tried once on a fetch miss.
pub const FALLBACK_BRANCH: &str = "master";

/// A fully resolved GitHub source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub owner: String,
    pub repo: String,
    /// Path inside the repo; empty for a repo-root skill.
    pub path: String,
    pub branch: String,
}

impl SourceRef {
    /// Canonical `https://github.com/...` form, used as the manifest source.
    #[must_use]
    pub fn canonical_url(&self) -> String {
        if self.path.is_empty() {
            format!("https://github.com/{}/{}", self.owner, self.repo)
        } else {
            format!(
                "https://github.com/{}/{}/tree/{}/{}",
                self.owner, self.repo, self.branch, self.path
            )
        }
    }
}

/// Classification of a raw skill identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkillLocator {
    /// Two-segment `author/name` key requiring a registry lookup.
    Registry { author: String, name: String },
    /// Directly fetchable source.
    Direct(SourceRef),
}

/// Classify a raw identifier. Bare strings with no slash are rejected:
/// registry lookups require at least one slash.
pub fn classify_identifier(raw: &str) -> Result<SkillLocator> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(SkError::Format("empty identifier".to_string()));
    }

    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Ok(SkillLocator::Direct(parse_source_url(raw)?));
    }

    let segments: Vec<&str> = raw
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();

    match segments.len() {
        0 | 1 => Err(SkError::Format(format!(
            "'{raw}' has no path separator; expected author/name or owner/repo/path"
        ))),
        2 => Ok(SkillLocator::Registry {
            author: segments[0].to_string(),
            name: segments[1].to_string(),
        }),
        _ => Ok(SkillLocator::Direct(SourceRef {
            owner: segments[0].to_string(),
            repo: segments[1].to_string(),
            path: segments[2..].join("/"),
            branch: DEFAULT_BRANCH.to_string(),
        })),
    }
}

/// Decompose a resolved source URL into `{owner, repo, path, branch}`.
///
/// Supported shapes after `github.com/owner/repo`:
/// - nothing (repo root, default branch)
/// - `tree/<branch>/<path>` and `blob/<branch>/<path>`
/// - anything else: treated as `path`, default branch
///
/// The hostname is validated against the allow-list before any parsing.
pub fn parse_source_url(url: &str) -> Result<SourceRef> {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| SkError::InvalidSourceUrl(format!("not an http(s) URL: {url}")))?;

    let (host, rest) = stripped.split_once('/').unwrap_or((stripped, ""));
    let host = host.split(':').next().unwrap_or(host).to_ascii_lowercase();
    if !ALLOWED_HOSTS.contains(&host.as_str()) {
        return Err(SkError::InvalidSourceUrl(format!(
            "host '{host}' is not allowed; only github.com sources are accepted"
        )));
    }

    let rest = rest.split(['?', '#']).next().unwrap_or(rest);
    let segments: Vec<&str> = rest
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.len() < 2 {
        return Err(SkError::InvalidSourceUrl(format!(
            "missing owner/repo segments: {url}"
        )));
    }

    let owner = segments[0].to_string();
    let repo = segments[1].trim_end_matches(".git").to_string();
    let tail = &segments[2..];

    let (branch, path) = match tail.first() {
        None => (DEFAULT_BRANCH.to_string(), String::new()),
        Some(&"tree" | &"blob") => {
            let Some(branch) = tail.get(1) else {
                return Err(SkError::InvalidSourceUrl(format!(
                    "missing branch after tree/blob: {url}"
                )));
            };
            ((*branch).to_string(), tail[2..].join("/"))
        }
        Some(_) => (DEFAULT_BRANCH.to_string(), tail.join("/")),
    };

    Ok(SourceRef {
        owner,
        repo,
        path,
        branch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_string_is_rejected() {
        let err = classify_identifier("just-a-name").unwrap_err();
        assert!(matches!(err, SkError::Format(_)));
    }

    #[test]
    fn empty_identifier_is_rejected() {
        assert!(classify_identifier("  ").is_err());
    }

    #[test]
    fn two_segments_is_registry_key() {
        let locator = classify_identifier("alice/rust-testing").unwrap();
        assert_eq!(
            locator,
            SkillLocator::Registry {
                author: "alice".to_string(),
                name: "rust-testing".to_string(),
            }
        );
    }

    #[test]
    fn three_segments_is_direct() {
        let locator = classify_identifier("alice/skills/rust-testing").unwrap();
        let SkillLocator::Direct(source) = locator else {
            panic!("expected direct source");
        };
        assert_eq!(source.owner, "alice");
        assert_eq!(source.repo, "skills");
        assert_eq!(source.path, "rust-testing");
        assert_eq!(source.branch, DEFAULT_BRANCH);
    }

    #[test]
    fn full_url_is_direct() {
        let locator =
            classify_identifier("https://github.com/alice/skills/tree/dev/rust-testing").unwrap();
        let SkillLocator::Direct(source) = locator else {
            panic!("expected direct source");
        };
        assert_eq!(source.branch, "dev");
        assert_eq!(source.path, "rust-testing");
    }

    #[test]
    fn parse_url_repo_root() {
        let source = parse_source_url("https://github.com/alice/skills").unwrap();
        assert_eq!(source.owner, "alice");
        assert_eq!(source.repo, "skills");
        assert_eq!(source.path, "");
        assert_eq!(source.branch, DEFAULT_BRANCH);
    }

    #[test]
    fn parse_url_blob_form() {
        let source =
            parse_source_url("https://github.com/alice/skills/blob/main/rust/SKILL.md").unwrap();
        assert_eq!(source.branch, "main");
        assert_eq!(source.path, "rust/SKILL.md");
    }

    #[test]
    fn parse_url_plain_path_defaults_branch() {
        let source = parse_source_url("https://github.com/alice/skills/rust-testing").unwrap();
        assert_eq!(source.branch, DEFAULT_BRANCH);
        assert_eq!(source.path, "rust-testing");
    }

    #[test]
    fn parse_url_rejects_foreign_host() {
        let err = parse_source_url("https://gitlab.com/alice/skills").unwrap_err();
        assert!(matches!(err, SkError::InvalidSourceUrl(_)));
        // Lookalike hosts are rejected too.
        assert!(parse_source_url("https://github.com.evil.com/a/b").is_err());
    }

    #[test]
    fn parse_url_accepts_www_and_case() {
        assert!(parse_source_url("https://www.github.com/alice/skills").is_ok());
        assert!(parse_source_url("https://GitHub.com/alice/skills").is_ok());
    }

    #[test]
    fn parse_url_strips_git_suffix_and_query() {
        let source = parse_source_url("https://github.com/alice/skills.git?tab=readme").unwrap();
        assert_eq!(source.repo, "skills");
        assert_eq!(source.path, "");
    }

    #[test]
    fn canonical_url_round_trip() {
        let source = SourceRef {
            owner: "alice".to_string(),
            repo: "skills".to_string(),
            path: "rust-testing".to_string(),
            branch: "main".to_string(),
        };
        let parsed = parse_source_url(&source.canonical_url()).unwrap();
        assert_eq!(parsed, source);
    }
}
