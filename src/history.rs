//! Version history, advisories, and update recommendations.
//!
//! The history store is append-only: version records are never rewritten,
//! and advisories are only ever marked withdrawn (kept for audit trail).
//! The oldest record for a skill stands in for "what the user has
//! installed"; the newest is "what the registry currently publishes".
//!
//! Change classification works at section level: headings are extracted at
//! depths one and two, and sections are diffed as added/removed/modified
//! (bodies compared verbatim). The update recommendation is an explicit
//! ordered decision table over the classification, risk delta, local
//! modification state, source trust, and changelog presence.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::registry::TrustLevel;
use crate::security::Severity;

/// One append-only version record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub skill_id: String,
    pub content_hash: String,
    pub semver: String,
    pub recorded_at: DateTime<Utc>,
}

/// A published security advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub id: String,
    pub skill_id: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub patched_versions: Option<Vec<String>>,
}

/// Severity-bucketed counts of active advisories. `advisories_available`
/// distinguishes "nothing published yet" from "checked, found nothing".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvisorySummary {
    pub advisories_available: bool,
    pub total: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub advisories: Vec<Advisory>,
}

/// SQLite-backed history store.
pub struct HistoryDb {
    conn: Connection,
}

impl std::fmt::Debug for HistoryDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryDb").finish_non_exhaustive()
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS skill_versions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    skill_id TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    semver TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_versions_skill ON skill_versions(skill_id, recorded_at);

CREATE TABLE IF NOT EXISTS advisories (
    id TEXT PRIMARY KEY,
    skill_id TEXT NOT NULL,
    severity TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    published_at TEXT NOT NULL,
    patched_versions TEXT,
    withdrawn INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_advisories_skill ON advisories(skill_id);
";

impl HistoryDb {
    /// Open (and create if needed) the history database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Open an in-memory store (tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    // ------------------------------------------------------------------
    // Version records
    // ------------------------------------------------------------------

    /// Append a version record. Never updates existing rows.
    pub fn record_version(&self, record: &VersionRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO skill_versions (skill_id, content_hash, semver, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.skill_id,
                record.content_hash,
                record.semver,
                record.recorded_at.to_rfc3339(),
            ],
        )?;
        debug!(skill = %record.skill_id, semver = %record.semver, "recorded version");
        Ok(())
    }

    /// Newest record: what the registry currently publishes.
    pub fn latest_version(&self, skill_id: &str) -> Result<Option<VersionRecord>> {
        self.version_at_edge(skill_id, "DESC")
    }

    /// Oldest record: a proxy for what the user currently has installed.
    pub fn oldest_version(&self, skill_id: &str) -> Result<Option<VersionRecord>> {
        self.version_at_edge(skill_id, "ASC")
    }

    fn version_at_edge(&self, skill_id: &str, order: &str) -> Result<Option<VersionRecord>> {
        let sql = format!(
            "SELECT skill_id, content_hash, semver, recorded_at FROM skill_versions
             WHERE skill_id = ?1 ORDER BY recorded_at {order}, id {order} LIMIT 1"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![skill_id], version_from_row)?;
        rows.next().transpose().map_err(Into::into)
    }

    /// All records for a skill, newest first.
    pub fn versions_for(&self, skill_id: &str) -> Result<Vec<VersionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT skill_id, content_hash, semver, recorded_at FROM skill_versions
             WHERE skill_id = ?1 ORDER BY recorded_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![skill_id], version_from_row)?;
        rows.collect::<std::result::Result<_, _>>().map_err(Into::into)
    }

    // ------------------------------------------------------------------
    // Advisories
    // ------------------------------------------------------------------

    /// Publish an advisory. The id is generated when empty.
    pub fn publish_advisory(&self, advisory: &Advisory) -> Result<String> {
        let id = if advisory.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            advisory.id.clone()
        };
        let patched = advisory
            .patched_versions
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn.execute(
            "INSERT INTO advisories
             (id, skill_id, severity, title, description, published_at, patched_versions)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                advisory.skill_id,
                advisory.severity.to_string(),
                advisory.title,
                advisory.description,
                advisory.published_at.to_rfc3339(),
                patched,
            ],
        )?;
        Ok(id)
    }

    /// Withdraw an advisory: excluded from active queries, kept in storage.
    pub fn withdraw_advisory(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("UPDATE advisories SET withdrawn = 1 WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Active advisories, optionally restricted to a set of skills.
    pub fn active_advisories(&self, skills: Option<&[String]>) -> Result<Vec<Advisory>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, skill_id, severity, title, description, published_at, patched_versions
             FROM advisories WHERE withdrawn = 0 ORDER BY published_at DESC",
        )?;
        let rows = stmt.query_map([], advisory_from_row)?;
        let mut advisories: Vec<Advisory> = rows.collect::<std::result::Result<_, _>>()?;
        if let Some(skills) = skills {
            advisories.retain(|advisory| skills.contains(&advisory.skill_id));
        }
        Ok(advisories)
    }

    fn advisory_store_is_empty(&self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM advisories", [], |row| row.get(0))?;
        Ok(count == 0)
    }

    /// Severity-bucketed summary of active advisories.
    pub fn advisory_summary(&self, skills: Option<&[String]>) -> Result<AdvisorySummary> {
        if self.advisory_store_is_empty()? {
            return Ok(AdvisorySummary {
                advisories_available: false,
                total: 0,
                by_severity: BTreeMap::new(),
                advisories: Vec::new(),
            });
        }

        let advisories = self.active_advisories(skills)?;
        let mut by_severity = BTreeMap::new();
        for advisory in &advisories {
            *by_severity.entry(advisory.severity.to_string()).or_insert(0) += 1;
        }
        Ok(AdvisorySummary {
            advisories_available: true,
            total: advisories.len(),
            by_severity,
            advisories,
        })
    }
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<VersionRecord> {
    let recorded_at: String = row.get(3)?;
    Ok(VersionRecord {
        skill_id: row.get(0)?,
        content_hash: row.get(1)?,
        semver: row.get(2)?,
        recorded_at: parse_rfc3339(&recorded_at),
    })
}

fn advisory_from_row(row: &Row<'_>) -> rusqlite::Result<Advisory> {
    let severity: String = row.get(2)?;
    let published_at: String = row.get(5)?;
    let patched: Option<String> = row.get(6)?;
    Ok(Advisory {
        id: row.get(0)?,
        skill_id: row.get(1)?,
        severity: Severity::parse(&severity),
        title: row.get(3)?,
        description: row.get(4)?,
        published_at: parse_rfc3339(&published_at),
        patched_versions: patched.and_then(|raw| serde_json::from_str(&raw).ok()),
    })
}

fn parse_rfc3339(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or_default()
}

// ----------------------------------------------------------------------
// Section-level change classification
// ----------------------------------------------------------------------

/// Classified magnitude of a content change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Major,
    Minor,
    Patch,
    Unknown,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Patch => write!(f, "patch"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Section-level difference between two versions of a skill.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

/// Extract `(heading, body)` pairs at heading depths 1 and 2. Deeper
/// headings belong to the enclosing section's body.
#[must_use]
pub fn extract_sections(content: &str) -> Vec<(String, String)> {
    let mut sections: Vec<(String, String)> = Vec::new();
    for line in content.lines() {
        let heading = line
            .strip_prefix("## ")
            .or_else(|| line.strip_prefix("# "));
        if let Some(title) = heading {
            sections.push((title.trim().to_string(), String::new()));
        } else if let Some((_, body)) = sections.last_mut() {
            body.push_str(line);
            body.push('\n');
        }
    }
    sections
}

/// Diff sections by heading. A heading only in `new` is added, only in
/// `old` is removed, in both with differing body text is modified (bodies
/// compared verbatim, not diffed further).
#[must_use]
pub fn diff_sections(old: &str, new: &str) -> SectionDiff {
    let old_sections: BTreeMap<String, String> = extract_sections(old).into_iter().collect();
    let new_sections: BTreeMap<String, String> = extract_sections(new).into_iter().collect();

    let mut diff = SectionDiff::default();
    for (heading, body) in &new_sections {
        match old_sections.get(heading) {
            None => diff.added.push(heading.clone()),
            Some(old_body) if old_body != body => diff.modified.push(heading.clone()),
            Some(_) => {}
        }
    }
    for heading in old_sections.keys() {
        if !new_sections.contains_key(heading) {
            diff.removed.push(heading.clone());
        }
    }
    diff
}

/// Risk-score increase at or above this counts as a major change.
pub const MAJOR_RISK_DELTA: f64 = 3.0;

/// Classify a change from section structure plus optional risk scores.
#[must_use]
pub fn classify_change(
    old: &str,
    new: &str,
    risk_before: Option<f64>,
    risk_after: Option<f64>,
) -> ChangeKind {
    let diff = diff_sections(old, new);
    let no_structure = extract_sections(old).is_empty() && extract_sections(new).is_empty();
    if no_structure {
        return ChangeKind::Unknown;
    }

    let risk_delta = match (risk_before, risk_after) {
        (Some(before), Some(after)) => after - before,
        _ => 0.0,
    };

    if !diff.removed.is_empty() || risk_delta >= MAJOR_RISK_DELTA {
        ChangeKind::Major
    } else if !diff.added.is_empty() {
        ChangeKind::Minor
    } else {
        ChangeKind::Patch
    }
}

// ----------------------------------------------------------------------
// Update recommendation decision table
// ----------------------------------------------------------------------

/// Recommended handling for a pending update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateAction {
    AutoUpdate,
    ReviewThenUpdate,
    ManualReviewRequired,
}

impl std::fmt::Display for UpdateAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AutoUpdate => write!(f, "auto-update"),
            Self::ReviewThenUpdate => write!(f, "review-then-update"),
            Self::ManualReviewRequired => write!(f, "manual-review-required"),
        }
    }
}

/// Inputs to the recommendation policy.
#[derive(Debug, Clone, Copy)]
pub struct UpdateSignals {
    pub change: ChangeKind,
    pub risk_increased: bool,
    pub locally_modified: bool,
    pub trust: TrustLevel,
    pub changelog_present: bool,
}

/// One row of the decision table. `None` matches anything; `trust_at_most`
/// matches trust levels at least as strong as the named one.
#[derive(Debug, Clone, Copy)]
struct PolicyRule {
    change: Option<ChangeKind>,
    risk_increased: Option<bool>,
    locally_modified: Option<bool>,
    trust_at_most: Option<TrustLevel>,
    changelog_present: Option<bool>,
    action: UpdateAction,
}

impl PolicyRule {
    fn matches(&self, signals: &UpdateSignals) -> bool {
        self.change.is_none_or(|change| change == signals.change)
            && self.risk_increased.is_none_or(|risk| risk == signals.risk_increased)
            && self
                .locally_modified
                .is_none_or(|modified| modified == signals.locally_modified)
            && self.trust_at_most.is_none_or(|trust| signals.trust <= trust)
            && self
                .changelog_present
                .is_none_or(|changelog| changelog == signals.changelog_present)
    }
}

const ANY: PolicyRule = PolicyRule {
    change: None,
    risk_increased: None,
    locally_modified: None,
    trust_at_most: None,
    changelog_present: None,
    action: UpdateAction::ManualReviewRequired,
};

/// Ordered decision table; first match wins, falling through to
/// manual-review-required.
const POLICY: &[PolicyRule] = &[
    PolicyRule {
        change: Some(ChangeKind::Unknown),
        ..ANY
    },
    PolicyRule {
        locally_modified: Some(true),
        risk_increased: Some(true),
        ..ANY
    },
    PolicyRule {
        change: Some(ChangeKind::Major),
        locally_modified: Some(true),
        ..ANY
    },
    PolicyRule {
        change: Some(ChangeKind::Major),
        risk_increased: Some(true),
        ..ANY
    },
    PolicyRule {
        change: Some(ChangeKind::Patch),
        risk_increased: Some(false),
        locally_modified: Some(false),
        trust_at_most: Some(TrustLevel::Verified),
        changelog_present: Some(true),
        action: UpdateAction::AutoUpdate,
        ..ANY
    },
    PolicyRule {
        change: Some(ChangeKind::Major),
        action: UpdateAction::ReviewThenUpdate,
        ..ANY
    },
    PolicyRule {
        locally_modified: Some(true),
        action: UpdateAction::ReviewThenUpdate,
        ..ANY
    },
    PolicyRule {
        trust_at_most: Some(TrustLevel::Community),
        action: UpdateAction::ReviewThenUpdate,
        ..ANY
    },
];

/// Evaluate the decision table.
#[must_use]
pub fn recommend_update(signals: &UpdateSignals) -> UpdateAction {
    POLICY
        .iter()
        .find(|rule| rule.matches(signals))
        .map_or(UpdateAction::ManualReviewRequired, |rule| rule.action)
}
