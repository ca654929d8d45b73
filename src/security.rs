//! Security gate for fetched skill content.
//!
//! Scanning is delegated to a [`ContentScanner`] collaborator; this module
//! only consumes the pass/fail verdict and severity classification. Any
//! critical- or high-severity finding in the primary content blocks the
//! install unless an explicit bypass flag is set (and logged). Auxiliary
//! files that fail the scan are dropped from the install rather than
//! blocking it: they are supplementary, the primary definition is not.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SkError};
use crate::fetcher::AuxFile;

/// Finding severity, ordered from worst to least.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

impl Severity {
    /// Parse a stored severity string; unknown strings rank lowest.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "critical" => Self::Critical,
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// One scanner finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

/// Scanner verdict for one piece of content.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub passed: bool,
    pub findings: Vec<Finding>,
}

impl ScanReport {
    fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|finding| finding.severity == severity)
            .count()
    }

    /// Whether any finding is severe enough to block an install.
    #[must_use]
    pub fn has_blocking_findings(&self) -> bool {
        self.findings
            .iter()
            .any(|finding| finding.severity <= Severity::High)
    }

    /// Severity-weighted score; update classification compares the score
    /// before and after an upstream change.
    #[must_use]
    pub fn risk_score(&self) -> f64 {
        self.findings
            .iter()
            .map(|finding| match finding.severity {
                Severity::Critical => 5.0,
                Severity::High => 3.0,
                Severity::Medium => 1.0,
                Severity::Low => 0.5,
            })
            .sum()
    }
}

/// External scanning collaborator contract.
pub trait ContentScanner {
    fn scan(&self, id: &str, content: &str) -> ScanReport;
}

static INJECTION_PATTERNS: Lazy<Vec<(Regex, Severity, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new("(?i)ignore (all|any|previous) instructions").unwrap(),
            Severity::Critical,
            "prompt injection: instruction override",
        ),
        (
            Regex::new("(?i)disregard (all|any|previous) instructions").unwrap(),
            Severity::Critical,
            "prompt injection: instruction override",
        ),
        (
            Regex::new("(?i)exfiltrate").unwrap(),
            Severity::Critical,
            "data exfiltration directive",
        ),
        (
            Regex::new(r"(?i)curl\s+[^\n]*\|\s*(ba)?sh").unwrap(),
            Severity::High,
            "pipe-to-shell command",
        ),
        (
            Regex::new(r"(?i)rm\s+-rf\s+[~/]").unwrap(),
            Severity::High,
            "destructive filesystem command",
        ),
        (
            Regex::new("(?i)reveal (the )?system prompt").unwrap(),
            Severity::High,
            "system prompt extraction",
        ),
        (
            Regex::new(r"(?i)(api[-_ ]?key|access[-_ ]?token|password)\s*[:=]\s*\S+").unwrap(),
            Severity::Medium,
            "credential-like assignment",
        ),
        (
            Regex::new(r"<script[\s>]").unwrap(),
            Severity::Low,
            "embedded script tag",
        ),
    ]
});

/// Built-in pattern scanner used as the default collaborator.
#[derive(Debug, Default)]
pub struct PatternScanner;

impl ContentScanner for PatternScanner {
    fn scan(&self, id: &str, content: &str) -> ScanReport {
        let mut findings = Vec::new();
        for (pattern, severity, label) in INJECTION_PATTERNS.iter() {
            if pattern.is_match(content) {
                findings.push(Finding {
                    severity: *severity,
                    message: format!("{label} in {id}"),
                });
            }
        }
        ScanReport {
            passed: !findings
                .iter()
                .any(|finding| finding.severity <= Severity::High),
            findings,
        }
    }
}

/// Gate policy over a scanner collaborator.
pub struct SecurityGate<'a> {
    scanner: &'a dyn ContentScanner,
    bypass: bool,
}

impl<'a> SecurityGate<'a> {
    #[must_use]
    pub fn new(scanner: &'a dyn ContentScanner, bypass: bool) -> Self {
        Self { scanner, bypass }
    }

    /// Gate the primary content; blocking findings are fatal unless bypassed.
    pub fn check_primary(&self, skill: &str, content: &str) -> Result<ScanReport> {
        let report = self.scanner.scan(skill, content);
        debug!(skill, findings = report.findings.len(), passed = report.passed, "scanned primary");

        if !report.passed || report.has_blocking_findings() {
            if self.bypass {
                warn!(
                    skill,
                    findings = report.findings.len(),
                    "SECURITY BYPASS: installing despite blocking findings"
                );
                return Ok(report);
            }
            return Err(SkError::SecurityBlocked {
                skill: skill.to_string(),
                critical: report.count(Severity::Critical),
                high: report.count(Severity::High),
                total: report.findings.len(),
            });
        }
        Ok(report)
    }

    /// Scan auxiliary files independently; failing files are dropped.
    #[must_use]
    pub fn filter_auxiliary(&self, skill: &str, files: Vec<AuxFile>) -> Vec<AuxFile> {
        files
            .into_iter()
            .filter(|file| {
                let id = format!("{skill}/{}", file.name);
                let report = self.scanner.scan(&id, &file.content);
                if report.passed && !report.has_blocking_findings() {
                    true
                } else {
                    warn!(
                        skill,
                        file = %file.name,
                        findings = report.findings.len(),
                        "dropping auxiliary file after failed scan"
                    );
                    false
                }
            })
            .collect()
    }
}
