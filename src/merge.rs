//! Local-edit detection and three-way content reconciliation.
//!
//! Modification detection is a pure function of two hashes plus file
//! presence; no semantic inspection. The three-way merge compares lines by
//! position against the install-time base. This positional diff (rather than
//! an LCS diff) is a known approximation: asymmetric insertions between
//! local and upstream will misalign, and that behavior is deliberate.

use std::path::Path;

use crate::error::Result;
use crate::utils::sha256_hex;

/// Result of comparing the installed file against its recorded hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModificationStatus {
    pub modified: bool,
    /// Hash of the file as it is now; empty when the file is missing.
    pub current_hash: String,
}

/// Re-hash the installed primary file and compare against the hash recorded
/// at install time. A missing file counts as modified (a local deletion).
pub fn detect_modifications(path: &Path, recorded_hash: &str) -> Result<ModificationStatus> {
    match std::fs::read_to_string(path) {
        Ok(current) => {
            let current_hash = sha256_hex(&current);
            Ok(ModificationStatus {
                modified: current_hash != recorded_hash,
                current_hash,
            })
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(ModificationStatus {
            modified: true,
            current_hash: String::new(),
        }),
        Err(err) => Err(err.into()),
    }
}

/// One position where local and upstream both diverged from base with
/// different results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConflict {
    /// 1-based line number in the base.
    pub line_number: usize,
    pub local: String,
    pub upstream: String,
    pub base: String,
}

/// Merge output. Conflicts are a structured result, not an error; the
/// caller chooses what to do with a partial merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    pub success: bool,
    /// Merged content; contains conflict markers when `success` is false.
    pub merged: String,
    pub conflicts: Vec<MergeConflict>,
}

const LOCAL_MARKER: &str = "<<<<<<< LOCAL";
const SEPARATOR_MARKER: &str = "=======";
const UPSTREAM_MARKER: &str = ">>>>>>> UPSTREAM";

/// Positional line-by-line three-way merge of `(base, local, upstream)`.
#[must_use]
pub fn three_way_merge(base: &str, local: &str, upstream: &str) -> MergeResult {
    if base.is_empty() {
        return merge_without_history(local, upstream);
    }

    let base_lines: Vec<&str> = split_lines(base);
    let local_lines: Vec<&str> = split_lines(local);
    let upstream_lines: Vec<&str> = split_lines(upstream);
    let max_len = base_lines
        .len()
        .max(local_lines.len())
        .max(upstream_lines.len());

    let mut merged: Vec<String> = Vec::with_capacity(max_len);
    let mut conflicts = Vec::new();

    for index in 0..max_len {
        let base_line = base_lines.get(index).copied();
        let local_line = local_lines.get(index).copied();
        let upstream_line = upstream_lines.get(index).copied();

        let local_changed = local_line != base_line;
        let upstream_changed = upstream_line != base_line;

        match (local_changed, upstream_changed) {
            (false, false) => {
                if let Some(line) = base_line {
                    merged.push(line.to_string());
                }
            }
            (true, false) => {
                // A None on the changed side is a deletion: omit the line.
                if let Some(line) = local_line {
                    merged.push(line.to_string());
                }
            }
            (false, true) => {
                if let Some(line) = upstream_line {
                    merged.push(line.to_string());
                }
            }
            (true, true) if local_line == upstream_line => {
                if let Some(line) = local_line {
                    merged.push(line.to_string());
                }
            }
            (true, true) => {
                conflicts.push(MergeConflict {
                    line_number: index + 1,
                    local: local_line.unwrap_or_default().to_string(),
                    upstream: upstream_line.unwrap_or_default().to_string(),
                    base: base_line.unwrap_or_default().to_string(),
                });
                merged.push(LOCAL_MARKER.to_string());
                if let Some(line) = local_line {
                    merged.push(line.to_string());
                }
                merged.push(SEPARATOR_MARKER.to_string());
                if let Some(line) = upstream_line {
                    merged.push(line.to_string());
                }
                merged.push(UPSTREAM_MARKER.to_string());
            }
        }
    }

    let mut output = merged.join("\n");
    if ends_with_newline(base, local, upstream) && !output.is_empty() {
        output.push('\n');
    }

    MergeResult {
        success: conflicts.is_empty(),
        merged: output,
        conflicts,
    }
}

/// Degenerate empty-base case: with no common history, content on exactly
/// one side wins outright; content on both sides is a single whole-content
/// conflict rather than a line-by-line one.
fn merge_without_history(local: &str, upstream: &str) -> MergeResult {
    if local == upstream {
        return MergeResult {
            success: true,
            merged: local.to_string(),
            conflicts: Vec::new(),
        };
    }
    if local.is_empty() {
        return MergeResult {
            success: true,
            merged: upstream.to_string(),
            conflicts: Vec::new(),
        };
    }
    if upstream.is_empty() {
        return MergeResult {
            success: true,
            merged: local.to_string(),
            conflicts: Vec::new(),
        };
    }

    // Trailing newlines would open a blank line before the next marker.
    let local_body = local.strip_suffix('\n').unwrap_or(local);
    let upstream_body = upstream.strip_suffix('\n').unwrap_or(upstream);
    let merged = format!(
        "{LOCAL_MARKER}\n{local_body}\n{SEPARATOR_MARKER}\n{upstream_body}\n{UPSTREAM_MARKER}\n"
    );
    MergeResult {
        success: false,
        merged,
        conflicts: vec![MergeConflict {
            line_number: 1,
            local: local.to_string(),
            upstream: upstream.to_string(),
            base: String::new(),
        }],
    }
}

fn split_lines(content: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = content.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines
}

fn ends_with_newline(base: &str, local: &str, upstream: &str) -> bool {
    base.ends_with('\n') || local.ends_with('\n') || upstream.ends_with('\n')
}
