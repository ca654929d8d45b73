//! Structural validation of fetched skill content.

use crate::error::{Result, SkError};

/// Minimum primary content length in bytes. Anything shorter cannot be a
/// usable skill definition.
pub const MIN_CONTENT_LENGTH: usize = 100;

/// Check structural minimums; every violation is collected, not just the
/// first, so the user can fix them all in one pass.
#[must_use]
pub fn check_content(content: &str) -> Vec<String> {
    let mut violations = Vec::new();

    let has_heading = content
        .lines()
        .any(|line| line.starts_with("# ") || line == "#");
    if !has_heading {
        violations.push("missing top-level heading ('# ...')".to_string());
    }

    if content.len() <= MIN_CONTENT_LENGTH {
        violations.push(format!(
            "content too short: {} bytes (minimum {})",
            content.len(),
            MIN_CONTENT_LENGTH
        ));
    }

    violations
}

/// Validate or fail with the full violation list.
pub fn validate_content(content: &str) -> Result<()> {
    let violations = check_content(content);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(SkError::Validation(violations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_content() -> String {
        format!("# A Real Skill\n\n{}\n", "Useful guidance. ".repeat(10))
    }

    #[test]
    fn valid_content_passes() {
        assert!(validate_content(&valid_content()).is_ok());
    }

    #[test]
    fn heading_after_frontmatter_counts() {
        let content = format!("---\nversion: 1.0.0\n---\n{}", valid_content());
        assert!(validate_content(&content).is_ok());
    }

    #[test]
    fn missing_heading_is_reported() {
        let content = "No heading here. ".repeat(20);
        let violations = check_content(&content);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("heading"));
    }

    #[test]
    fn all_violations_reported_together() {
        let violations = check_content("too short, no heading");
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn deeper_headings_do_not_satisfy_top_level() {
        let content = format!("## Only second level\n{}", "filler text ".repeat(20));
        let violations = check_content(&content);
        assert_eq!(violations.len(), 1);
    }
}
