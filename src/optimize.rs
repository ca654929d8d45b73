//! Best-effort decomposition of oversized skill content.
//!
//! Large skills are split into a reduced main file plus on-demand sub-files,
//! with a companion subagent file and an integration snippet. The outcome is
//! a sum type, never an error: any internal failure logs a warning and the
//! original content passes through unchanged. Optimization must never fail
//! an installation.

use tracing::{debug, warn};

/// Content below this size is left alone.
pub const OPTIMIZE_THRESHOLD: usize = 10_000;

/// A sub-file produced by decomposition, loaded on demand by the assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubFile {
    pub name: String,
    pub content: String,
}

/// A successfully decomposed skill.
#[derive(Debug, Clone)]
pub struct OptimizedSkill {
    /// Reduced main file: frontmatter, title, overview, sub-file index.
    pub main: String,
    pub sub_files: Vec<SubFile>,
    /// Companion delegation file for running the skill in a subagent.
    pub subagent: String,
    /// Snippet the user can paste to wire the subagent in.
    pub integration_snippet: String,
}

/// Result-or-original union; callers pattern-match instead of catching.
#[derive(Debug, Clone)]
pub enum OptimizeOutcome {
    Optimized(OptimizedSkill),
    Unchanged,
}

/// Attempt decomposition. Never fails; undersized or undivisible content
/// comes back as [`OptimizeOutcome::Unchanged`].
#[must_use]
pub fn optimize_content(skill_name: &str, content: &str) -> OptimizeOutcome {
    if content.len() < OPTIMIZE_THRESHOLD {
        return OptimizeOutcome::Unchanged;
    }

    match decompose(skill_name, content) {
        Some(optimized) => {
            debug!(
                skill = skill_name,
                sub_files = optimized.sub_files.len(),
                "decomposed oversized skill"
            );
            OptimizeOutcome::Optimized(optimized)
        }
        None => {
            warn!(
                skill = skill_name,
                "optimization not applicable, keeping content unchanged"
            );
            OptimizeOutcome::Unchanged
        }
    }
}

fn decompose(skill_name: &str, content: &str) -> Option<OptimizedSkill> {
    let mut preamble = String::new();
    let mut sections: Vec<(String, String)> = Vec::new();

    for line in content.lines() {
        if let Some(title) = line.strip_prefix("## ") {
            sections.push((title.trim().to_string(), String::new()));
        } else if let Some((_, body)) = sections.last_mut() {
            body.push_str(line);
            body.push('\n');
        } else {
            preamble.push_str(line);
            preamble.push('\n');
        }
    }

    // One section or none: splitting would not reduce anything.
    if sections.len() < 2 {
        return None;
    }

    let mut main = preamble;
    main.push_str("\n## Detail files\n\n");
    main.push_str("Load these on demand instead of reading everything up front:\n\n");

    let mut sub_files = Vec::with_capacity(sections.len());
    for (title, body) in &sections {
        let slug = slugify(title);
        if slug.is_empty() {
            return None;
        }
        let name = format!("{slug}.md");
        main.push_str(&format!("- `{name}` - {title}\n"));
        sub_files.push(SubFile {
            name,
            content: format!("## {title}\n{body}"),
        });
    }

    let subagent = format!(
        "---\nname: {skill_name}-runner\ndescription: Delegated executor for the {skill_name} skill\n---\n\n\
         # {skill_name} runner\n\n\
         Read `{skill_name}/SKILL.md`, then load only the detail files the task needs.\n"
    );
    let integration_snippet = format!(
        "Use the {skill_name}-runner subagent for tasks covered by the {skill_name} skill."
    );

    Some(OptimizedSkill {
        main,
        sub_files,
        subagent,
        integration_snippet,
    })
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if (ch == ' ' || ch == '-' || ch == '_') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big_skill() -> String {
        let mut content = String::from("# Big Skill\n\nOverview paragraph.\n\n");
        for i in 0..4 {
            content.push_str(&format!("## Section {i}\n\n{}\n", "body text ".repeat(400)));
        }
        content
    }

    #[test]
    fn small_content_is_unchanged() {
        let outcome = optimize_content("small", "# Small\nshort");
        assert!(matches!(outcome, OptimizeOutcome::Unchanged));
    }

    #[test]
    fn large_content_is_decomposed() {
        let outcome = optimize_content("big", &big_skill());
        let OptimizeOutcome::Optimized(optimized) = outcome else {
            panic!("expected decomposition");
        };
        assert_eq!(optimized.sub_files.len(), 4);
        assert!(optimized.main.contains("section-0.md"));
        assert!(optimized.main.len() < big_skill().len());
        assert!(optimized.subagent.contains("big-runner"));
        assert!(optimized.integration_snippet.contains("big"));
    }

    #[test]
    fn sub_files_keep_their_bodies() {
        let OptimizeOutcome::Optimized(optimized) = optimize_content("big", &big_skill()) else {
            panic!("expected decomposition");
        };
        assert!(optimized.sub_files[0].content.starts_with("## Section 0"));
        assert!(optimized.sub_files[0].content.contains("body text"));
    }

    #[test]
    fn single_section_large_content_stays_unchanged() {
        let content = format!("# One\n\n## Only\n\n{}", "x".repeat(OPTIMIZE_THRESHOLD));
        assert!(matches!(
            optimize_content("one", &content),
            OptimizeOutcome::Unchanged
        ));
    }

    #[test]
    fn slugify_handles_punctuation() {
        assert_eq!(slugify("Testing & Mocking!"), "testing-mocking");
        assert_eq!(slugify("  Edge--case  "), "edge-case");
    }
}
