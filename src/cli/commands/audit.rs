//! sk audit - Audit a skill pack directory for version drift.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::audit::{DriftStatus, audit_pack};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Pack directory containing one subdirectory per bundled skill
    /// (default: the managed skills directory)
    pub pack_dir: Option<PathBuf>,

    /// Emit the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(ctx: &AppContext, args: &AuditArgs) -> Result<()> {
    let pack_dir = args
        .pack_dir
        .clone()
        .unwrap_or_else(|| ctx.config.skills_dir());
    let entries = audit_pack(&pack_dir, &ctx.history)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No skills found under {}", pack_dir.display());
        return Ok(());
    }

    println!(
        "{:<28} {:<10} {:<10} {}",
        "SKILL".bold(),
        "BUNDLED".bold(),
        "REGISTRY".bold(),
        "STATUS".bold()
    );
    let mut outdated = 0;
    for entry in &entries {
        let status = match entry.status {
            DriftStatus::Current => entry.status.to_string().green(),
            DriftStatus::Outdated => {
                outdated += 1;
                entry.status.to_string().red()
            }
            DriftStatus::Ahead => entry.status.to_string().cyan(),
            DriftStatus::NoRegistryData | DriftStatus::MissingVersion => {
                entry.status.to_string().yellow()
            }
        };
        println!(
            "{:<28} {:<10} {:<10} {}",
            entry.skill_name,
            entry.bundled_version.as_deref().unwrap_or("-"),
            entry.registry_version.as_deref().unwrap_or("-"),
            status
        );
    }
    if outdated > 0 {
        println!(
            "\n{} skill(s) behind the registry; run 'sk update <name>' to refresh",
            outdated
        );
    }
    Ok(())
}
