//! sk update - Update an installed skill from its source.

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::error::Result;
use crate::installer::{InstallOptions, UpdateStrategy};

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Installed skill name
    pub name: String,

    /// Report what would change without writing anything
    #[arg(long)]
    pub check: bool,

    /// Discard local edits and take upstream content
    #[arg(long, conflicts_with = "check")]
    pub overwrite: bool,

    /// Update despite blocking security findings (logged)
    #[arg(long)]
    pub bypass_security: bool,
}

pub fn run(ctx: &AppContext, args: &UpdateArgs) -> Result<()> {
    let strategy = if args.check {
        UpdateStrategy::CheckOnly
    } else if args.overwrite {
        UpdateStrategy::Overwrite
    } else {
        UpdateStrategy::Merge
    };
    let options = InstallOptions {
        bypass_security: args.bypass_security,
        ..InstallOptions::default()
    };

    let installer = ctx.installer()?;
    let report = installer.update(&args.name, strategy, &options)?;

    if report.up_to_date {
        println!("{} is already up to date", report.name.bold());
        return Ok(());
    }

    if !report.applied {
        println!(
            "{} {} change available for {} (recommendation: {})",
            "Pending:".yellow().bold(),
            report.change,
            report.name.bold(),
            report.recommendation
        );
        if report.locally_modified {
            println!("  local edits detected; a plain update will three-way merge them");
        }
        return Ok(());
    }

    println!(
        "{} {} to {} ({} change)",
        "Updated".green().bold(),
        report.name.bold(),
        report.version,
        report.change
    );
    if report.conflicts.is_empty() {
        if report.locally_modified {
            println!("  local edits merged cleanly");
        }
    } else {
        println!(
            "{} {} conflict(s); resolve the LOCAL/UPSTREAM markers in SKILL.md:",
            "Warning:".yellow().bold(),
            report.conflicts.len()
        );
        for conflict in &report.conflicts {
            println!("  line {}", conflict.line_number);
        }
    }
    Ok(())
}
