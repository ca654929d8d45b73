//! sk list - List installed skills from the manifest.

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::error::Result;
use crate::merge::detect_modifications;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Show full source URLs and hashes
    #[arg(long, short = 'l')]
    pub long: bool,
}

pub fn run(ctx: &AppContext, args: &ListArgs) -> Result<()> {
    let manifest = ctx.manifest_store().load()?;
    if manifest.installed_skills.is_empty() {
        println!("No skills installed. Try 'sk install <author>/<name>'.");
        return Ok(());
    }

    println!(
        "{:<28} {:<10} {:<10} {}",
        "NAME".bold(),
        "VERSION".bold(),
        "STATE".bold(),
        "UPDATED".bold()
    );
    for entry in manifest.installed_skills.values() {
        let primary = entry.install_path.join(crate::fetcher::PRIMARY_FILE);
        let state = match detect_modifications(&primary, &entry.content_hash) {
            Ok(status) if status.modified => "modified".yellow(),
            Ok(_) => "clean".green(),
            Err(_) => "unreadable".red(),
        };
        println!(
            "{:<28} {:<10} {:<10} {}",
            entry.name,
            entry.version,
            state,
            entry.last_updated.format("%Y-%m-%d")
        );
        if args.long {
            println!("    source: {}", entry.source.dimmed());
            println!("    hash:   {}", entry.content_hash.dimmed());
        }
    }
    Ok(())
}
