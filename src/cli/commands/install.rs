//! sk install - Install a skill from a registry key or GitHub URL.

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::error::Result;
use crate::installer::InstallOptions;

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Registry key (author/name), GitHub URL, or owner/repo/path shorthand
    pub identifier: String,

    /// Reinstall even if the skill is already installed
    #[arg(long, short = 'f')]
    pub force: bool,

    /// Install despite blocking security findings (logged)
    #[arg(long)]
    pub bypass_security: bool,

    /// Skip the large-content optimization pass
    #[arg(long)]
    pub no_optimize: bool,
}

pub fn run(ctx: &AppContext, args: &InstallArgs) -> Result<()> {
    let installer = ctx.installer()?;
    let options = InstallOptions {
        force: args.force,
        bypass_security: args.bypass_security,
        optimize: !args.no_optimize,
    };
    let report = installer.install(&args.identifier, &options)?;

    println!(
        "{} {} {} ({})",
        "Installed".green().bold(),
        report.name.bold(),
        report.version,
        report.trust
    );
    println!("  source: {}", report.source);
    println!("  path:   {}", report.install_path.display());
    if report.auxiliary_files > 0 {
        println!("  auxiliary files: {}", report.auxiliary_files);
    }
    if report.optimized {
        println!("  {}", "content was split for context efficiency".yellow());
        if let Some(snippet) = &report.integration_snippet {
            println!("\n{snippet}");
        }
    }
    Ok(())
}
