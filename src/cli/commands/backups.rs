//! sk backups - List or restore backup snapshots.

use clap::{Args, Subcommand};
use colored::Colorize;

use crate::app::AppContext;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct BackupsArgs {
    #[command(subcommand)]
    pub command: BackupsCommand,
}

#[derive(Subcommand, Debug)]
pub enum BackupsCommand {
    /// List snapshots for a skill, newest first
    List(BackupsListArgs),
    /// Restore a skill's install directory from a named snapshot
    Restore(BackupsRestoreArgs),
}

#[derive(Args, Debug)]
pub struct BackupsListArgs {
    /// Installed skill name
    pub skill: String,
}

#[derive(Args, Debug)]
pub struct BackupsRestoreArgs {
    /// Installed skill name
    pub skill: String,

    /// Snapshot name as shown by 'sk backups list' (default: newest)
    pub backup: Option<String>,
}

pub fn run(ctx: &AppContext, args: &BackupsArgs) -> Result<()> {
    match &args.command {
        BackupsCommand::List(list) => run_list(ctx, list),
        BackupsCommand::Restore(restore) => run_restore(ctx, restore),
    }
}

fn run_list(ctx: &AppContext, args: &BackupsListArgs) -> Result<()> {
    let installer = ctx.installer()?;
    let backups = installer.backups().list(&args.skill)?;
    if backups.is_empty() {
        println!("No backups for {}", args.skill);
        return Ok(());
    }
    for backup in &backups {
        println!("{}  ({})", backup.name.bold(), backup.reason);
    }
    if installer.backups().original_primary(&args.skill)?.is_some() {
        println!("{}", "(.original install-time baseline also present)".dimmed());
    }
    Ok(())
}

fn run_restore(ctx: &AppContext, args: &BackupsRestoreArgs) -> Result<()> {
    let installer = ctx.installer()?;
    let backup_name = installer.restore(&args.skill, args.backup.as_deref())?;
    println!(
        "{} {} from {}",
        "Restored".green().bold(),
        args.skill.bold(),
        backup_name
    );
    Ok(())
}
