//! Command-line interface definitions and handlers.
//!
//! clap v4 derive macros; each subcommand lives in its own module under
//! `commands/` with an `Args` struct and a `run(ctx, args)` function.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;

/// sk - install, update, and audit skill packages for your coding agent
#[derive(Parser, Debug)]
#[command(name = "sk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/sk/config.toml)
    #[arg(long, global = true, env = "SK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install a skill from a registry key or GitHub URL
    Install(commands::install::InstallArgs),
    /// Update an installed skill from its source
    Update(commands::update::UpdateArgs),
    /// List installed skills
    List(commands::list::ListArgs),
    /// Remove an installed skill
    Remove(commands::remove::RemoveArgs),
    /// Audit a skill pack directory for version drift
    Audit(commands::audit::AuditArgs),
    /// List, publish, or withdraw security advisories
    Advisories(commands::advisories::AdvisoriesArgs),
    /// List or restore backup snapshots
    Backups(commands::backups::BackupsArgs),
}
