//! CLI command implementations.
//!
//! Each subcommand has its own module with an Args struct and a `run()`
//! function to execute the command.

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;

pub mod advisories;
pub mod audit;
pub mod backups;
pub mod install;
pub mod list;
pub mod remove;
pub mod update;

/// Dispatch a command to its handler.
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Install(args) => install::run(ctx, args),
        Commands::Update(args) => update::run(ctx, args),
        Commands::List(args) => list::run(ctx, args),
        Commands::Remove(args) => remove::run(ctx, args),
        Commands::Audit(args) => audit::run(ctx, args),
        Commands::Advisories(args) => advisories::run(ctx, args),
        Commands::Backups(args) => backups::run(ctx, args),
    }
}
