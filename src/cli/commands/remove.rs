//! sk remove - Remove an installed skill (a backup snapshot is kept).

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Installed skill name
    pub name: String,
}

pub fn run(ctx: &AppContext, args: &RemoveArgs) -> Result<()> {
    let installer = ctx.installer()?;
    installer.remove(&args.name)?;
    println!(
        "{} {} (a backup snapshot was kept under .backups)",
        "Removed".green().bold(),
        args.name.bold()
    );
    Ok(())
}
