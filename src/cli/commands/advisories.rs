//! sk advisories - List, publish, or withdraw security advisories.

use chrono::Utc;
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::app::AppContext;
use crate::error::Result;
use crate::history::Advisory;
use crate::security::Severity;

#[derive(Args, Debug)]
pub struct AdvisoriesArgs {
    #[command(subcommand)]
    pub command: Option<AdvisoriesCommand>,
}

#[derive(Subcommand, Debug)]
pub enum AdvisoriesCommand {
    /// Show active advisories for installed skills (default)
    Check(CheckArgs),
    /// Publish a local advisory record
    Publish(PublishArgs),
    /// Withdraw an advisory by id
    Withdraw(WithdrawArgs),
}

#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Include advisories for skills that are not installed
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Affected skill name
    pub skill: String,

    /// Severity: critical, high, medium, low
    #[arg(long, default_value = "medium")]
    pub severity: String,

    /// Short title
    #[arg(long)]
    pub title: String,

    /// Longer description
    #[arg(long, default_value = "")]
    pub description: String,

    /// Versions that contain the fix (repeatable)
    #[arg(long = "patched")]
    pub patched_versions: Vec<String>,
}

#[derive(Args, Debug)]
pub struct WithdrawArgs {
    /// Advisory id
    pub id: String,
}

pub fn run(ctx: &AppContext, args: &AdvisoriesArgs) -> Result<()> {
    match &args.command {
        None => run_check(ctx, &CheckArgs::default()),
        Some(AdvisoriesCommand::Check(check)) => run_check(ctx, check),
        Some(AdvisoriesCommand::Publish(publish)) => run_publish(ctx, publish),
        Some(AdvisoriesCommand::Withdraw(withdraw)) => run_withdraw(ctx, withdraw),
    }
}

fn run_check(ctx: &AppContext, args: &CheckArgs) -> Result<()> {
    let installed: Vec<String> = ctx
        .manifest_store()
        .load()?
        .installed_skills
        .keys()
        .cloned()
        .collect();
    let filter = if args.all { None } else { Some(installed.as_slice()) };

    let summary = ctx.history.advisory_summary(filter)?;
    if !summary.advisories_available {
        println!("No advisory data available yet.");
        return Ok(());
    }
    if summary.total == 0 {
        println!("{}", "No active advisories for your skills.".green());
        return Ok(());
    }

    println!(
        "{} active advisory(ies):",
        summary.total.to_string().bold()
    );
    for (severity, count) in &summary.by_severity {
        println!("  {severity}: {count}");
    }
    println!();
    for advisory in &summary.advisories {
        let severity = match advisory.severity {
            Severity::Critical | Severity::High => advisory.severity.to_string().red().bold(),
            Severity::Medium => advisory.severity.to_string().yellow(),
            Severity::Low => advisory.severity.to_string().normal(),
        };
        println!(
            "[{severity}] {} - {} ({})",
            advisory.skill_id.bold(),
            advisory.title,
            advisory.id
        );
        if let Some(patched) = &advisory.patched_versions {
            println!("    patched in: {}", patched.join(", "));
        }
    }
    Ok(())
}

fn run_publish(ctx: &AppContext, args: &PublishArgs) -> Result<()> {
    let advisory = Advisory {
        id: String::new(),
        skill_id: args.skill.clone(),
        severity: Severity::parse(&args.severity),
        title: args.title.clone(),
        description: args.description.clone(),
        published_at: Utc::now(),
        patched_versions: if args.patched_versions.is_empty() {
            None
        } else {
            Some(args.patched_versions.clone())
        },
    };
    let id = ctx.history.publish_advisory(&advisory)?;
    println!("Published advisory {id}");
    Ok(())
}

fn run_withdraw(ctx: &AppContext, args: &WithdrawArgs) -> Result<()> {
    if ctx.history.withdraw_advisory(&args.id)? {
        println!("Withdrew advisory {}", args.id);
    } else {
        println!("No advisory with id {}", args.id);
    }
    Ok(())
}
