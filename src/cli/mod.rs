//! Command-line front end: argument scanning and command dispatch.

mod progress;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;

use crate::{
    AppConfig, DirectoryMapping, Error, OutboxNotifier, Pacer, PullWorkflow, RunState, RunStats,
    SftPortal, TokioPacer, send_daily_report,
};

pub use progress::CliProgress;
use progress::{print_plan, print_recipients, print_summary};

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Pull, mark completion, then send the report.
    Run,
    /// Pull and mark completion only.
    Pull,
    /// Check the completion marker and send the report.
    Report,
    /// Log in, discover and print the navigation table.
    Plan,
    /// Show the recipient list, or replace it when addresses are given.
    Recipients(Vec<String>),
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    /// Command to run.
    pub command: Command,
    /// Explicit config file, if given.
    pub config_path: Option<PathBuf>,
}

fn print_usage() {
    eprintln!("Usage: sft-pull [COMMAND] [OPTIONS]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  run                    Pull files, then send the daily report (default)");
    eprintln!("  pull                   Pull files only");
    eprintln!("  report                 Send the daily report for today's pull");
    eprintln!("  plan                   Show which portal folders would be visited");
    eprintln!("  recipients [ADDR...]   Show or replace the report recipients");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <PATH>    Config file (default: $SFT_PULL_CONFIG or the user config dir)");
    eprintln!("  -h, --help             Show this help");
    eprintln!();
    eprintln!("Credentials are read from SFT_USERNAME / SFT_PASSWORD.");
}

/// Scans the arguments (without the program name).
///
/// Returns `Ok(None)` when help was requested.
///
/// # Errors
///
/// Returns [`Error::Config`] for unknown commands or options.
pub fn parse_args<I>(args: I) -> crate::Result<Option<CliArgs>>
where
    I: IntoIterator<Item = String>,
{
    let mut command: Option<String> = None;
    let mut operands = Vec::new();
    let mut config_path = None;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "-c" | "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| Error::Config(format!("{arg} requires a value")))?;
                config_path = Some(PathBuf::from(path));
            }
            other if other.starts_with('-') => {
                return Err(Error::Config(format!("unknown option: {other}")));
            }
            _ if command.is_none() => command = Some(arg),
            _ => operands.push(arg),
        }
    }

    let command = match command.as_deref().unwrap_or("run") {
        "run" => Command::Run,
        "pull" => Command::Pull,
        "report" => Command::Report,
        "plan" => Command::Plan,
        "recipients" => Command::Recipients(std::mem::take(&mut operands)),
        other => return Err(Error::Config(format!("unknown command: {other}"))),
    };
    if !operands.is_empty() {
        return Err(Error::Config(format!(
            "unexpected arguments: {}",
            operands.join(" ")
        )));
    }

    Ok(Some(CliArgs {
        command,
        config_path,
    }))
}

/// Runs the CLI with the process arguments.
///
/// # Errors
///
/// Returns the first error of the selected command.
pub async fn run() -> crate::Result<()> {
    let Some(args) = parse_args(std::env::args().skip(1))? else {
        print_usage();
        return Ok(());
    };

    let config_path = args.config_path.unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load_or_create(&config_path)?;
    log::debug!("Using configuration {}", config_path.display());

    match args.command {
        Command::Run => {
            run_pull(&config).await?;
            run_report(&config).await
        }
        Command::Pull => run_pull(&config).await.map(|_| ()),
        Command::Report => run_report(&config).await,
        Command::Plan => run_plan(&config).await,
        Command::Recipients(addresses) => run_recipients(&config, &addresses),
    }
}

async fn connect(config: &AppConfig, pacer: Arc<dyn Pacer>) -> crate::Result<PullWorkflow<SftPortal>> {
    let credentials = config.credentials()?;
    let mapping = DirectoryMapping::load(&config.paths.mapping_file)?;
    let portal = SftPortal::connect(
        config.portal.clone(),
        &credentials,
        &config.paths.staging_dir,
        Arc::clone(&pacer),
    )
    .await?;
    Ok(PullWorkflow::new(portal, config.clone(), mapping, pacer))
}

/// Pulls every mapped folder and marks today as completed.
async fn run_pull(config: &AppConfig) -> crate::Result<RunStats> {
    let today = Local::now().date_naive();
    let workflow = connect(config, Arc::new(TokioPacer)).await?;

    let progress = CliProgress::new();
    let result = workflow.run(today, &progress).await;
    progress.finish();

    let stats = result?;
    print_summary(&stats);
    Ok(stats)
}

/// Sends today's report through the outbox.
async fn run_report(config: &AppConfig) -> crate::Result<()> {
    let today = Local::now().date_naive();
    let notifier = OutboxNotifier::new(&config.paths.outbox_dir);
    let report = send_daily_report(config, today, &notifier).await?;
    println!(
        "Report for {} queued ({} files).",
        report.date,
        report.rows.len()
    );
    Ok(())
}

/// Discovers the tree and prints where each folder would go.
async fn run_plan(config: &AppConfig) -> crate::Result<()> {
    let workflow = connect(config, Arc::new(TokioPacer)).await?;
    print_plan(&workflow.plan().await?);
    Ok(())
}

fn run_recipients(config: &AppConfig, addresses: &[String]) -> crate::Result<()> {
    let path = &config.paths.state_file;
    let mut state = RunState::load(path)?;
    if !addresses.is_empty() {
        state.set_recipients(addresses);
        state.save(path)?;
        log::info!("Saved {} recipients to {}", state.email_recipients.len(), path.display());
    }
    print_recipients(&state.email_recipients);
    Ok(())
}
