use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use crate::commands::CommandReport;
use crate::commands::grid::GridOptions;
use crate::commands::record::RecordOptions;
use crate::commands::schedule::ScheduleAction;
use crate::commands::token::TokenAction;
use crate::commands::undo::UndoOptions;
use crate::commands::watchlist::WatchlistAction;

#[derive(Debug, Parser)]
#[command(
    name = "kiroku",
    version,
    about = "Media listening ledger: month logs and calendar indexes on a versioned blob store"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record one consumption entry into the month log and calendars.
    Record(RecordOptions),
    /// Reverse the most recently recorded entry.
    Undo(UndoOptions),
    /// Show the entry the next undo would remove.
    Last,
    /// Print a blank calendar grid for a month.
    Grid(GridOptions),
    /// Edit the weekly schedule document.
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },
    /// Edit the watchlist.
    Watchlist {
        #[command(subcommand)]
        action: WatchlistAction,
    },
    /// Manage the stored GitHub token.
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Report resolved configuration, state, and environment.
    Status,
}

fn dispatch(command: &Command) -> Result<CommandReport> {
    match command {
        Command::Record(opts) => commands::record::run(opts),
        Command::Undo(opts) => commands::undo::run(opts),
        Command::Last => commands::last::run(),
        Command::Grid(opts) => commands::grid::run(opts),
        Command::Schedule { action } => commands::schedule::run(action),
        Command::Watchlist { action } => commands::watchlist::run(action),
        Command::Token { action } => commands::token::run(action),
        Command::Status => commands::status::run(),
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let report = dispatch(&cli.command)?;

    for line in &report.details {
        println!("{line}");
    }
    if !report.ok {
        anyhow::bail!("{}: {}", report.command, report.issues.join("; "));
    }
    Ok(())
}
