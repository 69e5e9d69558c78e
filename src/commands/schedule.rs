use anyhow::Result;
use clap::{Args, Subcommand};

use crate::commands::{CommandReport, open_store};
use crate::ledger::config::load_config;
use crate::ledger::paths::resolve_paths;
use crate::ledger::schedule::{DAY_ORDER, ScheduleBook, day_label};
use crate::ledger::source::media_kind_tag;

#[derive(Debug, Clone, Subcommand)]
pub enum ScheduleAction {
    /// Print the weekly schedule.
    Show,
    /// Add a program to a day.
    Add(AddOptions),
    /// Remove the program at a position within a day.
    Remove(PositionOptions),
    /// Move a program one position up or down within its day.
    Move(MoveOptions),
}

#[derive(Debug, Clone, Args)]
pub struct AddOptions {
    /// Day of week: mon, tue, wed, thu, fri, sat, sun.
    #[arg(long)]
    pub day: String,
    #[arg(long)]
    pub name: String,
    /// Media kind: radio, tv, anime, streaming, ...
    #[arg(long, default_value = "radio")]
    pub kind: String,
}

#[derive(Debug, Clone, Args)]
pub struct PositionOptions {
    #[arg(long)]
    pub day: String,
    /// Zero-based position within the day's list.
    #[arg(long)]
    pub index: usize,
}

#[derive(Debug, Clone, Args)]
pub struct MoveOptions {
    #[arg(long)]
    pub day: String,
    #[arg(long)]
    pub index: usize,
    /// Move toward the front of the list instead of the back.
    #[arg(long)]
    pub up: bool,
}

fn check_day(report: &mut CommandReport, day: &str) -> bool {
    if DAY_ORDER.contains(&day) {
        return true;
    }
    report.issue(format!("unknown day `{day}`: use one of {}", DAY_ORDER.join("/")));
    false
}

pub fn run(action: &ScheduleAction) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let config = load_config(&paths)?;
    let mut report = CommandReport::new("schedule");

    let store = open_store(&config, &paths)?;
    let book = ScheduleBook::new(store.as_ref(), &config);

    match action {
        ScheduleAction::Show => {
            let doc = book.load()?;
            for day in DAY_ORDER {
                let items = doc.weekly.get(day).map(Vec::as_slice).unwrap_or(&[]);
                if items.is_empty() {
                    report.detail(format!("{}: -", day_label(day)));
                } else {
                    let joined = items
                        .iter()
                        .map(|item| format!("{} {}", media_kind_tag(&item.kind), item.name))
                        .collect::<Vec<_>>()
                        .join(", ");
                    report.detail(format!("{}: {joined}", day_label(day)));
                }
            }
        }
        ScheduleAction::Add(opts) => {
            if check_day(&mut report, &opts.day) {
                book.add_weekly(&opts.day, &opts.name, &opts.kind)?;
                report.detail(format!("added `{}` to {}", opts.name, opts.day));
            }
        }
        ScheduleAction::Remove(opts) => {
            if check_day(&mut report, &opts.day) {
                if book.remove_weekly(&opts.day, opts.index)? {
                    report.detail(format!("removed item {} from {}", opts.index, opts.day));
                } else {
                    report.issue(format!("no item {} on {}", opts.index, opts.day));
                }
            }
        }
        ScheduleAction::Move(opts) => {
            if check_day(&mut report, &opts.day) {
                if book.move_weekly(&opts.day, opts.index, opts.up)? {
                    report.detail(format!("moved item {} on {}", opts.index, opts.day));
                } else {
                    report.issue(format!(
                        "cannot move item {} on {} any further",
                        opts.index, opts.day
                    ));
                }
            }
        }
    }

    Ok(report)
}
