use anyhow::Result;
use clap::{Args, Subcommand};

use crate::commands::{CommandReport, open_store};
use crate::ledger::config::load_config;
use crate::ledger::paths::resolve_paths;
use crate::ledger::schedule::{ScheduleBook, yearly_done_counts};
use crate::ledger::source::media_kind_tag;

#[derive(Debug, Clone, Subcommand)]
pub enum WatchlistAction {
    /// Print the watchlist with per-year completion counts.
    Show,
    /// Add a title to watch later.
    Add(AddOptions),
    /// Mark a title as watched.
    Done(TitleOptions),
    /// Remove a title entirely.
    Remove(TitleOptions),
}

#[derive(Debug, Clone, Args)]
pub struct AddOptions {
    #[arg(long)]
    pub title: String,
    /// Media kind: movie, tv, anime, book, ...
    #[arg(long, default_value = "movie")]
    pub kind: String,
}

#[derive(Debug, Clone, Args)]
pub struct TitleOptions {
    #[arg(long)]
    pub title: String,
}

pub fn run(action: &WatchlistAction) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let config = load_config(&paths)?;
    let mut report = CommandReport::new("watchlist");

    let store = open_store(&config, &paths)?;
    let book = ScheduleBook::new(store.as_ref(), &config);

    match action {
        WatchlistAction::Show => {
            let doc = book.load()?;
            if doc.watchlist.is_empty() {
                report.detail("watchlist is empty");
            }
            for item in &doc.watchlist {
                let status = item.status.as_deref().unwrap_or("want");
                report.detail(format!(
                    "[{status}] {} {}",
                    media_kind_tag(&item.kind),
                    item.title
                ));
            }
            for (year, by_kind) in yearly_done_counts(&doc) {
                let summary = by_kind
                    .iter()
                    .map(|(kind, count)| format!("{}{count}", media_kind_tag(kind)))
                    .collect::<Vec<_>>()
                    .join(" ");
                report.detail(format!("{year}: {summary}"));
            }
        }
        WatchlistAction::Add(opts) => {
            book.add_watch(&opts.title, &opts.kind)?;
            report.detail(format!("added `{}`", opts.title));
        }
        WatchlistAction::Done(opts) => {
            if book.finish_watch(&opts.title)? {
                report.detail(format!("marked `{}` as done", opts.title));
            } else {
                report.issue(format!("`{}` is not on the watchlist (or already done)", opts.title));
            }
        }
        WatchlistAction::Remove(opts) => {
            if book.remove_watch(&opts.title)? {
                report.detail(format!("removed `{}`", opts.title));
            } else {
                report.issue(format!("`{}` is not on the watchlist", opts.title));
            }
        }
    }

    Ok(report)
}
