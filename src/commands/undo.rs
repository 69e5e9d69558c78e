use anyhow::Result;
use clap::Args;
use std::io::{self, BufRead, Write};

use crate::commands::{CommandReport, open_store};
use crate::error::SyncError;
use crate::ledger::config::load_config;
use crate::ledger::paths::resolve_paths;
use crate::ledger::recorder::{IndexWrite, Recorder};
use crate::ledger::undo;

#[derive(Debug, Clone, Args)]
pub struct UndoOptions {
    /// Skip the confirmation prompt.
    #[arg(long)]
    pub yes: bool,
}

fn confirm(title: &str) -> Result<bool> {
    print!("「{title}」を削除しますか？ [y/N] ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

pub fn run(opts: &UndoOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let config = load_config(&paths)?;
    let mut report = CommandReport::new("undo");

    let Some(slot) = undo::peek(&paths)? else {
        report.issue("no entry available to undo");
        return Ok(report);
    };

    if !opts.yes && !confirm(&slot.title)? {
        report.detail("cancelled");
        return Ok(report);
    }

    let store = open_store(&config, &paths)?;
    let recorder = Recorder::new(store.as_ref(), &config, &paths);

    match recorder.undo_last_entry() {
        Ok(outcome) => {
            if outcome.removed_block {
                report.detail(format!(
                    "removed `{}` from {}",
                    outcome.title, outcome.month_log_path
                ));
            } else {
                report.detail(format!(
                    "entry `{}` was already gone from {}",
                    outcome.title, outcome.month_log_path
                ));
            }
            for index in &outcome.indexes {
                match &index.write {
                    IndexWrite::Updated => report.detail(format!("index {}: updated", index.path)),
                    IndexWrite::Unchanged => {
                        report.detail(format!("index {}: nothing to remove", index.path))
                    }
                    IndexWrite::Skipped(reason) => {
                        report.detail(format!("index {}: skipped ({reason})", index.path))
                    }
                    IndexWrite::Failed(err) => {
                        report.detail(format!("index {}: FAILED ({err})", index.path))
                    }
                }
            }
        }
        Err(SyncError::NoUndoAvailable) => {
            report.issue("no entry available to undo");
        }
        Err(err) => {
            report.issue(format!("undo failed: {err}"));
        }
    }

    Ok(report)
}
