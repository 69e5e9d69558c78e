use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Args;

use crate::commands::{CommandReport, open_store};
use crate::ledger::config::load_config;
use crate::ledger::entry::LedgerEntry;
use crate::ledger::paths::resolve_paths;
use crate::ledger::recorder::{IndexWrite, Recorder};
use crate::ledger::source::SourceKind;

#[derive(Debug, Clone, Args)]
pub struct RecordOptions {
    /// Full title of the episode or video.
    #[arg(long)]
    pub title: String,
    /// Channel or program name.
    #[arg(long)]
    pub channel: String,
    /// Source URL.
    #[arg(long)]
    pub url: String,
    /// Optional note, rendered as a quote under the heading.
    #[arg(long)]
    pub memo: Option<String>,
    /// Target date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    pub date: Option<String>,
    /// Where the entry was consumed.
    #[arg(long, value_enum, default_value = "youtube")]
    pub source: SourceKind,
    /// Override the category tag emoji of the source.
    #[arg(long)]
    pub tag: Option<String>,
}

fn parse_target_date(raw: Option<&str>) -> Result<NaiveDate> {
    match raw {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("invalid --date `{raw}`; expected YYYY-MM-DD")),
        None => Ok(Local::now().date_naive()),
    }
}

pub fn run(opts: &RecordOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let config = load_config(&paths)?;
    let mut report = CommandReport::new("record");

    let target_date = parse_target_date(opts.date.as_deref())?;
    let profile = opts.source.profile();
    let entry = LedgerEntry {
        title: opts.title.clone(),
        channel: opts.channel.clone(),
        url: opts.source.normalize_url(&opts.url),
        memo: opts.memo.clone(),
        category_tag: opts
            .tag
            .clone()
            .unwrap_or_else(|| profile.category_tag.to_string()),
        link_label: profile.link_label.to_string(),
        target_date,
    };

    let store = open_store(&config, &paths)?;
    let recorder = Recorder::new(store.as_ref(), &config, &paths);

    match recorder.record_entry(&entry) {
        Ok(outcome) => {
            let created = if outcome.created_month_log {
                " (created)"
            } else {
                ""
            };
            report.detail(format!("month_log={}{created}", outcome.month_log_path));
            for index in &outcome.indexes {
                match &index.write {
                    IndexWrite::Updated => report.detail(format!("index {}: updated", index.path)),
                    IndexWrite::Unchanged => {
                        report.detail(format!("index {}: already up to date", index.path))
                    }
                    IndexWrite::Skipped(reason) => {
                        report.detail(format!("index {}: skipped ({reason})", index.path))
                    }
                    IndexWrite::Failed(err) => {
                        report.detail(format!("index {}: FAILED ({err}); log entry kept", index.path))
                    }
                }
            }
            if outcome.undo_slot_saved {
                report.detail("undo: `kiroku undo` removes this entry");
            }
        }
        Err(err) => {
            report.issue(format!("record failed: {err}"));
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::parse_target_date;

    #[test]
    fn parses_iso_dates() {
        let date = parse_target_date(Some("2024-03-05")).expect("parse");
        assert_eq!(date.to_string(), "2024-03-05");
    }

    #[test]
    fn rejects_garbage_dates() {
        assert!(parse_target_date(Some("3/5")).is_err());
    }
}
