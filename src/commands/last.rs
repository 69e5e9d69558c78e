use anyhow::Result;

use crate::commands::CommandReport;
use crate::ledger::paths::resolve_paths;
use crate::ledger::undo;

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("last");

    match undo::peek(&paths)? {
        Some(slot) => {
            report.detail(format!(
                "{} {} - {}",
                slot.category_tag, slot.channel, slot.title
            ));
            report.detail(format!("url={}", slot.url));
            report.detail(format!(
                "recorded_at={} day={}",
                slot.month_log_path, slot.day_key
            ));
        }
        None => {
            report.detail("undo slot is empty");
        }
    }

    Ok(report)
}
