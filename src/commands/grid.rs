use anyhow::Result;
use clap::Args;

use crate::commands::CommandReport;
use crate::ledger::calendar::generate_grid_text;

#[derive(Debug, Clone, Args)]
pub struct GridOptions {
    #[arg(long)]
    pub year: i32,
    #[arg(long)]
    pub month: u32,
}

pub fn run(opts: &GridOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("grid");

    if !(1..=12).contains(&opts.month) {
        report.issue(format!("invalid month {}: expected 1..=12", opts.month));
        return Ok(report);
    }
    if !(1..=9999).contains(&opts.year) {
        report.issue(format!("invalid year {}", opts.year));
        return Ok(report);
    }

    for line in generate_grid_text(opts.year, opts.month).lines() {
        report.detail(line);
    }
    Ok(report)
}
