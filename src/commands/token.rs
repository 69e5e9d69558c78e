use anyhow::Result;
use clap::{Args, Subcommand};

use crate::commands::CommandReport;
use crate::ledger::paths::resolve_paths;
use crate::ledger::token;

#[derive(Debug, Clone, Subcommand)]
pub enum TokenAction {
    /// Store a GitHub personal access token (repo scope).
    Set(SetOptions),
    /// Remove the stored token.
    Clear,
}

#[derive(Debug, Clone, Args)]
pub struct SetOptions {
    pub token: String,
}

pub fn run(action: &TokenAction) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("token");

    match action {
        TokenAction::Set(opts) => {
            token::store(&paths, &opts.token)?;
            report.detail(format!("token stored at {}", paths.token_file.display()));
        }
        TokenAction::Clear => {
            token::clear(&paths)?;
            report.detail("token cleared");
        }
    }

    Ok(report)
}
