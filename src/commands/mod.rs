pub mod grid;
pub mod last;
pub mod record;
pub mod schedule;
pub mod status;
pub mod token;
pub mod undo;
pub mod watchlist;

use crate::ledger::config::KirokuConfig;
use crate::ledger::paths::KirokuPaths;
use crate::ledger::token as token_store;
use crate::store::BlobStore;
use crate::store::dir::DirStore;
use crate::store::github::GitHubStore;
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

/// Build the configured blob store backend. The config is validated
/// before this runs, so only the credential can still be missing.
pub fn open_store(config: &KirokuConfig, paths: &KirokuPaths) -> Result<Box<dyn BlobStore>> {
    match config.store.backend.as_str() {
        "dir" => Ok(Box::new(DirStore::new(&config.store.dir_root))),
        _ => {
            let Some(token) = token_store::resolve(paths)? else {
                anyhow::bail!(
                    "no GitHub token available; run `kiroku token set <token>` or set KIROKU_GITHUB_TOKEN"
                );
            };
            Ok(Box::new(GitHubStore::new(
                config.store.github_repo.clone(),
                token,
            )))
        }
    }
}
