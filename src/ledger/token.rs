use crate::ledger::paths::KirokuPaths;
use anyhow::{Context, Result};
use std::env;
use std::fs;

/// Resolve the GitHub credential: environment first, then the token
/// file. Returns `None` when neither is set.
pub fn resolve(paths: &KirokuPaths) -> Result<Option<String>> {
    if let Ok(value) = env::var("KIROKU_GITHUB_TOKEN") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Ok(Some(trimmed.to_string()));
        }
    }

    let file = &paths.token_file;
    if !file.exists() {
        return Ok(None);
    }
    let raw =
        fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(trimmed.to_string()))
}

pub fn store(paths: &KirokuPaths, token: &str) -> Result<()> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        anyhow::bail!("token cannot be empty");
    }
    let file = &paths.token_file;
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(file, format!("{trimmed}\n"))
        .with_context(|| format!("failed to write {}", file.display()))?;
    Ok(())
}

/// Drop the file credential so the next run re-prompts. Called by the
/// engine when the store rejects the credential; the environment
/// variable is never touched.
pub fn clear(paths: &KirokuPaths) -> Result<()> {
    let file = &paths.token_file;
    if file.exists() {
        fs::remove_file(file)
            .with_context(|| format!("failed to remove {}", file.display()))?;
    }
    Ok(())
}
