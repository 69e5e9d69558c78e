use crate::ledger::paths::KirokuPaths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Summary of the last successfully recorded entry. A single slot,
/// overwritten on every record and cleared on undo: one reversal, no
/// history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UndoSlot {
    pub title: String,
    pub channel: String,
    pub url: String,
    pub category_tag: String,
    pub short_title: String,
    pub month_log_path: String,
    pub day_key: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub saved_at_epoch_secs: u64,
}

pub fn slot_file_path(paths: &KirokuPaths) -> PathBuf {
    paths.undo_file.clone()
}

pub fn peek(paths: &KirokuPaths) -> Result<Option<UndoSlot>> {
    let file = slot_file_path(paths);
    if !file.exists() {
        return Ok(None);
    }

    let raw =
        fs::read_to_string(&file).with_context(|| format!("failed to read {}", file.display()))?;
    let parsed: UndoSlot = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    Ok(Some(parsed))
}

pub fn remember(paths: &KirokuPaths, slot: &UndoSlot) -> Result<PathBuf> {
    let file = slot_file_path(paths);
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(slot)?;
    fs::write(&file, format!("{data}\n"))
        .with_context(|| format!("failed to write {}", file.display()))?;
    Ok(file)
}

pub fn forget(paths: &KirokuPaths) -> Result<()> {
    let file = slot_file_path(paths);
    if file.exists() {
        fs::remove_file(&file)
            .with_context(|| format!("failed to remove {}", file.display()))?;
    }
    Ok(())
}
