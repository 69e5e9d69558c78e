use anyhow::Result;
use std::env;
use std::path::PathBuf;

/// Local filesystem locations for process state. Everything the engine
/// keeps on disk (credential file, undo slot) lives under `state_dir`;
/// the ledger documents themselves live behind the blob store.
#[derive(Debug, Clone)]
pub struct KirokuPaths {
    pub state_dir: PathBuf,
    pub config_file: PathBuf,
    pub token_file: PathBuf,
    pub undo_file: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<KirokuPaths> {
    let home = required_home_dir()?;
    let state_dir = env_or_default_path("KIROKU_STATE_DIR", home.join(".kiroku"));

    let config_file = env_or_default_path(
        "KIROKU_CONFIG_PATH",
        home.join(".config/kiroku/config.toml"),
    );
    let token_file = env_or_default_path("KIROKU_TOKEN_FILE", state_dir.join("github_token"));
    let undo_file = env_or_default_path("KIROKU_UNDO_FILE", state_dir.join("undo_slot.json"));

    Ok(KirokuPaths {
        state_dir,
        config_file,
        token_file,
        undo_file,
    })
}
