use crate::ledger::paths::KirokuPaths;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `github` talks to the contents API; `dir` keeps the ledger in a
    /// local directory (offline use and tests).
    pub backend: String,
    pub github_repo: String,
    pub dir_root: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "github".to_string(),
            github_repo: "aztkp/media-log".to_string(),
            dir_root: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Directory (inside the store) holding the per-month log documents.
    pub log_dir: String,
    pub schedule_path: String,
    /// Heading of the weekly-schedule section regenerated in the global
    /// index after schedule edits.
    pub schedule_section: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            schedule_path: "schedule.json".to_string(),
            schedule_section: "## 週間スケジュール".to_string(),
        }
    }
}

/// One calendar index document. `link_prefix` is prepended to month-log
/// paths when building day links (the index next to the logs uses "",
/// the top-level aggregated index uses "logs/"). When `aggregator` is
/// set, month tables nest under that heading instead of the document
/// top level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub path: String,
    #[serde(default)]
    pub link_prefix: String,
    #[serde(default)]
    pub aggregator: Option<String>,
}

fn default_indexes() -> Vec<IndexConfig> {
    vec![
        IndexConfig {
            path: "logs/README.md".to_string(),
            link_prefix: String::new(),
            aggregator: None,
        },
        IndexConfig {
            path: "README.md".to_string(),
            link_prefix: "logs/".to_string(),
            aggregator: Some("## 聴取カレンダー".to_string()),
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Refetch-reapply attempts after an optimistic-concurrency conflict
    /// before the conflict surfaces to the caller.
    pub conflict_retries: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            conflict_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KirokuConfig {
    pub store: StoreConfig,
    pub layout: LayoutConfig,
    pub indexes: Vec<IndexConfig>,
    pub sync: SyncConfig,
}

impl Default for KirokuConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            layout: LayoutConfig::default(),
            indexes: default_indexes(),
            sync: SyncConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialKirokuConfig {
    store: Option<StoreConfig>,
    layout: Option<LayoutConfig>,
    indexes: Option<Vec<IndexConfig>>,
    sync: Option<SyncConfig>,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn validate(cfg: &KirokuConfig) -> Result<()> {
    match cfg.store.backend.as_str() {
        "github" => {
            if cfg.store.github_repo.trim().is_empty()
                || !cfg.store.github_repo.contains('/')
            {
                return Err(anyhow!(
                    "invalid github repo: expected `owner/name`, got `{}`",
                    cfg.store.github_repo
                ));
            }
        }
        "dir" => {
            if cfg.store.dir_root.trim().is_empty() {
                return Err(anyhow!("invalid dir store: `dir_root` cannot be empty"));
            }
        }
        other => {
            return Err(anyhow!("invalid store backend `{other}`: use `github` or `dir`"));
        }
    }
    if cfg.layout.log_dir.trim().is_empty() {
        return Err(anyhow!("invalid layout: log dir cannot be empty"));
    }
    if cfg.indexes.is_empty() {
        return Err(anyhow!("invalid config: at least one calendar index is required"));
    }
    for index in &cfg.indexes {
        if index.path.trim().is_empty() {
            return Err(anyhow!("invalid calendar index: path cannot be empty"));
        }
        if !index.link_prefix.is_empty() && !index.link_prefix.ends_with('/') {
            return Err(anyhow!(
                "invalid calendar index {}: link prefix must end with `/`",
                index.path
            ));
        }
        if let Some(aggregator) = &index.aggregator
            && aggregator.trim().is_empty()
        {
            return Err(anyhow!(
                "invalid calendar index {}: aggregator heading cannot be empty",
                index.path
            ));
        }
    }
    Ok(())
}

fn merge_file_config(paths: &KirokuPaths, base: &mut KirokuConfig) -> Result<()> {
    let path = &paths.config_file;
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: PartialKirokuConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse config {}: {err}", path.display()))?;
    if let Some(store) = parsed.store {
        base.store = store;
    }
    if let Some(layout) = parsed.layout {
        base.layout = layout;
    }
    if let Some(indexes) = parsed.indexes {
        base.indexes = indexes;
    }
    if let Some(sync) = parsed.sync {
        base.sync = sync;
    }
    Ok(())
}

pub fn load_config(paths: &KirokuPaths) -> Result<KirokuConfig> {
    let mut cfg = KirokuConfig::default();
    merge_file_config(paths, &mut cfg)?;

    cfg.store.backend = env_or_string("KIROKU_STORE_BACKEND", &cfg.store.backend);
    cfg.store.github_repo = env_or_string("KIROKU_GITHUB_REPO", &cfg.store.github_repo);
    cfg.store.dir_root = env_or_string("KIROKU_STORE_DIR", &cfg.store.dir_root);
    cfg.layout.log_dir = env_or_string("KIROKU_LOG_DIR", &cfg.layout.log_dir);
    cfg.layout.schedule_path =
        env_or_string("KIROKU_SCHEDULE_PATH", &cfg.layout.schedule_path);
    cfg.sync.conflict_retries =
        env_or_u64("KIROKU_CONFLICT_RETRIES", cfg.sync.conflict_retries);

    validate(&cfg)?;
    Ok(cfg)
}
