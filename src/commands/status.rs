use anyhow::Result;
use std::env;

use crate::commands::CommandReport;
use crate::ledger::config::load_config;
use crate::ledger::paths::resolve_paths;
use crate::ledger::token;
use crate::ledger::undo;

include!(concat!(env!("OUT_DIR"), "/kiroku_env_allowlist.rs"));

fn unknown_kiroku_env_keys() -> Vec<String> {
    env::vars()
        .map(|(key, _)| key)
        .filter(|key| key.starts_with("KIROKU_"))
        .filter(|key| !GENERATED_KIROKU_ENV_ALLOWLIST.contains(&key.as_str()))
        .collect()
}

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("build={}", env!("BUILD_UUID")));
    report.detail(format!("state_dir={}", paths.state_dir.display()));
    report.detail(format!("config_file={}", paths.config_file.display()));

    match load_config(&paths) {
        Ok(config) => {
            report.detail(format!("store.backend={}", config.store.backend));
            match config.store.backend.as_str() {
                "github" => report.detail(format!("store.github_repo={}", config.store.github_repo)),
                _ => report.detail(format!("store.dir_root={}", config.store.dir_root)),
            }
            report.detail(format!("layout.log_dir={}", config.layout.log_dir));
            report.detail(format!("layout.schedule_path={}", config.layout.schedule_path));
            for index in &config.indexes {
                report.detail(format!(
                    "index path={} link_prefix={} aggregator={}",
                    index.path,
                    if index.link_prefix.is_empty() {
                        "(none)"
                    } else {
                        index.link_prefix.as_str()
                    },
                    index.aggregator.as_deref().unwrap_or("(none)")
                ));
            }
            report.detail(format!("sync.conflict_retries={}", config.sync.conflict_retries));

            if config.store.backend == "github" {
                match token::resolve(&paths)? {
                    Some(_) => report.detail("github token: present"),
                    None => report.issue("github token: missing (run `kiroku token set`)"),
                }
            }
        }
        Err(err) => {
            report.issue(format!("config invalid: {err:#}"));
        }
    }

    match undo::peek(&paths) {
        Ok(Some(slot)) => report.detail(format!("undo slot: {} - {}", slot.channel, slot.title)),
        Ok(None) => report.detail("undo slot: empty"),
        Err(err) => report.issue(format!("undo slot unreadable: {err:#}")),
    }

    for key in unknown_kiroku_env_keys() {
        report.issue(format!("unknown environment variable {key} (typo?)"));
    }

    Ok(report)
}
