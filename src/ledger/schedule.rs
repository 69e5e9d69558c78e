use crate::error::{StoreError, SyncError};
use crate::ledger::config::KirokuConfig;
use crate::ledger::recorder::with_conflict_retry;
use crate::ledger::source::media_kind_tag;
use crate::ledger::warn::{self, WarnEvent};
use crate::store::BlobStore;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DAY_ORDER: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

pub fn day_label(day: &str) -> &'static str {
    match day {
        "mon" => "月",
        "tue" => "火",
        "wed" => "水",
        "thu" => "木",
        "fri" => "金",
        "sat" => "土",
        "sun" => "日",
        _ => "?",
    }
}

/// One recurring program on the weekly schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleItem {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One watchlist item. `completed` is the pre-status flag still found
/// in old documents; it is folded into `status` on load and never
/// written back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchItem {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(rename = "addedAt", default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>,
    #[serde(rename = "completedAt", default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

/// The `schedule.json` document: weekly recurring programs plus the
/// watchlist, edited as a whole with the usual version-token
/// compare-and-swap. Top-level fields this tool does not know about
/// ride along untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScheduleDoc {
    #[serde(default)]
    pub weekly: BTreeMap<String, Vec<ScheduleItem>>,
    #[serde(default)]
    pub watchlist: Vec<WatchItem>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ScheduleDoc {
    pub fn parse(path: &str, raw: &str) -> Result<Self, SyncError> {
        let mut doc: Self =
            serde_json::from_str(raw).map_err(|err| SyncError::Store(StoreError::Malformed {
                path: path.to_string(),
                reason: err.to_string(),
            }))?;
        doc.migrate_legacy_flags();
        Ok(doc)
    }

    fn migrate_legacy_flags(&mut self) {
        for item in &mut self.watchlist {
            if item.completed == Some(true) && item.status.is_none() {
                item.status = Some("done".to_string());
            }
            item.completed = None;
        }
    }

    pub fn render(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    /// The weekly-schedule table embedded in the global index document.
    pub fn weekly_table(&self) -> String {
        let mut table = String::from("| 曜日 | 番組 |\n|:--:|:--|\n");
        for day in DAY_ORDER {
            let items = self.weekly.get(day).map(Vec::as_slice).unwrap_or(&[]);
            if items.is_empty() {
                table.push_str(&format!("| {} | |\n", day_label(day)));
            } else {
                let joined = items
                    .iter()
                    .map(|item| format!("{} {}", media_kind_tag(&item.kind), item.name))
                    .collect::<Vec<_>>()
                    .join("<br>");
                table.push_str(&format!("| {} | {} |\n", day_label(day), joined));
            }
        }
        table
    }
}

/// Counts of completed watchlist items per (year, kind), for the show
/// command's summary line.
pub fn yearly_done_counts(doc: &ScheduleDoc) -> BTreeMap<String, BTreeMap<String, usize>> {
    let mut out: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for item in &doc.watchlist {
        if item.status.as_deref() != Some("done") {
            continue;
        }
        let Some(completed_at) = &item.completed_at else {
            continue;
        };
        let Some(year) = completed_at.get(..4) else {
            continue;
        };
        *out.entry(year.to_string())
            .or_default()
            .entry(item.kind.clone())
            .or_default() += 1;
    }
    out
}

/// Replace the weekly-schedule section of `doc` (between the section
/// heading and the next `---` rule) with a freshly rendered table.
/// Returns `None` when the section markers are absent.
pub fn patch_schedule_section(doc: &str, heading: &str, table: &str) -> Option<String> {
    let start = doc.find(heading)?;
    let end = doc[start..].find("\n---").map(|p| start + p)?;
    let mut out = String::with_capacity(doc.len() + table.len());
    out.push_str(&doc[..start]);
    out.push_str(heading);
    out.push_str("\n\n毎週の定期視聴番組\n\n");
    out.push_str(table);
    out.push_str(&doc[end..]);
    Some(out)
}

/// Read-modify-write editor for the schedule document. Each edit
/// refetches, applies the closure to the parsed document, writes back
/// with the fetched version, and then refreshes the weekly table in the
/// global index (best-effort).
pub struct ScheduleBook<'a> {
    store: &'a dyn BlobStore,
    config: &'a KirokuConfig,
}

impl<'a> ScheduleBook<'a> {
    pub fn new(store: &'a dyn BlobStore, config: &'a KirokuConfig) -> Self {
        Self { store, config }
    }

    pub fn load(&self) -> Result<ScheduleDoc, SyncError> {
        let path = &self.config.layout.schedule_path;
        match self.store.fetch(path)? {
            Some(blob) => ScheduleDoc::parse(path, &blob.content),
            None => Ok(ScheduleDoc::default()),
        }
    }

    /// Apply `edit` to the current document and persist it. The closure
    /// returns false to signal "nothing to do" (e.g. removing an item
    /// that is not there), which skips the write.
    pub fn edit(
        &self,
        edit: impl Fn(&mut ScheduleDoc) -> Result<bool, SyncError>,
    ) -> Result<bool, SyncError> {
        let path = self.config.layout.schedule_path.clone();
        let changed = with_conflict_retry(self.config.sync.conflict_retries, &path, || {
            let fetched = self.store.fetch(&path)?;
            let (mut doc, expected) = match &fetched {
                Some(blob) => (ScheduleDoc::parse(&path, &blob.content)?, Some(&blob.version)),
                None => (ScheduleDoc::default(), None),
            };
            if !edit(&mut doc)? {
                return Ok(None);
            }
            let rendered = doc.render().map_err(|err| {
                SyncError::Store(StoreError::Malformed {
                    path: path.clone(),
                    reason: err.to_string(),
                })
            })?;
            self.store
                .put(&path, &rendered, "📅 Update schedule", expected)?;
            Ok(Some(doc))
        })?;

        let Some(doc) = changed else {
            return Ok(false);
        };
        self.refresh_weekly_table(&doc);
        Ok(true)
    }

    /// The schedule table lives in the same document as the aggregated
    /// calendar. Failures here leave the table stale, never fail the
    /// schedule edit itself.
    fn refresh_weekly_table(&self, doc: &ScheduleDoc) {
        let Some(index) = self.config.indexes.iter().find(|i| i.aggregator.is_some()) else {
            return;
        };
        let heading = &self.config.layout.schedule_section;
        let result = with_conflict_retry(self.config.sync.conflict_retries, &index.path, || {
            let Some(blob) = self.store.fetch(&index.path)? else {
                return Ok(false);
            };
            let Some(next) = patch_schedule_section(&blob.content, heading, &doc.weekly_table())
            else {
                return Ok(false);
            };
            if next == blob.content {
                return Ok(true);
            }
            self.store.put(
                &index.path,
                &next,
                "📅 Update weekly schedule",
                Some(&blob.version),
            )?;
            Ok(true)
        });
        match result {
            Ok(true) => {}
            Ok(false) => warn::emit(WarnEvent {
                code: "PATCH_NOT_FOUND",
                stage: "schedule-table",
                path: &index.path,
                reason: "schedule-section-missing",
                err: "na",
            }),
            Err(err) => warn::emit(WarnEvent {
                code: "SCHEDULE_TABLE_WRITE_FAILED",
                stage: "schedule-table",
                path: &index.path,
                reason: "table-left-stale",
                err: &format!("{err:#}"),
            }),
        }
    }

    pub fn add_weekly(&self, day: &str, name: &str, kind: &str) -> Result<bool, SyncError> {
        self.edit(|doc| {
            doc.weekly
                .entry(day.to_string())
                .or_default()
                .push(ScheduleItem {
                    name: name.to_string(),
                    kind: kind.to_string(),
                });
            Ok(true)
        })
    }

    pub fn remove_weekly(&self, day: &str, index: usize) -> Result<bool, SyncError> {
        self.edit(|doc| {
            let Some(items) = doc.weekly.get_mut(day) else {
                return Ok(false);
            };
            if index >= items.len() {
                return Ok(false);
            }
            items.remove(index);
            Ok(true)
        })
    }

    /// Swap the item with its neighbor; `up` moves it earlier in the
    /// day's list.
    pub fn move_weekly(&self, day: &str, index: usize, up: bool) -> Result<bool, SyncError> {
        self.edit(|doc| {
            let Some(items) = doc.weekly.get_mut(day) else {
                return Ok(false);
            };
            let target = if up {
                index.checked_sub(1)
            } else {
                (index + 1 < items.len()).then_some(index + 1)
            };
            let Some(target) = target else {
                return Ok(false);
            };
            if index >= items.len() {
                return Ok(false);
            }
            items.swap(index, target);
            Ok(true)
        })
    }

    pub fn add_watch(&self, title: &str, kind: &str) -> Result<bool, SyncError> {
        self.edit(|doc| {
            doc.watchlist.push(WatchItem {
                title: title.to_string(),
                kind: kind.to_string(),
                status: Some("want".to_string()),
                completed: None,
                added_at: Some(Local::now().to_rfc3339()),
                completed_at: None,
            });
            Ok(true)
        })
    }

    pub fn finish_watch(&self, title: &str) -> Result<bool, SyncError> {
        self.edit(|doc| {
            let Some(item) = doc
                .watchlist
                .iter_mut()
                .find(|item| item.title == title && item.status.as_deref() != Some("done"))
            else {
                return Ok(false);
            };
            item.status = Some("done".to_string());
            item.completed_at = Some(Local::now().to_rfc3339());
            Ok(true)
        })
    }

    pub fn remove_watch(&self, title: &str) -> Result<bool, SyncError> {
        self.edit(|doc| {
            let before = doc.watchlist.len();
            doc.watchlist.retain(|item| item.title != title);
            Ok(doc.watchlist.len() != before)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::config::KirokuConfig;
    use crate::store::dir::DirStore;
    use tempfile::tempdir;

    fn test_config() -> KirokuConfig {
        let mut cfg = KirokuConfig::default();
        cfg.store.backend = "dir".to_string();
        cfg.store.dir_root = "unused".to_string();
        cfg
    }

    const README: &str = "# メディアログ\n\n## 聴取カレンダー\n\n## 週間スケジュール\n\n毎週の定期視聴番組\n\n| 曜日 | 番組 |\n|:--:|:--|\n| 月 | |\n| 火 | |\n| 水 | |\n| 木 | |\n| 金 | |\n| 土 | |\n| 日 | |\n\n---\n\n## メモ\n";

    #[test]
    fn weekly_add_updates_document_and_readme_table() {
        let tmp = tempdir().expect("tempdir");
        let store = DirStore::new(tmp.path());
        let config = test_config();
        store.put("README.md", README, "seed", None).expect("seed");

        let book = ScheduleBook::new(&store, &config);
        assert!(book.add_weekly("mon", "ラジオ深夜便", "radio").expect("add"));

        let doc = book.load().expect("load");
        assert_eq!(doc.weekly["mon"][0].name, "ラジオ深夜便");

        let readme = store
            .fetch("README.md")
            .expect("fetch")
            .expect("present")
            .content;
        assert!(readme.contains("| 月 | 📻 ラジオ深夜便 |"));
        // everything outside the schedule section is untouched
        assert!(readme.contains("## 聴取カレンダー"));
        assert!(readme.ends_with("\n---\n\n## メモ\n"));
    }

    #[test]
    fn move_and_remove_reorder_the_day_list() {
        let tmp = tempdir().expect("tempdir");
        let store = DirStore::new(tmp.path());
        let config = test_config();

        let book = ScheduleBook::new(&store, &config);
        book.add_weekly("fri", "A", "radio").expect("add A");
        book.add_weekly("fri", "B", "tv").expect("add B");

        assert!(book.move_weekly("fri", 1, true).expect("move up"));
        let doc = book.load().expect("load");
        assert_eq!(doc.weekly["fri"][0].name, "B");

        // already at the top
        assert!(!book.move_weekly("fri", 0, true).expect("move noop"));

        assert!(book.remove_weekly("fri", 0).expect("remove"));
        let doc = book.load().expect("load");
        assert_eq!(doc.weekly["fri"].len(), 1);
        assert_eq!(doc.weekly["fri"][0].name, "A");
    }

    #[test]
    fn watchlist_lifecycle() {
        let tmp = tempdir().expect("tempdir");
        let store = DirStore::new(tmp.path());
        let config = test_config();

        let book = ScheduleBook::new(&store, &config);
        book.add_watch("Dune", "movie").expect("add");
        assert!(book.finish_watch("Dune").expect("finish"));
        assert!(!book.finish_watch("Dune").expect("finish again"));

        let doc = book.load().expect("load");
        assert_eq!(doc.watchlist[0].status.as_deref(), Some("done"));
        assert!(doc.watchlist[0].completed_at.is_some());

        assert!(book.remove_watch("Dune").expect("remove"));
        assert!(!book.remove_watch("Dune").expect("remove again"));
    }

    #[test]
    fn legacy_completed_flag_migrates_to_status() {
        let raw = r#"{
  "weekly": {},
  "watchlist": [
    { "title": "Old Film", "type": "movie", "completed": true, "completedAt": "2023-11-02T10:00:00Z" }
  ]
}"#;
        let doc = ScheduleDoc::parse("schedule.json", raw).expect("parse");
        assert_eq!(doc.watchlist[0].status.as_deref(), Some("done"));
        assert_eq!(doc.watchlist[0].completed, None);
        assert!(!doc.render().expect("render").contains("\"completed\""));

        let counts = yearly_done_counts(&doc);
        assert_eq!(counts["2023"]["movie"], 1);
    }

    #[test]
    fn schedule_section_patch_preserves_surroundings() {
        let table = "| 曜日 | 番組 |\n|:--:|:--|\n| 月 | 📻 X |\n";
        let patched =
            patch_schedule_section(README, "## 週間スケジュール", table).expect("patched");
        assert!(patched.contains("## 週間スケジュール\n\n毎週の定期視聴番組\n\n| 曜日 | 番組 |"));
        assert!(patched.contains("| 月 | 📻 X |\n\n---\n\n## メモ\n"));
        assert!(patched.starts_with("# メディアログ\n\n## 聴取カレンダー\n"));

        assert!(patch_schedule_section("# no section\n", "## 週間スケジュール", table).is_none());
    }

    #[test]
    fn missing_document_loads_as_empty() {
        let tmp = tempdir().expect("tempdir");
        let store = DirStore::new(tmp.path());
        let config = test_config();
        let book = ScheduleBook::new(&store, &config);
        let doc = book.load().expect("load");
        assert!(doc.weekly.is_empty());
        assert!(doc.watchlist.is_empty());
    }
}
