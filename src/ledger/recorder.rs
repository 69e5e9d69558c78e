use crate::error::{StoreError, SyncError};
use crate::ledger::calendar::{self, CellPatch};
use crate::ledger::config::{IndexConfig, KirokuConfig};
use crate::ledger::dates::{self, DatePoints};
use crate::ledger::entry::{self, LedgerEntry};
use crate::ledger::month_log::MonthLog;
use crate::ledger::paths::KirokuPaths;
use crate::ledger::token;
use crate::ledger::undo::{self, UndoSlot};
use crate::ledger::util::now_epoch_secs;
use crate::ledger::warn::{self, WarnEvent};
use crate::store::BlobStore;

/// Outcome of one calendar-index write. Indexes are best-effort: a
/// failure is recorded here and logged, never escalated into rolling
/// back the month-log write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexWrite {
    Updated,
    Unchanged,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct IndexOutcome {
    pub path: String,
    pub write: IndexWrite,
}

#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub month_log_path: String,
    pub created_month_log: bool,
    pub undo_slot_saved: bool,
    pub indexes: Vec<IndexOutcome>,
}

#[derive(Debug, Clone)]
pub struct UndoOutcome {
    pub title: String,
    pub month_log_path: String,
    /// False when the block was already gone (hand-edited log); the
    /// undo still completes and clears the slot.
    pub removed_block: bool,
    pub indexes: Vec<IndexOutcome>,
}

/// Refetch-reapply loop for optimistic-concurrency conflicts. Each
/// attempt starts from a fresh fetch, so reapplying is safe; the
/// conflict surfaces once the budget is spent.
pub fn with_conflict_retry<T>(
    retries: u64,
    path: &str,
    mut attempt: impl FnMut() -> Result<T, SyncError>,
) -> Result<T, SyncError> {
    let mut used = 0u64;
    loop {
        match attempt() {
            Err(SyncError::Store(StoreError::Conflict { .. })) if used < retries => {
                used += 1;
                warn::emit(WarnEvent {
                    code: "CONFLICT_RETRY",
                    stage: "store-put",
                    path,
                    reason: "stale-version-refetching",
                    err: "na",
                });
            }
            other => return other,
        }
    }
}

/// Sequences the pure patchers against the blob store. One operation at
/// a time; every store round trip is fetch → patch in memory → put with
/// the fetched version, retried a bounded number of times on conflict.
pub struct Recorder<'a> {
    store: &'a dyn BlobStore,
    config: &'a KirokuConfig,
    paths: &'a KirokuPaths,
}

impl<'a> Recorder<'a> {
    pub fn new(store: &'a dyn BlobStore, config: &'a KirokuConfig, paths: &'a KirokuPaths) -> Self {
        Self {
            store,
            config,
            paths,
        }
    }

    pub fn record_entry(&self, entry: &LedgerEntry) -> Result<RecordOutcome, SyncError> {
        let result = self.record_entry_inner(entry);
        if let Err(err) = &result {
            self.react_to_auth_failure(err);
        }
        result
    }

    pub fn undo_last_entry(&self) -> Result<UndoOutcome, SyncError> {
        let result = self.undo_last_entry_inner();
        if let Err(err) = &result {
            self.react_to_auth_failure(err);
        }
        result
    }

    fn record_entry_inner(&self, entry: &LedgerEntry) -> Result<RecordOutcome, SyncError> {
        let points = dates::derive(&self.config.layout.log_dir, entry.target_date);
        let formatted = entry::format(entry);
        let log_message = format!("{} {} - {}", entry.category_tag, entry.channel, entry.title);

        let created = self.with_conflict_retry(&points.month_log_path, || {
            let fetched = self.store.fetch(&points.month_log_path)?;
            let (mut log, expected, created) = match &fetched {
                Some(blob) => (
                    MonthLog::parse(&points.month_log_path, &blob.content)?,
                    Some(&blob.version),
                    false,
                ),
                None => (MonthLog::new(points.year, points.month), None, true),
            };
            log.insert(&points.day_key, &formatted.block);
            self.store
                .put(&points.month_log_path, &log.render(), &log_message, expected)?;
            Ok(created)
        })?;

        let index_message = format!(
            "📅 {}/{} {}",
            points.month, points.day, formatted.short_title
        );
        let indexes = self
            .config
            .indexes
            .iter()
            .map(|index| self.insert_index_reference(index, &points, &formatted.short_title, &index_message))
            .collect();

        let slot = UndoSlot {
            title: entry.title.clone(),
            channel: entry.channel.clone(),
            url: entry.url.clone(),
            category_tag: entry.category_tag.clone(),
            short_title: formatted.short_title.clone(),
            month_log_path: points.month_log_path.clone(),
            day_key: points.day_key.clone(),
            year: points.year,
            month: points.month,
            day: points.day,
            saved_at_epoch_secs: now_epoch_secs().unwrap_or(0),
        };
        let undo_slot_saved = match undo::remember(self.paths, &slot) {
            Ok(_) => true,
            Err(err) => {
                warn::emit(WarnEvent {
                    code: "UNDO_STATE_WRITE_FAILED",
                    stage: "record",
                    path: &points.month_log_path,
                    reason: "undo-slot-not-persisted",
                    err: &format!("{err:#}"),
                });
                false
            }
        };

        Ok(RecordOutcome {
            month_log_path: points.month_log_path,
            created_month_log: created,
            undo_slot_saved,
            indexes,
        })
    }

    fn undo_last_entry_inner(&self) -> Result<UndoOutcome, SyncError> {
        let slot = undo::peek(self.paths)
            .map_err(|err| SyncError::UndoState(format!("{err:#}")))?
            .ok_or(SyncError::NoUndoAvailable)?;

        let heading = entry::heading_line(&slot.category_tag, &slot.channel, &slot.title);
        let log_message = format!("🗑️ Delete: {} - {}", slot.channel, slot.title);

        let removed_block = self.with_conflict_retry(&slot.month_log_path, || {
            let Some(blob) = self.store.fetch(&slot.month_log_path)? else {
                return Ok(false);
            };
            let mut log = MonthLog::parse(&slot.month_log_path, &blob.content)?;
            if !log.remove(&heading) {
                return Ok(false);
            }
            self.store
                .put(&slot.month_log_path, &log.render(), &log_message, Some(&blob.version))?;
            Ok(true)
        })?;
        if !removed_block {
            warn::emit(WarnEvent {
                code: "PATCH_NOT_FOUND",
                stage: "undo",
                path: &slot.month_log_path,
                reason: "entry-block-already-absent",
                err: "na",
            });
        }

        let points = DatePoints {
            year: slot.year,
            month: slot.month,
            day: slot.day,
            month_log_path: slot.month_log_path.clone(),
            day_key: slot.day_key.clone(),
            anchor: format!("{}{}", slot.month, slot.day),
        };
        let index_message = format!("🗑️ Remove from calendar: {}/{}", slot.month, slot.day);
        let indexes = self
            .config
            .indexes
            .iter()
            .map(|index| self.remove_index_reference(index, &points, &slot.short_title, &index_message))
            .collect();

        undo::forget(self.paths).map_err(|err| SyncError::UndoState(format!("{err:#}")))?;

        Ok(UndoOutcome {
            title: slot.title,
            month_log_path: slot.month_log_path,
            removed_block,
            indexes,
        })
    }

    fn insert_index_reference(
        &self,
        index: &IndexConfig,
        points: &DatePoints,
        short_title: &str,
        message: &str,
    ) -> IndexOutcome {
        let result = self.with_conflict_retry(&index.path, || {
            // an index that has never been written starts from a skeleton
            let fetched = self.store.fetch(&index.path)?;
            let (content, expected) = match &fetched {
                Some(blob) => (blob.content.clone(), Some(&blob.version)),
                None => (calendar::empty_index_document(index), None),
            };
            match calendar::insert_reference(&content, &index.path, index, points, short_title)? {
                CellPatch::Updated(next) => {
                    self.store.put(&index.path, &next, message, expected)?;
                    Ok(IndexWrite::Updated)
                }
                CellPatch::Unchanged => Ok(IndexWrite::Unchanged),
                CellPatch::Skipped(reason) => Ok(IndexWrite::Skipped(reason.to_string())),
            }
        });
        self.settle_index_write(index, "calendar-insert", result)
    }

    fn remove_index_reference(
        &self,
        index: &IndexConfig,
        points: &DatePoints,
        short_title: &str,
        message: &str,
    ) -> IndexOutcome {
        let result = self.with_conflict_retry(&index.path, || {
            let Some(blob) = self.store.fetch(&index.path)? else {
                return Ok(IndexWrite::Skipped("index document missing".to_string()));
            };
            match calendar::remove_reference(&blob.content, &index.path, index, points, short_title)? {
                CellPatch::Updated(next) => {
                    self.store.put(&index.path, &next, message, Some(&blob.version))?;
                    Ok(IndexWrite::Updated)
                }
                CellPatch::Unchanged => Ok(IndexWrite::Unchanged),
                CellPatch::Skipped(reason) => Ok(IndexWrite::Skipped(reason.to_string())),
            }
        });
        self.settle_index_write(index, "calendar-remove", result)
    }

    /// Best-effort semantics for index writes: failures and skips are
    /// logged and reported, never propagated.
    fn settle_index_write(
        &self,
        index: &IndexConfig,
        stage: &str,
        result: Result<IndexWrite, SyncError>,
    ) -> IndexOutcome {
        let write = match result {
            Ok(write) => {
                if let IndexWrite::Skipped(reason) = &write {
                    warn::emit(WarnEvent {
                        code: "PATCH_NOT_FOUND",
                        stage,
                        path: &index.path,
                        reason,
                        err: "na",
                    });
                }
                write
            }
            Err(err) => {
                self.react_to_auth_failure(&err);
                warn::emit(WarnEvent {
                    code: "CALENDAR_WRITE_FAILED",
                    stage,
                    path: &index.path,
                    reason: "index-left-stale",
                    err: &format!("{err:#}"),
                });
                IndexWrite::Failed(err.to_string())
            }
        };
        IndexOutcome {
            path: index.path.clone(),
            write,
        }
    }

    fn with_conflict_retry<T>(
        &self,
        path: &str,
        attempt: impl FnMut() -> Result<T, SyncError>,
    ) -> Result<T, SyncError> {
        with_conflict_retry(self.config.sync.conflict_retries, path, attempt)
    }

    /// A rejected credential aborts the operation and drops the stored
    /// token file so the caller can re-prompt.
    fn react_to_auth_failure(&self, err: &SyncError) {
        if !matches!(err, SyncError::Store(StoreError::AuthFailure)) {
            return;
        }
        if let Err(clear_err) = token::clear(self.paths) {
            warn::emit(WarnEvent {
                code: "TOKEN_CLEAR_FAILED",
                stage: "auth",
                path: "token-file",
                reason: "credential-rejected-but-not-cleared",
                err: &format!("{clear_err:#}"),
            });
        }
    }
}
