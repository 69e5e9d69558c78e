use thiserror::Error;

/// Failures raised by a blob store backend. Every variant maps onto one
/// observable wire condition; backends never panic on bad responses.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store credential rejected")]
    AuthFailure,
    #[error("version conflict writing {path}")]
    Conflict { path: String },
    #[error("malformed store payload for {path}: {reason}")]
    Malformed { path: String, reason: String },
}

/// Failures surfaced by the record/undo engine to its caller.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no entry available to undo")]
    NoUndoAvailable,
    #[error("document {path} does not match the expected layout: {reason}")]
    InvalidDocument { path: String, reason: String },
    #[error("undo state unusable: {0}")]
    UndoState(String),
}

impl SyncError {
    pub fn invalid_document(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDocument {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
