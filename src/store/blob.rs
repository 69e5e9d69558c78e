use crate::error::StoreError;

/// Opaque per-path token for optimistic concurrency. A put supplying a
/// stale token is rejected with `Conflict` instead of overwriting
/// concurrent changes.
pub type VersionToken = String;

#[derive(Debug, Clone)]
pub struct Blob {
    pub content: String,
    pub version: VersionToken,
}

/// The storage boundary of the engine. Documents are addressed by
/// store-relative paths; every mutation is a compare-and-swap against
/// the version fetched earlier.
pub trait BlobStore {
    /// `Ok(None)` means the path has never been written.
    fn fetch(&self, path: &str) -> Result<Option<Blob>, StoreError>;

    /// Write `content` at `path`. `expected` must match the path's
    /// current version (`None` to create). `message` describes the
    /// change for backends that keep history.
    fn put(
        &self,
        path: &str,
        content: &str,
        message: &str,
        expected: Option<&VersionToken>,
    ) -> Result<VersionToken, StoreError>;
}
