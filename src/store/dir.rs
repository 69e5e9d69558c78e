use crate::error::StoreError;
use crate::store::blob::{Blob, BlobStore, VersionToken};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Blob store backed by a local directory. Version tokens are content
/// hashes, so a put races correctly against any out-of-band edit of the
/// same file. Used for offline ledgers and by the integration tests.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path);
        let traversal = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if traversal || path.trim().is_empty() {
            return Err(StoreError::Malformed {
                path: path.to_string(),
                reason: "path must be relative and stay inside the store".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

fn content_version(content: &str) -> VersionToken {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl BlobStore for DirStore {
    fn fetch(&self, path: &str) -> Result<Option<Blob>, StoreError> {
        let file = self.resolve(path)?;
        if !file.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&file)
            .map_err(|err| StoreError::Unavailable(format!("{}: {err}", file.display())))?;
        let version = content_version(&content);
        Ok(Some(Blob { content, version }))
    }

    fn put(
        &self,
        path: &str,
        content: &str,
        _message: &str,
        expected: Option<&VersionToken>,
    ) -> Result<VersionToken, StoreError> {
        let file = self.resolve(path)?;

        let current = if file.exists() {
            let raw = fs::read_to_string(&file)
                .map_err(|err| StoreError::Unavailable(format!("{}: {err}", file.display())))?;
            Some(content_version(&raw))
        } else {
            None
        };
        if current.as_deref() != expected.map(String::as_str) {
            return Err(StoreError::Conflict {
                path: path.to_string(),
            });
        }

        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| StoreError::Unavailable(format!("{}: {err}", parent.display())))?;
        }
        fs::write(&file, content)
            .map_err(|err| StoreError::Unavailable(format!("{}: {err}", file.display())))?;
        Ok(content_version(content))
    }
}
