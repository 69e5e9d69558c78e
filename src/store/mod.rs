pub mod blob;
pub mod dir;
pub mod github;

pub use blob::{Blob, BlobStore, VersionToken};
