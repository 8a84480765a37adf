//! Seams between the orchestrator and the durable stores.

use canvass_core::VisitRecord;
use futures::future::BoxFuture;

use crate::error::StorageError;

/// Photo bytes as they will be uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime: String,
}

impl std::fmt::Debug for PhotoUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoUpload")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("filename", &self.filename)
            .field("mime", &self.mime)
            .finish()
    }
}

/// Durable object storage that returns a public link for each upload.
pub trait PhotoStore: Send + Sync {
    /// Stores the photo and returns a stable, publicly dereferencable URL.
    fn upload(&self, photo: PhotoUpload) -> BoxFuture<'_, Result<String, StorageError>>;
}

/// Append-only tabular store for visit rows.
pub trait VisitStore: Send + Sync {
    fn append(&self, record: VisitRecord) -> BoxFuture<'_, Result<(), StorageError>>;
}
