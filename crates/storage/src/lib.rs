//! Object-storage collaborator.
//!
//! The chat core never owns file bytes. Uploads and signed-URL issuance
//! happen elsewhere; this crate exposes only the download capability the
//! streaming pipeline needs to inline attachment content.

pub mod s3;

use async_trait::async_trait;

pub use s3::S3FileStore;

/// Errors from the object-storage collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The referenced file could not be downloaded.
    #[error("Download failed for file {file_id}: {reason}")]
    Download { file_id: String, reason: String },
}

/// Download capability over previously uploaded files.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Fetch the full content of a stored file into memory.
    async fn download_to_buffer(&self, file_id: &str) -> Result<Vec<u8>, StorageError>;
}
