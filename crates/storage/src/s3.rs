//! S3 implementation of the [`FileStore`] trait.

use async_trait::async_trait;
use aws_sdk_s3::Client;

use crate::{FileStore, StorageError};

/// File store backed by an S3 (or S3-compatible) bucket.
///
/// File ids are object keys within the configured bucket.
pub struct S3FileStore {
    client: Client,
    bucket: String,
}

impl S3FileStore {
    /// Build a store from the ambient AWS configuration (env credentials,
    /// region, optional custom endpoint).
    pub async fn from_env(bucket: String) -> Self {
        let config = aws_config::load_from_env().await;
        Self {
            client: Client::new(&config),
            bucket,
        }
    }

    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl FileStore for S3FileStore {
    async fn download_to_buffer(&self, file_id: &str) -> Result<Vec<u8>, StorageError> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(file_id)
            .send()
            .await
            .map_err(|e| StorageError::Download {
                file_id: file_id.to_string(),
                reason: e.to_string(),
            })?;

        let bytes = object
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Download {
                file_id: file_id.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(file_id, bucket = %self.bucket, "Downloaded attachment from S3");
        Ok(bytes.into_bytes().to_vec())
    }
}
