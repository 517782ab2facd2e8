//! Dry-run decorator: reads hit the wrapped store, writes are only logged.

use super::{ListOptions, ObjectStore, StorageEntry, UploadOptions};
use crate::error::StorageError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub struct DryRunStore {
    inner: Arc<dyn ObjectStore>,
}

impl DryRunStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ObjectStore for DryRunStore {
    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        options: ListOptions,
    ) -> Result<Vec<StorageEntry>, StorageError> {
        self.inner.list(bucket, prefix, options).await
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StorageError> {
        self.inner.download(bucket, path).await
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<(), StorageError> {
        info!(
            "[dry-run] would upload {}/{} ({} bytes, {}, {})",
            bucket,
            path,
            bytes.len(),
            options.content_type,
            options.cache_control
        );
        Ok(())
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), StorageError> {
        if !paths.is_empty() {
            info!("[dry-run] would remove from {}: {}", bucket, paths.join(", "));
        }
        Ok(())
    }
}
