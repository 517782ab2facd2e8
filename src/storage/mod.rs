//! # Object Storage Module
//!
//! Interfaccia verso l'object store remoto (sorgente in modalità mirror e
//! destinazione degli upload).
//!
//! ## Componenti:
//! - `ObjectStore`: trait con le quattro operazioni usate dalla pipeline
//! - `SupabaseStorage`: implementazione sulla REST API di Supabase Storage
//! - `DryRunStore`: decorator che inoltra le letture e logga le scritture
//!
//! Nelle listing le entry con `id == None` sono cartelle.

use crate::error::StorageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod dry_run;
#[cfg(test)]
pub(crate) mod memory;
pub mod supabase;

pub use dry_run::DryRunStore;
pub use supabase::SupabaseStorage;

/// One entry of a bucket listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub name: String,
    /// `None` for folders
    #[serde(default)]
    pub id: Option<String>,
}

impl StorageEntry {
    pub fn file(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: Some(id.into()),
        }
    }

    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.id.is_none()
    }
}

/// Pagination for `list`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub limit: usize,
    pub offset: usize,
}

/// Options for `upload`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub content_type: String,
    pub cache_control: String,
    pub overwrite: bool,
}

impl UploadOptions {
    /// Overwriting upload with `max-age=<cache_secs>`
    pub fn overwrite(content_type: impl Into<String>, cache_secs: u64) -> Self {
        Self {
            content_type: content_type.into(),
            cache_control: format!("max-age={}", cache_secs),
            overwrite: true,
        }
    }
}

/// Remote object store operations used by the pipeline
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List the direct children of `prefix` (empty for the bucket root)
    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        options: ListOptions,
    ) -> Result<Vec<StorageEntry>, StorageError>;

    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StorageError>;

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<(), StorageError>;

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), StorageError>;
}
