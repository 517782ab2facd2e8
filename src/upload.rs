//! # Upload & Legacy Cleanup
//!
//! Calcola il path finale di upload e gestisce la rimozione dei file
//! "legacy" rimasti da formati precedenti.
//!
//! ## Regole:
//! - Il path viene riscritto in `.webp` solo se il content type ottimizzato è
//!   `image/webp` e l'estensione originale è `png/jpg/jpeg/webp`
//! - I candidati legacy esistono solo nel namespace `images` e solo se il
//!   path di upload termina in `.webp`: stesso stem con `.png`, `.jpg`,
//!   `.jpeg`, mai il path di upload stesso
//! - L'upload sovrascrive sempre; la cleanup parte solo dopo un upload
//!   riuscito ed è best-effort

use crate::asset::{AssetPath, OptimizedAsset};
use crate::error::StorageError;
use crate::file_manager::FileManager;
use crate::storage::{ObjectStore, UploadOptions};
use std::sync::Arc;
use tracing::{debug, warn};

/// One year
pub const DEFAULT_CACHE_SECS: u64 = 31_536_000;

const WEBP_CONTENT_TYPE: &str = "image/webp";
const LEGACY_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Destination path and the stale siblings to delete after upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub upload_path: AssetPath,
    pub legacy_paths: Vec<AssetPath>,
}

impl UploadPlan {
    pub fn new(path: &AssetPath, optimized: &OptimizedAsset) -> Self {
        let rewrite = optimized.content_type == WEBP_CONTENT_TYPE
            && path
                .extension()
                .map(|ext| FileManager::is_image_extension(&ext))
                .unwrap_or(false);

        let upload_path = if rewrite {
            path.with_extension("webp")
        } else {
            path.clone()
        };

        let legacy_paths = if is_images_namespace(&upload_path)
            && upload_path.extension().as_deref() == Some("webp")
        {
            let mut candidates: Vec<AssetPath> = LEGACY_EXTENSIONS
                .iter()
                .map(|ext| upload_path.with_extension(ext))
                .collect();
            // The source itself, which may differ from the lowercase siblings only by case
            if !candidates.contains(path) {
                candidates.push(path.clone());
            }
            candidates.retain(|candidate| candidate != &upload_path);
            candidates
        } else {
            Vec::new()
        };

        Self {
            upload_path,
            legacy_paths,
        }
    }

    pub fn is_rewritten(&self, original: &AssetPath) -> bool {
        &self.upload_path != original
    }
}

fn is_images_namespace(path: &AssetPath) -> bool {
    let path = path.as_str();
    path.starts_with("images/") || path.contains("/images/")
}

/// Writes planned uploads to the destination bucket
pub struct UploadManager {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    cache_secs: u64,
}

impl UploadManager {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, cache_secs: u64) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            cache_secs,
        }
    }

    /// Upload then remove legacy siblings; only the upload can fail the asset
    pub async fn execute(&self, plan: &UploadPlan, optimized: &OptimizedAsset) -> Result<(), StorageError> {
        let options = UploadOptions::overwrite(&optimized.content_type, self.cache_secs);
        self.store
            .upload(
                &self.bucket,
                plan.upload_path.as_str(),
                optimized.bytes.clone(),
                &options,
            )
            .await?;
        debug!("Uploaded {}/{}", self.bucket, plan.upload_path);

        if plan.legacy_paths.is_empty() {
            return Ok(());
        }

        let legacy: Vec<String> = plan.legacy_paths.iter().map(|p| p.to_string()).collect();
        match self.store.remove(&self.bucket, &legacy).await {
            Ok(()) => debug!("Removed legacy candidates for {}: {:?}", plan.upload_path, legacy),
            Err(e) => warn!("Legacy cleanup failed for {}: {}", plan.upload_path, e),
        }
        Ok(())
    }
}
