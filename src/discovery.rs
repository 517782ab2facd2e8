//! # Asset Discovery Module
//!
//! Individua gli asset candidati da una delle due sorgenti.
//!
//! ## Modalità:
//! - **Locale**: la directory sorgente esiste, walk ricorsivo con allowlist
//! - **Mirror remoto**: la directory non esiste, listing ricorsivo del
//!   bucket sorgente con paginazione a offset
//!
//! Nel listing remoto le entry con `id == None` sono cartelle. Una pagina più
//! corta di `PAGE_SIZE` chiude la cartella. Un errore di listing su una
//! cartella viene loggato e la cartella saltata, la discovery continua.

use crate::asset::AssetPath;
use crate::error::StorageError;
use crate::file_manager::FileManager;
use crate::storage::{ListOptions, ObjectStore};
use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Entries requested per listing call
pub const PAGE_SIZE: usize = 1000;

/// Where assets are discovered and read from
#[derive(Clone)]
pub enum AssetSource {
    Local(PathBuf),
    Remote {
        store: Arc<dyn ObjectStore>,
        bucket: String,
    },
}

impl AssetSource {
    /// Local source if `source_dir` exists, otherwise mirror `source_bucket`
    pub fn select(source_dir: &Path, store: Arc<dyn ObjectStore>, source_bucket: &str) -> Self {
        if source_dir.is_dir() {
            info!("Using local source directory: {}", source_dir.display());
            Self::Local(source_dir.to_path_buf())
        } else {
            info!(
                "Source directory {} not found, mirroring bucket '{}'",
                source_dir.display(),
                source_bucket
            );
            Self::Remote {
                store,
                bucket: source_bucket.to_string(),
            }
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// All allowlisted assets, sorted by path
    pub async fn discover(&self) -> Result<Vec<AssetPath>> {
        match self {
            Self::Local(root) => FileManager::find_media_files(root),
            Self::Remote { store, bucket } => list_bucket(store.as_ref(), bucket)
                .await
                .with_context(|| format!("Failed to list bucket '{}'", bucket)),
        }
    }

    /// Raw bytes of one discovered asset
    pub async fn read(&self, asset: &AssetPath) -> Result<Vec<u8>> {
        match self {
            Self::Local(root) => FileManager::read_asset(root, asset)
                .await
                .with_context(|| format!("Failed to read {}", asset)),
            Self::Remote { store, bucket } => store
                .download(bucket, asset.as_str())
                .await
                .with_context(|| format!("Failed to download {}/{}", bucket, asset)),
        }
    }
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(root) => write!(f, "{}", root.display()),
            Self::Remote { bucket, .. } => write!(f, "bucket:{}", bucket),
        }
    }
}

/// Recursive listing of a whole bucket
/// Only a failure on the bucket root is an error; sub-folders are skipped
async fn list_bucket(store: &dyn ObjectStore, bucket: &str) -> Result<Vec<AssetPath>, StorageError> {
    let mut assets = Vec::new();
    let mut pending = vec![String::new()];

    while let Some(prefix) = pending.pop() {
        let mut offset = 0;
        loop {
            let options = ListOptions {
                limit: PAGE_SIZE,
                offset,
            };
            let page = match store.list(bucket, &prefix, options).await {
                Ok(page) => page,
                Err(e) if prefix.is_empty() => return Err(e),
                Err(e) => {
                    warn!("Skipping folder '{}' in bucket '{}': {}", prefix, bucket, e);
                    break;
                }
            };
            debug!("Listed {} entries under '{}' (offset {})", page.len(), prefix, offset);

            for entry in &page {
                let path = if prefix.is_empty() {
                    entry.name.clone()
                } else {
                    format!("{}/{}", prefix, entry.name)
                };
                if entry.is_folder() {
                    pending.push(path);
                } else if FileManager::is_supported_format(&entry.name) {
                    assets.push(AssetPath::new(path));
                }
            }

            if page.len() < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }
    }

    assets.sort();
    info!("Remote listing of '{}' found {} assets", bucket, assets.len());
    Ok(assets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_remote_pagination_reads_every_page() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..2500 {
            store.insert("source", &format!("comic/p{:04}.png", i), vec![0], "image/png");
        }
        let source = AssetSource::Remote {
            store: store.clone(),
            bucket: "source".to_string(),
        };

        let assets = source.discover().await.unwrap();
        assert_eq!(assets.len(), 2500);
        assert_eq!(assets[0].as_str(), "comic/p0000.png");
        assert_eq!(assets[2499].as_str(), "comic/p2499.png");
        // Root listing plus pages at offsets 0, 1000, 2000
        assert_eq!(store.list_calls(), 4);
    }

    #[tokio::test]
    async fn test_exact_page_boundary_requests_one_more_page() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..1000 {
            store.insert("source", &format!("p{:04}.png", i), vec![0], "image/png");
        }
        let source = AssetSource::Remote {
            store: store.clone(),
            bucket: "source".to_string(),
        };

        assert_eq!(source.discover().await.unwrap().len(), 1000);
        assert_eq!(store.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_remote_recurses_and_filters() {
        let store = Arc::new(MemoryStore::new());
        store.insert("source", "images/logo/brand.PNG", vec![1], "image/png");
        store.insert("source", "audio/theme.mp3", vec![2], "audio/mpeg");
        store.insert("source", "docs/readme.txt", vec![3], "text/plain");
        store.insert("source", "images/deep/nested/bg.jpg", vec![4], "image/jpeg");
        let source = AssetSource::Remote {
            store,
            bucket: "source".to_string(),
        };

        let assets: Vec<String> = source
            .discover()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(
            assets,
            vec!["audio/theme.mp3", "images/deep/nested/bg.jpg", "images/logo/brand.PNG"]
        );
    }

    #[tokio::test]
    async fn test_failed_folder_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        store.insert("source", "broken/a.png", vec![1], "image/png");
        store.insert("source", "ok/b.png", vec![2], "image/png");
        store.fail_listing_of("broken");
        let source = AssetSource::Remote {
            store,
            bucket: "source".to_string(),
        };

        let assets = source.discover().await.unwrap();
        assert_eq!(assets, vec![AssetPath::new("ok/b.png")]);
    }

    #[tokio::test]
    async fn test_root_listing_failure_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        store.insert("source", "ok/b.png", vec![2], "image/png");
        store.fail_listing_of("");
        let source = AssetSource::Remote {
            store,
            bucket: "source".to_string(),
        };

        let err = source.discover().await.unwrap_err();
        assert!(err.to_string().contains("Failed to list bucket 'source'"));
        assert!(matches!(
            err.downcast_ref::<StorageError>(),
            Some(StorageError::Api { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_select_prefers_existing_directory() {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());

        let local = AssetSource::select(dir.path(), store.clone(), "source");
        assert!(!local.is_remote());

        let remote = AssetSource::select(&dir.path().join("missing"), store, "source");
        assert!(remote.is_remote());
        assert_eq!(remote.to_string(), "bucket:source");
    }

    #[tokio::test]
    async fn test_read_from_both_sources() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("images")).unwrap();
        std::fs::write(dir.path().join("images/a.png"), b"local").unwrap();
        let local = AssetSource::Local(dir.path().to_path_buf());
        assert_eq!(local.read(&AssetPath::new("images/a.png")).await.unwrap(), b"local");

        let store = Arc::new(MemoryStore::new());
        store.insert("source", "images/a.png", b"remote".to_vec(), "image/png");
        let remote = AssetSource::Remote {
            store,
            bucket: "source".to_string(),
        };
        assert_eq!(remote.read(&AssetPath::new("images/a.png")).await.unwrap(), b"remote");
        assert!(remote.read(&AssetPath::new("images/missing.png")).await.is_err());
    }
}
