//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file locali e le utilità sui formati.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva dei media supportati nella directory sorgente
//! - Determinazione formato (raster, immagine, audio) e content type
//! - Lettura dei bytes di un asset dalla sorgente locale
//! - Formattazione human-readable delle dimensioni e calcolo riduzione
//!
//! ## Formati supportati:
//! - **Immagini**: PNG, JPG, JPEG, WebP
//! - **Audio**: MP3, M4A, WAV
//!
//! ## Esempio:
//! ```rust,ignore
//! let assets = FileManager::find_media_files(Path::new("assets"))?;
//! for asset in assets {
//!     let bytes = FileManager::read_asset(Path::new("assets"), &asset).await?;
//! }
//! ```

use crate::asset::AssetPath;
use anyhow::Result;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extensions the pipeline picks up from either source
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "mp3", "m4a", "wav"];

/// Manages local file operations and format helpers
pub struct FileManager;

impl FileManager {
    /// Find all supported media files below `media_dir`, relative and sorted
    pub fn find_media_files(media_dir: &Path) -> Result<Vec<AssetPath>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(media_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("Skipping unreadable entry below {}: {}", media_dir.display(), err);
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if !Self::is_supported_format(&path.to_string_lossy()) {
                continue;
            }
            let relative = path.strip_prefix(media_dir)?;
            files.push(AssetPath::from_relative(relative));
        }

        files.sort();
        debug!("Local walk of {} found {} assets", media_dir.display(), files.len());
        Ok(files)
    }

    /// Read the bytes of an asset below the local source root
    pub async fn read_asset(root: &Path, asset: &AssetPath) -> Result<Vec<u8>> {
        let full_path = asset
            .as_str()
            .split('/')
            .fold(root.to_path_buf(), |acc, segment| acc.join(segment));
        Ok(fs::read(&full_path).await?)
    }

    fn extension_of(name: &str) -> Option<String> {
        AssetPath::new(name).extension()
    }

    /// Check if a file name carries an allowlisted extension
    pub fn is_supported_format(name: &str) -> bool {
        Self::extension_of(name)
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }

    /// Raster formats the transcoder is allowed to transform
    pub fn is_raster_extension(ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "png" | "jpg" | "jpeg")
    }

    /// Image formats (raster plus webp)
    pub fn is_image_extension(ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "png" | "jpg" | "jpeg" | "webp")
    }

    /// Natural MIME type of an extension
    pub fn content_type_for(ext: &str) -> &'static str {
        match ext.to_lowercase().as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "webp" => "image/webp",
            "mp3" => "audio/mpeg",
            "m4a" => "audio/mp4",
            "wav" => "audio/wav",
            _ => "application/octet-stream",
        }
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction (negative when the output grew)
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_media_files_filters_and_relativizes() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("images/comic")).unwrap();
        std::fs::create_dir_all(root.join("audio")).unwrap();
        std::fs::write(root.join("images/comic/page1.png"), b"png").unwrap();
        std::fs::write(root.join("images/comic/notes.txt"), b"txt").unwrap();
        std::fs::write(root.join("audio/intro.MP3"), b"mp3").unwrap();
        std::fs::write(root.join("README"), b"readme").unwrap();

        let files = FileManager::find_media_files(root).unwrap();
        let names: Vec<&str> = files.iter().map(|p| p.as_str()).collect();
        assert_eq!(names, vec!["audio/intro.MP3", "images/comic/page1.png"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_link_is_skipped() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("images")).unwrap();
        std::fs::write(root.join("images/ok.png"), b"png").unwrap();
        std::os::unix::fs::symlink(root.join("missing.png"), root.join("images/gone.png")).unwrap();

        let files = FileManager::find_media_files(root).unwrap();
        assert_eq!(files, vec![AssetPath::new("images/ok.png")]);
    }

    #[test]
    fn test_read_asset_joins_segments() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("images/logos")).unwrap();
        std::fs::write(dir.path().join("images/logos/icon.png"), b"icon").unwrap();

        let bytes = tokio_test::block_on(FileManager::read_asset(
            dir.path(),
            &AssetPath::new("images/logos/icon.png"),
        ))
        .unwrap();
        assert_eq!(bytes, b"icon");
    }

    #[test]
    fn test_content_types() {
        assert_eq!(FileManager::content_type_for("PNG"), "image/png");
        assert_eq!(FileManager::content_type_for("jpeg"), "image/jpeg");
        assert_eq!(FileManager::content_type_for("m4a"), "audio/mp4");
        assert_eq!(FileManager::content_type_for("bin"), "application/octet-stream");
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(FileManager::format_size(512), "512 B");
        assert_eq!(FileManager::format_size(2048), "2.00 KB");
        assert_eq!(FileManager::calculate_reduction(200, 50), 75.0);
        assert_eq!(FileManager::calculate_reduction(0, 50), 0.0);
        assert!(FileManager::is_raster_extension("JPG"));
        assert!(!FileManager::is_raster_extension("webp"));
        assert!(FileManager::is_image_extension("webp"));
    }
}
