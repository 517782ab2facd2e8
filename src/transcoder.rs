//! # Image Transcoder
//!
//! Trasforma i bytes di un'immagine secondo il profilo della sua categoria.
//!
//! ## Pipeline
//!
//! | Input            | Profilo webp                       | Profilo jpeg/original              |
//! |------------------|------------------------------------|------------------------------------|
//! | png / jpg / jpeg | resize best-effort → `cwebp -q`    | skip se < minSize, resize (+ jpeg) |
//! | webp / altro     | passthrough                        | passthrough                        |
//!
//! - Con output webp la regola `min_size_bytes` non si applica: il solo
//!   cambio di formato di solito conviene
//! - Un resize fallito (o nessun backend supportato) non è un errore: si
//!   passa all'encoder l'immagine originale
//! - Encoder assente o fallito → `Err(TranscodeError)`. Il transcoder non
//!   conosce le categorie: decide l'orchestratore se è fatale
//! - Per output non-webp il risultato è accettato solo se strettamente più
//!   piccolo dell'originale
//! - Tutti i file intermedi vivono in una `TempDir` rimossa su ogni uscita

use crate::asset::OptimizedAsset;
use crate::classifier::{OptimizationProfile, OutputFormat};
use crate::encoder::WebpEncoder;
use crate::error::TranscodeError;
use crate::file_manager::FileManager;
use crate::resize::ResizeBackend;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Optimizes raster images according to a profile
pub struct ImageTranscoder {
    resizer: Arc<dyn ResizeBackend>,
    encoder: Arc<WebpEncoder>,
    temp_root: Option<PathBuf>,
}

impl ImageTranscoder {
    pub fn new(resizer: Arc<dyn ResizeBackend>, encoder: Arc<WebpEncoder>) -> Self {
        Self {
            resizer,
            encoder,
            temp_root: None,
        }
    }

    /// Create intermediate directories below `root` instead of the system temp dir
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    pub fn encoder(&self) -> &Arc<WebpEncoder> {
        &self.encoder
    }

    /// Transcode `bytes` (with source `extension`) according to `profile`
    pub async fn transcode(
        &self,
        bytes: &[u8],
        extension: &str,
        profile: &OptimizationProfile,
    ) -> Result<OptimizedAsset, TranscodeError> {
        let ext = extension.to_lowercase();
        if !FileManager::is_raster_extension(&ext) {
            debug!("Passthrough for .{} input", ext);
            return Ok(Self::passthrough(bytes, &ext));
        }

        // Dropped (and deleted) on every return path below
        let mut builder = tempfile::Builder::new();
        builder.prefix("asset-sync-");
        let workdir = match self.temp_root {
            Some(ref root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let source = workdir.path().join(format!("source.{}", ext));
        tokio::fs::write(&source, bytes).await?;

        match profile.output_format {
            OutputFormat::Webp => self.to_webp(&workdir, &source, &ext, profile).await,
            OutputFormat::Jpeg | OutputFormat::Original => {
                self.recompress(&workdir, &source, bytes, &ext, profile).await
            }
        }
    }

    async fn to_webp(
        &self,
        workdir: &TempDir,
        source: &Path,
        ext: &str,
        profile: &OptimizationProfile,
    ) -> Result<OptimizedAsset, TranscodeError> {
        let encoder_input = self
            .try_resize(workdir, source, ext, profile.max_dimension)
            .await
            .unwrap_or_else(|| source.to_path_buf());

        let output = workdir.path().join("encoded.webp");
        self.encoder.encode(&encoder_input, &output, profile.quality).await?;

        let encoded = tokio::fs::read(&output).await?;
        Ok(OptimizedAsset::new(encoded, "image/webp"))
    }

    async fn recompress(
        &self,
        workdir: &TempDir,
        source: &Path,
        original: &[u8],
        ext: &str,
        profile: &OptimizationProfile,
    ) -> Result<OptimizedAsset, TranscodeError> {
        if (original.len() as u64) < profile.min_size_bytes {
            debug!(
                "Skipping {} bytes input below minimum {}",
                original.len(),
                profile.min_size_bytes
            );
            return Ok(Self::passthrough(original, ext));
        }
        if !self.resizer.is_supported() {
            debug!("Resize backend {} unsupported, passthrough", self.resizer.name());
            return Ok(Self::passthrough(original, ext));
        }

        let resized = workdir.path().join(format!("resized.{}", ext));
        self.resizer
            .resize(source, &resized, profile.max_dimension)
            .await?;

        let as_jpeg = profile.output_format == OutputFormat::Jpeg || matches!(ext, "jpg" | "jpeg");
        let (result_path, content_type) = if as_jpeg {
            let recompressed = workdir.path().join("recompressed.jpg");
            self.resizer
                .recompress(&resized, &recompressed, profile.quality)
                .await?;
            (recompressed, "image/jpeg")
        } else {
            (resized, FileManager::content_type_for(ext))
        };

        let candidate = tokio::fs::read(&result_path).await?;
        if candidate.len() < original.len() {
            Ok(OptimizedAsset::new(candidate, content_type))
        } else {
            debug!(
                "Optimized output not smaller ({} >= {}), keeping original",
                candidate.len(),
                original.len()
            );
            Ok(Self::passthrough(original, ext))
        }
    }

    /// Best-effort resize; `None` means "use the original"
    async fn try_resize(
        &self,
        workdir: &TempDir,
        source: &Path,
        ext: &str,
        max_dimension: u32,
    ) -> Option<PathBuf> {
        if !self.resizer.is_supported() {
            return None;
        }
        let resized = workdir.path().join(format!("resized.{}", ext));
        match self.resizer.resize(source, &resized, max_dimension).await {
            Ok(()) => Some(resized),
            Err(e) => {
                warn!("Resize with {} failed, encoding original: {}", self.resizer.name(), e);
                None
            }
        }
    }

    fn passthrough(bytes: &[u8], ext: &str) -> OptimizedAsset {
        OptimizedAsset::new(bytes.to_vec(), FileManager::content_type_for(ext))
    }
}
