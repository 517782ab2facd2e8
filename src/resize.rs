//! # Image Resize Module
//!
//! Questo modulo modella la capacità di resize come interfaccia esplicita
//! (`ResizeBackend`) con una query `is_supported()`, così che il backend
//! possa cambiare per piattaforma senza toccare i call site.
//!
//! ## Backend disponibili
//! 1. **sips** - nativo macOS (`sips -Z <max>`), usato solo sugli host Apple
//! 2. **magick / convert** - ImageMagick 7.x o 6.x se installato
//! 3. **portable** - in-process con il crate `image`, sempre disponibile
//! 4. **none** - nessun resize: le immagini non-webp passano invariate
//!
//! Con `ResizeBackendKind::Auto` si usa il primo supportato nell'ordine sopra.
//!
//! ## Operazioni
//! - `resize(input, output, max_dimension)`: riduce il lato lungo a
//!   `max_dimension`, mai ingrandisce
//! - `recompress(input, output, quality)`: ricomprime come JPEG

use crate::error::TranscodeError;
use crate::platform::{stderr_excerpt, PlatformCommands};
use crate::utils::to_string_vec;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Resize capability, queried before use
#[async_trait]
pub trait ResizeBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this backend can run on the current host
    fn is_supported(&self) -> bool;

    /// Shrink so the longest side is at most `max_dimension`
    async fn resize(&self, input: &Path, output: &Path, max_dimension: u32) -> Result<(), TranscodeError>;

    /// Re-encode as JPEG at `quality`
    async fn recompress(&self, input: &Path, output: &Path, quality: u8) -> Result<(), TranscodeError>;
}

/// Which backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeBackendKind {
    #[default]
    Auto,
    Sips,
    Imagemagick,
    Portable,
    None,
}

impl FromStr for ResizeBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "sips" => Ok(Self::Sips),
            "imagemagick" | "magick" => Ok(Self::Imagemagick),
            "portable" | "image" => Ok(Self::Portable),
            "none" => Ok(Self::None),
            other => Err(format!(
                "unknown resize backend '{}' (expected auto, sips, imagemagick, portable, none)",
                other
            )),
        }
    }
}

impl fmt::Display for ResizeBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Sips => "sips",
            Self::Imagemagick => "imagemagick",
            Self::Portable => "portable",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// Pick the backend for `kind`
pub fn select_backend(kind: ResizeBackendKind, timeout: Duration) -> Arc<dyn ResizeBackend> {
    let backend: Arc<dyn ResizeBackend> = match kind {
        ResizeBackendKind::Sips => Arc::new(SipsResizer::new(timeout)),
        ResizeBackendKind::Imagemagick => Arc::new(MagickResizer::new(timeout)),
        ResizeBackendKind::Portable => Arc::new(PortableResizer),
        ResizeBackendKind::None => Arc::new(NoResize),
        ResizeBackendKind::Auto => {
            let sips = SipsResizer::new(timeout);
            let magick = MagickResizer::new(timeout);
            if sips.is_supported() {
                Arc::new(sips)
            } else if magick.is_supported() {
                Arc::new(magick)
            } else {
                Arc::new(PortableResizer)
            }
        }
    };
    info!(
        "Resize backend: {} (requested: {}, supported: {})",
        backend.name(),
        kind,
        backend.is_supported()
    );
    backend
}

async fn run_checked(program: &Path, args: &[String], timeout: Duration) -> Result<(), TranscodeError> {
    let output = PlatformCommands::run_tool(program, args, timeout).await?;
    if output.status.success() {
        Ok(())
    } else {
        Err(TranscodeError::Resize(stderr_excerpt(&output)))
    }
}

/// macOS `sips`
pub struct SipsResizer {
    program: Option<PathBuf>,
    timeout: Duration,
}

impl SipsResizer {
    pub fn new(timeout: Duration) -> Self {
        let program = if cfg!(target_os = "macos") {
            PlatformCommands::instance().get_tool_path("sips")
        } else {
            None
        };
        Self { program, timeout }
    }

    fn program(&self) -> Result<&Path, TranscodeError> {
        self.program
            .as_deref()
            .ok_or_else(|| TranscodeError::Resize("sips is not available on this host".to_string()))
    }
}

#[async_trait]
impl ResizeBackend for SipsResizer {
    fn name(&self) -> &'static str {
        "sips"
    }

    fn is_supported(&self) -> bool {
        self.program.is_some()
    }

    async fn resize(&self, input: &Path, output: &Path, max_dimension: u32) -> Result<(), TranscodeError> {
        let args = to_string_vec([
            "-Z".to_string(),
            max_dimension.to_string(),
            input.to_string_lossy().into_owned(),
            "--out".to_string(),
            output.to_string_lossy().into_owned(),
        ]);
        run_checked(self.program()?, &args, self.timeout).await
    }

    async fn recompress(&self, input: &Path, output: &Path, quality: u8) -> Result<(), TranscodeError> {
        let args = to_string_vec([
            "-s".to_string(),
            "format".to_string(),
            "jpeg".to_string(),
            "-s".to_string(),
            "formatOptions".to_string(),
            quality.to_string(),
            input.to_string_lossy().into_owned(),
            "--out".to_string(),
            output.to_string_lossy().into_owned(),
        ]);
        run_checked(self.program()?, &args, self.timeout).await
    }
}

/// ImageMagick 7 (`magick`) or 6 (`convert`)
pub struct MagickResizer {
    program: Option<PathBuf>,
    timeout: Duration,
}

impl MagickResizer {
    pub fn new(timeout: Duration) -> Self {
        let platform = PlatformCommands::instance();
        let program = platform
            .get_tool_path("magick")
            .or_else(|| platform.get_tool_path("convert"));
        Self { program, timeout }
    }

    fn program(&self) -> Result<&Path, TranscodeError> {
        self.program
            .as_deref()
            .ok_or_else(|| TranscodeError::Resize("ImageMagick is not installed".to_string()))
    }
}

#[async_trait]
impl ResizeBackend for MagickResizer {
    fn name(&self) -> &'static str {
        "imagemagick"
    }

    fn is_supported(&self) -> bool {
        self.program.is_some()
    }

    async fn resize(&self, input: &Path, output: &Path, max_dimension: u32) -> Result<(), TranscodeError> {
        // '>' only shrinks, never enlarges
        let geometry = format!("{}x{}>", max_dimension, max_dimension);
        let args = to_string_vec([
            input.to_string_lossy().into_owned(),
            "-filter".to_string(),
            "Lanczos".to_string(),
            "-resize".to_string(),
            geometry,
            "-strip".to_string(),
            output.to_string_lossy().into_owned(),
        ]);
        run_checked(self.program()?, &args, self.timeout).await
    }

    async fn recompress(&self, input: &Path, output: &Path, quality: u8) -> Result<(), TranscodeError> {
        let args = to_string_vec([
            input.to_string_lossy().into_owned(),
            "-strip".to_string(),
            "-interlace".to_string(),
            "Plane".to_string(),
            "-quality".to_string(),
            quality.to_string(),
            format!("jpg:{}", output.to_string_lossy()),
        ]);
        run_checked(self.program()?, &args, self.timeout).await
    }
}

/// In-process backend built on the `image` crate
pub struct PortableResizer;

impl PortableResizer {
    fn resize_blocking(input: &Path, output: &Path, max_dimension: u32) -> Result<(), TranscodeError> {
        let img = image::open(input)?;
        let (width, height) = img.dimensions();
        let resized = if width > max_dimension || height > max_dimension {
            debug!("Resizing {}x{} to fit {}", width, height, max_dimension);
            img.resize(max_dimension, max_dimension, FilterType::Lanczos3)
        } else {
            img
        };

        match ImageFormat::from_path(output)? {
            ImageFormat::Jpeg => Self::write_jpeg(&resized, output, 90),
            format => Ok(resized.save_with_format(output, format)?),
        }
    }

    fn recompress_blocking(input: &Path, output: &Path, quality: u8) -> Result<(), TranscodeError> {
        let img = image::open(input)?;
        Self::write_jpeg(&img, output, quality)
    }

    fn write_jpeg(img: &DynamicImage, output: &Path, quality: u8) -> Result<(), TranscodeError> {
        let file = std::fs::File::create(output)?;
        let mut writer = BufWriter::new(file);
        let rgb = img.to_rgb8();
        JpegEncoder::new_with_quality(&mut writer, quality).encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ColorType::Rgb8,
        )?;
        Ok(())
    }
}

#[async_trait]
impl ResizeBackend for PortableResizer {
    fn name(&self) -> &'static str {
        "portable"
    }

    fn is_supported(&self) -> bool {
        true
    }

    async fn resize(&self, input: &Path, output: &Path, max_dimension: u32) -> Result<(), TranscodeError> {
        let (input, output) = (input.to_path_buf(), output.to_path_buf());
        tokio::task::spawn_blocking(move || Self::resize_blocking(&input, &output, max_dimension))
            .await
            .map_err(|e| TranscodeError::Resize(format!("resize task failed: {}", e)))?
    }

    async fn recompress(&self, input: &Path, output: &Path, quality: u8) -> Result<(), TranscodeError> {
        let (input, output) = (input.to_path_buf(), output.to_path_buf());
        tokio::task::spawn_blocking(move || Self::recompress_blocking(&input, &output, quality))
            .await
            .map_err(|e| TranscodeError::Resize(format!("recompress task failed: {}", e)))?
    }
}

/// No resize capability on this host
pub struct NoResize;

#[async_trait]
impl ResizeBackend for NoResize {
    fn name(&self) -> &'static str {
        "none"
    }

    fn is_supported(&self) -> bool {
        false
    }

    async fn resize(&self, _input: &Path, _output: &Path, _max_dimension: u32) -> Result<(), TranscodeError> {
        Err(TranscodeError::Resize("no resize backend available".to_string()))
    }

    async fn recompress(&self, _input: &Path, _output: &Path, _quality: u8) -> Result<(), TranscodeError> {
        Err(TranscodeError::Resize("no resize backend available".to_string()))
    }
}
