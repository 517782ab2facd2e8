//! # Asset Model
//!
//! Tipi di base condivisi da tutta la pipeline:
//! - `AssetPath`: path relativo normalizzato con `/`, identico per sorgente
//!   locale e remota
//! - `OptimizedAsset`: bytes + content type prodotti dalla trascodifica (o
//!   passthrough dell'originale)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Forward-slash-normalized relative path identifying one asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetPath(String);

impl AssetPath {
    /// Normalizes separators and strips leading `./` and `/`
    pub fn new(raw: impl AsRef<str>) -> Self {
        let mut normalized = raw.as_ref().replace('\\', "/");
        loop {
            if let Some(rest) = normalized.strip_prefix("./") {
                normalized = rest.to_string();
            } else if let Some(rest) = normalized.strip_prefix('/') {
                normalized = rest.to_string();
            } else {
                break;
            }
        }
        Self(normalized)
    }

    /// Builds an asset path from a filesystem path relative to the source root
    pub fn from_relative(relative: &Path) -> Self {
        let joined = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Self::new(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Lowercased extension without the dot, if any
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 && idx + 1 < name.len() => Some(name[idx + 1..].to_lowercase()),
            _ => None,
        }
    }

    /// Path without its extension (`images/comic/page1.png` -> `images/comic/page1`)
    pub fn stem_path(&self) -> &str {
        let name_start = self.0.len() - self.file_name().len();
        match self.file_name().rfind('.') {
            Some(idx) if idx > 0 => &self.0[..name_start + idx],
            _ => &self.0,
        }
    }

    /// Same path with the extension replaced (or appended when missing)
    pub fn with_extension(&self, extension: &str) -> Self {
        Self(format!("{}.{}", self.stem_path(), extension))
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetPath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Result of transcoding, or a pass-through of the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizedAsset {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl OptimizedAsset {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
