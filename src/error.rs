//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Categorie di errori:
//! - `OptimizeError`: errori di setup o fatali che interrompono l'intera run
//!   (credenziali mancanti, encoder WebP assente per categorie obbligatorie)
//! - `TranscodeError`: errori di trascodifica per singolo asset. È
//!   l'orchestratore a decidere se sono fatali o solo un warning
//! - `StorageError`: errori dell'object store remoto (list, download,
//!   upload, remove)
//!
//! ## Esempio:
//! ```rust,ignore
//! if !encoder.is_available().await {
//!     return Err(TranscodeError::EncoderUnavailable);
//! }
//! ```

use std::path::PathBuf;

/// Fatal and setup errors for a synchronization run
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing destination credentials: {0}")]
    MissingCredentials(String),

    #[error(
        "WebP encoder is required for {count} comic asset(s) (e.g. {example}) but is not available; \
         install cwebp (libwebp) before syncing"
    )]
    MandatoryEncoderMissing { count: usize, example: String },

    #[error("Mandatory WebP conversion failed for {path}")]
    MandatoryConversion {
        path: String,
        #[source]
        source: TranscodeError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Run aborted before completion")]
    Aborted,
}

/// Per-asset transcoding failures
#[derive(thiserror::Error, Debug)]
pub enum TranscodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("WebP encoder is not available")]
    EncoderUnavailable,

    #[error("WebP encoding failed: {0}")]
    EncoderFailed(String),

    #[error("Resize failed: {0}")]
    Resize(String),

    #[error("Tool {tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("Failed to launch {tool} ({path}): {message}")]
    Spawn {
        tool: String,
        path: PathBuf,
        message: String,
    },
}

/// Remote object store failures
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Object not found: {bucket}/{path}")]
    NotFound { bucket: String, path: String },

    #[error("Invalid storage request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_cause_is_rendered_once() {
        let err = anyhow::Error::from(OptimizeError::MandatoryConversion {
            path: "images/comic/p1.png".to_string(),
            source: TranscodeError::EncoderUnavailable,
        });
        assert_eq!(
            format!("{:#}", err),
            "Mandatory WebP conversion failed for images/comic/p1.png: WebP encoder is not available"
        );
    }

    #[test]
    fn test_storage_error_is_transparent() {
        let err = OptimizeError::from(StorageError::InvalidRequest("bad".to_string()));
        assert_eq!(err.to_string(), "Invalid storage request: bad");
    }
}
