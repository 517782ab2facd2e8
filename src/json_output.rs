//! # JSON Output Module
//!
//! Output strutturato JSON-lines per chi pilota la sync da un altro processo
//! (CI, script di deploy).
//!
//! ## Tipi di messaggi:
//! - `start`: inizio run, sorgente e numero di asset
//! - `asset_complete`: esito di un singolo asset
//! - `complete`: fine run con le statistiche finali
//! - `error`: errore fatale o di setup

use crate::progress::RunStats;
use serde::{Deserialize, Serialize};

/// Tipo di messaggio JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    Start {
        source: String,
        destination_bucket: String,
        total_assets: usize,
        dry_run: bool,
    },

    AssetComplete {
        path: String,
        category: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        upload_path: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
        original_size: u64,
        optimized_size: u64,
        reduction_percent: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    Complete {
        uploaded: usize,
        failed: usize,
        bytes_original: u64,
        bytes_optimized: u64,
        bytes_saved: u64,
        reduction_percent: f64,
        duration_seconds: f64,
    },

    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(source: impl Into<String>, destination_bucket: impl Into<String>, total_assets: usize, dry_run: bool) -> Self {
        Self::Start {
            source: source.into(),
            destination_bucket: destination_bucket.into(),
            total_assets,
            dry_run,
        }
    }

    pub fn complete(stats: &RunStats, duration_seconds: f64) -> Self {
        Self::Complete {
            uploaded: stats.uploaded,
            failed: stats.failed,
            bytes_original: stats.bytes_original,
            bytes_optimized: stats.bytes_optimized,
            bytes_saved: stats.bytes_saved(),
            reduction_percent: stats.reduction_percent(),
            duration_seconds,
        }
    }

    pub fn error(message: impl Into<String>, details: Option<String>) -> Self {
        Self::Error {
            message: message.into(),
            details,
        }
    }
}
