//! # Progress Tracking and Statistics Module
//!
//! Progress bar e statistiche aggregate di una run.
//!
//! ## Componenti principali:
//! - `ProgressManager`: progress bar `indicatif` (nascosta in modalità JSON)
//! - `RunStats`: contatori della run, aggiornati solo dal join loop
//!   dell'orchestratore
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:12] [========================>---------------] 31/52 (59%) [OK] page1.png: 71.3% saved
//! ```

use crate::file_manager::FileManager;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

/// Manages the progress bar for a run
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_assets: u64) -> Self {
        let bar = ProgressBar::new(total_assets);

        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        ) {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager that draws nothing
    pub fn hidden(total_assets: u64) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total_assets);
        Self { bar }
    }

    /// Advance by one asset and show `message`
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Outcome counters for one run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub uploaded: usize,
    pub failed: usize,
    pub bytes_original: u64,
    pub bytes_optimized: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_upload(&mut self, original_size: u64, optimized_size: u64) {
        self.uploaded += 1;
        self.bytes_original += original_size;
        self.bytes_optimized += optimized_size;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn total(&self) -> usize {
        self.uploaded + self.failed
    }

    pub fn bytes_saved(&self) -> u64 {
        self.bytes_original.saturating_sub(self.bytes_optimized)
    }

    pub fn reduction_percent(&self) -> f64 {
        FileManager::calculate_reduction(self.bytes_original, self.bytes_optimized)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Uploaded: {} | Failed: {} | Original: {} | Optimized: {} | Saved: {} ({:.1}%)",
            self.uploaded,
            self.failed,
            FileManager::format_size(self.bytes_original),
            FileManager::format_size(self.bytes_optimized),
            FileManager::format_size(self.bytes_saved()),
            self.reduction_percent()
        )
    }
}
