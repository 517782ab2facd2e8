//! # Progress Tracking Module
//!
//! Unifica progress bar ed eventi JSON. Chiamato solo dal join loop
//! dell'orchestratore, quindi non ha stato condiviso.

use crate::{
    json_output::JsonMessage,
    optimizer::task_optimizer::AssetOutcome,
    progress::{ProgressManager, RunStats},
};

pub struct ProgressTracker {
    pub total_assets: usize,
    json_output: bool,
    progress_manager: ProgressManager,
}

impl ProgressTracker {
    pub fn new(total_assets: usize, json_output: bool) -> Self {
        let progress_manager = if json_output {
            ProgressManager::hidden(total_assets as u64)
        } else {
            ProgressManager::new(total_assets as u64)
        };
        Self {
            total_assets,
            json_output,
            progress_manager,
        }
    }

    /// Advance the bar and emit the per-asset event
    pub fn record(&self, outcome: &AssetOutcome) {
        let name = outcome.path().file_name().to_string();
        match outcome {
            AssetOutcome::Uploaded(report) => {
                if self.json_output {
                    JsonMessage::AssetComplete {
                        path: report.path.to_string(),
                        category: report.category.to_string(),
                        upload_path: Some(report.plan.upload_path.to_string()),
                        content_type: Some(report.content_type.clone()),
                        original_size: report.original_size,
                        optimized_size: report.optimized_size,
                        reduction_percent: report.reduction_percent(),
                        error: None,
                    }
                    .emit();
                }
                self.progress_manager
                    .update(&format!("[OK] {}: {:.1}% saved", name, report.reduction_percent()));
            }
            AssetOutcome::Failed {
                path,
                category,
                original_size,
                error,
            } => {
                if self.json_output {
                    JsonMessage::AssetComplete {
                        path: path.to_string(),
                        category: category.to_string(),
                        upload_path: None,
                        content_type: None,
                        original_size: *original_size,
                        optimized_size: 0,
                        reduction_percent: 0.0,
                        error: Some(error.clone()),
                    }
                    .emit();
                }
                self.progress_manager.update(&format!("[ERROR] {}", name));
            }
            AssetOutcome::Fatal { error, .. } => {
                if self.json_output {
                    JsonMessage::error(error.to_string(), Some(outcome.path().to_string())).emit();
                }
                self.progress_manager.update(&format!("[FATAL] {}", name));
            }
        }
    }

    pub fn position(&self) -> u64 {
        self.progress_manager.position()
    }

    pub fn finish(&self, stats: &RunStats) {
        self.progress_manager.finish(&stats.format_summary());
    }
}
