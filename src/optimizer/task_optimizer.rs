//! # Task Optimizer Module
//!
//! Worker per un singolo asset: lettura → classificazione → transcodifica →
//! piano di upload → upload e cleanup.
//!
//! Il worker non tocca `RunStats`: restituisce un `AssetOutcome` che
//! l'orchestratore aggrega nel suo join loop.

use crate::{
    asset::{AssetPath, OptimizedAsset},
    classifier::AssetCategory,
    discovery::AssetSource,
    error::OptimizeError,
    file_manager::FileManager,
    transcoder::ImageTranscoder,
    upload::{UploadManager, UploadPlan},
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// A successfully uploaded asset
#[derive(Debug, Clone)]
pub struct AssetReport {
    pub path: AssetPath,
    pub category: AssetCategory,
    pub plan: UploadPlan,
    pub content_type: String,
    pub original_size: u64,
    pub optimized_size: u64,
}

impl AssetReport {
    pub fn reduction_percent(&self) -> f64 {
        FileManager::calculate_reduction(self.original_size, self.optimized_size)
    }
}

/// Result of processing one asset
#[derive(Debug)]
pub enum AssetOutcome {
    Uploaded(AssetReport),
    /// Read or upload failure; the run continues
    Failed {
        path: AssetPath,
        category: AssetCategory,
        original_size: u64,
        error: String,
    },
    /// Mandatory conversion failure; the run stops
    Fatal {
        path: AssetPath,
        error: OptimizeError,
    },
}

impl AssetOutcome {
    pub fn path(&self) -> &AssetPath {
        match self {
            Self::Uploaded(report) => &report.path,
            Self::Failed { path, .. } | Self::Fatal { path, .. } => path,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}

/// Worker shared by all asset tasks of a run
pub struct TaskOptimizer {
    source: AssetSource,
    transcoder: Arc<ImageTranscoder>,
    uploader: Arc<UploadManager>,
}

impl TaskOptimizer {
    pub fn new(source: AssetSource, transcoder: Arc<ImageTranscoder>, uploader: Arc<UploadManager>) -> Self {
        Self {
            source,
            transcoder,
            uploader,
        }
    }

    pub fn source(&self) -> &AssetSource {
        &self.source
    }

    pub fn transcoder(&self) -> &Arc<ImageTranscoder> {
        &self.transcoder
    }

    /// Process one asset end to end
    pub async fn process_asset(&self, path: AssetPath) -> AssetOutcome {
        let category = AssetCategory::classify(&path);

        let bytes = match self.source.read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("[FAIL] {}: {:#}", path, e);
                return AssetOutcome::Failed {
                    path,
                    category,
                    original_size: 0,
                    error: format!("{:#}", e),
                };
            }
        };
        let original_size = bytes.len() as u64;

        let optimized = match self.optimize(&path, category, &bytes).await {
            Ok(optimized) => optimized,
            Err(error) => {
                error!("[FATAL] {}: {}", path, error);
                return AssetOutcome::Fatal { path, error };
            }
        };

        let plan = UploadPlan::new(&path, &optimized);
        if let Err(e) = self.uploader.execute(&plan, &optimized).await {
            error!("[FAIL] {} -> {}: upload failed: {}", path, plan.upload_path, e);
            return AssetOutcome::Failed {
                path,
                category,
                original_size,
                error: e.to_string(),
            };
        }

        let report = AssetReport {
            category,
            content_type: optimized.content_type.clone(),
            optimized_size: optimized.len() as u64,
            original_size,
            plan,
            path,
        };
        info!(
            "[OK] {} -> {} ({}): {} -> {} ({:.1}% saved)",
            report.path,
            report.plan.upload_path,
            report.category,
            FileManager::format_size(report.original_size),
            FileManager::format_size(report.optimized_size),
            report.reduction_percent()
        );
        AssetOutcome::Uploaded(report)
    }

    /// Transcode according to the category profile; only mandatory
    /// categories turn a transcode error into a fatal one
    async fn optimize(
        &self,
        path: &AssetPath,
        category: AssetCategory,
        bytes: &[u8],
    ) -> Result<OptimizedAsset, OptimizeError> {
        let extension = path.extension().unwrap_or_default();
        let profile = category.profile();

        match self.transcoder.transcode(bytes, &extension, &profile).await {
            Ok(optimized) => Ok(optimized),
            Err(source) if category.is_mandatory() => Err(OptimizeError::MandatoryConversion {
                path: path.to_string(),
                source,
            }),
            Err(e) => {
                warn!("[WARN] {}: optimization failed, uploading original: {}", path, e);
                Ok(OptimizedAsset::new(
                    bytes.to_vec(),
                    FileManager::content_type_for(&extension),
                ))
            }
        }
    }
}
