//! # Optimizer Module
//!
//! Sottomoduli:
//! - `media_optimizer`: orchestratore della run
//! - `task_optimizer`: worker per singolo asset
//! - `progress_tracker`: progress bar ed eventi JSON

pub mod media_optimizer;
pub mod progress_tracker;
pub mod task_optimizer;

pub use media_optimizer::MediaOptimizer;
pub use progress_tracker::ProgressTracker;
pub use task_optimizer::{AssetOutcome, AssetReport, TaskOptimizer};
