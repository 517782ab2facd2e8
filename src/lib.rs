//! # Media Asset Sync Library
//!
//! Pipeline di ottimizzazione e sincronizzazione dei media dell'app verso
//! l'object storage.
//!
//! ## Architettura dei moduli:
//! - `asset`: path normalizzati e risultato della transcodifica
//! - `classifier`: categoria e profilo di ottimizzazione da path
//! - `config`: configurazione (file JSON, env, CLI) e validazione
//! - `discovery`: sorgente locale o mirror del bucket remoto
//! - `encoder`: wrapper `cwebp` con probe memoizzato
//! - `resize`: backend di resize (sips, ImageMagick, crate `image`)
//! - `transcoder`: pipeline di transcodifica con fallback
//! - `upload`: piano di upload e cleanup dei file legacy
//! - `storage`: trait `ObjectStore` e client Supabase Storage
//! - `optimizer`: orchestratore e worker per asset
//! - `progress`, `json_output`: progress bar, statistiche ed eventi JSON
//! - `platform`, `tool_resolver`, `utils`: esecuzione dei tool esterni
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use media_asset_sync::{Config, MediaOptimizer};
//!
//! let mut config = Config::from_file(&Config::default_path()).await?;
//! config.apply_env();
//! let stats = MediaOptimizer::from_config(config)?.run().await?;
//! println!("{}", stats.format_summary());
//! ```

pub mod asset;
pub mod classifier;
pub mod config;
pub mod discovery;
pub mod encoder;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod optimizer;
pub mod platform;
pub mod progress;
pub mod resize;
pub mod storage;
pub mod tool_resolver;
pub mod transcoder;
pub mod upload;
pub mod utils;

pub use asset::{AssetPath, OptimizedAsset};
pub use classifier::{AssetCategory, OptimizationProfile, OutputFormat};
pub use config::Config;
pub use error::{OptimizeError, StorageError, TranscodeError};
pub use optimizer::MediaOptimizer;
pub use progress::RunStats;
pub use upload::{UploadManager, UploadPlan};
