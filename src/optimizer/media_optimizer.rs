//! # Media Optimizer Main Orchestrator
//!
//! Guida una run completa: discovery, preflight dell'encoder, pool di worker
//! limitato da semaforo, aggregazione delle statistiche e report finale.
//!
//! ## Politica di fallimento:
//! - Errori di setup (credenziali, encoder mancante per i fumetti) fermano
//!   la run prima di qualsiasi upload
//! - Una conversione obbligatoria fallita alza il flag di abort: nessun
//!   nuovo asset parte, quelli in corso terminano
//! - Errori di lettura/upload contano come `failed` e la run prosegue
//! - Ctrl-C ha effetto solo ai confini tra un asset e l'altro

use crate::{
    asset::AssetPath,
    classifier::AssetCategory,
    config::Config,
    discovery::AssetSource,
    encoder::WebpEncoder,
    error::OptimizeError,
    file_manager::FileManager,
    json_output::JsonMessage,
    optimizer::{
        progress_tracker::ProgressTracker,
        task_optimizer::{AssetOutcome, TaskOptimizer},
    },
    progress::RunStats,
    resize::select_backend,
    storage::{DryRunStore, ObjectStore, SupabaseStorage},
    tool_resolver::ToolPathResolver,
    transcoder::ImageTranscoder,
    upload::UploadManager,
};
use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Orchestratore principale
pub struct MediaOptimizer {
    config: Config,
    task_optimizer: Arc<TaskOptimizer>,
    abort: Arc<AtomicBool>,
}

impl MediaOptimizer {
    /// Build the pipeline against the configured Supabase project
    pub fn from_config(config: Config) -> Result<Self, OptimizeError> {
        config.validate()?;
        let (url, key) = config.require_credentials()?;

        let remote: Arc<dyn ObjectStore> = Arc::new(SupabaseStorage::new(&url, key)?);
        let store: Arc<dyn ObjectStore> = if config.dry_run {
            Arc::new(DryRunStore::new(remote))
        } else {
            remote
        };
        Self::new(config, store)
    }

    /// Build the pipeline on top of an existing store
    pub fn new(config: Config, store: Arc<dyn ObjectStore>) -> Result<Self, OptimizeError> {
        config.validate()?;
        let timeout = config.tool_timeout();

        let cwebp = config.cwebp_path.clone().or_else(|| {
            config
                .tools_dir
                .as_ref()
                .and_then(|dir| ToolPathResolver::with_tools_dir(dir).resolve_tool("cwebp"))
        });
        let encoder = Arc::new(WebpEncoder::system(cwebp.as_deref(), timeout));
        let resizer = select_backend(config.resize_backend, timeout);
        let transcoder = Arc::new(ImageTranscoder::new(resizer, encoder));

        let uploader = Arc::new(UploadManager::new(
            store.clone(),
            config.destination_bucket.clone(),
            config.cache_max_age_secs,
        ));
        let source = AssetSource::select(&config.source_dir, store, &config.source_bucket);

        Ok(Self {
            config,
            task_optimizer: Arc::new(TaskOptimizer::new(source, transcoder, uploader)),
            abort: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that stops the run at the next asset boundary when raised
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        self.abort.clone()
    }

    /// Esegue la run completa
    pub async fn run(&self) -> Result<RunStats> {
        let start_time = Instant::now();
        let source = self.task_optimizer.source();

        let assets = match source.discover().await {
            Ok(assets) => assets,
            Err(e) => {
                self.emit_error(&format!("Discovery failed for {}", source), &format!("{:#}", e));
                return Err(e);
            }
        };
        self.emit_start_message(&assets);

        if let Err(e) = self.preflight(&assets).await {
            self.emit_error("Preflight check failed", &e.to_string());
            return Err(e.into());
        }

        if assets.is_empty() {
            info!("No media assets found in {}", source);
            let stats = RunStats::new();
            self.print_final_stats(&stats, start_time.elapsed().as_secs_f64());
            return Ok(stats);
        }

        let interrupt = self.spawn_interrupt_listener();
        let outcome = self.process_assets_concurrently(assets).await;
        interrupt.abort();

        let (stats, fatal) = outcome?;
        self.print_final_stats(&stats, start_time.elapsed().as_secs_f64());

        if let Some(fatal) = fatal {
            let fatal = anyhow::Error::from(fatal);
            self.emit_error("Run aborted", &format!("{:#}", fatal));
            return Err(fatal);
        }
        if self.abort.load(Ordering::SeqCst) {
            warn!("Run interrupted after {} asset(s)", stats.total());
            return Err(OptimizeError::Aborted.into());
        }
        Ok(stats)
    }

    /// Fail fast when comic rasters need an encoder that is not there
    async fn preflight(&self, assets: &[AssetPath]) -> Result<(), OptimizeError> {
        let mandatory: Vec<&AssetPath> = assets
            .iter()
            .filter(|path| AssetCategory::classify(path).is_mandatory())
            .filter(|path| {
                path.extension()
                    .map(|ext| FileManager::is_raster_extension(&ext))
                    .unwrap_or(false)
            })
            .collect();

        let Some(first) = mandatory.first() else {
            return Ok(());
        };

        let encoder = self.task_optimizer.transcoder().encoder();
        if encoder.is_available().await {
            debug!("{} comic asset(s) will be converted with {}", mandatory.len(), encoder.program().display());
            return Ok(());
        }

        error!(
            "WebP encoder not found; install it with: {}",
            ToolPathResolver::install_instructions("cwebp")
        );
        Err(OptimizeError::MandatoryEncoderMissing {
            count: mandatory.len(),
            example: first.to_string(),
        })
    }

    /// Processa gli asset con un pool limitato; le statistiche sono
    /// aggiornate solo qui, nel join loop
    async fn process_assets_concurrently(
        &self,
        assets: Vec<AssetPath>,
    ) -> Result<(RunStats, Option<OptimizeError>)> {
        let total = assets.len();
        let tracker = ProgressTracker::new(total, self.config.json_output);
        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let mut running = FuturesUnordered::new();

        info!("Processing {} assets with {} workers", total, self.config.workers);

        for path in assets {
            let permit = semaphore.clone().acquire_owned().await?;
            if self.abort.load(Ordering::SeqCst) {
                debug!("Abort requested, not starting {}", path);
                break;
            }

            let worker = self.task_optimizer.clone();
            let abort = self.abort.clone();
            running.push(tokio::spawn(async move {
                let _permit = permit;
                let outcome = worker.process_asset(path).await;
                if outcome.is_fatal() {
                    abort.store(true, Ordering::SeqCst);
                }
                outcome
            }));
        }

        let mut stats = RunStats::new();
        let mut fatal = None;
        while let Some(joined) = running.next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Asset task panicked: {}", e);
                    stats.record_failure();
                    continue;
                }
            };

            tracker.record(&outcome);
            match outcome {
                AssetOutcome::Uploaded(report) => {
                    stats.record_upload(report.original_size, report.optimized_size)
                }
                AssetOutcome::Failed { .. } => stats.record_failure(),
                AssetOutcome::Fatal { error, .. } => {
                    stats.record_failure();
                    fatal.get_or_insert(error);
                }
            }
        }

        tracker.finish(&stats);
        debug!("Joined {} of {} assets", tracker.position(), tracker.total_assets);
        Ok((stats, fatal))
    }

    fn spawn_interrupt_listener(&self) -> tokio::task::JoinHandle<()> {
        let abort = self.abort.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, finishing in-flight assets");
                abort.store(true, Ordering::SeqCst);
            }
        })
    }

    fn emit_start_message(&self, assets: &[AssetPath]) {
        let source = self.task_optimizer.source();
        if self.config.json_output {
            JsonMessage::start(
                source.to_string(),
                self.config.destination_bucket.clone(),
                assets.len(),
                self.config.dry_run,
            )
            .emit();
        } else {
            info!(
                "Syncing {} assets from {} to bucket '{}'",
                assets.len(),
                source,
                self.config.destination_bucket
            );
            if self.config.dry_run {
                info!("Dry run mode: nothing will be uploaded or deleted");
            }
        }
    }

    fn emit_error(&self, message: &str, details: &str) {
        if self.config.json_output {
            JsonMessage::error(message, Some(details.to_string())).emit();
        }
    }

    /// Stampa statistiche finali
    fn print_final_stats(&self, stats: &RunStats, duration: f64) {
        if self.config.json_output {
            JsonMessage::complete(stats, duration).emit();
        } else {
            info!("=== Sync Complete ===");
            info!("Uploaded: {}", stats.uploaded);
            info!("Failed: {}", stats.failed);
            info!("Original size: {}", FileManager::format_size(stats.bytes_original));
            info!("Optimized size: {}", FileManager::format_size(stats.bytes_optimized));
            info!(
                "Saved: {} ({:.2}%)",
                FileManager::format_size(stats.bytes_saved()),
                stats.reduction_percent()
            );
            info!("Duration: {:.1}s", duration);
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::encoder::testing as fake;
    use crate::resize::ResizeBackendKind;
    use crate::storage::memory::MemoryStore;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn write(root: &Path, path: &str, bytes: &[u8]) {
        let full = root.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, bytes).unwrap();
    }

    fn config(source_dir: &Path, cwebp: PathBuf) -> Config {
        Config {
            source_dir: source_dir.to_path_buf(),
            cwebp_path: Some(cwebp),
            resize_backend: ResizeBackendKind::None,
            workers: 2,
            tool_timeout_secs: 10,
            ..Default::default()
        }
    }

    fn snapshot(store: &MemoryStore) -> Vec<(String, Vec<u8>, String)> {
        store
            .paths("media")
            .into_iter()
            .map(|path| {
                let object = store.get("media", &path).unwrap();
                (path, object.bytes, object.content_type)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_missing_encoder_aborts_before_upload() {
        let source = TempDir::new().unwrap();
        write(source.path(), "images/comic/page1.png", &vec![1u8; 4096]);
        write(source.path(), "audio/theme.mp3", b"ID3");
        let store = Arc::new(MemoryStore::new());

        let optimizer = MediaOptimizer::new(
            config(source.path(), PathBuf::from("/nonexistent/cwebp")),
            store.clone(),
        )
        .unwrap();
        let err = optimizer.run().await.unwrap_err();

        match err.downcast_ref::<OptimizeError>() {
            Some(OptimizeError::MandatoryEncoderMissing { count, example }) => {
                assert_eq!(*count, 1);
                assert_eq!(example, "images/comic/page1.png");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.upload_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_comic_conversion_stops_new_assets() {
        let source = TempDir::new().unwrap();
        let tools = TempDir::new().unwrap();
        write(source.path(), "audio/a.mp3", b"ID3 a");
        write(source.path(), "images/comic/p1.png", &vec![5u8; 4096]);
        write(source.path(), "music/z.mp3", b"ID3 z");
        let store = Arc::new(MemoryStore::new());

        let mut config = config(source.path(), fake::broken_cwebp(tools.path()));
        config.workers = 1;
        let optimizer = MediaOptimizer::new(config, store.clone()).unwrap();
        let err = optimizer.run().await.unwrap_err();

        match err.downcast_ref::<OptimizeError>() {
            Some(OptimizeError::MandatoryConversion { path, .. }) => {
                assert_eq!(path, "images/comic/p1.png")
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(format!("{:#}", err).matches("cannot encode").count(), 1);
        assert_eq!(store.paths("media"), vec!["audio/a.mp3".to_string()]);
        assert_eq!(store.upload_calls(), 1);
    }

    #[tokio::test]
    async fn test_unlistable_bucket_fails_run() {
        let scratch = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.insert("media-source", "audio/a.mp3", b"ID3".to_vec(), "audio/mpeg");
        store.fail_listing_of("");

        let optimizer = MediaOptimizer::new(
            config(&scratch.path().join("missing"), PathBuf::from("/nonexistent/cwebp")),
            store.clone(),
        )
        .unwrap();

        assert!(optimizer.run().await.is_err());
        assert_eq!(store.upload_calls(), 0);
    }

    #[tokio::test]
    async fn test_webp_comics_do_not_need_encoder() {
        let source = TempDir::new().unwrap();
        write(source.path(), "images/comic/art.webp", b"RIFF webp");
        let store = Arc::new(MemoryStore::new());

        let optimizer = MediaOptimizer::new(
            config(source.path(), PathBuf::from("/nonexistent/cwebp")),
            store.clone(),
        )
        .unwrap();
        let stats = optimizer.run().await.unwrap();

        assert_eq!(stats.uploaded, 1);
        assert_eq!(store.paths("media"), vec!["images/comic/art.webp".to_string()]);
    }

    #[tokio::test]
    async fn test_repeated_runs_are_stable() {
        let source = TempDir::new().unwrap();
        let tools = TempDir::new().unwrap();
        write(source.path(), "images/comic/page1.png", &vec![3u8; 120 * 1024]);
        write(source.path(), "images/logos/icon.png", &vec![4u8; 5 * 1024]);
        write(source.path(), "images/comic/art.webp", b"RIFF webp");
        write(source.path(), "audio/theme.mp3", b"ID3 audio");

        let store = Arc::new(MemoryStore::new());
        store.insert("media", "images/comic/page1.jpg", b"legacy".to_vec(), "image/jpeg");
        store.insert("media", "images/logos/icon.png", b"legacy".to_vec(), "image/png");

        let optimizer = MediaOptimizer::new(
            config(source.path(), fake::fake_cwebp(tools.path())),
            store.clone(),
        )
        .unwrap();

        let first = optimizer.run().await.unwrap();
        let after_first = snapshot(&store);
        let second = optimizer.run().await.unwrap();
        let after_second = snapshot(&store);

        assert_eq!(first, second);
        assert_eq!(first.uploaded, 4);
        assert_eq!(first.failed, 0);
        assert_eq!(after_first, after_second);
        assert_eq!(
            store.paths("media"),
            vec![
                "audio/theme.mp3".to_string(),
                "images/comic/art.webp".to_string(),
                "images/comic/page1.webp".to_string(),
                "images/logos/icon.webp".to_string(),
            ]
        );
        // Encoder probed once for the whole process of both runs
        assert_eq!(fake::probe_count(tools.path()), 1);
    }

    #[tokio::test]
    async fn test_failed_upload_does_not_stop_run() {
        let source = TempDir::new().unwrap();
        let tools = TempDir::new().unwrap();
        write(source.path(), "audio/a.mp3", b"ID3 a");
        write(source.path(), "audio/b.mp3", b"ID3 bb");
        write(source.path(), "audio/c.wav", b"RIFF ccc");
        let store = Arc::new(MemoryStore::new());
        store.fail_upload_of("audio/b.mp3");

        let optimizer = MediaOptimizer::new(
            config(source.path(), fake::fake_cwebp(tools.path())),
            store.clone(),
        )
        .unwrap();
        let stats = optimizer.run().await.unwrap();

        assert_eq!(stats.uploaded, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.bytes_original, 5 + 8);
        assert_eq!(
            store.paths("media"),
            vec!["audio/a.mp3".to_string(), "audio/c.wav".to_string()]
        );
    }

    #[tokio::test]
    async fn test_mirrors_remote_bucket_without_local_source() {
        let scratch = TempDir::new().unwrap();
        let tools = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.insert("media-source", "images/avatars/me.png", vec![9u8; 2048], "image/png");
        store.insert("media-source", "notes.txt", b"skip".to_vec(), "text/plain");

        let optimizer = MediaOptimizer::new(
            config(&scratch.path().join("missing"), fake::fake_cwebp(tools.path())),
            store.clone(),
        )
        .unwrap();
        let stats = optimizer.run().await.unwrap();

        assert_eq!(stats.uploaded, 1);
        let uploaded = store.get("media", "images/avatars/me.webp").unwrap();
        assert_eq!(uploaded.bytes, fake::FAKE_WEBP);
        assert_eq!(uploaded.content_type, "image/webp");
    }

    #[tokio::test]
    async fn test_raised_abort_flag_starts_nothing() {
        let source = TempDir::new().unwrap();
        let tools = TempDir::new().unwrap();
        write(source.path(), "audio/a.mp3", b"ID3");
        let store = Arc::new(MemoryStore::new());

        let optimizer = MediaOptimizer::new(
            config(source.path(), fake::fake_cwebp(tools.path())),
            store.clone(),
        )
        .unwrap();
        optimizer.abort_handle().store(true, Ordering::SeqCst);

        let err = optimizer.run().await.unwrap_err();
        assert!(matches!(err.downcast_ref::<OptimizeError>(), Some(OptimizeError::Aborted)));
        assert_eq!(store.upload_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_source_completes() {
        let source = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let optimizer = MediaOptimizer::new(
            config(source.path(), PathBuf::from("/nonexistent/cwebp")),
            store,
        )
        .unwrap();

        assert_eq!(optimizer.run().await.unwrap(), RunStats::new());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
        let config = Config {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(
            MediaOptimizer::new(config, store),
            Err(OptimizeError::Config(_))
        ));
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let config = Config::default();
        assert!(matches!(
            MediaOptimizer::from_config(config),
            Err(OptimizeError::MissingCredentials(_))
        ));
    }
}
