//! # Media Asset Sync - Main Entry Point
//!
//! ## Responsabilità:
//! - Parsing degli argomenti con `clap` (nessun flag obbligatorio)
//! - Inizializzazione del logging con `tracing`
//! - Costruzione della `Config`: default → file → env → flag CLI
//! - Avvio della run e exit code (0 anche con asset falliti, non zero per
//!   errori di setup o fatali)
//!
//! ## Esempio di utilizzo:
//! ```bash
//! asset-sync --source-dir ./assets --bucket media --workers 8 --verbose
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use media_asset_sync::{resize::ResizeBackendKind, Config, MediaOptimizer};

#[derive(Parser)]
#[command(name = "asset-sync")]
#[command(about = "Optimize application media and sync it to object storage")]
struct Args {
    /// Configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Local source directory; mirrored from the source bucket when missing
    #[arg(long)]
    source_dir: Option<PathBuf>,

    /// Bucket mirrored when the source directory does not exist
    #[arg(long)]
    source_bucket: Option<String>,

    /// Destination bucket
    #[arg(short, long)]
    bucket: Option<String>,

    /// Number of parallel workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Resize backend: auto, sips, imagemagick, portable, none
    #[arg(long)]
    resize_backend: Option<ResizeBackendKind>,

    /// Explicit path to the cwebp binary
    #[arg(long)]
    cwebp: Option<PathBuf>,

    /// Log uploads and deletions without performing them
    #[arg(long)]
    dry_run: bool,

    /// Emit JSON-lines events on stdout
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply_to(self, config: &mut Config) {
        if let Some(dir) = self.source_dir {
            config.source_dir = dir;
        }
        if let Some(bucket) = self.source_bucket {
            config.source_bucket = bucket;
        }
        if let Some(bucket) = self.bucket {
            config.destination_bucket = bucket;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(backend) = self.resize_backend {
            config.resize_backend = backend;
        }
        if let Some(cwebp) = self.cwebp {
            config.cwebp_path = Some(cwebp);
        }
        config.dry_run |= self.dry_run;
        config.json_output |= self.json;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stderr keeps stdout clean for --json
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::from_file(&config_path).await?;
    config.apply_env();
    args.apply_to(&mut config);

    info!("Platform: {}", media_asset_sync::platform::PlatformCommands::system_info());

    let optimizer = MediaOptimizer::from_config(config)?;
    match optimizer.run().await {
        Ok(stats) => {
            info!("{}", stats.format_summary());
            Ok(())
        }
        Err(e) => {
            error!("{:#}", e);
            Err(e)
        }
    }
}
