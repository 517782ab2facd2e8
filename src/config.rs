//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione della pipeline.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con sorgente, destinazione e parametri di run
//! - Validazione dei parametri
//! - Caricamento/salvataggio da/verso file JSON
//! - Overlay delle variabili d'ambiente sopra al file
//!
//! ## Precedenza:
//! default → file JSON → variabili d'ambiente → flag CLI
//!
//! ## Variabili d'ambiente:
//! - `SUPABASE_URL`, `SUPABASE_SERVICE_ROLE_KEY` (fallback `SUPABASE_ANON_KEY`)
//! - `ASSET_SYNC_SOURCE_DIR`, `ASSET_SYNC_SOURCE_BUCKET`, `ASSET_SYNC_BUCKET`
//! - `ASSET_SYNC_TOOLS_DIR`
//!
//! ## Esempio:
//! ```rust,ignore
//! let mut config = Config::from_file(&Config::default_path()).await?;
//! config.apply_env();
//! config.validate()?;
//! let (url, key) = config.require_credentials()?;
//! ```

use crate::error::OptimizeError;
use crate::resize::ResizeBackendKind;
use crate::tool_resolver::TOOLS_DIR_ENV;
use crate::upload::DEFAULT_CACHE_SECS;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a synchronization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local source tree; mirrored from `source_bucket` when missing
    pub source_dir: PathBuf,
    pub source_bucket: String,
    pub destination_bucket: String,
    /// Supabase project URL
    pub storage_url: Option<String>,
    /// Never written back to disk
    #[serde(skip_serializing)]
    pub service_key: Option<String>,
    /// Number of parallel workers
    pub workers: usize,
    pub resize_backend: ResizeBackendKind,
    /// Explicit `cwebp` binary
    pub cwebp_path: Option<PathBuf>,
    /// Directory searched for bundled tools before PATH
    pub tools_dir: Option<PathBuf>,
    /// Timeout applied to every external tool invocation
    pub tool_timeout_secs: u64,
    /// `max-age` sent with every upload
    pub cache_max_age_secs: u64,
    /// Log writes instead of performing them
    pub dry_run: bool,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("assets"),
            source_bucket: "media-source".to_string(),
            destination_bucket: "media".to_string(),
            storage_url: None,
            service_key: None,
            workers: 4,
            resize_backend: ResizeBackendKind::Auto,
            cwebp_path: None,
            tools_dir: None,
            tool_timeout_secs: 120,
            cache_max_age_secs: DEFAULT_CACHE_SECS,
            dry_run: false,
            json_output: false,
        }
    }
}

impl Config {
    /// `<config dir>/asset-sync/config.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("asset-sync")
            .join("config.json")
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), OptimizeError> {
        if self.workers == 0 {
            return Err(OptimizeError::Config(
                "Number of workers must be greater than 0".to_string(),
            ));
        }
        if self.tool_timeout_secs == 0 {
            return Err(OptimizeError::Config(
                "Tool timeout must be at least one second".to_string(),
            ));
        }
        if self.destination_bucket.trim().is_empty() {
            return Err(OptimizeError::Config("Destination bucket must not be empty".to_string()));
        }
        if self.source_bucket.trim().is_empty() {
            return Err(OptimizeError::Config("Source bucket must not be empty".to_string()));
        }
        if let Some(ref dir) = self.tools_dir {
            if !dir.is_dir() {
                return Err(OptimizeError::Config(format!(
                    "Tools directory is not a directory: {}",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    /// Destination URL and key, or the setup error naming what is missing
    pub fn require_credentials(&self) -> Result<(String, String), OptimizeError> {
        let url = self.storage_url.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let key = self.service_key.as_deref().map(str::trim).filter(|s| !s.is_empty());
        match (url, key) {
            (Some(url), Some(key)) => Ok((url.to_string(), key.to_string())),
            (None, Some(_)) => Err(OptimizeError::MissingCredentials("SUPABASE_URL is not set".to_string())),
            (Some(_), None) => Err(OptimizeError::MissingCredentials(
                "SUPABASE_SERVICE_ROLE_KEY (or SUPABASE_ANON_KEY) is not set".to_string(),
            )),
            (None, None) => Err(OptimizeError::MissingCredentials(
                "SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY are not set".to_string(),
            )),
        }
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`; empty values are ignored
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = get("SUPABASE_URL") {
            self.storage_url = Some(url);
        }
        if let Some(key) = get("SUPABASE_SERVICE_ROLE_KEY").or_else(|| get("SUPABASE_ANON_KEY")) {
            self.service_key = Some(key);
        }
        if let Some(dir) = get("ASSET_SYNC_SOURCE_DIR") {
            self.source_dir = PathBuf::from(dir);
        }
        if let Some(bucket) = get("ASSET_SYNC_SOURCE_BUCKET") {
            self.source_bucket = bucket;
        }
        if let Some(bucket) = get("ASSET_SYNC_BUCKET") {
            self.destination_bucket = bucket;
        }
        if let Some(dir) = get(TOOLS_DIR_ENV) {
            self.tools_dir = Some(PathBuf::from(dir));
        }
    }

    /// Load configuration from file, defaults when it does not exist
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
