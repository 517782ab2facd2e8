//! # WebP Encoder
//!
//! Wrapper attorno al tool esterno `cwebp`.
//!
//! ## Responsabilità:
//! - Probe di disponibilità eseguito una sola volta per istanza (e quindi per
//!   processo, dato che l'orchestratore condivide un'unica istanza): il
//!   risultato è memorizzato in un `OnceCell`, i chiamanti concorrenti
//!   attendono lo stesso probe
//! - Encoding con qualità configurabile e timeout per invocazione
//!
//! Il probe non fallisce mai: spawn fallito, exit code non zero o timeout
//! significano semplicemente "non disponibile".

use crate::error::TranscodeError;
use crate::platform::{stderr_excerpt, PlatformCommands};
use crate::utils::to_string_vec;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// External WebP encoder with a memoized availability probe
#[derive(Debug)]
pub struct WebpEncoder {
    program: PathBuf,
    timeout: Duration,
    available: OnceCell<bool>,
}

impl WebpEncoder {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            available: OnceCell::new(),
        }
    }

    /// Encoder resolved from an explicit override, the tools dir, or PATH
    pub fn system(override_path: Option<&Path>, timeout: Duration) -> Self {
        let program = override_path
            .map(Path::to_path_buf)
            .or_else(|| PlatformCommands::instance().get_tool_path("cwebp"))
            .unwrap_or_else(|| PathBuf::from("cwebp"));
        Self::new(program, timeout)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Whether the encoder can be invoked; probes on first call only
    pub async fn is_available(&self) -> bool {
        *self.available.get_or_init(|| self.probe()).await
    }

    async fn probe(&self) -> bool {
        let args = to_string_vec(["-version"]);
        match PlatformCommands::run_tool(&self.program, &args, self.timeout).await {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
                info!("WebP encoder available: {} ({})", self.program.display(), version);
                true
            }
            Ok(output) => {
                warn!(
                    "WebP encoder probe failed for {}: {}",
                    self.program.display(),
                    stderr_excerpt(&output)
                );
                false
            }
            Err(e) => {
                warn!("WebP encoder not available ({}): {}", self.program.display(), e);
                false
            }
        }
    }

    /// Encode `input` into `output` at `quality`
    pub async fn encode(&self, input: &Path, output: &Path, quality: u8) -> Result<(), TranscodeError> {
        if !self.is_available().await {
            return Err(TranscodeError::EncoderUnavailable);
        }

        let args = crate::args!["-quiet", "-q", quality, "-m", 4, input.display(), "-o", output.display()];

        let result = PlatformCommands::run_tool(&self.program, &args, self.timeout).await?;
        if !result.status.success() {
            return Err(TranscodeError::EncoderFailed(stderr_excerpt(&result)));
        }
        if !output.is_file() {
            return Err(TranscodeError::EncoderFailed(format!(
                "encoder produced no output at {}",
                output.display()
            )));
        }

        debug!("Encoded {} -> {} (q={})", input.display(), output.display(), quality);
        Ok(())
    }
}
