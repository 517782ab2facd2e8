//! # Platform-specific utilities
//!
//! Questo modulo centralizza la risoluzione dei tool esterni e la loro
//! esecuzione con timeout. Ogni invocazione è bloccante per il task che la
//! esegue ma ha sempre un timeout: allo scadere il processo figlio viene
//! terminato e l'invocazione è considerata fallita.

use crate::error::TranscodeError;
use crate::tool_resolver::ToolPathResolver;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// Platform command manager with tool resolution
pub struct PlatformCommands {
    tool_resolver: ToolPathResolver,
}

impl PlatformCommands {
    /// Get the singleton instance
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<PlatformCommands> = OnceLock::new();
        INSTANCE.get_or_init(|| Self {
            tool_resolver: ToolPathResolver::new(),
        })
    }

    /// Resolved path of a tool (bundled or system)
    pub fn get_tool_path(&self, base_name: &str) -> Option<PathBuf> {
        self.tool_resolver.resolve_tool(base_name)
    }

    /// Run a tool to completion, killing it when `timeout` elapses
    pub async fn run_tool(
        program: &Path,
        args: &[String],
        timeout: Duration,
    ) -> Result<Output, TranscodeError> {
        let tool = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());

        debug!("Running {} {:?}", tool, args);
        let start_time = Instant::now();

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TranscodeError::Spawn {
                tool: tool.clone(),
                path: program.to_path_buf(),
                message: e.to_string(),
            })?;

        // Dropping the wait future on timeout kills the child
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| TranscodeError::Timeout {
                tool: tool.clone(),
                secs: timeout.as_secs(),
            })??;

        debug!("{} exited with {} in {:?}", tool, output.status, start_time.elapsed());
        Ok(output)
    }

    /// Get system information for debugging
    pub fn system_info() -> SystemInfo {
        SystemInfo {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            family: std::env::consts::FAMILY,
        }
    }
}

/// Short stderr excerpt for error messages
pub fn stderr_excerpt(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        format!("exit status {}", output.status)
    } else {
        trimmed.lines().take(3).collect::<Vec<_>>().join(" | ")
    }
}

/// System information structure
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
}

impl std::fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.os, self.arch, self.family)
    }
}
