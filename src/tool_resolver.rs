//! # Tool Path Resolver
//!
//! Finds the external binaries the pipeline shells out to:
//! - a bundled tools directory (`ASSET_SYNC_TOOLS_DIR` or the config override)
//! - the system `PATH`

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable pointing at a directory of bundled tools
pub const TOOLS_DIR_ENV: &str = "ASSET_SYNC_TOOLS_DIR";

/// Tool path resolver for bundled and system-installed tools
#[derive(Debug, Clone, Default)]
pub struct ToolPathResolver {
    tools_dir: Option<PathBuf>,
}

impl ToolPathResolver {
    /// Create a resolver honouring `ASSET_SYNC_TOOLS_DIR`
    pub fn new() -> Self {
        let tools_dir = env::var_os(TOOLS_DIR_ENV)
            .map(PathBuf::from)
            .filter(|dir| dir.is_dir());
        Self { tools_dir }
    }

    pub fn with_tools_dir(tools_dir: impl Into<PathBuf>) -> Self {
        Self {
            tools_dir: Some(tools_dir.into()),
        }
    }

    /// Resolve the path to a specific tool, bundled first
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        if let Some(ref tools_dir) = self.tools_dir {
            let bundled = Self::bundled_tool_path(tools_dir, tool_name);
            if bundled.is_file() {
                debug!("Using bundled tool: {} -> {:?}", tool_name, bundled);
                return Some(bundled);
            }
        }

        match which::which(tool_name) {
            Ok(path) => {
                debug!("Using system tool: {} -> {:?}", tool_name, path);
                Some(path)
            }
            Err(_) => {
                debug!("Tool not found: {}", tool_name);
                None
            }
        }
    }

    fn bundled_tool_path(tools_dir: &Path, tool_name: &str) -> PathBuf {
        let extension = if cfg!(windows) { ".exe" } else { "" };
        tools_dir.join(format!("{}{}", tool_name, extension))
    }

    /// Installation hint shown when a required tool is missing
    pub fn install_instructions(tool_name: &str) -> &'static str {
        match tool_name {
            "cwebp" => {
                if cfg!(target_os = "macos") {
                    "brew install webp"
                } else {
                    "sudo apt-get install webp"
                }
            }
            "magick" | "convert" => {
                if cfg!(target_os = "macos") {
                    "brew install imagemagick"
                } else {
                    "sudo apt-get install imagemagick"
                }
            }
            "sips" => "sips ships with macOS only",
            _ => "install it and make sure it is on PATH",
        }
    }
}
