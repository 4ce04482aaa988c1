//! Configuration loading

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::supervisor::SupervisorConfig;

pub const CONFIG_FILE_NAME: &str = ".studio.toml";

/// Find a config file by walking up the directory tree, then checking global config.
///
/// Search order:
/// 1. Current directory and parent directories (walking up to root)
/// 2. Global config at ~/.config/mcp-studio/
fn find_config_file(filename: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let candidate = current.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("mcp-studio").join(filename);
        if global_path.exists() {
            return Some(global_path);
        }
    }

    None
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

// ============================================================================
// Studio Configuration (.studio.toml)
// ============================================================================

/// Top-level studio configuration (from .studio.toml)
#[derive(Debug, Default, Deserialize)]
pub struct StudioConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub deploy: DeploySection,
    #[serde(default)]
    pub gateway: GatewaySection,
}

/// HTTP listener section
#[derive(Debug, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Store section
#[derive(Debug, Default, Deserialize)]
pub struct StoreSection {
    /// Store document path, `~/.mcp-studio/store.json` when unset
    pub path: Option<String>,
    /// Where deployed drafts are written, `~/.mcp-studio/exports` when unset
    pub export_dir: Option<String>,
}

/// Deployment supervisor section
#[derive(Debug, Deserialize)]
pub struct DeploySection {
    #[serde(default = "default_shell")]
    pub shell: String,
    pub working_dir: Option<String>,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

/// Live server gateway section
#[derive(Debug, Deserialize)]
pub struct GatewaySection {
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3100
}

fn default_shell() -> String {
    "sh".to_string()
}

fn default_max_output_bytes() -> usize {
    1024 * 1024
}

fn default_startup_timeout() -> u64 {
    30
}

fn default_tool_timeout() -> u64 {
    60
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DeploySection {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            working_dir: None,
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            startup_timeout_secs: default_startup_timeout(),
            tool_timeout_secs: default_tool_timeout(),
        }
    }
}

impl StudioConfig {
    /// Load config from .studio.toml
    ///
    /// Search order:
    /// 1. Walk up directory tree from cwd looking for .studio.toml
    /// 2. Check ~/.config/mcp-studio/.studio.toml (global fallback)
    /// 3. Fall back to defaults
    pub fn load() -> Result<Self> {
        if let Some(config_path) = find_config_file(CONFIG_FILE_NAME) {
            tracing::debug!("Loading config from: {}", config_path.display());
            return Self::load_from_path(&config_path);
        }

        tracing::debug!("No {} found, using defaults", CONFIG_FILE_NAME);
        Ok(Self::default())
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: StudioConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    /// Store path from config, if set
    pub fn store_path(&self) -> Option<PathBuf> {
        self.store.path.as_deref().map(expand_path)
    }

    /// Draft export directory, next to the default store when unset
    pub fn export_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = self.store.export_dir.as_deref() {
            return Ok(expand_path(dir));
        }
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".mcp-studio").join("exports"))
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            shell: self.deploy.shell.clone(),
            working_dir: self.deploy.working_dir.as_deref().map(expand_path),
            max_output_bytes: self.deploy.max_output_bytes,
        }
    }

    pub fn gateway_timeouts(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.gateway.startup_timeout_secs),
            Duration::from_secs(self.gateway.tool_timeout_secs),
        )
    }
}
