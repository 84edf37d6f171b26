//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

const LOCAL_CONFIG_FILE: &str = "hashpipe.toml";

/// Per-user config file, e.g. ~/.config/hashpipe/config.toml
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "hashpipe")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Runtime configuration for the signing pipeline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub workers: WorkersConfig,
    pub signer: SignerConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Unread items a stream holds before its writer blocks (0 = rendezvous)
    pub stream_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stream_capacity: hashpipe_core::DEFAULT_STREAM_CAPACITY,
        }
    }
}

/// Worker pool size per stage; also the bound on in-flight items.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub single_hash: usize,
    pub multi_hash: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let workers = cpus.clamp(4, 16);
        Self {
            single_hash: workers,
            multi_hash: workers,
        }
    }
}

/// Latency emulation for [`DataSigner`](crate::DataSigner)
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    pub crc32_delay_ms: u64,
    pub md5_delay_ms: u64,
    /// Stall imposed on an md5 call that overlaps another
    pub overheat_penalty_ms: u64,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            crc32_delay_ms: 0,
            md5_delay_ms: 0,
            overheat_penalty_ms: 1000,
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./hashpipe.toml (current directory)
    /// 2. ~/.config/hashpipe/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."), user_config_path().as_deref())
    }

    /// Search `dir` for hashpipe.toml, then `user_config`, then fall back
    /// to defaults.
    pub fn load_from(dir: &Path, user_config: Option<&Path>) -> Result<Self> {
        let local_config = dir.join(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(user_config) = user_config {
            if user_config.exists() {
                return Self::from_file(user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.workers.single_hash == 0 {
            bail!("workers.single_hash must be at least 1");
        }
        if self.workers.multi_hash == 0 {
            bail!("workers.multi_hash must be at least 1");
        }
        Ok(())
    }
}
