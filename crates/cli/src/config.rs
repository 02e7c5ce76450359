use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use inboxproxy_attachments::ChunkPolicy;
use inboxproxy_executor::QueueConfig;

/// Environment variable overriding `storage.directory`.
pub const STORAGE_DIR_ENV: &str = "INBOXPROXY_STORAGE_DIR";
/// Environment variable overriding `queue.failure_log`.
pub const FAILURE_LOG_ENV: &str = "INBOXPROXY_FAILURE_LOG";

/// Top-level configuration, loaded from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub queue: QueueFileConfig,
}

/// Where attachment objects are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the local object store.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
        }
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from("./data")
}

/// Chunking thresholds in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_threshold")]
    pub threshold_bytes: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: u64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            threshold_bytes: default_threshold(),
            chunk_size_bytes: default_chunk_size(),
        }
    }
}

fn default_threshold() -> u64 {
    ChunkPolicy::DEFAULT_THRESHOLD
}

fn default_chunk_size() -> u64 {
    ChunkPolicy::DEFAULT_CHUNK_SIZE
}

/// Worker pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueFileConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Append-only log of jobs that exhausted their retries.
    #[serde(default = "default_failure_log")]
    pub failure_log: PathBuf,
}

impl Default for QueueFileConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            failure_log: default_failure_log(),
        }
    }
}

fn default_workers() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_failure_log() -> PathBuf {
    PathBuf::from("failures.log")
}

impl InboxConfig {
    /// Read `path`, falling back to defaults when it does not exist, then
    /// apply environment overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config: Self = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config at {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("failed to parse config at {}", path.display()))?
        } else {
            info!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply `INBOXPROXY_*` overrides resolved through `lookup`. Empty values
    /// are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        if let Some(dir) = var(STORAGE_DIR_ENV) {
            self.storage.directory = PathBuf::from(dir);
        }
        if let Some(log) = var(FAILURE_LOG_ENV) {
            self.queue.failure_log = PathBuf::from(log);
        }
    }

    pub fn chunk_policy(&self) -> anyhow::Result<ChunkPolicy> {
        ChunkPolicy::new(self.chunking.threshold_bytes, self.chunking.chunk_size_bytes)
            .context("invalid [chunking] section")
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            workers: self.queue.workers,
            max_retries: self.queue.max_retries,
            retry_delay: Duration::from_millis(self.queue.retry_delay_ms),
            failure_log: self.queue.failure_log.clone(),
        }
    }
}
