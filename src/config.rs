use crate::admission::PlatformGates;
use crate::batch::{BatchRunner, CallPolicy};
use crate::matcher::{MatchPolicy, Matcher};
use crate::retry::RetryPolicy;
use anyhow::{ensure, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Sqlite file caching catalog search resolutions. No cache when unset.
    #[serde(default)]
    pub cache_db_path: Option<PathBuf>,

    /// Directory of per-platform library files served by the in-memory provider.
    #[serde(default = "default_library_dir")]
    pub library_dir: PathBuf,

    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    // Batch scheduling
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency_per_platform: usize,
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,

    // Rate-limit retries
    #[serde(default = "default_max_retries")]
    pub max_retries_on_error: u32,
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay")]
    pub retry_max_delay_ms: u64,

    // Matching
    #[serde(default)]
    pub match_policy: MatchPolicy,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Name for playlists created by sync/restore. Placeholders: `${name}`, `${platform}`.
    #[serde(default = "default_playlist_name_template")]
    pub playlist_name_template: String,
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("playsync").join("logs"))
        .unwrap_or_else(|| "logs".into())
}
fn default_library_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("playsync").join("library"))
        .unwrap_or_else(|| "library".into())
}
fn default_backup_dir() -> PathBuf { "playlist_backups".into() }
fn default_max_concurrency() -> usize { 2 }
fn default_operation_timeout() -> u64 { 300 }
fn default_max_retries() -> u32 { 3 }
fn default_retry_base_delay() -> u64 { 500 }
fn default_retry_max_delay() -> u64 { 30_000 }
fn default_similarity_threshold() -> f64 { 0.92 }
fn default_playlist_name_template() -> String { "${name}".into() }

impl Default for Config {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            cache_db_path: None,
            library_dir: default_library_dir(),
            backup_dir: default_backup_dir(),
            max_concurrency_per_platform: default_max_concurrency(),
            operation_timeout_secs: default_operation_timeout(),
            max_retries_on_error: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
            retry_max_delay_ms: default_retry_max_delay(),
            match_policy: MatchPolicy::default(),
            similarity_threshold: default_similarity_threshold(),
            playlist_name_template: default_playlist_name_template(),
        }
    }
}

impl Config {
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_concurrency_per_platform > 0, "max_concurrency_per_platform must be at least 1");
        ensure!(self.operation_timeout_secs > 0, "operation_timeout_secs must be at least 1");
        ensure!(
            self.retry_base_delay_ms <= self.retry_max_delay_ms,
            "retry_base_delay_ms must not exceed retry_max_delay_ms"
        );
        ensure!(
            self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0,
            "similarity_threshold must be in (0, 1], got {}",
            self.similarity_threshold
        );
        ensure!(
            self.playlist_name_template.contains("${name}"),
            "playlist_name_template must contain ${{name}}"
        );
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries_on_error,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }

    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy::new(PlatformGates::new(self.max_concurrency_per_platform), self.retry_policy())
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn batch_runner(&self) -> BatchRunner {
        BatchRunner::new(self.operation_timeout())
    }

    pub fn matcher(&self) -> Arc<dyn Matcher> {
        self.match_policy.build(self.similarity_threshold)
    }
}
