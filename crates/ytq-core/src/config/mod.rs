//! Configuration: one immutable `YtqConfig` built at startup and shared by `Arc`.
//!
//! Loaded from `~/.config/ytq/config.toml` (created with defaults when absent),
//! then overridden from an optional env file and the process environment.

mod downloader;
mod env;
mod fetch;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub use downloader::{CookieSource, DownloaderConfig, OverwritePolicy};
pub use env::{apply_overrides, read_env_file};
pub use fetch::FetchSchedulerConfig;

/// Name used for the built-in downloader and scheduler entries.
pub const DEFAULT_PROFILE: &str = "default";

/// Default base URL of the YouTube Data API v3.
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Failure to resolve a named configuration entry, or an invalid value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown downloader configuration `{0}`")]
    UnknownDownloader(String),
    #[error("unknown fetch scheduler configuration `{0}`")]
    UnknownScheduler(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Global configuration loaded from `~/.config/ytq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YtqConfig {
    /// Number of downloads that may run at the same time.
    pub thread_pool_size: usize,
    /// Maximum number of tasks waiting in the pool queue (None = unbounded).
    #[serde(default)]
    pub queue_capacity: Option<usize>,
    /// Where downloaded files land. None = current directory at run time.
    #[serde(default)]
    pub download_folder: Option<PathBuf>,
    /// Path or name of the yt-dlp executable.
    #[serde(default = "default_downloader_path")]
    pub downloader_path: PathBuf,
    /// API key for the YouTube Data API (discovery). Discovery is disabled without it.
    #[serde(default)]
    pub youtube_api_key: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub youtube_api_base_url: String,
    /// Scheduler entry used by `ytq daemon` / `ytq fetch` when none is named.
    #[serde(default = "default_profile_name")]
    pub active_scheduler: String,
    /// Named downloader configurations (`[downloader.<name>]`).
    #[serde(default = "default_downloaders", rename = "downloader")]
    pub downloaders: BTreeMap<String, DownloaderConfig>,
    /// Named fetch scheduler configurations (`[scheduler.<name>]`).
    #[serde(default = "default_schedulers", rename = "scheduler")]
    pub schedulers: BTreeMap<String, FetchSchedulerConfig>,
}

fn default_downloader_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_profile_name() -> String {
    DEFAULT_PROFILE.to_string()
}

fn default_downloaders() -> BTreeMap<String, DownloaderConfig> {
    BTreeMap::from([(DEFAULT_PROFILE.to_string(), DownloaderConfig::default())])
}

fn default_schedulers() -> BTreeMap<String, FetchSchedulerConfig> {
    BTreeMap::from([(DEFAULT_PROFILE.to_string(), FetchSchedulerConfig::default())])
}

impl Default for YtqConfig {
    fn default() -> Self {
        Self {
            thread_pool_size: 3,
            queue_capacity: None,
            download_folder: None,
            downloader_path: default_downloader_path(),
            youtube_api_key: None,
            youtube_api_base_url: default_api_base_url(),
            active_scheduler: default_profile_name(),
            downloaders: default_downloaders(),
            schedulers: default_schedulers(),
        }
    }
}

impl YtqConfig {
    /// Resolve a named downloader configuration.
    pub fn downloader(&self, name: &str) -> Result<&DownloaderConfig, ConfigError> {
        self.downloaders
            .get(name)
            .ok_or_else(|| ConfigError::UnknownDownloader(name.to_string()))
    }

    /// Resolve a named fetch scheduler configuration.
    pub fn scheduler(&self, name: &str) -> Result<&FetchSchedulerConfig, ConfigError> {
        self.schedulers
            .get(name)
            .ok_or_else(|| ConfigError::UnknownScheduler(name.to_string()))
    }

    /// The YouTube API key, unless unset or blank.
    pub fn api_key(&self) -> Option<&str> {
        self.youtube_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Download folder, falling back to `fallback` (usually the working directory).
    pub fn download_folder_or(&self, fallback: &Path) -> PathBuf {
        self.download_folder
            .clone()
            .unwrap_or_else(|| fallback.to_path_buf())
    }

    /// Reject values no component can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_pool_size == 0 {
            return Err(ConfigError::Invalid(
                "thread_pool_size must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == Some(0) {
            return Err(ConfigError::Invalid(
                "queue_capacity must be at least 1 when set".to_string(),
            ));
        }
        for (name, sched) in &self.schedulers {
            if sched.safety_threshold > sched.daily_limit {
                return Err(ConfigError::Invalid(format!(
                    "scheduler `{name}`: safety_threshold exceeds daily_limit"
                )));
            }
            if !self.downloaders.contains_key(&sched.config_name) {
                return Err(ConfigError::Invalid(format!(
                    "scheduler `{name}` refers to unknown downloader `{}`",
                    sched.config_name
                )));
            }
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ytq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<YtqConfig> {
    let path = config_path()?;
    load_or_init_at(&path)
}

/// Like `load_or_init` but for an explicit path (tests, `--config`).
pub fn load_or_init_at(path: &Path) -> Result<YtqConfig> {
    if !path.exists() {
        let default_cfg = YtqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: YtqConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}

/// Full startup load: file, then env file, then process environment, then validation.
pub fn load(env_file: Option<&Path>) -> Result<YtqConfig> {
    let mut cfg = load_or_init()?;
    let file_vars = match env_file {
        Some(path) => read_env_file(path)?,
        None => Default::default(),
    };
    apply_overrides(&mut cfg, &file_vars, |key| std::env::var(key).ok())?;
    cfg.validate()?;
    Ok(cfg)
}
