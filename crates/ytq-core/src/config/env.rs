//! `KEY=VALUE` env file parsing and environment overrides on top of config.toml.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{ConfigError, YtqConfig};

pub const ENV_THREAD_POOL_SIZE: &str = "YTQ_THREAD_POOL_SIZE";
pub const ENV_DOWNLOAD_FOLDER: &str = "YTQ_DOWNLOAD_FOLDER";
pub const ENV_DOWNLOADER_PATH: &str = "YTQ_DOWNLOADER_PATH";
pub const ENV_YOUTUBE_API_KEY: &str = "YTQ_YOUTUBE_API_KEY";

/// Reads an env file. A missing file yields no variables.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("read env file: {}", path.display()))?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value_raw.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}

/// Applies overrides; `env_lookup` (the process environment) wins over `file_vars`.
pub fn apply_overrides(
    cfg: &mut YtqConfig,
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let lookup = |key: &str| {
        env_lookup(key)
            .or_else(|| file_vars.get(key).cloned())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    if let Some(raw) = lookup(ENV_THREAD_POOL_SIZE) {
        cfg.thread_pool_size = raw.parse::<usize>().map_err(|_| {
            ConfigError::Invalid(format!("{ENV_THREAD_POOL_SIZE} is not a number: {raw}"))
        })?;
    }
    if let Some(folder) = lookup(ENV_DOWNLOAD_FOLDER) {
        cfg.download_folder = Some(PathBuf::from(folder));
    }
    if let Some(path) = lookup(ENV_DOWNLOADER_PATH) {
        cfg.downloader_path = PathBuf::from(path);
    }
    if let Some(key) = lookup(ENV_YOUTUBE_API_KEY) {
        cfg.youtube_api_key = Some(key);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn read_env_file_handles_export_quotes_and_comments() {
        let file = env_file(
            r#"
            export YTQ_DOWNLOAD_FOLDER="/media/yt"
            YTQ_DOWNLOADER_PATH='/opt/yt-dlp'
            YTQ_THREAD_POOL_SIZE =  4
            # comment
            NOT_A_PAIR
            "#,
        );
        let vars = read_env_file(file.path()).unwrap();
        assert_eq!(vars.get(ENV_DOWNLOAD_FOLDER).unwrap(), "/media/yt");
        assert_eq!(vars.get(ENV_DOWNLOADER_PATH).unwrap(), "/opt/yt-dlp");
        assert_eq!(vars.get(ENV_THREAD_POOL_SIZE).unwrap(), "4");
        assert!(!vars.contains_key("NOT_A_PAIR"));
    }

    #[test]
    fn missing_env_file_is_empty() {
        let vars = read_env_file(Path::new("/definitely/not/here.env")).unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn environment_wins_over_file() {
        let mut cfg = YtqConfig::default();
        let file_vars = HashMap::from([
            (ENV_THREAD_POOL_SIZE.to_string(), "2".to_string()),
            (ENV_YOUTUBE_API_KEY.to_string(), "from-file".to_string()),
        ]);
        apply_overrides(&mut cfg, &file_vars, |key| {
            (key == ENV_YOUTUBE_API_KEY).then(|| "from-env".to_string())
        })
        .unwrap();
        assert_eq!(cfg.thread_pool_size, 2);
        assert_eq!(cfg.youtube_api_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn bad_pool_size_is_invalid() {
        let mut cfg = YtqConfig::default();
        let file_vars = HashMap::from([(ENV_THREAD_POOL_SIZE.to_string(), "many".to_string())]);
        let err = apply_overrides(&mut cfg, &file_vars, |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
