//! Named downloader configuration: everything that shapes one yt-dlp invocation
//! plus the job-level policies bound to it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to do when the target file already exists in the download folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Never overwrite any file (`--no-overwrites`).
    Never,
    /// Overwrite video and metadata files (`--force-overwrites`).
    Always,
    /// yt-dlp default: keep the video, refresh metadata files.
    #[default]
    Default,
}

/// Where the downloader should take cookies from, if at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieSource {
    File(PathBuf),
    Browser(String),
}

/// One `[downloader.<name>]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Output template relative to the download folder.
    pub output_template: String,
    /// Format selector (`-f`). None = yt-dlp default.
    pub format: Option<String>,
    /// Format sort keys (`-S`), e.g. `["res:1080", "ext:mp4:m4a"]`.
    pub format_sort: Vec<String>,
    /// Container for merged video+audio (`--merge-output-format`).
    pub merge_output_format: Option<String>,
    pub write_subtitles: bool,
    pub write_auto_subtitles: bool,
    pub embed_subtitles: bool,
    /// Subtitle languages (`--sub-langs`), e.g. `["en", "fr"]`.
    pub subtitle_languages: Vec<String>,
    pub subtitle_format: Option<String>,
    /// Extract audio only (`-x`).
    pub extract_audio: bool,
    pub audio_format: Option<String>,
    pub audio_quality: Option<String>,
    pub overwrite: OverwritePolicy,
    pub use_cookies: bool,
    pub cookies_file: Option<PathBuf>,
    pub cookies_from_browser: Option<String>,
    /// Network retries performed by yt-dlp itself. The engine never retries a task.
    pub retries: Option<u32>,
    /// Bandwidth cap passed to `--limit-rate` (e.g. "2M").
    pub rate_limit: Option<String>,
    /// Extra arguments appended verbatim before the URL.
    pub extra_args: Vec<String>,
    /// Start a job as soon as it is created.
    pub start_download_automatically: bool,
    /// Delete a job record once every task succeeded.
    pub remove_completed_job_automatically: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            output_template: "%(title).200B [%(id)s].%(ext)s".to_string(),
            format: None,
            format_sort: Vec::new(),
            merge_output_format: None,
            write_subtitles: false,
            write_auto_subtitles: false,
            embed_subtitles: false,
            subtitle_languages: Vec::new(),
            subtitle_format: None,
            extract_audio: false,
            audio_format: None,
            audio_quality: None,
            overwrite: OverwritePolicy::Default,
            use_cookies: false,
            cookies_file: None,
            cookies_from_browser: None,
            retries: None,
            rate_limit: None,
            extra_args: Vec::new(),
            start_download_automatically: true,
            remove_completed_job_automatically: false,
        }
    }
}

impl DownloaderConfig {
    /// Cookie source when `use_cookies` is on. A cookie file wins over a browser.
    pub fn cookie_source(&self) -> Option<CookieSource> {
        if !self.use_cookies {
            return None;
        }
        if let Some(path) = &self.cookies_file {
            return Some(CookieSource::File(path.clone()));
        }
        self.cookies_from_browser
            .as_ref()
            .filter(|b| !b.trim().is_empty())
            .map(|b| CookieSource::Browser(b.trim().to_string()))
    }

    pub fn wants_subtitles(&self) -> bool {
        self.write_subtitles || self.write_auto_subtitles || self.embed_subtitles
    }
}
