//! yt-dlp command line built from a `DownloaderConfig`.

use std::path::Path;

use crate::config::{CookieSource, DownloaderConfig, OverwritePolicy};
use crate::url_model::watch_url;

/// Marker printed before each progress line (see `--progress-template`).
pub const PROGRESS_MARKER: &str = "ytq-progress";
/// Marker printed before the final file path (see `--print after_move:`).
pub const FILE_MARKER: &str = "ytq-file";

fn push(args: &mut Vec<String>, flag: &str, value: impl Into<String>) {
    args.push(flag.to_string());
    args.push(value.into());
}

/// Full argument list for downloading `video_id` into `download_folder`.
///
/// Order: fixed machine-readable flags, output template, format, subtitles,
/// audio, overwrite policy, cookies, retries/rate, user extras, `--`, URL.
pub fn build_args(video_id: &str, config: &DownloaderConfig, download_folder: &Path) -> Vec<String> {
    let mut args: Vec<String> = [
        "--ignore-config",
        "--newline",
        "--no-simulate",
        "--progress",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    push(
        &mut args,
        "--progress-template",
        format!(
            "download:{PROGRESS_MARKER} %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s"
        ),
    );
    push(&mut args, "--print", format!("after_move:{FILE_MARKER} %(filepath)s"));
    push(
        &mut args,
        "-o",
        download_folder
            .join(&config.output_template)
            .to_string_lossy()
            .to_string(),
    );

    if let Some(format) = &config.format {
        push(&mut args, "-f", format.clone());
    }
    if !config.format_sort.is_empty() {
        push(&mut args, "-S", config.format_sort.join(","));
    }
    if let Some(merge) = &config.merge_output_format {
        push(&mut args, "--merge-output-format", merge.clone());
    }

    if config.write_subtitles {
        args.push("--write-subs".to_string());
    }
    if config.write_auto_subtitles {
        args.push("--write-auto-subs".to_string());
    }
    if config.wants_subtitles() {
        if !config.subtitle_languages.is_empty() {
            push(&mut args, "--sub-langs", config.subtitle_languages.join(","));
        }
        if let Some(fmt) = &config.subtitle_format {
            push(&mut args, "--sub-format", fmt.clone());
        }
    }
    if config.embed_subtitles {
        args.push("--embed-subs".to_string());
    }

    if config.extract_audio {
        args.push("-x".to_string());
        if let Some(fmt) = &config.audio_format {
            push(&mut args, "--audio-format", fmt.clone());
        }
        if let Some(q) = &config.audio_quality {
            push(&mut args, "--audio-quality", q.clone());
        }
    }

    match config.overwrite {
        OverwritePolicy::Never => args.push("--no-overwrites".to_string()),
        OverwritePolicy::Always => args.push("--force-overwrites".to_string()),
        OverwritePolicy::Default => {}
    }

    match config.cookie_source() {
        Some(CookieSource::File(path)) => {
            push(&mut args, "--cookies", path.to_string_lossy().to_string())
        }
        Some(CookieSource::Browser(browser)) => push(&mut args, "--cookies-from-browser", browser),
        None => {}
    }

    if let Some(retries) = config.retries {
        push(&mut args, "--retries", retries.to_string());
    }
    if let Some(rate) = &config.rate_limit {
        push(&mut args, "--limit-rate", rate.clone());
    }

    args.extend(config.extra_args.iter().cloned());
    args.push("--".to_string());
    args.push(watch_url(video_id));
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn default_config_args() {
        let args = build_args("dQw4w9WgXcQ", &DownloaderConfig::default(), Path::new("/dl"));
        assert_eq!(&args[..4], ["--ignore-config", "--newline", "--no-simulate", "--progress"]);
        assert_eq!(
            value_after(&args, "-o"),
            Some("/dl/%(title).200B [%(id)s].%(ext)s")
        );
        assert!(value_after(&args, "--progress-template")
            .unwrap()
            .starts_with("download:ytq-progress "));
        assert_eq!(value_after(&args, "--print"), Some("after_move:ytq-file %(filepath)s"));
        assert!(!args.iter().any(|a| a == "--no-overwrites" || a == "--force-overwrites"));
        assert!(!args.iter().any(|a| a == "-f" || a == "-x" || a == "--cookies"));
        let n = args.len();
        assert_eq!(args[n - 2], "--");
        assert_eq!(args[n - 1], "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn full_config_args() {
        let cfg = DownloaderConfig {
            format: Some("bv*+ba/b".into()),
            format_sort: vec!["res:1080".into(), "ext:mp4:m4a".into()],
            merge_output_format: Some("mkv".into()),
            write_subtitles: true,
            embed_subtitles: true,
            subtitle_languages: vec!["en".into(), "fr".into()],
            subtitle_format: Some("srt".into()),
            extract_audio: true,
            audio_format: Some("mp3".into()),
            audio_quality: Some("0".into()),
            overwrite: OverwritePolicy::Never,
            use_cookies: true,
            cookies_from_browser: Some("firefox".into()),
            retries: Some(5),
            rate_limit: Some("2M".into()),
            extra_args: vec!["--no-mtime".into()],
            ..Default::default()
        };
        let args = build_args("abcdefghijk", &cfg, &PathBuf::from("out"));
        assert_eq!(value_after(&args, "-f"), Some("bv*+ba/b"));
        assert_eq!(value_after(&args, "-S"), Some("res:1080,ext:mp4:m4a"));
        assert_eq!(value_after(&args, "--merge-output-format"), Some("mkv"));
        assert!(args.iter().any(|a| a == "--write-subs"));
        assert!(!args.iter().any(|a| a == "--write-auto-subs"));
        assert_eq!(value_after(&args, "--sub-langs"), Some("en,fr"));
        assert_eq!(value_after(&args, "--sub-format"), Some("srt"));
        assert!(args.iter().any(|a| a == "--embed-subs"));
        assert!(args.iter().any(|a| a == "-x"));
        assert_eq!(value_after(&args, "--audio-format"), Some("mp3"));
        assert_eq!(value_after(&args, "--audio-quality"), Some("0"));
        assert!(args.iter().any(|a| a == "--no-overwrites"));
        assert_eq!(value_after(&args, "--cookies-from-browser"), Some("firefox"));
        assert_eq!(value_after(&args, "--retries"), Some("5"));
        assert_eq!(value_after(&args, "--limit-rate"), Some("2M"));
        let sep = args.iter().position(|a| a == "--").unwrap();
        assert_eq!(args[sep - 1], "--no-mtime");
    }

    #[test]
    fn force_overwrite_and_cookie_file() {
        let cfg = DownloaderConfig {
            overwrite: OverwritePolicy::Always,
            use_cookies: true,
            cookies_file: Some(PathBuf::from("/etc/ytq/cookies.txt")),
            ..Default::default()
        };
        let args = build_args("abcdefghijk", &cfg, Path::new("/dl"));
        assert!(args.iter().any(|a| a == "--force-overwrites"));
        assert_eq!(value_after(&args, "--cookies"), Some("/etc/ytq/cookies.txt"));
        assert!(value_after(&args, "--cookies-from-browser").is_none());
    }
}
