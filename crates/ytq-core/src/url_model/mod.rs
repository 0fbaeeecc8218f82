//! Video URL modeling: resolve user input to a YouTube video id and back.
//!
//! Accepted inputs: `watch?v=` URLs (any youtube host), `youtu.be/<id>`,
//! `/shorts/<id>`, `/embed/<id>`, `/live/<id>`, `/v/<id>`, and a bare id.

mod path;

pub use path::video_id_from_path;

/// Length of every YouTube video id.
pub const VIDEO_ID_LEN: usize = 11;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VideoIdError {
    #[error("empty input")]
    Empty,
    #[error("not a YouTube URL")]
    UnsupportedHost,
    #[error("no video id found in URL")]
    MissingId,
    #[error("malformed video id `{0}`")]
    Malformed(String),
}

/// True if `s` has the shape of a video id: 11 chars of `[A-Za-z0-9_-]`.
pub fn is_video_id(s: &str) -> bool {
    s.len() == VIDEO_ID_LEN
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn is_youtube_host(host: &str) -> bool {
    let host = host.trim_start_matches("www.").trim_start_matches("m.");
    matches!(
        host,
        "youtube.com" | "music.youtube.com" | "youtu.be" | "youtube-nocookie.com"
    )
}

/// Resolves a URL or bare id to a video id.
///
/// # Examples
///
/// - `resolve_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ")` → `"dQw4w9WgXcQ"`
/// - `resolve_video_id("https://youtu.be/dQw4w9WgXcQ?t=42")` → `"dQw4w9WgXcQ"`
/// - `resolve_video_id("dQw4w9WgXcQ")` → `"dQw4w9WgXcQ"`
pub fn resolve_video_id(input: &str) -> Result<String, VideoIdError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(VideoIdError::Empty);
    }
    if is_video_id(input) {
        return Ok(input.to_string());
    }

    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{input}")
    };
    let parsed = url::Url::parse(&with_scheme).map_err(|_| VideoIdError::MissingId)?;
    let host = parsed
        .host_str()
        .map(str::to_ascii_lowercase)
        .ok_or(VideoIdError::UnsupportedHost)?;
    if !is_youtube_host(&host) {
        return Err(VideoIdError::UnsupportedHost);
    }

    let candidate = if host.ends_with("youtu.be") {
        parsed
            .path_segments()
            .and_then(|mut s| s.next())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    } else {
        parsed
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned())
            .or_else(|| video_id_from_path(parsed.path()))
    };

    let id = candidate.ok_or(VideoIdError::MissingId)?;
    if is_video_id(&id) {
        Ok(id)
    } else {
        Err(VideoIdError::Malformed(id))
    }
}

/// Canonical watch URL handed to the downloader.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}
