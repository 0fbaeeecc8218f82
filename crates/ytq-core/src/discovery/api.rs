//! YouTube Data API v3 response shapes (only the fields discovery reads).

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChannelItem {
    pub content_details: ChannelContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChannelContentDetails {
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RelatedPlaylists {
    pub uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistItemsResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistItem {
    pub content_details: PlaylistItemDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistItemDetails {
    pub video_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub message: String,
}

/// Human-readable message for a non-2xx response.
pub(crate) fn error_message(status: u32, body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(e) if !e.error.message.is_empty() => {
            format!("YouTube API error {}: {}", e.error.code.max(status), e.error.message)
        }
        _ => format!("YouTube API returned HTTP {status}"),
    }
}
