//! Discovery over the YouTube Data API v3.
//!
//! Reads the channel's uploads playlist newest first and stops at the first
//! video already marked seen, at the page limit, or at the end of the playlist.
//! Every request costs one unit.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::api::{self, ChannelListResponse, PlaylistItemsResponse};
use super::{CurlGet, Discovery, DiscoveryBatch, DiscoveryError, HttpGet};
use crate::store::ChannelStore;

const PAGE_SIZE: &str = "50";

pub struct YouTubeApiDiscovery {
    http: Arc<dyn HttpGet>,
    base_url: String,
    api_key: String,
    channels: Arc<dyn ChannelStore>,
    max_pages: u32,
}

impl YouTubeApiDiscovery {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        channels: Arc<dyn ChannelStore>,
        max_pages: u32,
    ) -> Self {
        Self {
            http: Arc::new(CurlGet),
            base_url: base_url.into(),
            api_key: api_key.into(),
            channels,
            max_pages: max_pages.max(1),
        }
    }

    /// Replace the HTTP transport.
    pub fn with_http(mut self, http: Arc<dyn HttpGet>) -> Self {
        self.http = http;
        self
    }

    fn endpoint(&self, resource: &str, params: &[(&str, &str)]) -> Result<String, String> {
        let base = format!("{}/{}", self.base_url.trim_end_matches('/'), resource);
        let mut url = url::Url::parse(&base).map_err(|e| format!("invalid API URL `{base}`: {e}"))?;
        {
            let mut query = url.query_pairs_mut();
            for (k, v) in params {
                query.append_pair(k, v);
            }
            query.append_pair("key", &self.api_key);
        }
        Ok(url.into())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, String> {
        let http = Arc::clone(&self.http);
        let response = tokio::task::spawn_blocking(move || http.get(&url))
            .await
            .map_err(|e| format!("request task failed: {e}"))?
            .map_err(|e| format!("{e:#}"))?;
        if !(200..300).contains(&response.status) {
            return Err(api::error_message(response.status, &response.body));
        }
        serde_json::from_slice(&response.body).map_err(|e| format!("unexpected API response: {e}"))
    }

    async fn uploads_playlist(&self, channel_id: &str, units: &mut u64) -> Result<String, DiscoveryError> {
        if let Some(id) = derived_uploads_playlist(channel_id) {
            return Ok(id);
        }
        let url = self
            .endpoint("channels", &[("part", "contentDetails"), ("id", channel_id)])
            .map_err(|e| DiscoveryError::new(e, *units))?;
        *units += 1;
        let response: ChannelListResponse = self
            .get_json(url)
            .await
            .map_err(|e| DiscoveryError::new(e, *units))?;
        response
            .items
            .into_iter()
            .find_map(|item| item.content_details.related_playlists.uploads)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DiscoveryError::new(format!("channel {channel_id} not found"), *units))
    }
}

/// `UC…` channel ids map to their `UU…` uploads playlist without a lookup.
pub(crate) fn derived_uploads_playlist(channel_id: &str) -> Option<String> {
    let rest = channel_id.strip_prefix("UC")?;
    (channel_id.len() == 24).then(|| format!("UU{rest}"))
}

#[async_trait]
impl Discovery for YouTubeApiDiscovery {
    async fn list_new_videos(&self, channel_id: &str) -> Result<DiscoveryBatch, DiscoveryError> {
        let mut units = 0u64;
        let playlist = self.uploads_playlist(channel_id, &mut units).await?;

        let mut fresh: Vec<String> = Vec::new();
        let mut page_token: Option<String> = None;
        'pages: for _ in 0..self.max_pages {
            let mut params = vec![
                ("part", "contentDetails"),
                ("playlistId", playlist.as_str()),
                ("maxResults", PAGE_SIZE),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.as_str()));
            }
            let url = self
                .endpoint("playlistItems", &params)
                .map_err(|e| DiscoveryError::new(e, units))?;
            units += 1;
            let page: PlaylistItemsResponse = self
                .get_json(url)
                .await
                .map_err(|e| DiscoveryError::new(e, units))?;

            for item in page.items {
                let video_id = item.content_details.video_id;
                let seen = self
                    .channels
                    .is_seen(channel_id, &video_id)
                    .await
                    .map_err(|e| DiscoveryError::new(format!("{e:#}"), units))?;
                if seen {
                    break 'pages;
                }
                if !fresh.contains(&video_id) {
                    fresh.push(video_id);
                }
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        fresh.reverse();
        tracing::debug!(channel_id, new = fresh.len(), units, "channel discovery done");
        Ok(DiscoveryBatch {
            video_ids: fresh,
            units_used: units,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::http::HttpResponse;
    use crate::store::MemoryStore;
    use std::sync::Mutex;

    const CHANNEL: &str = "UCabcdefghijklmnopqrstuv";

    /// Serves canned bodies by matching a substring of the request URL.
    struct FakeHttp {
        routes: Vec<(&'static str, u32, String)>,
        requests: Mutex<Vec<String>>,
    }

    impl FakeHttp {
        fn new(routes: Vec<(&'static str, u32, String)>) -> Arc<Self> {
            Arc::new(Self {
                routes,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl HttpGet for FakeHttp {
        fn get(&self, url: &str) -> anyhow::Result<HttpResponse> {
            self.requests.lock().unwrap().push(url.to_string());
            let (_, status, body) = self
                .routes
                .iter()
                .find(|(needle, _, _)| url.contains(needle))
                .ok_or_else(|| anyhow::anyhow!("no route for {url}"))?;
            Ok(HttpResponse {
                status: *status,
                body: body.clone().into_bytes(),
            })
        }
    }

    fn page(ids: &[&str], next: Option<&str>) -> String {
        let items: Vec<_> = ids
            .iter()
            .map(|id| serde_json::json!({"contentDetails": {"videoId": id}}))
            .collect();
        serde_json::json!({"items": items, "nextPageToken": next}).to_string()
    }

    fn discovery(http: Arc<FakeHttp>, store: Arc<MemoryStore>, max_pages: u32) -> YouTubeApiDiscovery {
        YouTubeApiDiscovery::new("k3y", "https://api.test/youtube/v3/", store, max_pages).with_http(http)
    }

    #[test]
    fn uc_channels_map_to_uploads_playlist() {
        assert_eq!(
            derived_uploads_playlist(CHANNEL).as_deref(),
            Some("UUabcdefghijklmnopqrstuv")
        );
        assert_eq!(derived_uploads_playlist("UCshort"), None);
        assert_eq!(derived_uploads_playlist("@somehandle"), None);
    }

    #[tokio::test]
    async fn stops_at_first_seen_video_and_returns_oldest_first() {
        let store = Arc::new(MemoryStore::new());
        store.mark_seen(CHANNEL, &["vid00000003".to_string()]).await.unwrap();
        let http = FakeHttp::new(vec![(
            "playlistItems",
            200,
            page(&["vid00000005", "vid00000004", "vid00000003", "vid00000002"], Some("NEXT")),
        )]);

        let batch = discovery(http.clone(), store, 3).list_new_videos(CHANNEL).await.unwrap();
        assert_eq!(batch.video_ids, ["vid00000004", "vid00000005"]);
        assert_eq!(batch.units_used, 1);

        let requests = http.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("https://api.test/youtube/v3/playlistItems?"));
        assert!(requests[0].contains("playlistId=UUabcdefghijklmnopqrstuv"));
        assert!(requests[0].contains("key=k3y"));
    }

    #[tokio::test]
    async fn follows_pages_up_to_the_limit() {
        let store = Arc::new(MemoryStore::new());
        let http = FakeHttp::new(vec![
            ("pageToken=P3", 200, page(&["vid00000001"], None)),
            ("pageToken=P2", 200, page(&["vid00000002"], Some("P3"))),
            ("playlistItems", 200, page(&["vid00000003"], Some("P2"))),
        ]);

        let batch = discovery(http.clone(), store, 2).list_new_videos(CHANNEL).await.unwrap();
        assert_eq!(batch.video_ids, ["vid00000002", "vid00000003"]);
        assert_eq!(batch.units_used, 2);
        assert_eq!(http.requests().len(), 2);
    }

    #[tokio::test]
    async fn other_channel_ids_are_looked_up() {
        let store = Arc::new(MemoryStore::new());
        let http = FakeHttp::new(vec![
            (
                "/channels?",
                200,
                r#"{"items":[{"contentDetails":{"relatedPlaylists":{"uploads":"UUfromlookup"}}}]}"#.to_string(),
            ),
            ("playlistId=UUfromlookup", 200, page(&["vid00000001"], None)),
        ]);

        let batch = discovery(http, store, 2).list_new_videos("legacyname").await.unwrap();
        assert_eq!(batch.video_ids, ["vid00000001"]);
        assert_eq!(batch.units_used, 2);
    }

    #[tokio::test]
    async fn unknown_channel_fails_with_units_spent() {
        let store = Arc::new(MemoryStore::new());
        let http = FakeHttp::new(vec![("/channels?", 200, r#"{"items":[]}"#.to_string())]);

        let err = discovery(http, store, 2).list_new_videos("nosuchchannel").await.unwrap_err();
        assert!(err.message.contains("not found"), "{}", err.message);
        assert_eq!(err.units_used, 1);
    }

    #[tokio::test]
    async fn api_error_carries_units_consumed_so_far() {
        let store = Arc::new(MemoryStore::new());
        let http = FakeHttp::new(vec![
            ("pageToken=P2", 403, r#"{"error":{"code":403,"message":"quotaExceeded"}}"#.to_string()),
            ("playlistItems", 200, page(&["vid00000002"], Some("P2"))),
        ]);

        let err = discovery(http, store, 5).list_new_videos(CHANNEL).await.unwrap_err();
        assert_eq!(err.units_used, 2);
        assert_eq!(err.message, "YouTube API error 403: quotaExceeded");
    }
}
