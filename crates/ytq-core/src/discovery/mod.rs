//! Channel discovery: which uploads of a tracked channel have not been seen yet.

mod api;
mod http;
mod youtube;

use async_trait::async_trait;

pub use http::{CurlGet, HttpGet, HttpResponse};
pub use youtube::YouTubeApiDiscovery;

/// New videos of one channel, oldest first, plus the API units spent finding them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryBatch {
    pub video_ids: Vec<String>,
    pub units_used: u64,
}

/// Discovery failure. `units_used` counts the requests already made, which are
/// charged even though the batch is lost.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DiscoveryError {
    pub message: String,
    pub units_used: u64,
}

impl DiscoveryError {
    pub fn new(message: impl Into<String>, units_used: u64) -> Self {
        Self {
            message: message.into(),
            units_used,
        }
    }
}

#[async_trait]
pub trait Discovery: Send + Sync {
    async fn list_new_videos(&self, channel_id: &str) -> Result<DiscoveryBatch, DiscoveryError>;
}
