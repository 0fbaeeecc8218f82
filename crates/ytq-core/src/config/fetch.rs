//! Named fetch scheduler configuration (`[scheduler.<name>]`).

use serde::{Deserialize, Serialize};

use super::DEFAULT_PROFILE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSchedulerConfig {
    /// When false, timer fires are skipped (manual `ytq fetch` still runs).
    pub auto_start: bool,
    /// Six-field cron expression with seconds (`sec min hour dom mon dow`).
    /// Takes precedence over `fixed_rate_secs`.
    pub cron: Option<String>,
    /// IANA time zone for the cron expression and the quota day boundary.
    pub time_zone: String,
    /// Fixed interval between fires, used when `cron` is unset.
    pub fixed_rate_secs: Option<u64>,
    /// Daily API unit budget.
    pub daily_limit: u64,
    /// Headroom below `daily_limit` that is never intentionally spent.
    pub safety_threshold: u64,
    /// Units reserved before each discovery cycle.
    pub estimated_discovery_cost: u64,
    /// Downloader configuration for channels that do not name one.
    pub config_name: String,
    /// Upper bound on playlist pages read per channel and cycle.
    pub max_pages_per_channel: u32,
}

impl Default for FetchSchedulerConfig {
    fn default() -> Self {
        Self {
            auto_start: false,
            cron: Some("0 0 */6 * * *".to_string()),
            time_zone: "UTC".to_string(),
            fixed_rate_secs: None,
            daily_limit: 10_000,
            safety_threshold: 500,
            estimated_discovery_cost: 100,
            config_name: DEFAULT_PROFILE.to_string(),
            max_pages_per_channel: 2,
        }
    }
}
