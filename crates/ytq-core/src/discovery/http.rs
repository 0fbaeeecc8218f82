//! Blocking HTTP GET over libcurl.

use anyhow::{Context, Result};
use std::time::Duration;

/// Response of a GET: status code and body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u32,
    pub body: Vec<u8>,
}

/// Blocking GET. Call from `spawn_blocking` when used from async code.
pub trait HttpGet: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CurlGet;

impl HttpGet for CurlGet {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        let mut body = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url).context("invalid URL")?;
        easy.follow_location(true)?;
        easy.connect_timeout(Duration::from_secs(15))?;
        easy.timeout(Duration::from_secs(30))?;
        easy.useragent(concat!("ytq/", env!("CARGO_PKG_VERSION")))?;

        let mut list = curl::easy::List::new();
        list.append("Accept: application/json")?;
        easy.http_headers(list)?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform().context("GET request failed")?;
        }

        let status = easy.response_code().context("no response code")?;
        Ok(HttpResponse { status, body })
    }
}
