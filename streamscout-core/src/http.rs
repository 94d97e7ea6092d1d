//! Shared HTTP plumbing
//!
//! All network I/O in the engine goes through the [`PageFetcher`] seam so
//! adapters, the iframe walker and the key cache can be exercised against
//! scripted responses in tests. The real implementation rides a shared
//! `reqwest` client with connection pooling and bounded timeouts; an
//! unbounded hang on one scraped site must never stall the fallback chain.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::HttpConfig;
use crate::error::{check_response, text_with_limit, Error, Result};

/// Realistic browser User-Agent; several embed hosts refuse anything else.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Shared HTTP client for all upstream requests (connection pooling).
static SHARED_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(10)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .expect("Failed to build shared HTTP client")
});

/// Network seam for everything the engine fetches.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET a page body as text, with per-request headers.
    ///
    /// Non-2xx statuses and bodies over the size cap are errors; callers in
    /// the fallback chain treat any error as "no result for this branch".
    async fn get_text(&self, url: &str, headers: &HashMap<String, String>) -> Result<String>;

    /// GET a URL and report the raw status code, ignoring the body.
    ///
    /// Used by the liveness probe: any HTTP response means alive, only
    /// transport failures are errors.
    async fn get_status(&self, url: &str) -> Result<u16>;
}

/// `PageFetcher` over the shared `reqwest` client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Reuses the shared connection pool with default timeouts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: SHARED_CLIENT.clone(),
        }
    }

    /// Build a dedicated client from configuration.
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .pool_max_idle_per_host(10)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn get_text(&self, url: &str, headers: &HashMap<String, String>) -> Result<String> {
        let mut req = self.client.get(url);
        for (name, value) in headers {
            req = req.header(name, value);
        }
        let resp = check_response(req.send().await?)?;
        text_with_limit(resp).await
    }

    async fn get_status(&self, url: &str) -> Result<u16> {
        let resp = self.client.get(url).send().await?;
        Ok(resp.status().as_u16())
    }
}

/// Convenience: a single-entry `Referer` header map.
#[must_use]
pub fn referer_headers(referer: &str) -> HashMap<String, String> {
    HashMap::from([("Referer".to_string(), referer.to_string())])
}
