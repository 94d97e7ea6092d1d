//! Embed-page scrape adapters
//!
//! Config-driven scrapers for third-party embed hosts. Each constructs a
//! provider-specific embed URL from the episode's external id, fetches it
//! with a realistic browser User-Agent and the calling site as `Referer`,
//! and works through: provider-specific secondary patterns, generic
//! extraction, then the iframe chain walker. Secondary-pattern failures are
//! local; only the initial page fetch can fail the adapter as a whole.

use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::{EmbedProviderConfig, SecondaryPattern, WalkerConfig};
use crate::error::Result;
use crate::extract::{extract_links, stream_kind};
use crate::http::{referer_headers, PageFetcher};
use crate::models::{ContentEpisode, MediaLink};
use crate::walker::IframeWalker;

static RE_DATA_HASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"data-hash\s*=\s*["']([^"']+)["']"#).expect("invalid data-hash regex")
});

static RE_RCP_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["'](/rcp/[^"']+)["']"#).expect("invalid rcp path regex")
});

static RE_PRORCP_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["'](/prorcp/[^"']+)["']"#).expect("invalid prorcp path regex")
});

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    url: String,
    #[serde(default)]
    label: Option<String>,
}

/// One embed-page scraper instance.
pub struct EmbedScrapeAdapter {
    fetcher: Arc<dyn PageFetcher>,
    walker: IframeWalker,
    config: EmbedProviderConfig,
    depth_budget: u32,
}

impl EmbedScrapeAdapter {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        walker_config: &WalkerConfig,
        config: EmbedProviderConfig,
    ) -> Self {
        Self {
            walker: IframeWalker::new(fetcher.clone(), walker_config),
            fetcher,
            config,
            depth_budget: walker_config.depth_budget,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub async fn resolve(&self, episode: &ContentEpisode) -> Result<Vec<MediaLink>> {
        let page_url = self.embed_url(episode);
        let html = self
            .fetcher
            .get_text(&page_url, &referer_headers(&self.config.referer))
            .await?;

        if let Some(secondary) = &self.config.secondary {
            let links = match secondary {
                SecondaryPattern::DataHash { exchange_url } => {
                    self.exchange_data_hashes(&html, &page_url, exchange_url).await
                }
                SecondaryPattern::RcpRedirect => self.follow_rcp(&html, &page_url).await,
            };
            if !links.is_empty() {
                return Ok(links);
            }
        }

        let links = extract_links(&html, &self.config.name, Some(&page_url));
        if !links.is_empty() {
            return Ok(links);
        }

        Ok(self
            .walker
            .follow_chain(&html, &page_url, self.depth_budget, &self.config.name)
            .await)
    }

    /// Expand the movie or episode URL template for this episode.
    fn embed_url(&self, episode: &ContentEpisode) -> String {
        match episode.season {
            Some(season) => self
                .config
                .episode_url
                .replace("{id}", &episode.parent_content_id)
                .replace("{season}", &season.to_string())
                .replace("{episode}", &episode.episode_number.to_string()),
            None => self.config.movie_url.replace("{id}", &episode.parent_content_id),
        }
    }

    /// `data-hash` attributes are exchanged one by one against a secondary
    /// endpoint that answers `{"url": "...", "label": "..."}`. Failed
    /// exchanges are skipped.
    async fn exchange_data_hashes(
        &self,
        html: &str,
        page_url: &str,
        exchange_url: &str,
    ) -> Vec<MediaLink> {
        let mut links = Vec::new();
        for caps in RE_DATA_HASH.captures_iter(html) {
            let hash = &caps[1];
            let url = format!("{exchange_url}/{hash}");
            let body = match self.fetcher.get_text(&url, &referer_headers(page_url)).await {
                Ok(body) => body,
                Err(err) => {
                    warn!(hash, %err, "data-hash exchange failed");
                    continue;
                }
            };
            let response: ExchangeResponse = match serde_json::from_str(&body) {
                Ok(response) => response,
                Err(err) => {
                    debug!(hash, %err, "data-hash exchange response did not parse");
                    continue;
                }
            };
            if !response.url.starts_with("http") {
                continue;
            }
            links.push(MediaLink {
                is_segmented_stream: stream_kind(&response.url).unwrap_or(true),
                quality_label: response.label.unwrap_or_else(|| "Auto".to_string()),
                url: response.url,
                extractor_name: self.config.name.clone(),
                required_referer: Some(page_url.to_string()),
            });
        }
        links
    }

    /// The `/rcp/` page embeds a `/prorcp/` hop which carries the actual
    /// player setup; both hops are fetched with the previous page as
    /// `Referer`, then handed to the generic extractor.
    async fn follow_rcp(&self, html: &str, page_url: &str) -> Vec<MediaLink> {
        let Some(rcp_url) = RE_RCP_PATH
            .captures(html)
            .and_then(|caps| absolutize(&caps[1], page_url))
        else {
            return Vec::new();
        };

        let rcp_body = match self.fetcher.get_text(&rcp_url, &referer_headers(page_url)).await {
            Ok(body) => body,
            Err(err) => {
                warn!(url = %rcp_url, %err, "rcp hop failed");
                return Vec::new();
            }
        };

        if let Some(prorcp_url) = RE_PRORCP_PATH
            .captures(&rcp_body)
            .and_then(|caps| absolutize(&caps[1], &rcp_url))
        {
            match self
                .fetcher
                .get_text(&prorcp_url, &referer_headers(&rcp_url))
                .await
            {
                Ok(body) => {
                    let links = extract_links(&body, &self.config.name, Some(&prorcp_url));
                    if !links.is_empty() {
                        return links;
                    }
                }
                Err(err) => warn!(url = %prorcp_url, %err, "prorcp hop failed"),
            }
        }

        extract_links(&rcp_body, &self.config.name, Some(&rcp_url))
    }
}

fn absolutize(path: &str, base: &str) -> Option<String> {
    Url::parse(base).ok()?.join(path).ok().map(Into::into)
}
