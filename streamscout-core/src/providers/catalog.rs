//! Catalog-proxy adapter
//!
//! Read-only client for a TMDB-proxy metadata catalog keyed by external
//! numeric ids. This is the browse/search half of a source; it never
//! produces links. Upstream envelopes are parsed leniently: a missing or
//! unexpected shape yields an empty result, not an error.

use std::collections::HashMap;
use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::http::PageFetcher;

/// One catalog entry (movie, show or anime season).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogItem {
    pub id: u64,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub media_type: String,
    pub release_year: Option<u32>,
}

/// One episode row under a catalog entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeSummary {
    pub id: u64,
    pub name: String,
    pub season_number: u32,
    pub episode_number: u32,
    pub overview: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResultsEnvelope<T> {
    results: Vec<T>,
}

/// Client for the catalog proxy.
pub struct CatalogProxyAdapter {
    fetcher: Arc<dyn PageFetcher>,
    base_url: String,
}

impl CatalogProxyAdapter {
    pub fn new(fetcher: Arc<dyn PageFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        "catalog-proxy"
    }

    pub async fn trending(&self, page: u32) -> Result<Vec<CatalogItem>> {
        let url = format!("{}/trending?page={page}", self.base_url);
        self.fetch_results(&url).await
    }

    pub async fn popular(&self, page: u32) -> Result<Vec<CatalogItem>> {
        let url = format!("{}/popular?page={page}", self.base_url);
        self.fetch_results(&url).await
    }

    pub async fn search(&self, query: &str, page: u32) -> Result<Vec<CatalogItem>> {
        let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC);
        let url = format!("{}/search?query={encoded}&page={page}", self.base_url);
        self.fetch_results(&url).await
    }

    /// Details for one catalog entry; `None` when the upstream payload does
    /// not look like an entry at all.
    pub async fn details(&self, content_id: &str) -> Result<Option<CatalogItem>> {
        let url = format!("{}/title/{content_id}", self.base_url);
        let body = self.fetcher.get_text(&url, &HashMap::new()).await?;
        match serde_json::from_str::<CatalogItem>(&body) {
            Ok(item) if item.id != 0 => Ok(Some(item)),
            Ok(_) => Ok(None),
            Err(err) => {
                debug!(%url, %err, "unexpected details payload");
                Ok(None)
            }
        }
    }

    pub async fn episodes(&self, content_id: &str, season: Option<u32>) -> Result<Vec<EpisodeSummary>> {
        let url = match season {
            Some(season) => format!("{}/title/{content_id}/episodes?season={season}", self.base_url),
            None => format!("{}/title/{content_id}/episodes", self.base_url),
        };
        self.fetch_results(&url).await
    }

    async fn fetch_results<T: serde::de::DeserializeOwned + Default>(&self, url: &str) -> Result<Vec<T>> {
        let body = self.fetcher.get_text(url, &HashMap::new()).await?;
        match serde_json::from_str::<ResultsEnvelope<T>>(&body) {
            Ok(envelope) => Ok(envelope.results),
            Err(err) => {
                debug!(%url, %err, "unexpected catalog envelope, returning empty");
                Ok(Vec::new())
            }
        }
    }
}
