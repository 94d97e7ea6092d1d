//! Source facade and registry
//!
//! A `StreamSource` is the per-catalog entry point: catalog browsing on one
//! side, the link-resolution fallback chain on the other. The
//! `SourceRegistry` owns every configured source and exposes the one
//! inbound surface callers get: `resolve_links(source_id, content_id,
//! episode_id)`. An unknown source id is the single hard failure; a source
//! with nothing playable answers with an empty list.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::PageFetcher;
use crate::keycache::KeyCache;
use crate::models::{parse_episode_route, ContentEpisode, MediaLink, ProviderAttempt};
use crate::orchestrator::ResolutionOrchestrator;
use crate::providers::{
    CatalogItem, CatalogProxyAdapter, EmbedScrapeAdapter, EpisodeSummary, KeyDecryptingAdapter,
    ProviderAdapter,
};

/// Per-catalog entry point: browse/search plus link resolution.
pub struct StreamSource {
    pub id: String,
    pub name: String,
    base_url: String,
    fetcher: Arc<dyn PageFetcher>,
    catalog: CatalogProxyAdapter,
    orchestrator: ResolutionOrchestrator,
}

impl StreamSource {
    /// Home page rows: trending first, popular second.
    pub async fn home_page(&self) -> Result<Vec<(String, Vec<CatalogItem>)>> {
        let trending = self.catalog.trending(1).await?;
        let popular = self.catalog.popular(1).await?;
        Ok(vec![
            ("Trending".to_string(), trending),
            ("Popular".to_string(), popular),
        ])
    }

    pub async fn search(&self, query: &str, page: u32) -> Result<Vec<CatalogItem>> {
        self.catalog.search(query, page).await
    }

    pub async fn details(&self, content_id: &str) -> Result<Option<CatalogItem>> {
        self.catalog.details(content_id).await
    }

    pub async fn episodes(&self, content_id: &str, season: Option<u32>) -> Result<Vec<EpisodeSummary>> {
        self.catalog.episodes(content_id, season).await
    }

    /// The adapter chain in its fixed priority order.
    #[must_use]
    pub fn adapter_chain(&self) -> Vec<&str> {
        self.orchestrator.adapter_names()
    }

    /// Resolve one episode to playable links through this source's chain.
    pub async fn get_links(
        &self,
        episode: &ContentEpisode,
    ) -> Result<(Vec<MediaLink>, Vec<ProviderAttempt>)> {
        self.orchestrator.resolve(episode).await
    }

    /// Liveness probe: true iff the base URL answers with any HTTP status.
    pub async fn ping(&self) -> bool {
        match self.fetcher.get_status(&self.base_url).await {
            Ok(status) => {
                debug!(source = %self.id, status, "ping answered");
                true
            }
            Err(err) => {
                debug!(source = %self.id, %err, "ping failed");
                false
            }
        }
    }

    /// Build the episode identity this source resolves, from opaque routing
    /// ids.
    fn episode_from_route(&self, content_id: &str, episode_route: &str) -> Result<ContentEpisode> {
        let (season, episode_number) = parse_episode_route(episode_route)?;
        let id = match season {
            Some(season) => format!("{content_id}-s{season}e{episode_number}"),
            None => format!("{content_id}-e{episode_number}"),
        };
        let url = format!("{}/title/{content_id}/{episode_route}", self.base_url);
        ContentEpisode::new(id, content_id, self.id.clone(), url, episode_number, season, None)
    }
}

/// Id-keyed set of configured sources.
pub struct SourceRegistry {
    sources: HashMap<String, Arc<StreamSource>>,
}

impl SourceRegistry {
    /// Build every configured source over one shared fetcher and key cache.
    ///
    /// The adapter chain order per source is fixed here: the catalog proxy,
    /// the key-decrypting adapter (when enabled), then the embed scrapers
    /// in config order.
    #[must_use]
    pub fn from_config(config: &Config, fetcher: Arc<dyn PageFetcher>) -> Self {
        let key_cache = Arc::new(KeyCache::new());
        let mut sources = HashMap::new();

        for source_config in &config.sources {
            // The capability set, in fallback priority order. The catalog
            // proxy never produces links and always falls through.
            let mut adapters: Vec<ProviderAdapter> = vec![ProviderAdapter::CatalogProxy(
                CatalogProxyAdapter::new(fetcher.clone(), source_config.catalog_base_url.clone()),
            )];

            if source_config.use_key_api {
                adapters.push(ProviderAdapter::KeyDecrypting(KeyDecryptingAdapter::new(
                    fetcher.clone(),
                    key_cache.clone(),
                    config.key_api.clone(),
                )));
            }
            for embed_config in &source_config.embeds {
                adapters.push(ProviderAdapter::EmbedScrape(EmbedScrapeAdapter::new(
                    fetcher.clone(),
                    &config.walker,
                    embed_config.clone(),
                )));
            }

            let source = StreamSource {
                id: source_config.id.clone(),
                name: source_config.name.clone(),
                base_url: source_config.base_url.clone(),
                fetcher: fetcher.clone(),
                catalog: CatalogProxyAdapter::new(fetcher.clone(), source_config.catalog_base_url.clone()),
                orchestrator: ResolutionOrchestrator::new(adapters),
            };
            sources.insert(source.id.clone(), Arc::new(source));
        }

        Self { sources }
    }

    /// Look up a source by id.
    ///
    /// # Errors
    /// `Error::UnknownSource`, the one configuration failure surfaced to
    /// callers as a hard error; there is no fallback source to try.
    pub fn get(&self, source_id: &str) -> Result<Arc<StreamSource>> {
        self.sources
            .get(source_id)
            .cloned()
            .ok_or_else(|| Error::UnknownSource(source_id.to_string()))
    }

    #[must_use]
    pub fn source_ids(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    /// The mandated inbound surface: opaque ids in, ranked links out.
    ///
    /// Returns `Ok(vec![])` when every provider comes up empty; errors only
    /// for an unknown source or an unparseable episode identifier.
    pub async fn resolve_links(
        &self,
        source_id: &str,
        content_id: &str,
        episode_id: &str,
    ) -> Result<Vec<MediaLink>> {
        let source = self.get(source_id)?;
        let episode = source.episode_from_route(content_id, episode_id)?;

        info!(source = source_id, content = content_id, episode = episode_id, "resolving links");
        let (links, attempts) = source.get_links(&episode).await?;
        debug!(
            source = source_id,
            attempts = attempts.len(),
            links = links.len(),
            "resolution finished"
        );
        Ok(links)
    }
}
