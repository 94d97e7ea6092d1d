// Provider adapters
//
// One adapter per upstream extraction provider, each implementing the same
// "resolve episode -> links" contract. Adapters form a tagged-variant
// capability set held in an ordered list per source; the orchestrator
// matches on the variant instead of dynamic dispatch, so the fallback
// order is fixed at construction time and trivially reproducible.

pub mod catalog;
pub mod embed;
pub mod key_api;

pub use catalog::{CatalogItem, CatalogProxyAdapter, EpisodeSummary};
pub use embed::EmbedScrapeAdapter;
pub use key_api::KeyDecryptingAdapter;

use crate::error::Result;
use crate::models::{ContentEpisode, MediaLink};

/// The capability set: every adapter a source's chain may contain.
pub enum ProviderAdapter {
    /// Catalog browsing/search; never link-producing.
    CatalogProxy(CatalogProxyAdapter),
    /// Per-provider "server" API with encrypted link payloads.
    KeyDecrypting(KeyDecryptingAdapter),
    /// Embed-page scraper with optional provider-specific patterns.
    EmbedScrape(EmbedScrapeAdapter),
}

impl ProviderAdapter {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::CatalogProxy(adapter) => adapter.name(),
            Self::KeyDecrypting(adapter) => adapter.name(),
            Self::EmbedScrape(adapter) => adapter.name(),
        }
    }

    /// Resolve an episode to candidate links.
    ///
    /// An `Err` is an ordinary value to the orchestrator: it records the
    /// failed attempt and moves on to the next adapter.
    pub async fn resolve(&self, episode: &ContentEpisode) -> Result<Vec<MediaLink>> {
        match self {
            Self::CatalogProxy(_) => Ok(Vec::new()),
            Self::KeyDecrypting(adapter) => adapter.resolve(episode).await,
            Self::EmbedScrape(adapter) => adapter.resolve(episode).await,
        }
    }
}
