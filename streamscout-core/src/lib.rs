// Streamscout resolution engine
//
// Given (source id, content id, episode id), produce a deduplicated list of
// candidate media links by orchestrating multiple unreliable third-party
// extraction providers.
//
// Architecture, leaf to root:
// - crypto / extract / walker: pure helpers and the iframe chain walker
// - providers: one adapter per upstream provider (catalog proxy, key-based
//   decrypting API, embed-page scrapers)
// - orchestrator: fixed-priority fallback chain, first success wins
// - source: per-catalog facade + the id-keyed registry callers talk to

pub mod config;
pub mod crypto;
pub mod error;
pub mod extract;
pub mod http;
pub mod keycache;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod source;
pub mod walker;

#[cfg(test)]
pub mod test_support;

pub use config::Config;
pub use error::{Error, Result};
pub use http::{HttpFetcher, PageFetcher};
pub use keycache::KeyCache;
pub use models::{ContentEpisode, MediaLink, ProviderAttempt};
pub use orchestrator::ResolutionOrchestrator;
pub use source::{SourceRegistry, StreamSource};
