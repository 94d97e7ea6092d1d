//! Core resolution data model
//!
//! `ContentEpisode` identifies what to resolve, `MediaLink` is a candidate
//! playable stream, `ProviderAttempt` records one adapter execution for
//! diagnostics. Links are produced fresh per resolution call and never
//! persisted by the engine.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;

// Accepts "7", "e7", "s2e7" and "2x7" (case-insensitive).
static RE_EPISODE_ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:s(\d+)[ex]|(\d+)x)?e?(\d+)$").expect("invalid episode route regex")
});

/// What to resolve: one episode of one piece of content on one source.
///
/// Immutable once constructed. `id` is the upstream-specific opaque episode
/// id; `parent_content_id` is the catalog id of the owning movie/show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEpisode {
    pub id: String,
    pub parent_content_id: String,
    pub source_id: String,
    pub url: String,
    pub episode_number: u32,
    pub season: Option<u32>,
    pub title: Option<String>,
}

impl ContentEpisode {
    /// Construct a validated episode.
    ///
    /// # Errors
    /// `Error::InvalidEpisode` when an id is empty or a number is zero.
    /// This is the hard programmer-error surface, never absorbed by the
    /// fallback chain.
    pub fn new(
        id: impl Into<String>,
        parent_content_id: impl Into<String>,
        source_id: impl Into<String>,
        url: impl Into<String>,
        episode_number: u32,
        season: Option<u32>,
        title: Option<String>,
    ) -> Result<Self, Error> {
        let id = id.into();
        let parent_content_id = parent_content_id.into();
        if id.is_empty() || parent_content_id.is_empty() {
            return Err(Error::InvalidEpisode("empty episode or content id".to_string()));
        }
        if episode_number == 0 {
            return Err(Error::InvalidEpisode("episode number must be positive".to_string()));
        }
        if season == Some(0) {
            return Err(Error::InvalidEpisode("season number must be positive".to_string()));
        }
        Ok(Self {
            id,
            parent_content_id,
            source_id: source_id.into(),
            url: url.into(),
            episode_number,
            season,
            title,
        })
    }
}

/// Parse a routing identifier into `(season, episode_number)`.
///
/// Accepted forms: `"7"`, `"e7"`, `"s2e7"`, `"2x7"` (case-insensitive).
pub fn parse_episode_route(route: &str) -> Result<(Option<u32>, u32), Error> {
    let caps = RE_EPISODE_ROUTE
        .captures(route.trim())
        .ok_or_else(|| Error::InvalidEpisode(format!("unparseable episode route: {route:?}")))?;

    let season = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().parse::<u32>())
        .transpose()
        .map_err(|_| Error::InvalidEpisode(format!("season out of range in {route:?}")))?;

    let episode = caps
        .get(3)
        .expect("route regex always captures an episode number")
        .as_str()
        .parse::<u32>()
        .map_err(|_| Error::InvalidEpisode(format!("episode out of range in {route:?}")))?;

    if episode == 0 || season == Some(0) {
        return Err(Error::InvalidEpisode(format!("zero season/episode in {route:?}")));
    }
    Ok((season, episode))
}

/// A candidate playable stream.
///
/// Two links are duplicates iff their `url` strings are equal; see
/// [`dedup_links_by_url`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaLink {
    /// Absolute stream URL.
    pub url: String,
    /// Free-form label, e.g. "1080p", "English - VidCloud", "Auto".
    pub quality_label: String,
    /// Provenance tag: which adapter produced the link.
    pub extractor_name: String,
    /// HLS/DASH manifest vs. progressive file.
    pub is_segmented_stream: bool,
    /// Must be sent as the `Referer` header when fetching `url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_referer: Option<String>,
}

/// Remove duplicate links, keeping the first occurrence of each URL.
#[must_use]
pub fn dedup_links_by_url(links: Vec<MediaLink>) -> Vec<MediaLink> {
    let mut seen: HashSet<String> = HashSet::with_capacity(links.len());
    links
        .into_iter()
        .filter(|link| seen.insert(link.url.clone()))
        .collect()
}

/// Outcome of one adapter execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AttemptOutcome {
    /// Adapter produced this many links.
    Found(usize),
    /// Adapter ran cleanly and produced nothing.
    Empty,
    /// Adapter failed; the classification string is the error display.
    Failed(String),
}

/// One adapter execution in a fallback chain. Ephemeral: logged, returned
/// for diagnostics, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderAttempt {
    pub provider: String,
    pub ordinal: usize,
    pub outcome: AttemptOutcome,
}
