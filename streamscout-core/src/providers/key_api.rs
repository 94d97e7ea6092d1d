//! Key-based decrypting adapter
//!
//! One upstream provider serves links as per-entry ciphertext from a small
//! set of numbered "server" endpoints. Servers are tried in a fixed
//! non-sequential priority order, stopping at the first index that yields
//! any link. Each entry decrypts independently: a malformed ciphertext or a
//! non-URL plaintext skips that entry only, never the whole response.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::KeyApiConfig;
use crate::crypto::{decrypt_link, is_url_shaped};
use crate::error::Result;
use crate::extract::stream_kind;
use crate::http::{referer_headers, PageFetcher};
use crate::keycache::KeyCache;
use crate::models::{ContentEpisode, MediaLink};

#[derive(Debug, Deserialize)]
struct EncryptedEntry {
    #[serde(default)]
    lang: String,
    link: String,
    #[serde(default, rename = "type")]
    kind: String,
}

/// Adapter for the key-based decrypting provider.
pub struct KeyDecryptingAdapter {
    fetcher: Arc<dyn PageFetcher>,
    key_cache: Arc<KeyCache>,
    config: KeyApiConfig,
}

impl KeyDecryptingAdapter {
    pub fn new(fetcher: Arc<dyn PageFetcher>, key_cache: Arc<KeyCache>, config: KeyApiConfig) -> Self {
        Self {
            fetcher,
            key_cache,
            config,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub async fn resolve(&self, episode: &ContentEpisode) -> Result<Vec<MediaLink>> {
        // Fetched and decrypted at most once per process; concurrent
        // resolutions share the in-flight fetch.
        let session_key = self
            .key_cache
            .get_or_fetch(self.fetcher.as_ref(), &self.config)
            .await?;

        for &index in &self.config.server_indices {
            let url = format!(
                "{}/servers/{index}/episode/{}",
                self.config.base_url, episode.id
            );
            let body = match self
                .fetcher
                .get_text(&url, &referer_headers(&self.config.base_url))
                .await
            {
                Ok(body) => body,
                Err(err) => {
                    warn!(server = index, %err, "key api server failed");
                    continue;
                }
            };

            let entries: Vec<EncryptedEntry> = match serde_json::from_str(&body) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(server = index, %err, "key api response did not parse");
                    continue;
                }
            };

            let links = self.decrypt_entries(&entries, &session_key);
            if !links.is_empty() {
                return Ok(links);
            }
        }

        Ok(Vec::new())
    }

    fn decrypt_entries(&self, entries: &[EncryptedEntry], session_key: &str) -> Vec<MediaLink> {
        let mut links = Vec::with_capacity(entries.len());
        for entry in entries {
            let plaintext = match decrypt_link(&entry.link, session_key) {
                Ok(plaintext) => plaintext,
                Err(err) => {
                    debug!(lang = %entry.lang, %err, "skipping undecryptable link");
                    continue;
                }
            };
            if !is_url_shaped(&plaintext) {
                debug!(lang = %entry.lang, "discarding non-URL plaintext");
                continue;
            }

            let lang = if entry.lang.is_empty() { "Unknown" } else { entry.lang.as_str() };
            links.push(MediaLink {
                is_segmented_stream: segmented_from_kind(&entry.kind, &plaintext),
                url: plaintext,
                quality_label: format!("{lang} - {}", self.config.label),
                extractor_name: self.config.name.clone(),
                required_referer: None,
            });
        }
        links
    }
}

fn segmented_from_kind(kind: &str, url: &str) -> bool {
    match kind {
        "hls" | "dash" | "m3u8" => true,
        "mp4" | "file" | "progressive" => false,
        _ => stream_kind(url).unwrap_or(true),
    }
}
