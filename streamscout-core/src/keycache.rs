//! Process-lifetime DecryptionKey cache
//!
//! The key-based provider's session key is fetched and decrypted lazily,
//! exactly once per process, and shared by every concurrent resolution.
//! Single-flight guards initialization: when many resolutions race on a cold
//! cache, one fetch runs and the rest wait for its result. A failed fetch
//! leaves the cache empty so the next caller retries; a cancelled leader is
//! retried by the library. Nothing is ever persisted.

use std::collections::HashMap;

use async_singleflight::Group;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::KeyApiConfig;
use crate::crypto;
use crate::error::{Error, Result};
use crate::http::PageFetcher;

const FLIGHT_KEY: &str = "decryption-key";

/// Shared, lazily-initialized session key cache.
pub struct KeyCache {
    cached: RwLock<Option<String>>,
    flight: Group<String, String, Error>,
}

impl KeyCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cached: RwLock::new(None),
            flight: Group::new(),
        }
    }

    /// Return the cached session key, fetching and decrypting it first if
    /// this is the cold path.
    ///
    /// Under concurrent cold-path access only one fetch+decrypt runs; other
    /// callers await and reuse its result.
    pub async fn get_or_fetch(
        &self,
        fetcher: &dyn PageFetcher,
        config: &KeyApiConfig,
    ) -> Result<String> {
        if let Some(key) = self.cached.read().await.as_ref() {
            return Ok(key.clone());
        }

        let fut = async {
            // Re-check under the flight: a just-finished leader may have
            // filled the cache between our miss and our turn.
            if let Some(key) = self.cached.read().await.as_ref() {
                return Ok(key.clone());
            }

            let body = fetcher.get_text(&config.key_endpoint, &HashMap::new()).await?;
            let blob = extract_key_blob(&body);
            let session_key = crypto::decrypt_api_key(&blob, &config.bootstrap_key_hex)?;

            debug!("session key fetched and decrypted");
            *self.cached.write().await = Some(session_key.clone());
            Ok(session_key)
        };

        // Group::work returns Result<V, Option<E>>:
        //   Ok(v)        => success
        //   Err(Some(e)) => inner error from the fetch/decrypt
        //   Err(None)    => leader dropped (after the library's retries)
        self.flight
            .work(&FLIGHT_KEY.to_string(), fut)
            .await
            .map_err(|opt_err| match opt_err {
                Some(inner) => inner,
                None => Error::Network("key fetch leader dropped".to_string()),
            })
    }

    /// Whether a session key is already cached (test/diagnostic hook).
    pub async fn is_cached(&self) -> bool {
        self.cached.read().await.is_some()
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new()
    }
}

/// The endpoint responds with `{"encrypted_key": "<blob>"}`; a bare blob
/// body is accepted as well in case the envelope drifts.
fn extract_key_blob(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(blob) = value.get("encrypted_key").and_then(|v| v.as_str()) {
            return blob.to_string();
        }
    }
    body.trim().to_string()
}
