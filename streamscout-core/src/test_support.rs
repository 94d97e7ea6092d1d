//! Scripted `PageFetcher` for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::http::PageFetcher;

/// Routes are matched by substring against the requested URL, first match
/// wins in insertion order. Unrouted URLs fail like a dead host.
pub struct MockFetcher {
    routes: Vec<(String, Option<String>)>,
    hits: Mutex<HashMap<String, usize>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Serve `body` for URLs containing `url_part`.
    pub fn route(mut self, url_part: &str, body: &str) -> Self {
        self.routes.push((url_part.to_string(), Some(body.to_string())));
        self
    }

    /// Fail requests for URLs containing `url_part` with a network error.
    pub fn fail(mut self, url_part: &str) -> Self {
        self.routes.push((url_part.to_string(), None));
        self
    }

    /// How many requests matched `url_part`.
    pub fn count(&self, url_part: &str) -> usize {
        *self.hits.lock().expect("hit counter lock").get(url_part).unwrap_or(&0)
    }

    /// Total requests across all routes (including unrouted misses).
    pub fn total_requests(&self) -> usize {
        self.hits.lock().expect("hit counter lock").values().sum()
    }

    fn record(&self, key: &str) {
        *self.hits.lock().expect("hit counter lock").entry(key.to_string()).or_insert(0) += 1;
    }

    fn lookup(&self, url: &str) -> Option<(String, Option<String>)> {
        self.routes
            .iter()
            .find(|(part, _)| url.contains(part.as_str()))
            .cloned()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn get_text(&self, url: &str, _headers: &HashMap<String, String>) -> Result<String> {
        match self.lookup(url) {
            Some((part, Some(body))) => {
                self.record(&part);
                Ok(body)
            }
            Some((part, None)) => {
                self.record(&part);
                Err(Error::Network(format!("scripted failure for {url}")))
            }
            None => {
                self.record("__unrouted__");
                Err(Error::Network(format!("no scripted route for {url}")))
            }
        }
    }

    async fn get_status(&self, url: &str) -> Result<u16> {
        match self.lookup(url) {
            Some((part, Some(_))) => {
                self.record(&part);
                Ok(200)
            }
            Some((part, None)) => {
                self.record(&part);
                Err(Error::Network(format!("scripted failure for {url}")))
            }
            None => Ok(404),
        }
    }
}
