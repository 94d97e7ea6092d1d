//! Resolution orchestrator
//!
//! Drives one source's fallback chain: adapters run sequentially in their
//! fixed priority order, the first non-empty result wins and no further
//! adapters run. Adapter failures are ordinary values here: recorded as
//! attempts, never propagated. Exhausting the chain is an empty result, not
//! an error.
//!
//! Sequential on purpose: speculative parallel resolution would waste
//! bandwidth and hit several upstream hosts at once for a result the first
//! adapter usually provides.

use tracing::{info, warn};

use crate::error::Result;
use crate::models::{dedup_links_by_url, AttemptOutcome, ContentEpisode, MediaLink, ProviderAttempt};
use crate::providers::ProviderAdapter;

/// Resolution progress through the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,
    TryingAdapter(usize),
    Succeeded,
    Exhausted,
}

/// Runs a fixed-priority adapter chain for one source.
pub struct ResolutionOrchestrator {
    adapters: Vec<ProviderAdapter>,
}

impl ResolutionOrchestrator {
    /// The adapter order given here is the fallback priority order; it never
    /// changes after construction.
    #[must_use]
    pub fn new(adapters: Vec<ProviderAdapter>) -> Self {
        Self { adapters }
    }

    #[must_use]
    pub fn adapter_names(&self) -> Vec<&str> {
        self.adapters.iter().map(ProviderAdapter::name).collect()
    }

    /// Resolve an episode through the chain.
    ///
    /// Always `Ok`: the chain absorbs every adapter failure. The returned
    /// attempts record what each executed adapter did, in order.
    pub async fn resolve(
        &self,
        episode: &ContentEpisode,
    ) -> Result<(Vec<MediaLink>, Vec<ProviderAttempt>)> {
        let mut attempts: Vec<ProviderAttempt> = Vec::new();
        let mut winning: Vec<MediaLink> = Vec::new();
        let mut state = State::Pending;

        loop {
            state = match state {
                State::Pending => State::TryingAdapter(0),

                State::TryingAdapter(index) if index >= self.adapters.len() => State::Exhausted,

                State::TryingAdapter(index) => {
                    let adapter = &self.adapters[index];
                    let outcome = match adapter.resolve(episode).await {
                        Ok(links) if links.is_empty() => AttemptOutcome::Empty,
                        Ok(links) => {
                            winning = links;
                            AttemptOutcome::Found(winning.len())
                        }
                        Err(err) => {
                            warn!(provider = adapter.name(), %err, "adapter failed, falling through");
                            AttemptOutcome::Failed(err.to_string())
                        }
                    };

                    let found = matches!(outcome, AttemptOutcome::Found(_));
                    attempts.push(ProviderAttempt {
                        provider: adapter.name().to_string(),
                        ordinal: index,
                        outcome,
                    });

                    if found {
                        State::Succeeded
                    } else {
                        State::TryingAdapter(index + 1)
                    }
                }

                State::Succeeded => {
                    let links = dedup_links_by_url(std::mem::take(&mut winning));
                    info!(
                        episode = %episode.id,
                        provider = attempts.last().map_or("?", |a| a.provider.as_str()),
                        count = links.len(),
                        "resolution succeeded"
                    );
                    return Ok((links, attempts));
                }

                State::Exhausted => {
                    info!(episode = %episode.id, tried = attempts.len(), "resolution exhausted, no links");
                    return Ok((Vec::new(), attempts));
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{EmbedProviderConfig, WalkerConfig};
    use crate::providers::EmbedScrapeAdapter;
    use crate::test_support::MockFetcher;

    fn embed(name: &str, fetcher: &Arc<MockFetcher>) -> ProviderAdapter {
        ProviderAdapter::EmbedScrape(EmbedScrapeAdapter::new(
            fetcher.clone(),
            &WalkerConfig::default(),
            EmbedProviderConfig {
                name: name.to_string(),
                movie_url: format!("https://{name}.example/embed/movie/{{id}}"),
                episode_url: format!("https://{name}.example/embed/tv/{{id}}/{{season}}-{{episode}}"),
                referer: "https://caller.example/".to_string(),
                secondary: None,
            },
        ))
    }

    fn movie() -> ContentEpisode {
        ContentEpisode::new("m-1", "603", "src", "https://caller.example/t/603", 1, None, None)
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        // Adapter #1 empty, #2 has two links, #3 would also have links but
        // must never be queried.
        let fetcher = Arc::new(
            MockFetcher::new()
                .route("one.example", "<html>nothing here</html>")
                .route(
                    "two.example",
                    r#"sources: ["https://cdn.example/a.m3u8", "https://cdn.example/b.mp4"]"#,
                )
                .route("three.example", r#"file: "https://cdn.example/c.m3u8""#),
        );
        let orchestrator = ResolutionOrchestrator::new(vec![
            embed("one", &fetcher),
            embed("two", &fetcher),
            embed("three", &fetcher),
        ]);

        let (links, attempts) = orchestrator.resolve(&movie()).await.unwrap();

        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|l| l.extractor_name == "two"));
        assert_eq!(fetcher.count("three.example"), 0);
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].outcome, AttemptOutcome::Empty);
        assert_eq!(attempts[1].outcome, AttemptOutcome::Found(2));
    }

    #[tokio::test]
    async fn test_failed_adapter_does_not_block_the_next() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .fail("one.example")
                .route("two.example", r#"file: "https://cdn.example/a.m3u8""#),
        );
        let orchestrator =
            ResolutionOrchestrator::new(vec![embed("one", &fetcher), embed("two", &fetcher)]);

        let (links, attempts) = orchestrator.resolve(&movie()).await.unwrap();
        assert_eq!(links.len(), 1);
        assert!(matches!(attempts[0].outcome, AttemptOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_exhausted_chain_is_empty_not_error() {
        let fetcher = Arc::new(MockFetcher::new().fail("one.example").fail("two.example"));
        let orchestrator =
            ResolutionOrchestrator::new(vec![embed("one", &fetcher), embed("two", &fetcher)]);

        let (links, attempts) = orchestrator.resolve(&movie()).await.unwrap();
        assert!(links.is_empty());
        assert_eq!(attempts.len(), 2);
    }

    #[tokio::test]
    async fn test_winning_links_are_deduplicated_by_url() {
        // The same URL appears twice in the page (kv rule and array rule)
        // plus once more under a different quality label.
        let page = r#"
            player.setup({file: "https://cdn.example/v/master.m3u8"});
            sources: ["https://cdn.example/v/master.m3u8"]
        "#;
        let fetcher = Arc::new(MockFetcher::new().route("one.example", page));
        let orchestrator = ResolutionOrchestrator::new(vec![embed("one", &fetcher)]);

        let (links, _) = orchestrator.resolve(&movie()).await.unwrap();
        assert_eq!(links.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_chain_exhausts_immediately() {
        let orchestrator = ResolutionOrchestrator::new(Vec::new());
        let (links, attempts) = orchestrator.resolve(&movie()).await.unwrap();
        assert!(links.is_empty());
        assert!(attempts.is_empty());
    }
}
