//! Iframe chain walker
//!
//! Embed pages frequently bury the real player behind nested `<iframe>`
//! hops. The walker follows them depth-first in document order with an
//! explicit worklist and a per-frame depth counter, so the depth bound is a
//! hard guarantee and circular embeds terminate. A fetch failure abandons
//! only its own branch. The walk ends at the first frame that yields any
//! link; fast success beats exhaustiveness here.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::config::WalkerConfig;
use crate::extract::extract_links;
use crate::http::{referer_headers, PageFetcher};
use crate::models::MediaLink;

static RE_IFRAME_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<iframe[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#)
        .expect("invalid iframe src regex")
});

struct Frame {
    url: String,
    referer: String,
    depth: u32,
}

/// Walks nested iframe embeds, re-running the extractor at each hop.
pub struct IframeWalker {
    fetcher: Arc<dyn PageFetcher>,
    ad_markers: Vec<String>,
}

impl IframeWalker {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &WalkerConfig) -> Self {
        Self {
            fetcher,
            ad_markers: config.ad_markers.clone(),
        }
    }

    /// Follow the iframe chain rooted at `html`, at most `depth_budget`
    /// nested levels deep. Returns the first non-empty extraction found
    /// anywhere in the walk, or nothing.
    pub async fn follow_chain(
        &self,
        html: &str,
        referer_url: &str,
        depth_budget: u32,
        extractor_name: &str,
    ) -> Vec<MediaLink> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut stack: Vec<Frame> = Vec::new();
        self.push_child_frames(html, referer_url, 1, depth_budget, &mut stack, &mut visited);

        while let Some(frame) = stack.pop() {
            let headers = referer_headers(&frame.referer);
            let body = match self.fetcher.get_text(&frame.url, &headers).await {
                Ok(body) => body,
                Err(err) => {
                    warn!(url = %frame.url, %err, "iframe fetch failed, abandoning branch");
                    continue;
                }
            };

            let links = extract_links(&body, extractor_name, Some(frame.url.as_str()));
            if !links.is_empty() {
                debug!(url = %frame.url, depth = frame.depth, count = links.len(), "links found in iframe chain");
                return links;
            }

            self.push_child_frames(
                &body,
                &frame.url,
                frame.depth + 1,
                depth_budget,
                &mut stack,
                &mut visited,
            );
        }

        Vec::new()
    }

    /// Collect `html`'s iframe srcs in document order and push them onto the
    /// worklist (reversed, so the stack pops them in document order).
    fn push_child_frames(
        &self,
        html: &str,
        referer: &str,
        depth: u32,
        depth_budget: u32,
        stack: &mut Vec<Frame>,
        visited: &mut HashSet<String>,
    ) {
        if depth > depth_budget {
            return;
        }

        let mut frames: Vec<String> = Vec::new();
        for caps in RE_IFRAME_SRC.captures_iter(html) {
            let src = &caps[1];
            if self.is_ad_url(src) {
                debug!(src, "skipping ad-network iframe");
                continue;
            }
            let Some(absolute) = normalize_frame_url(src, referer) else {
                debug!(src, "skipping unnormalizable iframe src");
                continue;
            };
            if visited.insert(absolute.clone()) {
                frames.push(absolute);
            }
        }

        for url in frames.into_iter().rev() {
            stack.push(Frame {
                url,
                referer: referer.to_string(),
                depth,
            });
        }
    }

    fn is_ad_url(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        self.ad_markers.iter().any(|marker| lower.contains(marker.as_str()))
    }
}

/// Normalize relative and protocol-relative srcs against the referer.
fn normalize_frame_url(src: &str, referer: &str) -> Option<String> {
    let base = Url::parse(referer).ok()?;
    base.join(src).ok().map(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockFetcher;

    fn walker(fetcher: MockFetcher) -> (IframeWalker, Arc<MockFetcher>) {
        let fetcher = Arc::new(fetcher);
        let walker = IframeWalker::new(fetcher.clone(), &WalkerConfig::default());
        (walker, fetcher)
    }

    #[tokio::test]
    async fn test_depth_budget_bounds_chain_of_ten() {
        // Ten pages, each embedding the next; only three may be visited.
        let mut fetcher = MockFetcher::new();
        for i in 1..=10 {
            let body = format!(r#"<iframe src="https://hop.example/frame/{}"></iframe>"#, i + 1);
            fetcher = fetcher.route(&format!("/frame/{i}"), &body);
        }
        let (walker, fetcher) = walker(fetcher);

        let root = r#"<iframe src="https://hop.example/frame/1"></iframe>"#;
        let links = walker
            .follow_chain(root, "https://hop.example/", 3, "test")
            .await;

        assert!(links.is_empty());
        assert_eq!(fetcher.total_requests(), 3);
        assert_eq!(fetcher.count("/frame/4"), 0);
    }

    #[tokio::test]
    async fn test_circular_embeds_terminate() {
        let fetcher = MockFetcher::new()
            .route("/a", r#"<iframe src="https://loop.example/b"></iframe>"#)
            .route("/b", r#"<iframe src="https://loop.example/a"></iframe>"#);
        let (walker, _) = walker(fetcher);

        let root = r#"<iframe src="https://loop.example/a"></iframe>"#;
        let links = walker
            .follow_chain(root, "https://loop.example/", 10, "test")
            .await;
        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn test_first_find_stops_the_walk() {
        let fetcher = MockFetcher::new()
            .route("/player", r#"file: "https://cdn.example/v/master.m3u8""#)
            .route("/second", r#"file: "https://cdn.example/v/other.m3u8""#);
        let (walker, fetcher) = walker(fetcher);

        let root = r#"
            <iframe src="https://host.example/player"></iframe>
            <iframe src="https://host.example/second"></iframe>
        "#;
        let links = walker
            .follow_chain(root, "https://host.example/", 3, "test")
            .await;

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://cdn.example/v/master.m3u8");
        assert_eq!(fetcher.count("/second"), 0);
    }

    #[tokio::test]
    async fn test_failed_branch_does_not_abort_siblings() {
        let fetcher = MockFetcher::new()
            .fail("/dead")
            .route("/alive", r#"file: "https://cdn.example/v/master.m3u8""#);
        let (walker, _) = walker(fetcher);

        let root = r#"
            <iframe src="https://host.example/dead"></iframe>
            <iframe src="https://host.example/alive"></iframe>
        "#;
        let links = walker
            .follow_chain(root, "https://host.example/", 3, "test")
            .await;
        assert_eq!(links.len(), 1);
    }

    #[tokio::test]
    async fn test_ad_frames_are_skipped() {
        let fetcher = MockFetcher::new()
            .route("/banner/spot", r#"file: "https://cdn.example/ad.m3u8""#)
            .route("/real", r#"file: "https://cdn.example/v/master.m3u8""#);
        let (walker, fetcher) = walker(fetcher);

        let root = r#"
            <iframe src="https://host.example/banner/spot"></iframe>
            <iframe src="https://host.example/real"></iframe>
        "#;
        let links = walker
            .follow_chain(root, "https://host.example/", 3, "test")
            .await;

        assert_eq!(links[0].url, "https://cdn.example/v/master.m3u8");
        assert_eq!(fetcher.count("/banner/spot"), 0);
    }

    #[tokio::test]
    async fn test_relative_and_protocol_relative_srcs() {
        let fetcher = MockFetcher::new()
            .route("host.example/rel/player", r#"file: "https://cdn.example/v/a.m3u8""#);
        let (walker, _) = walker(fetcher);

        let root = r#"<iframe src="/rel/player"></iframe>"#;
        let links = walker
            .follow_chain(root, "https://host.example/watch/1", 3, "test")
            .await;
        assert_eq!(links.len(), 1);

        assert_eq!(
            normalize_frame_url("//other.example/p", "https://host.example/x").as_deref(),
            Some("https://other.example/p")
        );
    }
}
