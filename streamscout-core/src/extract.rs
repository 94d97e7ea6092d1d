//! HTML/JS media link extraction
//!
//! Pattern rules over arbitrary page text, applied in a fixed order so the
//! output is deterministic:
//!
//! 1. absolute URLs with a segmented-stream extension (`.m3u8`, `.mpd`)
//! 2. absolute URLs with a progressive extension (`.mp4`, `.mkv`, `.webm`)
//! 3. `file`/`source`/`src`/`url` key-value assignments
//! 4. `sources: [...]` array literals
//!
//! JS string-literal slashes (`\/`) are unescaped before any rule runs.
//! Pure and idempotent; deduplicated by URL across all rules.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::MediaLink;

const URL_CHARS: &str = r#"[^\s"'<>\\]"#;

static RE_SEGMENTED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"https?://{URL_CHARS}+\.(?:m3u8|mpd)(?:\?{URL_CHARS}*)?"
    ))
    .expect("invalid segmented URL regex")
});

static RE_PROGRESSIVE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"https?://{URL_CHARS}+\.(?:mp4|mkv|webm)(?:\?{URL_CHARS}*)?"
    ))
    .expect("invalid progressive URL regex")
});

static RE_KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?(?:file|source|src|url)["']?\s*[:=]\s*["'](?<url>https?://[^"']+)["']"#)
        .expect("invalid key-value regex")
});

static RE_SOURCES_ARRAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)sources\s*[:=]\s*\[(?<body>.*?)\]").expect("invalid sources array regex")
});

static RE_QUALITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{3,4})[pP]\b").expect("invalid quality regex"));

/// Extract candidate media links from HTML or JS text.
///
/// `referer` becomes `required_referer` on every produced link. Same input
/// always yields the same output, in rule order then document order.
#[must_use]
pub fn extract_links(text: &str, extractor_name: &str, referer: Option<&str>) -> Vec<MediaLink> {
    let text = text.replace("\\/", "/");
    let mut seen: HashSet<String> = HashSet::new();
    let mut links: Vec<MediaLink> = Vec::new();

    let mut push = |url: &str, is_segmented: bool, seen: &mut HashSet<String>, links: &mut Vec<MediaLink>| {
        if seen.insert(url.to_string()) {
            links.push(MediaLink {
                url: url.to_string(),
                quality_label: sniff_quality(url),
                extractor_name: extractor_name.to_string(),
                is_segmented_stream: is_segmented,
                required_referer: referer.map(str::to_string),
            });
        }
    };

    // Rule 1: absolute segmented-stream URLs
    for m in RE_SEGMENTED_URL.find_iter(&text) {
        push(m.as_str(), true, &mut seen, &mut links);
    }

    // Rule 2: absolute progressive URLs
    for m in RE_PROGRESSIVE_URL.find_iter(&text) {
        push(m.as_str(), false, &mut seen, &mut links);
    }

    // Rule 3: known key-value assignments
    for caps in RE_KEY_VALUE.captures_iter(&text) {
        let url = &caps["url"];
        if let Some(is_segmented) = stream_kind(url) {
            push(url, is_segmented, &mut seen, &mut links);
        }
    }

    // Rule 4: sources array literals
    for caps in RE_SOURCES_ARRAY.captures_iter(&text) {
        let body = &caps["body"];
        for m in RE_SEGMENTED_URL.find_iter(body) {
            push(m.as_str(), true, &mut seen, &mut links);
        }
        for m in RE_PROGRESSIVE_URL.find_iter(body) {
            push(m.as_str(), false, &mut seen, &mut links);
        }
    }

    links
}

/// Classify a URL by stream extension: `Some(true)` segmented, `Some(false)`
/// progressive, `None` neither.
#[must_use]
pub fn stream_kind(url: &str) -> Option<bool> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    if path.ends_with(".m3u8") || path.ends_with(".mpd") {
        Some(true)
    } else if path.ends_with(".mp4") || path.ends_with(".mkv") || path.ends_with(".webm") {
        Some(false)
    } else {
        None
    }
}

fn sniff_quality(url: &str) -> String {
    RE_QUALITY
        .captures(url)
        .map_or_else(|| "Auto".to_string(), |caps| format!("{}p", &caps[1]))
}
