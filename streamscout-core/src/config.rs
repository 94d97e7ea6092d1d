use std::path::Path;

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Engine configuration
///
/// Everything the scraping side of the engine depends on is configuration,
/// not protocol truth: upstream endpoints and cipher parameters drift, and a
/// drifted adapter must degrade to an empty result rather than panic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub walker: WalkerConfig,
    pub key_api: KeyApiConfig,
    pub logging: LoggingConfig,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub connect_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            connect_timeout_seconds: 10,
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerConfig {
    /// Hard bound on nested iframe levels.
    pub depth_budget: u32,
    /// Frame URLs containing any of these substrings are skipped.
    pub ad_markers: Vec<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            depth_budget: 3,
            ad_markers: vec![
                "ads".to_string(),
                "banner".to_string(),
                "doubleclick".to_string(),
                "sponsor".to_string(),
            ],
        }
    }
}

/// Key-based decrypting provider parameters.
///
/// The cipher envelope is reverse-engineered from a changeable upstream;
/// treat every field here as replaceable, including the bootstrap key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyApiConfig {
    /// Adapter name used as the `extractor_name` provenance tag.
    pub name: String,
    /// Human-facing label appended to per-language quality labels.
    pub label: String,
    /// Base URL of the provider API.
    pub base_url: String,
    /// Endpoint returning the encrypted session key blob.
    pub key_endpoint: String,
    /// 32-byte AES-256-GCM bootstrap key, hex-encoded.
    pub bootstrap_key_hex: String,
    /// Server indices in fallback priority order.
    pub server_indices: Vec<u32>,
}

impl Default for KeyApiConfig {
    fn default() -> Self {
        Self {
            name: "keyvault".to_string(),
            label: "KeyVault".to_string(),
            base_url: "https://api.keyvault.example".to_string(),
            key_endpoint: "https://api.keyvault.example/session/key".to_string(),
            bootstrap_key_hex:
                "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f".to_string(),
            server_indices: vec![2, 0, 1],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" for development, "json" for production.
    pub format: String,
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// One streaming source: a catalog plus its link-resolution fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub id: String,
    pub name: String,
    pub base_url: String,
    /// TMDB-proxy catalog endpoint for the browse/search surface.
    pub catalog_base_url: String,
    /// Whether the key-based decrypting adapter participates in this
    /// source's chain (it runs first when enabled).
    pub use_key_api: bool,
    /// Embed-page scrapers in fallback priority order.
    pub embeds: Vec<EmbedProviderConfig>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            id: "vidhaven".to_string(),
            name: "VidHaven".to_string(),
            base_url: "https://vidhaven.example".to_string(),
            catalog_base_url: "https://catalog.vidhaven.example/api/v1".to_string(),
            use_key_api: true,
            embeds: vec![
                EmbedProviderConfig {
                    name: "vidcloud".to_string(),
                    movie_url: "https://vidcloud.example/embed/movie/{id}".to_string(),
                    episode_url: "https://vidcloud.example/embed/tv/{id}/{season}-{episode}"
                        .to_string(),
                    referer: "https://vidhaven.example/".to_string(),
                    secondary: Some(SecondaryPattern::RcpRedirect),
                },
                EmbedProviderConfig {
                    name: "streambed".to_string(),
                    movie_url: "https://streambed.example/e/{id}".to_string(),
                    episode_url: "https://streambed.example/e/{id}/{season}/{episode}".to_string(),
                    referer: "https://vidhaven.example/".to_string(),
                    secondary: Some(SecondaryPattern::DataHash {
                        exchange_url: "https://streambed.example/ajax/sources".to_string(),
                    }),
                },
                EmbedProviderConfig {
                    name: "mirrorplay".to_string(),
                    movie_url: "https://mirrorplay.example/watch/{id}".to_string(),
                    episode_url: "https://mirrorplay.example/watch/{id}-{season}x{episode}"
                        .to_string(),
                    referer: "https://vidhaven.example/".to_string(),
                    secondary: None,
                },
            ],
        }
    }
}

/// One embed-page scraper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedProviderConfig {
    pub name: String,
    /// URL template for movies; `{id}` is the external content id.
    pub movie_url: String,
    /// URL template for episodes; `{id}`, `{season}`, `{episode}`.
    pub episode_url: String,
    /// Referer sent when fetching the embed page.
    pub referer: String,
    /// Provider-specific pattern tried before generic extraction.
    #[serde(default)]
    pub secondary: Option<SecondaryPattern>,
}

/// Provider-specific secondary extraction patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecondaryPattern {
    /// `data-hash` attributes exchanged against a secondary endpoint.
    DataHash { exchange_url: String },
    /// `/rcp/` redirect page leading to a `/prorcp/` hop.
    RcpRedirect,
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("STREAMSCOUT")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config.with_default_sources())
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// An empty `sources` table means "use the built-in default source",
    /// so a bare binary still resolves something.
    fn with_default_sources(mut self) -> Self {
        if self.sources.is_empty() {
            self.sources.push(SourceConfig::default());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_complete() {
        let config = Config::default().with_default_sources();
        assert_eq!(config.walker.depth_budget, 3);
        assert_eq!(config.key_api.server_indices, vec![2, 0, 1]);
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].embeds.len(), 3);
        assert_eq!(config.http.request_timeout_seconds, 30);
    }

    #[test]
    fn test_bootstrap_key_is_32_bytes() {
        let key = hex::decode(&KeyApiConfig::default().bootstrap_key_hex).unwrap();
        assert_eq!(key.len(), 32);
    }

    #[test]
    fn test_secondary_pattern_roundtrip() {
        let embed = &SourceConfig::default().embeds[1];
        let json = serde_json::to_string(embed).unwrap();
        let back: EmbedProviderConfig = serde_json::from_str(&json).unwrap();
        match back.secondary {
            Some(SecondaryPattern::DataHash { ref exchange_url }) => {
                assert!(exchange_url.contains("ajax"));
            }
            other => panic!("unexpected secondary pattern: {other:?}"),
        }
    }
}
