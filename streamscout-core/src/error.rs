//! Shared resolution error types
//!
//! One taxonomy for every component of the engine. Recoverable classes
//! (network, parse, crypto) are absorbed at the component that produced them
//! and become empty attempts; only `UnknownSource` and `InvalidEpisode`
//! escape to callers.

use thiserror::Error;

/// Maximum response body size for upstream HTTP calls (16 MB).
/// Prevents OOM from malicious or misconfigured upstream servers.
pub const MAX_RESPONSE_SIZE: usize = 16 * 1024 * 1024;

/// Common error type for the resolution engine.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error {status} for {url}")]
    Http { status: reqwest::StatusCode, url: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Response too large ({size} bytes, max {MAX_RESPONSE_SIZE})")]
    ResponseTooLarge { size: u64 },

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Invalid episode identifier: {0}")]
    InvalidEpisode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the fallback chain may absorb this error and keep going.
    ///
    /// `UnknownSource`, `InvalidEpisode` and `InvalidConfig` are caller
    /// mistakes with no fallback to try; everything else is an upstream
    /// problem scoped to a single attempt.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::UnknownSource(_) | Self::InvalidEpisode(_) | Self::InvalidConfig(_)
        )
    }
}

/// Read a response body with size limit and deserialize as JSON.
///
/// Checks `Content-Length` hint first (if available), then enforces the
/// limit on the actual body bytes before deserializing.
pub async fn json_with_limit<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T> {
    let bytes = bytes_with_limit(response).await?;
    serde_json::from_slice(&bytes).map_err(Into::into)
}

/// Read a response body with size limit as UTF-8 text (lossy).
pub async fn text_with_limit(response: reqwest::Response) -> Result<String> {
    let bytes = bytes_with_limit(response).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn bytes_with_limit(response: reqwest::Response) -> Result<Vec<u8>> {
    if let Some(cl) = response.content_length() {
        if cl as usize > MAX_RESPONSE_SIZE {
            return Err(Error::ResponseTooLarge { size: cl });
        }
    }
    let bytes = response.bytes().await?;
    if bytes.len() > MAX_RESPONSE_SIZE {
        return Err(Error::ResponseTooLarge { size: bytes.len() as u64 });
    }
    Ok(bytes.to_vec())
}

/// Check HTTP response status before processing body.
pub fn check_response(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(Error::Http {
            status,
            url: resp.url().to_string(),
        });
    }
    Ok(resp)
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
