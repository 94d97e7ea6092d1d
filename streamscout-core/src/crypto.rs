//! Link payload decryption using AES-256-GCM
//!
//! Two schemes, both pure functions over string inputs:
//!
//! - the session-key blob: `base64(version byte ‖ 12-byte nonce ‖ ciphertext)`
//!   under a configured 32-byte bootstrap key, GCM tag as integrity check;
//! - per-link ciphertexts: `base64(ciphertext)` with no embedded IV; key and
//!   nonce are both derived from the session key.
//!
//! Any failure maps to `Error::Crypto` and means "this blob / this link is
//! unusable", never "abort the provider". The cipher envelope follows a
//! changeable upstream; constants here mirror `KeyApiConfig`, not protocol
//! truth.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// AES-256-GCM nonce size (96 bits / 12 bytes)
const NONCE_SIZE: usize = 12;

/// AES-256-GCM authentication tag size
const TAG_SIZE: usize = 16;

/// Version byte prepended to session-key blobs. Upstream bumps this when the
/// envelope changes; an unknown version fails decryption and degrades the
/// provider to empty.
const KEY_VERSION: u8 = 0x01;

/// Recover the provider's per-session decryption key from its blob.
///
/// # Errors
/// `Error::Crypto` when the blob is malformed, truncated, carries an unknown
/// version, fails the GCM integrity check, or decrypts to non-UTF-8.
pub fn decrypt_api_key(blob: &str, bootstrap_key_hex: &str) -> Result<String> {
    let key_bytes = hex::decode(bootstrap_key_hex)
        .map_err(|e| Error::Crypto(format!("invalid bootstrap key hex: {e}")))?;
    if key_bytes.len() != 32 {
        return Err(Error::Crypto(format!(
            "bootstrap key must be 32 bytes, got {}",
            key_bytes.len()
        )));
    }

    let combined = BASE64
        .decode(blob.trim())
        .map_err(|e| Error::Crypto(format!("invalid base64 in key blob: {e}")))?;
    if combined.len() < 1 + NONCE_SIZE + TAG_SIZE {
        return Err(Error::Crypto("key blob too short".to_string()));
    }

    let version = combined[0];
    if version != KEY_VERSION {
        return Err(Error::Crypto(format!(
            "unsupported key blob version: {version} (expected {KEY_VERSION})"
        )));
    }

    let (nonce_bytes, ciphertext) = combined[1..].split_at(NONCE_SIZE);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| Error::Crypto("key blob decryption failed (wrong key or corrupted blob)".to_string()))?;

    String::from_utf8(plaintext)
        .map_err(|_| Error::Crypto("decrypted session key is not valid UTF-8".to_string()))
}

/// Reverse the per-link scheme: AES-256-GCM under a key and fixed nonce both
/// derived from the session key. The input carries no IV.
///
/// # Errors
/// `Error::Crypto` on invalid base64, a failed integrity check, or non-UTF-8
/// plaintext. Callers skip the single link and continue.
pub fn decrypt_link(ciphertext_b64: &str, session_key: &str) -> Result<String> {
    let (key_bytes, nonce_bytes) = derive_link_material(session_key);

    let data = BASE64
        .decode(ciphertext_b64.trim())
        .map_err(|e| Error::Crypto(format!("invalid base64 in link ciphertext: {e}")))?;
    if data.len() < TAG_SIZE {
        return Err(Error::Crypto("link ciphertext too short".to_string()));
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), data.as_ref())
        .map_err(|_| Error::Crypto("link decryption failed".to_string()))?;

    String::from_utf8(plaintext)
        .map_err(|_| Error::Crypto("decrypted link is not valid UTF-8".to_string()))
}

/// A structurally valid decryption is only trusted when it yields a URL;
/// anything else is a semantic failure handled by the calling adapter.
#[must_use]
pub fn is_url_shaped(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Link key = SHA-256(session key); fixed nonce = SHA-256(link key)[..12].
fn derive_link_material(session_key: &str) -> ([u8; 32], [u8; NONCE_SIZE]) {
    let key_digest = Sha256::digest(session_key.as_bytes());
    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&key_digest);

    let nonce_digest = Sha256::digest(key_bytes);
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    nonce_bytes.copy_from_slice(&nonce_digest[..NONCE_SIZE]);

    (key_bytes, nonce_bytes)
}

#[cfg(test)]
pub(crate) mod test_mirror {
    //! Test-side encrypt helpers mirroring the upstream schemes.

    use super::*;

    pub fn encrypt_api_key(session_key: &str, bootstrap_key_hex: &str) -> String {
        let key_bytes = hex::decode(bootstrap_key_hex).expect("test key hex");
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
        let nonce_bytes = [7u8; NONCE_SIZE];
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), session_key.as_bytes())
            .expect("test encryption");

        let mut combined = Vec::with_capacity(1 + NONCE_SIZE + ciphertext.len());
        combined.push(KEY_VERSION);
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);
        BASE64.encode(combined)
    }

    pub fn encrypt_link(plaintext: &str, session_key: &str) -> String {
        let (key_bytes, nonce_bytes) = derive_link_material(session_key);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .expect("test encryption");
        BASE64.encode(ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::test_mirror::{encrypt_api_key, encrypt_link};
    use super::*;

    const TEST_BOOTSTRAP: &str =
        "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn test_api_key_round_trip() {
        let blob = encrypt_api_key("session-key-123", TEST_BOOTSTRAP);
        assert_eq!(decrypt_api_key(&blob, TEST_BOOTSTRAP).unwrap(), "session-key-123");
    }

    #[test]
    fn test_api_key_rejects_bad_base64() {
        let err = decrypt_api_key("not-base64!!", TEST_BOOTSTRAP).unwrap_err();
        assert!(matches!(err, Error::Crypto(_)));
    }

    #[test]
    fn test_api_key_rejects_truncated_blob() {
        let blob = encrypt_api_key("session-key-123", TEST_BOOTSTRAP);
        let truncated = &blob[..8];
        assert!(decrypt_api_key(truncated, TEST_BOOTSTRAP).is_err());
    }

    #[test]
    fn test_api_key_rejects_wrong_key() {
        let blob = encrypt_api_key("session-key-123", TEST_BOOTSTRAP);
        let wrong = "ff0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1eff";
        assert!(decrypt_api_key(&blob, wrong).is_err());
    }

    #[test]
    fn test_api_key_rejects_unknown_version() {
        let blob = encrypt_api_key("session-key-123", TEST_BOOTSTRAP);
        let mut raw = BASE64.decode(&blob).unwrap();
        raw[0] = 0x02;
        assert!(decrypt_api_key(&BASE64.encode(raw), TEST_BOOTSTRAP).is_err());
    }

    #[test]
    fn test_link_round_trip() {
        let ct = encrypt_link("https://cdn.example/v/master.m3u8", "session-key-123");
        assert_eq!(
            decrypt_link(&ct, "session-key-123").unwrap(),
            "https://cdn.example/v/master.m3u8"
        );
    }

    #[test]
    fn test_link_wrong_session_key_fails() {
        let ct = encrypt_link("https://cdn.example/v/master.m3u8", "session-key-123");
        assert!(decrypt_link(&ct, "other-key").is_err());
    }

    #[test]
    fn test_link_rejects_malformed_ciphertext() {
        assert!(decrypt_link("not-base64!!", "session-key-123").is_err());
        assert!(decrypt_link("AAAA", "session-key-123").is_err());
    }

    #[test]
    fn test_non_url_plaintext_is_semantic_not_crypto() {
        // Decryption succeeds; only the URL-shape gate rejects it.
        let ct = encrypt_link("definitely not a url", "session-key-123");
        let plaintext = decrypt_link(&ct, "session-key-123").unwrap();
        assert!(!is_url_shaped(&plaintext));
    }

    #[test]
    fn test_is_url_shaped() {
        assert!(is_url_shaped("https://a/b.m3u8"));
        assert!(is_url_shaped("http://a/b.mp4"));
        assert!(!is_url_shaped("ftp://a/b"));
        assert!(!is_url_shaped("//a/b.mp4"));
    }
}
