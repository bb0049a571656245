//! KuCoin API request signing.

use crate::config::KucoinConfig;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue, CONTENT_TYPE};
use reqwest::Method;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

/// KuCoin key version for passphrases signed with the API secret.
const KEY_VERSION: &str = "2";

/// Authentication headers for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub api_key: String,
    pub signature: String,
    pub timestamp: String,
    pub passphrase: String,
    pub key_version: &'static str,
}

impl SignedHeaders {
    /// Render as a header map, including the JSON content type.
    ///
    /// Fails when a value (in practice the API key) is not a legal header value.
    pub fn to_header_map(&self) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut headers = HeaderMap::new();
        let pairs = [
            ("kc-api-key", self.api_key.as_str()),
            ("kc-api-sign", self.signature.as_str()),
            ("kc-api-timestamp", self.timestamp.as_str()),
            ("kc-api-passphrase", self.passphrase.as_str()),
            ("kc-api-key-version", self.key_version),
        ];
        for (name, value) in pairs {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_str(value)?);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

/// Signs KuCoin REST requests with HMAC-SHA256.
#[derive(Clone)]
pub struct RequestSigner {
    api_key: String,
    api_secret: String,
    api_passphrase: String,
}

impl RequestSigner {
    pub fn new(config: &KucoinConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            api_passphrase: config.api_passphrase.clone(),
        }
    }

    /// Sign a request at the current wall-clock time.
    pub fn sign(&self, method: &Method, endpoint: &str) -> SignedHeaders {
        self.sign_at(method, endpoint, Self::timestamp())
    }

    /// Sign a request at an explicit timestamp (milliseconds since the epoch).
    ///
    /// `endpoint` is the path including the query string, exactly as sent.
    pub fn sign_at(&self, method: &Method, endpoint: &str, timestamp_ms: u64) -> SignedHeaders {
        let timestamp = timestamp_ms.to_string();
        let payload = format!("{}{}{}", timestamp, method.as_str(), endpoint);

        SignedHeaders {
            api_key: self.api_key.clone(),
            signature: self.hmac_base64(&payload),
            timestamp,
            passphrase: self.hmac_base64(&self.api_passphrase),
            key_version: KEY_VERSION,
        }
    }

    fn hmac_base64(&self, message: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(message.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }

    /// Get current timestamp in milliseconds.
    fn timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}
