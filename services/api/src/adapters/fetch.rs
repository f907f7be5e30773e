//! services/api/src/adapters/fetch.rs
//!
//! This module contains the image fetcher used by the archiver. `data:`
//! URIs are decoded locally; anything else is fetched over HTTP.

use async_trait::async_trait;
use base64::Engine;
use cardsmith_core::ports::{ImageFetcher, PortError, PortResult};

/// An adapter that implements the `ImageFetcher` port with reqwest and
/// local base64 decoding.
#[derive(Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    /// Creates a new `HttpImageFetcher`.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn decode_data_uri(data_uri: &str) -> PortResult<Vec<u8>> {
        let payload = data_uri
            .split_once(";base64,")
            .map(|(_, payload)| payload)
            .ok_or_else(|| {
                PortError::Unexpected("data URI is not base64-encoded".to_string())
            })?;
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| PortError::Unexpected(format!("data URI decode failed: {e}")))
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url_or_data_uri: &str) -> PortResult<Vec<u8>> {
        if url_or_data_uri.starts_with("data:") {
            return Self::decode_data_uri(url_or_data_uri);
        }

        let response = self
            .client
            .get(url_or_data_uri)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("image fetch failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Unexpected(format!(
                "image fetch returned HTTP {status}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PortError::Unexpected(format!("image fetch read failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}
