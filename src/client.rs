//! HTTP client wrapper for metadata requests.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::config::DEFAULT_TIMEOUT;
use crate::error::CfnError;
use crate::signer::QueryParams;

/// Content type sent with every metadata request.
const CONTENT_TYPE_JSON: &str = "application/json";

/// HTTP client wrapper for metadata server requests.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    inner: Client,
}

impl MetadataClient {
    /// Create a new metadata client with the specified timeout.
    pub fn new(timeout: Duration) -> Result<Self, CfnError> {
        let inner = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CfnError::not_configured(format!("could not build http client: {}", e)))?;
        Ok(Self { inner })
    }

    /// Create a new metadata client with the default timeout.
    pub fn with_default_timeout() -> Result<Self, CfnError> {
        Self::new(DEFAULT_TIMEOUT)
    }

    /// GET `url` with `params` as the query string and return the body.
    ///
    /// # Errors
    ///
    /// Returns `CfnError::MetadataNotAvailable` on network failure or a non-2xx status.
    pub async fn get(&self, url: &Url, params: &QueryParams) -> Result<String, CfnError> {
        debug!("GET {}", url);
        let response = self
            .inner
            .get(url.clone())
            .query(params)
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
            .send()
            .await
            .map_err(|e| {
                warn!("{}", e);
                CfnError::not_available(format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} returned {}", url, status);
            return Err(CfnError::not_available(format!("http {}", status.as_u16())));
        }

        response.text().await.map_err(|e| {
            warn!("{}", e);
            CfnError::not_available(format!("could not read response body: {}", e))
        })
    }
}
