//! reqwest-backed listings transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Config;
use crate::error::{ListingsError, Result};
use crate::paging::PagedFilters;
use crate::response::{ListRequest, ListResponse};

use super::ListingsTransport;

/// Longest server error body echoed back in an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Listings transport that POSTs JSON to routes under a base URL.
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport from configuration
    ///
    /// Uses the configured connect and request timeouts.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = config.base_url()?;
        Self::with_timeouts(
            base_url,
            Duration::from_secs(config.server.connect_timeout_secs),
            Duration::from_secs(config.server.request_timeout_secs),
        )
    }

    /// Create a transport with a 30s connect timeout and 60s total timeout.
    pub fn new(base_url: Url) -> Result<Self> {
        Self::with_timeouts(base_url, Duration::from_secs(30), Duration::from_secs(60))
    }

    fn with_timeouts(mut base_url: Url, connect: Duration, total: Duration) -> Result<Self> {
        // Routes resolve under the base path, so it must end in a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(total)
            .connect_timeout(connect)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Resolve a route such as `/listings/food` against the base URL.
    ///
    /// The route is always taken relative to the base path, so a base URL
    /// of `https://host/api` serves `/listings/food` from
    /// `https://host/api/listings/food`.
    pub fn route_url(&self, route: &str) -> Result<Url> {
        let relative = route.trim().trim_start_matches('/');
        if relative.is_empty() {
            return Err(ListingsError::InvalidRoute(route.to_string()));
        }

        self.base_url
            .join(relative)
            .map_err(|e| ListingsError::InvalidRoute(format!("{route}: {e}")))
    }
}

#[async_trait]
impl<F, T> ListingsTransport<F, T> for HttpTransport
where
    F: Serialize + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
{
    async fn post_listings(
        &self,
        route: &str,
        filters: &PagedFilters<F>,
    ) -> Result<ListResponse<T>> {
        let url = self.route_url(route)?;

        tracing::debug!(
            %url,
            offset = filters.retrieval_offset,
            amount = filters.retrieval_amount,
            "posting listings request"
        );

        let response = self
            .client
            .post(url)
            .header(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("application/json"),
            )
            .json(&ListRequest { filters })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(ListingsError::Status { status, message });
        }

        let bytes = response.bytes().await?;
        let parsed: ListResponse<T> = serde_json::from_slice(&bytes)?;
        Ok(parsed)
    }
}
