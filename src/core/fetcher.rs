use crate::domain::ports::Fetcher;
use crate::utils::error::{EtlError, FetchError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Single GET per call, bounded by a timeout, no retry.
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(EtlError::ApiError)?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> std::result::Result<serde_json::Value, FetchError> {
        tracing::debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;

        tracing::debug!("API response status: {}", response.status());

        let response = response
            .error_for_status()
            .map_err(|e| FetchError::from_reqwest(&e))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;

        serde_json::from_slice(&body).map_err(|e| FetchError::decode(e.to_string()))
    }
}
