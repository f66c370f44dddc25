use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

use crate::cache::ResultCache;
use crate::config::BackendConfig;
use crate::lookup::LookupResult;
use crate::query::Query;

pub type FetchFuture = Pin<Box<dyn Future<Output = Result<LookupResult, BackendError>> + Send>>;

/// Anything that can turn a query into a lookup result.
pub trait Backend: Send + Sync {
    fn fetch(&self, query: Query) -> FetchFuture;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Lookup service responded with HTTP {0}")]
    Status(u16),
    #[error("Could not read lookup response: {0}")]
    Decode(String),
    #[error("{}", service_message(.0))]
    Service(i32),
}

fn service_message(code: &i32) -> String {
    match *code {
        20 => "Text to translate is too long".to_string(),
        30 => "Unable to translate this text".to_string(),
        40 => "Unsupported language".to_string(),
        50 => "Invalid API key".to_string(),
        60 => "No dictionary result".to_string(),
        other => format!("Lookup service error (code {})", other),
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else {
            BackendError::Network(e.to_string())
        }
    }
}

/// Rejects service-level failures carried inside an HTTP 200 body.
pub fn check_result(result: LookupResult) -> Result<LookupResult, BackendError> {
    if result.error_code != 0 {
        return Err(BackendError::Service(result.error_code));
    }
    Ok(result)
}

/// HTTP client for a Youdao-style dictionary endpoint. Successful results are
/// written into the shared [`ResultCache`].
#[derive(Clone)]
pub struct LookupClient {
    endpoint: String,
    key_from: String,
    api_key: String,
    client: reqwest::Client,
    cache: ResultCache,
}

impl LookupClient {
    pub fn with_config(config: &BackendConfig, cache: ResultCache) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(LookupClient {
            endpoint: config.endpoint.clone(),
            key_from: config.key_from.clone(),
            api_key: config.api_key.clone(),
            client,
            cache,
        })
    }

    async fn request(
        client: reqwest::Client,
        endpoint: String,
        key_from: String,
        api_key: String,
        query: &Query,
    ) -> Result<LookupResult, BackendError> {
        let response = client
            .get(&endpoint)
            .query(&[
                ("keyfrom", key_from.as_str()),
                ("key", api_key.as_str()),
                ("type", "data"),
                ("doctype", "json"),
                ("version", "1.1"),
                ("q", query.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackendError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let result: LookupResult =
            serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))?;

        check_result(result)
    }
}

impl Backend for LookupClient {
    fn fetch(&self, query: Query) -> FetchFuture {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let key_from = self.key_from.clone();
        let api_key = self.api_key.clone();
        let cache = self.cache.clone();

        Box::pin(async move {
            tracing::debug!("Requesting lookup for {:?}", query.as_str());
            let result = Self::request(client, endpoint, key_from, api_key, &query).await?;
            cache.put(query, result.clone());
            Ok(result)
        })
    }
}
