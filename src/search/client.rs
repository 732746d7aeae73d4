use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::types::{SearchHit, SearchRequest, SearchResponse};
use super::SearchProvider;
use crate::config::{RequestConfig, SearchConfig};
use crate::error::{SearchError, SearchResult};

/// Wire body: the request plus the API key the provider expects inline.
#[derive(Serialize)]
struct SearchBody<'a> {
    api_key: &'a str,
    #[serde(flatten)]
    request: &'a SearchRequest,
}

/// HTTP client for the web search API
#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout_ms: u64,
}

impl SearchClient {
    /// Create a new search client
    pub fn new(config: &SearchConfig, request_config: &RequestConfig) -> SearchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(SearchError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout_ms: request_config.timeout_ms,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl SearchProvider for SearchClient {
    async fn search(&self, request: &SearchRequest) -> SearchResult<Vec<SearchHit>> {
        let url = format!("{}/search", self.base_url);
        let start = Instant::now();

        debug!(
            query = %request.query,
            max_results = request.max_results,
            restricted = request.include_domains.is_some(),
            "Calling search API"
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&SearchBody {
                api_key: &self.api_key,
                request,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    SearchError::Http(e)
                }
            })?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited);
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let body: SearchResponse =
            response
                .json()
                .await
                .map_err(|e| SearchError::InvalidResponse {
                    message: format!("Failed to parse search response: {}", e),
                })?;

        info!(
            query = %request.query,
            results = body.results.len(),
            latency_ms = start.elapsed().as_millis(),
            "Search call succeeded"
        );

        Ok(body.results)
    }
}
