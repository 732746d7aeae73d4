use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::types::{CreatePipeRequest, CreatePipeResponse, PipeRequest, PipeResponse};
use crate::config::{BackendDescriptor, LangbaseConfig, RequestConfig};
use crate::error::{LangbaseError, LangbaseResult};

/// Client for interacting with Langbase Pipes API
#[derive(Clone)]
pub struct LangbaseClient {
    client: Client,
    base_url: String,
    api_key: String,
    request_config: RequestConfig,
}

impl LangbaseClient {
    /// Create a new Langbase client
    pub fn new(config: &LangbaseConfig, request_config: RequestConfig) -> LangbaseResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(LangbaseError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            request_config,
        })
    }

    /// Run a Langbase pipe once.
    ///
    /// There is no retry here: the fallback invoker moves on to the next
    /// backend instead of repeating a billable call.
    pub async fn call_pipe(&self, request: PipeRequest) -> LangbaseResult<PipeResponse> {
        let url = format!("{}/v1/pipes/run", self.base_url);
        let start = Instant::now();

        debug!(
            pipe = %request.name,
            messages = request.messages.len(),
            temperature = ?request.temperature,
            "Calling Langbase pipe"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LangbaseError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    LangbaseError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(LangbaseError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let pipe_response: PipeResponse =
            response
                .json()
                .await
                .map_err(|e| LangbaseError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        if !pipe_response.success {
            return Err(LangbaseError::InvalidResponse {
                message: "Pipe reported an unsuccessful run".to_string(),
            });
        }

        info!(
            pipe = %request.name,
            latency_ms = start.elapsed().as_millis(),
            total_tokens = ?pipe_response
                .raw
                .as_ref()
                .and_then(|r| r.usage.as_ref())
                .and_then(|u| u.total_tokens),
            "Langbase pipe call succeeded"
        );

        Ok(pipe_response)
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Output size cap applied to every pipe run
    pub fn max_output_tokens(&self) -> u32 {
        self.request_config.max_output_tokens
    }

    /// Create a new pipe
    pub async fn create_pipe(
        &self,
        request: CreatePipeRequest,
    ) -> LangbaseResult<CreatePipeResponse> {
        let url = format!("{}/v1/pipes", self.base_url);

        info!(pipe = %request.name, model = ?request.model, "Creating Langbase pipe");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(LangbaseError::Http)?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(LangbaseError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let pipe_response: CreatePipeResponse =
            response
                .json()
                .await
                .map_err(|e| LangbaseError::InvalidResponse {
                    message: format!("Failed to parse create pipe response: {}", e),
                })?;

        info!(
            pipe = %pipe_response.name,
            url = %pipe_response.url,
            "Pipe created successfully"
        );

        Ok(pipe_response)
    }

    /// Ensure every configured backend pipe exists, creating it if needed.
    ///
    /// A backend that cannot be created is logged and skipped; startup only
    /// fails when no backend pipe is available at all.
    pub async fn ensure_backend_pipes(&self, backends: &[BackendDescriptor]) -> LangbaseResult<()> {
        let mut last_error = None;
        let mut ready = 0usize;

        for backend in backends {
            let request = CreatePipeRequest::new(&backend.pipe)
                .with_description("Claim verification reasoning backend")
                .with_model(&backend.model)
                .with_upsert(true)
                .with_store(false)
                .with_max_tokens(self.request_config.max_output_tokens);

            match self.create_pipe(request).await {
                Ok(_) => {
                    info!(pipe = %backend.pipe, model = %backend.model, "Backend pipe ready");
                    ready += 1;
                }
                Err(LangbaseError::Api { status: 409, .. }) => {
                    // Pipe already exists, that's fine
                    info!(pipe = %backend.pipe, "Pipe already exists");
                    ready += 1;
                }
                Err(e) => {
                    warn!(pipe = %backend.pipe, error = %e, "Failed to ensure backend pipe");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if ready == 0 => Err(e),
            _ => Ok(()),
        }
    }
}
