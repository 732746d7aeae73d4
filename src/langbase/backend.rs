use async_trait::async_trait;

use super::client::LangbaseClient;
use super::types::PipeRequest;
use crate::config::BackendDescriptor;
use crate::error::LangbaseResult;
use crate::stages::{CompletionRequest, ReasoningBackend};

/// A reasoning backend backed by one Langbase pipe.
#[derive(Clone)]
pub struct PipeBackend {
    client: LangbaseClient,
    descriptor: BackendDescriptor,
}

impl PipeBackend {
    /// Bind a pipe descriptor to a client.
    pub fn new(client: LangbaseClient, descriptor: BackendDescriptor) -> Self {
        Self { client, descriptor }
    }

    /// Build one backend per descriptor, preserving order.
    pub fn from_descriptors(
        client: &LangbaseClient,
        descriptors: &[BackendDescriptor],
    ) -> Vec<Self> {
        descriptors
            .iter()
            .cloned()
            .map(|d| Self::new(client.clone(), d))
            .collect()
    }

    /// The descriptor this backend runs.
    pub fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }
}

#[async_trait]
impl ReasoningBackend for PipeBackend {
    fn name(&self) -> &str {
        &self.descriptor.pipe
    }

    async fn complete(&self, request: &CompletionRequest) -> LangbaseResult<String> {
        let pipe_request = PipeRequest::new(&self.descriptor.pipe, request.messages.clone())
            .with_temperature(request.temperature)
            .with_max_tokens(request.max_tokens.unwrap_or(self.client.max_output_tokens()));

        let response = self.client.call_pipe(pipe_request).await?;
        Ok(response.completion)
    }
}
