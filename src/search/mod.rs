//! Web search retrieval adapter.

mod client;
mod types;

pub use client::SearchClient;
pub use types::*;

use async_trait::async_trait;

use crate::error::SearchResult;

/// Source of web search results.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one search and return the provider's hits in rank order.
    async fn search(&self, request: &SearchRequest) -> SearchResult<Vec<SearchHit>>;
}
