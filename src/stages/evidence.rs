//! Evidence retrieval for claims.
//!
//! Focused mode runs one domain-restricted search and filters hits by
//! keyword overlap with the claim. Parallel mode runs three unrestricted
//! searches (main, skeptical, context) concurrently for the deep audit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{RetrievalError, SearchError};
use crate::search::{SearchDepth, SearchHit, SearchProvider, SearchRequest};

/// Words too common in claims to count as evidence keywords.
const NOISE_WORDS: &[&str] = &["january", "2026", "news", "latest", "today", "report", "india"];

const FOCUSED_MAX_RESULTS: u32 = 6;
const PARALLEL_MAX_RESULTS: u32 = 5;

/// One piece of retrieved evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Source URL.
    pub url: String,
    /// Page title.
    pub title: String,
    /// Snippet text.
    pub content: String,
    /// Provider relevance score, 0.0 when the provider gave none.
    pub relevance: f64,
}

impl From<SearchHit> for EvidenceItem {
    fn from(hit: SearchHit) -> Self {
        Self {
            url: hit.url,
            title: hit.title,
            content: hit.content,
            relevance: hit.score.unwrap_or(0.0),
        }
    }
}

/// Outcome of a focused retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum EvidenceOutcome {
    /// Relevant items, never empty.
    Found(Vec<EvidenceItem>),
    /// Why no evidence is available.
    Unavailable(RetrievalError),
}

/// Which angle of the claim a parallel stream investigates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// The claim verbatim.
    Main,
    /// Searches for debunks.
    Skeptical,
    /// Searches for background.
    Context,
}

impl StreamKind {
    /// Build this stream's query from the claim.
    pub fn query_for(&self, claim: &str) -> String {
        match self {
            StreamKind::Main => claim.to_string(),
            StreamKind::Skeptical => format!("{} hoax fake facts", claim),
            StreamKind::Context => format!("{} background history details", claim),
        }
    }
}

/// One settled stream of a parallel investigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationStream {
    /// Investigation angle.
    pub kind: StreamKind,
    /// Query sent for this stream.
    pub query: String,
    /// Returned items; empty on failure.
    pub items: Vec<EvidenceItem>,
    /// Failure message when the search failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated result of a three-stream investigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationResult {
    /// Claim under investigation.
    pub query: String,
    /// When all streams settled.
    pub timestamp: DateTime<Utc>,
    /// Main, skeptical and context, in that order.
    pub streams: Vec<InvestigationStream>,
}

impl InvestigationResult {
    /// Total items across all streams.
    pub fn item_count(&self) -> usize {
        self.streams.iter().map(|s| s.items.len()).sum()
    }

    /// Streams that ended in an error.
    pub fn failed_streams(&self) -> usize {
        self.streams.iter().filter(|s| s.error.is_some()).count()
    }
}

/// Gathers evidence for claims from a search provider.
#[derive(Clone)]
pub struct EvidenceAggregator {
    provider: Arc<dyn SearchProvider>,
    allowed_domains: Vec<String>,
}

impl EvidenceAggregator {
    /// Create an aggregator restricted to `allowed_domains` in focused mode.
    pub fn new(provider: Arc<dyn SearchProvider>, allowed_domains: Vec<String>) -> Self {
        Self {
            provider,
            allowed_domains,
        }
    }

    /// Domain-restricted search with keyword relevance filtering.
    pub async fn focused(&self, claim: &str) -> EvidenceOutcome {
        let request = SearchRequest::new(claim, FOCUSED_MAX_RESULTS)
            .with_domains(self.allowed_domains.clone())
            .with_depth(SearchDepth::Advanced);

        let hits = match self.provider.search(&request).await {
            Ok(hits) => hits,
            Err(SearchError::RateLimited) => {
                warn!(claim = %claim, "Search rate limit hit during focused retrieval");
                return EvidenceOutcome::Unavailable(RetrievalError::ServiceBusy {
                    message: "Search service is rate limited. Try again shortly.".to_string(),
                });
            }
            Err(e) => {
                warn!(claim = %claim, error = %e, "Focused retrieval failed");
                return EvidenceOutcome::Unavailable(RetrievalError::Fatal {
                    message: e.to_string(),
                });
            }
        };

        if hits.is_empty() {
            return EvidenceOutcome::Unavailable(RetrievalError::NoResults {
                message: "No results found from trusted sources.".to_string(),
            });
        }

        let total = hits.len();
        let keywords = claim_keywords(claim);
        let relevant = filter_relevant(hits.into_iter().map(EvidenceItem::from), &keywords);

        debug!(
            total,
            kept = relevant.len(),
            keywords = keywords.len(),
            "Relevance filter applied"
        );

        if relevant.is_empty() {
            return EvidenceOutcome::Unavailable(RetrievalError::NoResults {
                message: format!(
                    "None of the {} results from trusted sources matched the claim.",
                    total
                ),
            });
        }

        info!(claim = %claim, items = relevant.len(), "Focused retrieval found evidence");
        EvidenceOutcome::Found(relevant)
    }

    /// Three concurrent unrestricted searches; each stream settles on its own.
    pub async fn parallel(&self, claim: &str) -> InvestigationResult {
        let (main, skeptical, context) = tokio::join!(
            self.stream(StreamKind::Main, claim),
            self.stream(StreamKind::Skeptical, claim),
            self.stream(StreamKind::Context, claim),
        );

        let result = InvestigationResult {
            query: claim.to_string(),
            timestamp: Utc::now(),
            streams: vec![main, skeptical, context],
        };

        info!(
            claim = %claim,
            items = result.item_count(),
            failed_streams = result.failed_streams(),
            "Parallel investigation settled"
        );

        result
    }

    async fn stream(&self, kind: StreamKind, claim: &str) -> InvestigationStream {
        let query = kind.query_for(claim);
        let request = SearchRequest::new(&query, PARALLEL_MAX_RESULTS);

        match self.provider.search(&request).await {
            Ok(hits) => InvestigationStream {
                kind,
                query,
                items: hits.into_iter().map(EvidenceItem::from).collect(),
                error: None,
            },
            Err(e) => {
                warn!(stream = ?kind, error = %e, "Investigation stream failed");
                InvestigationStream {
                    kind,
                    query,
                    items: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Lower-cased claim tokens longer than two characters, minus noise words.
pub fn claim_keywords(claim: &str) -> Vec<String> {
    claim
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.chars().count() > 2 && !NOISE_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}

/// Keep items whose content contains at least 60% of the keywords.
///
/// An empty keyword set counts as one unmatched keyword, so nothing passes.
pub fn filter_relevant(
    items: impl IntoIterator<Item = EvidenceItem>,
    keywords: &[String],
) -> Vec<EvidenceItem> {
    let total = keywords.len().max(1);
    items
        .into_iter()
        .filter(|item| {
            let content = item.content.to_lowercase();
            let matched = keywords
                .iter()
                .filter(|k| content.contains(k.as_str()))
                .count();
            matched * 10 >= total * 6
        })
        .collect()
}
