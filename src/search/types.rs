use serde::{Deserialize, Serialize};

/// Request sent to the search provider
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    /// Search text.
    pub query: String,
    /// Restrict results to these domains when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_domains: Option<Vec<String>>,
    /// Result cap.
    pub max_results: u32,
    /// Provider effort level.
    pub search_depth: SearchDepth,
    /// Provider topic, `general` for claims.
    pub topic: String,
}

/// How much effort the provider spends per query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    /// Fast, shallow search.
    Basic,
    /// Slower search with richer snippets.
    Advanced,
}

/// One result returned by the provider
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Snippet of page text.
    #[serde(default)]
    pub content: String,
    /// Provider relevance score, when given.
    #[serde(default)]
    pub score: Option<f64>,
}

/// Provider response envelope
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

impl SearchRequest {
    /// Create an advanced general-topic request
    pub fn new(query: impl Into<String>, max_results: u32) -> Self {
        Self {
            query: query.into(),
            include_domains: None,
            max_results,
            search_depth: SearchDepth::Advanced,
            topic: "general".to_string(),
        }
    }

    /// Restrict the search to an allow-list of domains
    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.include_domains = Some(domains);
        self
    }

    /// Set the search depth
    pub fn with_depth(mut self, depth: SearchDepth) -> Self {
        self.search_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_request_serialization() {
        let req = SearchRequest::new("delhi fog", 6).with_domains(vec!["ndtv.com".to_string()]);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["query"], "delhi fog");
        assert_eq!(value["include_domains"], json!(["ndtv.com"]));
        assert_eq!(value["max_results"], 6);
        assert_eq!(value["search_depth"], "advanced");
        assert_eq!(value["topic"], "general");
    }

    #[test]
    fn test_search_request_without_domains() {
        let value = serde_json::to_value(
            SearchRequest::new("q", 5).with_depth(SearchDepth::Basic),
        )
        .unwrap();
        assert!(value.get("include_domains").is_none());
        assert_eq!(value["search_depth"], "basic");
    }

    #[test]
    fn test_search_hit_defaults() {
        let hit: SearchHit = serde_json::from_value(json!({"url": "https://x"})).unwrap();
        assert_eq!(hit.title, "");
        assert_eq!(hit.content, "");
        assert!(hit.score.is_none());
    }
}
