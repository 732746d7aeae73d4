//! Claim verification stages.
//!
//! This module provides the pipeline stages a claim moves through:
//! - [`EvidenceAggregator`]: focused and three-stream evidence retrieval
//! - [`ReasoningInvoker`]: first-success fallback across reasoning backends
//! - [`AnalysisStage`]: structured True/False/Misleading judgment
//! - [`GradingStage`]: 0-100 trust score with tiered parsing
//! - [`AuditStage`]: cross-stream deep audit for escalated claims
//! - [`EscalationService`]: gray-area gate and manual escalation
//! - [`ClaimPipeline`]: end-to-end orchestration of a single claim check

mod analysis;
mod audit;
mod escalation;
mod evidence;
pub(crate) mod fallback;
mod grading;
mod pipeline;

pub use analysis::*;
pub use audit::*;
pub use escalation::*;
pub use evidence::*;
pub use fallback::*;
pub use grading::*;
pub use pipeline::*;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ParseError;

// ============================================================================
// Shared Utilities
// ============================================================================

/// Result of interpreting backend text as a structured record.
///
/// Consumers match on this once instead of re-probing the raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParsedOutput<T> {
    /// Text parsed into the expected record.
    Structured(T),
    /// Text carried no JSON at all.
    RawText(String),
    /// Text looked like JSON but did not match the expected shape.
    Malformed(ParseError),
}

impl<T> ParsedOutput<T> {
    /// The structured record, if parsing succeeded.
    pub fn structured(&self) -> Option<&T> {
        match self {
            ParsedOutput::Structured(value) => Some(value),
            _ => None,
        }
    }

    /// Whether parsing produced the expected record.
    pub fn is_structured(&self) -> bool {
        matches!(self, ParsedOutput::Structured(_))
    }
}

/// Interpret a completion as `T`.
///
/// A complete value followed by trailing prose still parses. JSON-shaped
/// text that fails to deserialize is `Malformed`; text with no JSON in it is
/// kept verbatim as `RawText`.
pub fn parse_structured<T: DeserializeOwned>(completion: &str) -> ParsedOutput<T> {
    let json = match extract_json_from_completion(completion) {
        Ok(json) => json,
        Err(_) => return ParsedOutput::RawText(completion.to_string()),
    };

    match serde_json::from_str::<T>(json) {
        Ok(value) => ParsedOutput::Structured(value),
        Err(e) => leading_json::<T>(json)
            .or_else(|| brace_span(completion).and_then(|span| serde_json::from_str(span).ok()))
            .map(ParsedOutput::Structured)
            .unwrap_or_else(|| {
                ParsedOutput::Malformed(ParseError::Malformed {
                    message: e.to_string(),
                })
            }),
    }
}

/// First complete JSON value in `text`, ignoring whatever follows it.
pub(crate) fn leading_json<T: DeserializeOwned>(text: &str) -> Option<T> {
    serde_json::Deserializer::from_str(text)
        .into_iter::<T>()
        .next()
        .and_then(Result::ok)
}

/// Serialize a value to JSON for logging or snapshots, with warning on failure.
pub(crate) fn serialize_for_log<T: Serialize>(value: &T, context: &str) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!(
            error = %e,
            context = %context,
            "Failed to serialize value"
        );
        serde_json::json!({
            "serialization_error": e.to_string(),
            "context": context
        })
    })
}

/// Extract JSON from a completion string, handling markdown code blocks.
///
/// Attempts extraction in this order:
/// 1. Raw JSON (fast path)
/// 2. ```json ... ``` code blocks
/// 3. ``` ... ``` code blocks
/// 4. The span from the first `{` to the last `}`
pub(crate) fn extract_json_from_completion(completion: &str) -> Result<&str, String> {
    // Fast path: raw JSON
    let trimmed = completion.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(trimmed);
    }

    if completion.contains("```json") {
        return completion
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ```json block but content was empty or malformed".to_string());
    }

    if completion.contains("```") {
        return completion
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ``` block but content was empty or malformed".to_string());
    }

    if let Some(span) = brace_span(completion) {
        return Ok(span);
    }

    Err(format!(
        "No JSON found in response. First 100 chars: '{}'",
        completion.chars().take(100).collect::<String>()
    ))
}

/// Greedy span from the first `{` to the last `}` inclusive.
pub(crate) fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
