use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{parse_structured, serialize_for_log, EvidenceOutcome, ParsedOutput, ReasoningInvoker};
use crate::error::ReasoningError;
use crate::langbase::Message;
use crate::prompts::{render, ANALYST_PROMPT};

const ANALYSIS_TEMPERATURE: f64 = 0.2;

/// Verdict class of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conclusion {
    /// Evidence supports the claim.
    #[serde(alias = "true", alias = "TRUE")]
    True,
    /// Evidence contradicts the claim.
    #[serde(alias = "false", alias = "FALSE")]
    False,
    /// Partly true or missing context.
    #[serde(alias = "misleading", alias = "MISLEADING")]
    Misleading,
    /// No usable evidence.
    #[serde(alias = "insufficient_data", alias = "Insufficient Data")]
    InsufficientData,
}

/// A source cited by the analysis, titled by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Title written by the backend.
    pub title: String,
    /// Evidence URL.
    pub url: String,
}

/// Structured judgment of a claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Verdict class.
    pub conclusion: Conclusion,
    /// Summary grounded in the snippets.
    pub summary: String,
    /// Supporting points with citation markers.
    #[serde(default)]
    pub evidence: Vec<String>,
    /// Cited sources.
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl AnalysisRecord {
    /// Canonical record for a claim that could not be checked against evidence.
    pub fn insufficient_data(summary: impl Into<String>) -> Self {
        Self {
            conclusion: Conclusion::InsufficientData,
            summary: summary.into(),
            evidence: Vec::new(),
            sources: Vec::new(),
        }
    }
}

/// Output of the analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Backend text as received, or the serialized canonical record.
    pub raw_text: String,
    /// Parsed form of `raw_text`.
    pub record: ParsedOutput<AnalysisRecord>,
}

/// Produces a grounded True/False/Misleading judgment from evidence.
#[derive(Clone)]
pub struct AnalysisStage {
    invoker: ReasoningInvoker,
}

impl AnalysisStage {
    /// Create an analysis stage over `invoker`.
    pub fn new(invoker: ReasoningInvoker) -> Self {
        Self { invoker }
    }

    /// Analyze a claim against its evidence.
    ///
    /// Retrieval signals short-circuit to an InsufficientData record without
    /// a backend call. Backend exhaustion is the only error.
    pub async fn analyze(
        &self,
        claim: &str,
        evidence: &EvidenceOutcome,
    ) -> Result<Analysis, ReasoningError> {
        let items = match evidence {
            EvidenceOutcome::Found(items) => items,
            EvidenceOutcome::Unavailable(signal) => {
                info!(
                    claim = %claim,
                    signal = %signal,
                    "No usable evidence, returning InsufficientData"
                );
                let record = AnalysisRecord::insufficient_data(signal.message());
                return Ok(Analysis {
                    raw_text: serialize_for_log(&record, "analysis.insufficient_data").to_string(),
                    record: ParsedOutput::Structured(record),
                });
            }
        };

        let date = Utc::now().format("%a %b %d %Y").to_string();
        let messages = vec![
            Message::system(render(ANALYST_PROMPT, &date, claim)),
            Message::user(format!(
                "Analyze these search results: {}",
                serialize_for_log(items, "analysis.evidence")
            )),
        ];

        let completion = self.invoker.invoke(messages, ANALYSIS_TEMPERATURE).await?;
        let record = parse_structured::<AnalysisRecord>(&completion.text);

        match &record {
            ParsedOutput::Structured(r) => info!(
                claim = %claim,
                conclusion = ?r.conclusion,
                sources = r.sources.len(),
                backend = %completion.backend,
                "Analysis completed"
            ),
            ParsedOutput::RawText(_) => {
                warn!(backend = %completion.backend, "Analysis returned unstructured text")
            }
            ParsedOutput::Malformed(e) => {
                warn!(backend = %completion.backend, error = %e, "Analysis JSON malformed")
            }
        }

        Ok(Analysis {
            raw_text: completion.text,
            record,
        })
    }
}
