use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{parse_structured, serialize_for_log, InvestigationResult, ParsedOutput, ReasoningInvoker};
use crate::langbase::Message;
use crate::prompts::{render, AUDITOR_PROMPT};

const AUDIT_TEMPERATURE: f64 = 0.2;

/// Cross-stream audit of a claim, as shown to DAO voters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Synthesis across the three streams.
    pub summary: String,
    /// Key facts, tagged with their stream.
    #[serde(default)]
    pub evidence: Vec<String>,
    /// Contradictions between streams.
    #[serde(default)]
    pub conflicts: Vec<String>,
    /// Auditor verdict.
    pub conclusion: String,
    /// Caveats about the audit itself.
    #[serde(default)]
    pub audit_note: String,
    /// Set when the report was not produced from structured backend output.
    #[serde(default)]
    pub degraded: bool,
}

impl AuditReport {
    /// Wrap unstructured backend text into a report.
    fn from_raw_text(text: &str) -> Self {
        Self {
            summary: text.replace("```json", "").replace("```", "").trim().to_string(),
            evidence: Vec::new(),
            conflicts: Vec::new(),
            conclusion: "Audit completed (Raw Text due to formatting error).".to_string(),
            audit_note: "Manual review recommended.".to_string(),
            degraded: true,
        }
    }

    /// Report used when no backend could run the audit.
    fn technical_failure() -> Self {
        Self {
            summary: "Audit failed due to technical error.".to_string(),
            evidence: Vec::new(),
            conflicts: Vec::new(),
            conclusion: "INCONCLUSIVE".to_string(),
            audit_note: "System error during audit.".to_string(),
            degraded: true,
        }
    }
}

/// Synthesizes a three-stream investigation into an audit report.
#[derive(Clone)]
pub struct AuditStage {
    invoker: ReasoningInvoker,
}

impl AuditStage {
    /// Create an audit stage over `invoker`.
    pub fn new(invoker: ReasoningInvoker) -> Self {
        Self { invoker }
    }

    /// Audit an investigation. Never fails.
    pub async fn audit(&self, investigation: &InvestigationResult) -> AuditReport {
        let date = Utc::now().format("%a %b %d %Y").to_string();
        let messages = vec![
            Message::system(render(AUDITOR_PROMPT, &date, &investigation.query)),
            Message::user(format!(
                "INPUT DATA (3 parallel investigations): {}",
                serialize_for_log(investigation, "audit.investigation")
            )),
        ];

        let completion = match self.invoker.invoke(messages, AUDIT_TEMPERATURE).await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Audit backends exhausted");
                return AuditReport::technical_failure();
            }
        };

        let report = match parse_structured::<AuditReport>(&completion.text) {
            ParsedOutput::Structured(mut report) => {
                report.degraded = false;
                report
            }
            ParsedOutput::RawText(text) => AuditReport::from_raw_text(&text),
            ParsedOutput::Malformed(e) => {
                warn!(error = %e, "Audit JSON malformed, keeping raw text");
                AuditReport::from_raw_text(&completion.text)
            }
        };

        info!(
            claim = %investigation.query,
            conflicts = report.conflicts.len(),
            degraded = report.degraded,
            backend = %completion.backend,
            "Audit completed"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::fallback::tests::ScriptedBackend;
    use crate::stages::{EvidenceItem, InvestigationStream, StreamKind};
    use std::sync::Arc;

    fn investigation() -> InvestigationResult {
        InvestigationResult {
            query: "Moon is made of cheese".to_string(),
            timestamp: Utc::now(),
            streams: vec![
                InvestigationStream {
                    kind: StreamKind::Main,
                    query: "Moon is made of cheese".to_string(),
                    items: vec![EvidenceItem {
                        url: "https://nasa.gov/moon".to_string(),
                        title: "Moon".to_string(),
                        content: "The moon is rock".to_string(),
                        relevance: 0.7,
                    }],
                    error: None,
                },
                InvestigationStream {
                    kind: StreamKind::Skeptical,
                    query: "Moon is made of cheese hoax fake facts".to_string(),
                    items: vec![],
                    error: Some("Search API error: 500".to_string()),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_structured_report() {
        let text = r#"{"summary":"Rock","evidence":["rock (main)"],"conflicts":[],"conclusion":"False","audit_note":"1 stream"}"#;
        let backend = Arc::new(ScriptedBackend::ok("a", text));
        let stage = AuditStage::new(ReasoningInvoker::new(vec![backend.clone()]));

        let report = stage.audit(&investigation()).await;

        assert_eq!(report.conclusion, "False");
        assert_eq!(report.evidence, vec!["rock (main)".to_string()]);
        assert!(!report.degraded);

        let requests = backend.requests.lock().unwrap();
        assert!(requests[0].messages[1].content.contains("nasa.gov/moon"));
        assert!(requests[0].messages[1].content.contains("skeptical"));
    }

    #[tokio::test]
    async fn test_report_with_trailing_prose_is_not_degraded() {
        let text = "{\"summary\":\"Rock\",\"conflicts\":[\"age\"],\"conclusion\":\"False\",\"audit_note\":\"ok\"}\nHope this helps.";
        let backend = Arc::new(ScriptedBackend::ok("a", text));
        let report = AuditStage::new(ReasoningInvoker::new(vec![backend]))
            .audit(&investigation())
            .await;

        assert_eq!(report.summary, "Rock");
        assert_eq!(report.conflicts, vec!["age".to_string()]);
        assert!(!report.degraded);
    }

    #[tokio::test]
    async fn test_raw_text_is_wrapped() {
        let backend = Arc::new(ScriptedBackend::ok("a", "The moon is rock, not cheese."));
        let report = AuditStage::new(ReasoningInvoker::new(vec![backend]))
            .audit(&investigation())
            .await;

        assert_eq!(report.summary, "The moon is rock, not cheese.");
        assert_eq!(report.audit_note, "Manual review recommended.");
        assert!(report.degraded);
    }

    #[tokio::test]
    async fn test_malformed_json_is_wrapped() {
        let backend = Arc::new(ScriptedBackend::ok("a", "```json\n{\"summary\": 5}\n```"));
        let report = AuditStage::new(ReasoningInvoker::new(vec![backend]))
            .audit(&investigation())
            .await;

        assert_eq!(report.summary, "{\"summary\": 5}");
        assert!(report.degraded);
    }

    #[tokio::test]
    async fn test_backend_exhaustion_gives_canned_report() {
        let report = AuditStage::new(ReasoningInvoker::new(vec![Arc::new(
            ScriptedBackend::failing("a"),
        )]))
        .audit(&investigation())
        .await;

        assert_eq!(report.summary, "Audit failed due to technical error.");
        assert_eq!(report.conclusion, "INCONCLUSIVE");
        assert!(report.degraded);
    }
}
