//! Trust scoring of analyses.
//!
//! Backend output is parsed in tiers so grading never fails: a greedy JSON
//! span, then the leading JSON value after fence stripping, then the first
//! standalone two- or three-digit number, and finally a zero score.

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{info, warn};

use super::{brace_span, leading_json, Analysis, ReasoningInvoker};
use crate::langbase::Message;
use crate::prompts::{render, GRADER_PROMPT};

const GRADING_TEMPERATURE: f64 = 0.0;

static SCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2,3}\b").expect("valid score regex"));

/// Which parse tier produced a grading record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeTier {
    /// Greedy brace span parsed.
    Json,
    /// Leading JSON value after fence stripping.
    Fenced,
    /// First standalone two- or three-digit number.
    Regex,
    /// Nothing usable; score 0.
    Ungradable,
    /// No backend answered; score 0.
    BackendFailed,
}

impl GradeTier {
    /// Wire name of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeTier::Json => "json",
            GradeTier::Fenced => "fenced",
            GradeTier::Regex => "regex",
            GradeTier::Ungradable => "ungradable",
            GradeTier::BackendFailed => "backend_failed",
        }
    }
}

/// Trust score of an analysis, always within 0..=100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingRecord {
    /// Trust score, 0..=100.
    pub score: u8,
    /// Grader explanation.
    pub reasoning: String,
    /// Parse tier that produced the score.
    pub tier: GradeTier,
}

/// Scores analyses with the grading rubric.
#[derive(Clone)]
pub struct GradingStage {
    invoker: ReasoningInvoker,
}

impl GradingStage {
    /// Create a grading stage over `invoker`.
    pub fn new(invoker: ReasoningInvoker) -> Self {
        Self { invoker }
    }

    /// Grade an analysis. Never fails; backend exhaustion scores 0.
    pub async fn grade(&self, claim: &str, analysis: &Analysis) -> GradingRecord {
        let date = Utc::now().format("%a %b %d %Y").to_string();
        let messages = vec![
            Message::system(render(GRADER_PROMPT, &date, claim)),
            Message::user(format!("Grade this analysis: {}", analysis.raw_text)),
        ];

        let completion = match self.invoker.invoke(messages, GRADING_TEMPERATURE).await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Grading backends exhausted, scoring 0");
                return GradingRecord {
                    score: 0,
                    reasoning: format!("Error in grading: {}", e),
                    tier: GradeTier::BackendFailed,
                };
            }
        };

        let record = parse_grading(&completion.text);

        if !matches!(record.tier, GradeTier::Json) {
            warn!(
                tier = record.tier.as_str(),
                raw = %completion.text.chars().take(200).collect::<String>(),
                "Grader output needed a fallback parse"
            );
        }
        info!(
            score = record.score,
            tier = record.tier.as_str(),
            backend = %completion.backend,
            "Grading completed"
        );

        record
    }
}

/// Parse grader output into a record, trying each tier in order.
pub fn parse_grading(text: &str) -> GradingRecord {
    if let Some((score, reasoning)) = brace_span(text)
        .and_then(|span| serde_json::from_str::<Value>(span).ok())
        .and_then(|v| grading_fields(&v))
    {
        return GradingRecord {
            score,
            reasoning,
            tier: GradeTier::Json,
        };
    }

    let stripped = text.replace("```json", "").replace("```", "");
    if let Some((score, reasoning)) = leading_json::<Value>(stripped.trim())
        .as_ref()
        .and_then(grading_fields)
    {
        return GradingRecord {
            score,
            reasoning,
            tier: GradeTier::Fenced,
        };
    }

    if let Some(score) = SCORE_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
    {
        return GradingRecord {
            score: clamp_score(score),
            reasoning: "Parsed score from raw text.".to_string(),
            tier: GradeTier::Regex,
        };
    }

    GradingRecord {
        score: 0,
        reasoning: format!(
            "Ungradable: {}",
            text.chars().take(100).collect::<String>()
        ),
        tier: GradeTier::Ungradable,
    }
}

/// Score and reasoning from a grading object. A score is required.
fn grading_fields(value: &Value) -> Option<(u8, String)> {
    let score = match value.get("score")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    let reasoning = value
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some((clamp_score(score), reasoning))
}

/// Round and clamp to 0..=100.
pub fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::fallback::tests::ScriptedBackend;
    use crate::stages::{AnalysisRecord, ParsedOutput};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_clean_json_uses_json_tier() {
        assert_eq!(
            parse_grading(r#"{"score":72,"reasoning":"x"}"#),
            GradingRecord {
                score: 72,
                reasoning: "x".to_string(),
                tier: GradeTier::Json,
            }
        );
    }

    #[test]
    fn test_json_inside_prose_and_fence() {
        let record = parse_grading("Sure!\n```json\n{\"score\": 55, \"reasoning\": \"mixed\"}\n```");
        assert_eq!(record.score, 55);
        assert_eq!(record.tier, GradeTier::Json);
    }

    #[test]
    fn test_trailing_object_falls_to_fenced_tier() {
        // The greedy span covers both objects and fails to parse.
        let record = parse_grading("```json\n{\"score\": 88, \"reasoning\": \"ok\"}\n``` note: {see above}");
        assert_eq!(record.score, 88);
        assert_eq!(record.reasoning, "ok");
        assert_eq!(record.tier, GradeTier::Fenced);
    }

    #[test]
    fn test_regex_tier() {
        let record = parse_grading("I would give this a score of 45 out of 100");
        assert_eq!(record.score, 45);
        assert_eq!(record.reasoning, "Parsed score from raw text.");
        assert_eq!(record.tier, GradeTier::Regex);
    }

    #[test]
    fn test_regex_tier_skips_digits_inside_years() {
        let record = parse_grading("As of 2026, roughly 45 seems fair");
        assert_eq!(record.score, 45);
        assert_eq!(record.tier, GradeTier::Regex);

        assert_eq!(parse_grading("year 2026 only").tier, GradeTier::Ungradable);
    }

    #[test]
    fn test_ungradable_tier() {
        let record = parse_grading("no idea");
        assert_eq!(record.score, 0);
        assert!(record.reasoning.starts_with("Ungradable"));
        assert_eq!(record.tier, GradeTier::Ungradable);
    }

    #[test]
    fn test_scores_are_clamped() {
        assert_eq!(parse_grading(r#"{"score": 150}"#).score, 100);
        assert_eq!(parse_grading(r#"{"score": -20}"#).score, 0);
        assert_eq!(parse_grading(r#"{"score": 72.6}"#).score, 73);
        assert_eq!(parse_grading(r#"{"score": "64"}"#).score, 64);
        assert_eq!(parse_grading("score 999").score, 100);
    }

    #[test]
    fn test_missing_score_is_not_a_grading_object() {
        let record = parse_grading(r#"{"reasoning": "no score given"}"#);
        assert_eq!(record.tier, GradeTier::Ungradable);
    }

    #[test]
    fn test_missing_reasoning_defaults_empty() {
        let record = parse_grading(r#"{"score": 90}"#);
        assert_eq!(record.reasoning, "");
    }

    #[test]
    fn test_clamp_score_bounds() {
        assert_eq!(clamp_score(f64::NAN), 0);
        assert_eq!(clamp_score(f64::INFINITY), 100);
        assert_eq!(clamp_score(-0.4), 0);
        assert_eq!(clamp_score(59.5), 60);
    }

    fn analysis() -> Analysis {
        Analysis {
            raw_text: "Conclusion: Misleading".to_string(),
            record: ParsedOutput::Structured(AnalysisRecord::insufficient_data("x")),
        }
    }

    #[tokio::test]
    async fn test_grade_uses_zero_temperature() {
        let backend = Arc::new(ScriptedBackend::ok("a", r#"{"score":50,"reasoning":"unclear"}"#));
        let stage = GradingStage::new(ReasoningInvoker::new(vec![backend.clone()]));

        let record = stage.grade("claim", &analysis()).await;

        assert_eq!(record.score, 50);
        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests[0].temperature, 0.0);
        assert!(requests[0].messages[1].content.contains("Conclusion: Misleading"));
    }

    #[tokio::test]
    async fn test_grade_backend_failure_scores_zero() {
        let stage = GradingStage::new(ReasoningInvoker::new(vec![Arc::new(
            ScriptedBackend::failing("a"),
        )]));

        let record = stage.grade("claim", &analysis()).await;
        assert_eq!(record.score, 0);
        assert_eq!(record.tier, GradeTier::BackendFailed);
    }
}
