use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, info_span, Instrument};

use super::{
    serialize_for_log, should_escalate, Analysis, AnalysisStage, EvidenceAggregator,
    EvidenceOutcome, GradingRecord, GradingStage,
};
use crate::dao::ConsensusEngine;
use crate::error::{AppResult, ToolError};
use crate::storage::{DaoCase, HistoryEntry, SqliteStorage, Storage};

/// Message shown when a claim is sent to community voting.
pub const GRAY_AREA_MESSAGE: &str =
    "This claim falls in a gray area. Community voting has been initiated.";

/// Everything the pipeline learned about one claim, stage by stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    /// Claim as submitted.
    pub claim: String,
    /// When the check began.
    pub started_at: DateTime<Utc>,
    /// Focused retrieval outcome.
    pub evidence: EvidenceOutcome,
    /// Analysis stage output.
    pub analysis: Analysis,
    /// Grading stage output.
    pub grading: GradingRecord,
    /// When grading finished.
    pub completed_at: DateTime<Utc>,
}

/// Pointer to the DAO case opened for a gray-area claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseNotice {
    /// Opened case.
    pub case_id: String,
    /// Text shown to the caller.
    pub message: String,
    /// End of the voting window.
    pub voting_deadline: DateTime<Utc>,
}

/// Result of checking one claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimVerdict {
    /// Persisted history entry.
    pub history_id: String,
    /// Analysis stage output.
    pub analysis: Analysis,
    /// Trust score.
    pub grading: GradingRecord,
    /// Present when the score fell in the gray area.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dao_case: Option<CaseNotice>,
}

/// Runs a claim through evidence, analysis and grading, then persists it.
#[derive(Clone)]
pub struct ClaimPipeline {
    aggregator: EvidenceAggregator,
    analysis: AnalysisStage,
    grading: GradingStage,
    storage: SqliteStorage,
    engine: ConsensusEngine,
}

impl ClaimPipeline {
    /// Assemble a pipeline from its stages.
    pub fn new(
        aggregator: EvidenceAggregator,
        analysis: AnalysisStage,
        grading: GradingStage,
        storage: SqliteStorage,
        engine: ConsensusEngine,
    ) -> Self {
        Self {
            aggregator,
            analysis,
            grading,
            storage,
            engine,
        }
    }

    /// Check a claim end to end.
    ///
    /// Stages run one after another. Only backend exhaustion during analysis
    /// aborts the check; every other stage condition is carried in the result.
    pub async fn check_claim(&self, claim: &str) -> AppResult<ClaimVerdict> {
        let claim = claim.trim();
        if claim.is_empty() {
            return Err(ToolError::Validation {
                field: "claim".to_string(),
                reason: "Claim cannot be empty".to_string(),
            }
            .into());
        }

        self.run(claim)
            .instrument(info_span!("check_claim", claim = %claim))
            .await
    }

    async fn run(&self, claim: &str) -> AppResult<ClaimVerdict> {
        let start = Instant::now();
        let started_at = Utc::now();

        let evidence = self.aggregator.focused(claim).await;
        let analysis = self.analysis.analyze(claim, &evidence).await?;
        let grading = self.grading.grade(claim, &analysis).await;

        let snapshot = PipelineSnapshot {
            claim: claim.to_string(),
            started_at,
            evidence,
            analysis,
            grading,
            completed_at: Utc::now(),
        };

        let entry = HistoryEntry::new(
            claim,
            serialize_for_log(&snapshot.analysis, "pipeline.analysis"),
            serialize_for_log(&snapshot.grading, "pipeline.grading"),
            snapshot.grading.score,
        )
        .with_snapshot(serialize_for_log(&snapshot, "pipeline.snapshot"));
        self.storage.insert_history(&entry).await?;

        let dao_case = if should_escalate(snapshot.grading.score) {
            let case = DaoCase::new(claim, entry.analysis.clone(), snapshot.grading.score);
            self.engine
                .open_case(&entry.id, case)
                .await?
                .map(|case| CaseNotice {
                    case_id: case.id,
                    message: GRAY_AREA_MESSAGE.to_string(),
                    voting_deadline: case.voting_deadline,
                })
        } else {
            None
        };

        info!(
            history_id = %entry.id,
            score = snapshot.grading.score,
            tier = snapshot.grading.tier.as_str(),
            escalated = dao_case.is_some(),
            latency_ms = start.elapsed().as_millis(),
            "Claim check completed"
        );

        Ok(ClaimVerdict {
            history_id: entry.id,
            analysis: snapshot.analysis,
            grading: snapshot.grading,
            dao_case,
        })
    }
}
