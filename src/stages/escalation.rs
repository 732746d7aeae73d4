use std::ops::RangeInclusive;
use tracing::info;

use super::{serialize_for_log, AuditStage, EvidenceAggregator};
use crate::dao::ConsensusEngine;
use crate::error::EscalationError;
use crate::storage::{normalize_id, DaoCase, SqliteStorage, Storage};

/// Trust scores too ambiguous to stand without a community vote.
pub const GRAY_AREA: RangeInclusive<u8> = 40..=60;

/// Whether a score needs community review.
pub fn should_escalate(score: u8) -> bool {
    GRAY_AREA.contains(&score)
}

/// Manual escalation of past claim checks to the DAO.
///
/// Runs a fresh three-stream investigation and deep audit, then opens a case
/// whose snapshot is the audit report.
#[derive(Clone)]
pub struct EscalationService {
    storage: SqliteStorage,
    aggregator: EvidenceAggregator,
    audit: AuditStage,
    engine: ConsensusEngine,
}

impl EscalationService {
    /// Create a service that audits before opening cases.
    pub fn new(
        storage: SqliteStorage,
        aggregator: EvidenceAggregator,
        audit: AuditStage,
        engine: ConsensusEngine,
    ) -> Self {
        Self {
            storage,
            aggregator,
            audit,
            engine,
        }
    }

    /// Escalate a history entry. Each entry can be escalated once.
    pub async fn escalate(&self, history_id: &str) -> Result<DaoCase, EscalationError> {
        let history_id = normalize_id(history_id);

        let entry = self
            .storage
            .get_history(&history_id)
            .await?
            .ok_or_else(|| EscalationError::HistoryNotFound {
                history_id: history_id.clone(),
            })?;

        if entry.is_escalated {
            return Err(EscalationError::AlreadyEscalated { history_id });
        }

        info!(history_id = %history_id, claim = %entry.query, "Starting deep audit for escalation");

        let investigation = self.aggregator.parallel(&entry.query).await;
        let report = self.audit.audit(&investigation).await;

        let case = DaoCase::new(
            &entry.query,
            serialize_for_log(&report, "escalation.audit_report"),
            entry.score,
        );

        // Another escalation may have won while the audit ran.
        match self.engine.open_case(&entry.id, case).await? {
            Some(case) => Ok(case),
            None => Err(EscalationError::AlreadyEscalated { history_id }),
        }
    }
}
