use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::{decide, CaseLocks, LedgerMirror, RESOLUTION_THRESHOLD};
use crate::error::{ConsensusError, StorageError};
use crate::storage::{
    normalize_id, CaseStatus, DaoCase, Resolution, SqliteStorage, Storage, Vote, VoteAppend,
    VoteChoice,
};

/// Outcome of an accepted vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteReceipt {
    /// Canonical id of the case voted on.
    pub case_id: String,
    /// Votes on the case after this one.
    pub vote_count: u32,
    /// Set when this vote completed the case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

/// Runs the DAO case lifecycle: opening, voting, resolution.
#[derive(Clone)]
pub struct ConsensusEngine {
    storage: SqliteStorage,
    locks: CaseLocks,
    ledger: Option<Arc<dyn LedgerMirror>>,
}

impl ConsensusEngine {
    /// Create an engine with no ledger mirror.
    pub fn new(storage: SqliteStorage) -> Self {
        Self {
            storage,
            locks: CaseLocks::new(),
            ledger: None,
        }
    }

    /// Mirror lifecycle events to an external ledger.
    pub fn with_ledger(mut self, ledger: Arc<dyn LedgerMirror>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Open `case` for history entry `history_id`.
    ///
    /// Returns `None` if the entry is missing or already escalated; in that
    /// case nothing is written.
    pub async fn open_case(
        &self,
        history_id: &str,
        case: DaoCase,
    ) -> Result<Option<DaoCase>, StorageError> {
        let case = case.with_history(history_id);
        if !self.storage.escalate_history(history_id, &case).await? {
            return Ok(None);
        }

        info!(
            case_id = %case.id,
            history_id = %history_id,
            initial_score = case.initial_score,
            voting_deadline = %case.voting_deadline,
            "DAO case opened"
        );

        if let Some(ledger) = &self.ledger {
            if let Err(e) = ledger.case_created(&case).await {
                warn!(case_id = %case.id, error = %e, "Ledger mirror failed on case creation");
            }
        }

        Ok(Some(case))
    }

    /// Record a vote, resolving the case when it reaches the threshold.
    pub async fn submit_vote(
        &self,
        case_id: &str,
        voter_id: &str,
        choice: VoteChoice,
        reasoning: &str,
    ) -> Result<VoteReceipt, ConsensusError> {
        let case_id = normalize_id(case_id);
        let voter_id = voter_id.trim();
        if voter_id.is_empty() {
            return Err(ConsensusError::InvalidVoter);
        }
        let _guard = self.locks.lock(&case_id).await;

        let vote = Vote::new(voter_id, choice, reasoning);
        let vote_count = match self.storage.append_vote(&case_id, &vote).await? {
            VoteAppend::Appended { vote_count } => vote_count,
            VoteAppend::CaseMissing => return Err(ConsensusError::CaseNotFound { case_id }),
            VoteAppend::CaseResolved => {
                return Err(ConsensusError::CaseAlreadyResolved { case_id })
            }
            VoteAppend::Duplicate => {
                return Err(ConsensusError::DuplicateVote {
                    case_id,
                    voter_id: voter_id.to_string(),
                })
            }
        };

        info!(
            case_id = %case_id,
            voter_id = %voter_id,
            choice = %choice,
            vote_count,
            "Vote recorded"
        );

        if let Some(ledger) = &self.ledger {
            if let Err(e) = ledger.vote_cast(&case_id, &vote).await {
                warn!(case_id = %case_id, error = %e, "Ledger mirror failed on vote");
            }
        }

        let resolution = if vote_count >= RESOLUTION_THRESHOLD {
            Some(self.resolve_locked(&case_id).await?)
        } else {
            None
        };

        Ok(VoteReceipt {
            case_id,
            vote_count,
            resolution,
        })
    }

    /// Resolve a pending case from its current votes.
    pub async fn resolve_case(&self, case_id: &str) -> Result<Resolution, ConsensusError> {
        let case_id = normalize_id(case_id);
        let _guard = self.locks.lock(&case_id).await;
        self.resolve_locked(&case_id).await
    }

    /// Caller must hold the case lock.
    async fn resolve_locked(&self, case_id: &str) -> Result<Resolution, ConsensusError> {
        let case = self
            .storage
            .get_case(case_id)
            .await?
            .ok_or_else(|| ConsensusError::CaseNotFound {
                case_id: case_id.to_string(),
            })?;

        if case.status == CaseStatus::Resolved {
            return Err(ConsensusError::CaseAlreadyResolved {
                case_id: case_id.to_string(),
            });
        }

        let tally = case.tally();
        let (final_verdict, consensus_score) = decide(tally);
        let resolution = Resolution {
            final_verdict,
            consensus_score,
            resolved_at: Utc::now(),
        };

        if !self.storage.resolve_case(case_id, &resolution).await? {
            return Err(ConsensusError::CaseAlreadyResolved {
                case_id: case_id.to_string(),
            });
        }

        info!(
            case_id = %case_id,
            verdict = %final_verdict,
            consensus_score,
            true_votes = tally.true_votes,
            false_votes = tally.false_votes,
            "DAO case resolved"
        );

        if let Some(ledger) = &self.ledger {
            if let Err(e) = ledger.case_resolved(case_id, &resolution).await {
                warn!(case_id = %case_id, error = %e, "Ledger mirror failed on resolution");
            }
        }

        Ok(resolution)
    }

    /// Record the external ledger id of a case.
    pub async fn attach_on_chain_id(
        &self,
        case_id: &str,
        on_chain_id: &str,
    ) -> Result<(), ConsensusError> {
        let case_id = normalize_id(case_id);
        let _guard = self.locks.lock(&case_id).await;

        if !self.storage.set_on_chain_id(&case_id, on_chain_id.trim()).await? {
            return Err(ConsensusError::CaseNotFound { case_id });
        }

        info!(case_id = %case_id, on_chain_id = %on_chain_id, "On-chain id attached");
        Ok(())
    }

    /// Cases still open for voting, oldest first.
    pub async fn list_pending(&self) -> Result<Vec<DaoCase>, ConsensusError> {
        Ok(self
            .storage
            .list_cases_by_status(CaseStatus::Pending)
            .await?)
    }

    /// Get a case with its votes.
    pub async fn get_case(&self, case_id: &str) -> Result<DaoCase, ConsensusError> {
        let case_id = normalize_id(case_id);
        self.storage
            .get_case(&case_id)
            .await?
            .ok_or(ConsensusError::CaseNotFound { case_id })
    }
}
