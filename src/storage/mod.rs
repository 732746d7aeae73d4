//! Storage layer for claim history and DAO cases.
//!
//! This module provides SQLite-based storage for fact-check history entries,
//! DAO cases and their votes.

mod sqlite;

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageResult;

/// Days a DAO case stays open for voting.
pub const VOTING_PERIOD_DAYS: i64 = 7;

/// Weight every vote carries.
pub const DEFAULT_STAKE_WEIGHT: u32 = 10;

/// A completed claim check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique entry identifier.
    pub id: String,
    /// The claim as submitted.
    pub query: String,
    /// Analysis stage output.
    pub analysis: serde_json::Value,
    /// Grading stage output.
    pub grading: serde_json::Value,
    /// Trust score (0-100).
    pub score: u8,
    /// Typed pipeline context captured at completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<serde_json::Value>,
    /// When the check completed.
    pub created_at: DateTime<Utc>,
    /// Whether a DAO case was opened for this entry. Only ever goes false to true.
    pub is_escalated: bool,
    /// Live vote tally of the linked DAO case, for escalated entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dao_votes: Option<VoteTally>,
}

/// Lifecycle state of a DAO case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Open for voting.
    #[default]
    Pending,
    /// Verdict reached. Terminal.
    Resolved,
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseStatus::Pending => write!(f, "pending"),
            CaseStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl std::str::FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(CaseStatus::Pending),
            "resolved" => Ok(CaseStatus::Resolved),
            _ => Err(format!("Unknown case status: {}", s)),
        }
    }
}

/// A voter's verdict on a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    /// The claim is true.
    True,
    /// The claim is false.
    False,
}

impl std::fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteChoice::True => write!(f, "true"),
            VoteChoice::False => write!(f, "false"),
        }
    }
}

impl std::str::FromStr for VoteChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "true" => Ok(VoteChoice::True),
            "false" => Ok(VoteChoice::False),
            _ => Err(format!("Unknown vote choice: {}", s)),
        }
    }
}

/// One community vote on a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    /// Voter identity, unique per case.
    pub voter_id: String,
    /// Verdict chosen.
    pub choice: VoteChoice,
    /// Free-text justification, possibly empty.
    pub reasoning: String,
    /// When the vote was cast.
    pub timestamp: DateTime<Utc>,
    /// Informational stake; every vote counts once.
    pub stake_weight: u32,
}

impl Vote {
    /// Create a vote cast now with the default stake.
    pub fn new(voter_id: impl Into<String>, choice: VoteChoice, reasoning: impl Into<String>) -> Self {
        Self {
            voter_id: voter_id.into(),
            choice,
            reasoning: reasoning.into(),
            timestamp: Utc::now(),
            stake_weight: DEFAULT_STAKE_WEIGHT,
        }
    }
}

/// Vote counts per choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    /// Votes for `true`.
    pub true_votes: u32,
    /// Votes for `false`.
    pub false_votes: u32,
}

impl VoteTally {
    /// Votes cast.
    pub fn total(&self) -> u32 {
        self.true_votes + self.false_votes
    }
}

/// Outcome recorded when a case is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Choice with strictly more votes; ties go to `false`.
    pub final_verdict: VoteChoice,
    /// Share of the winning choice, 0..=100.
    pub consensus_score: u8,
    /// When the case closed.
    pub resolved_at: DateTime<Utc>,
}

/// A claim escalated to community voting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaoCase {
    /// Unique case identifier.
    pub id: String,
    /// History entry the case was opened from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
    /// The claim under vote.
    pub query: String,
    /// Analysis or audit report shown to voters.
    pub analysis: serde_json::Value,
    /// Automated trust score at escalation time.
    pub initial_score: u8,
    /// Lifecycle state.
    pub status: CaseStatus,
    /// Votes in the order they were cast.
    pub votes: Vec<Vote>,
    /// When the case opened.
    pub created_at: DateTime<Utc>,
    /// Seven days after opening.
    pub voting_deadline: DateTime<Utc>,
    /// External ledger reference, informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chain_id: Option<String>,
    /// Set on resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_verdict: Option<VoteChoice>,
    /// Set on resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consensus_score: Option<u8>,
    /// Set on resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Result of a conditional vote append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAppend {
    /// Vote stored.
    Appended {
        /// Votes on the case after the append.
        vote_count: u32,
    },
    /// The voter already has a vote on this case.
    Duplicate,
    /// The case is no longer pending.
    CaseResolved,
    /// No case with that id.
    CaseMissing,
}

impl HistoryEntry {
    /// Create a new, unescalated history entry
    pub fn new(
        query: impl Into<String>,
        analysis: serde_json::Value,
        grading: serde_json::Value,
        score: u8,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query: query.into(),
            analysis,
            grading,
            score: score.min(100),
            snapshot: None,
            created_at: Utc::now(),
            is_escalated: false,
            dao_votes: None,
        }
    }

    /// Attach the pipeline snapshot
    pub fn with_snapshot(mut self, snapshot: serde_json::Value) -> Self {
        self.snapshot = Some(snapshot);
        self
    }
}

impl DaoCase {
    /// Create a pending case whose voting window starts now
    pub fn new(query: impl Into<String>, analysis: serde_json::Value, initial_score: u8) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            history_id: None,
            query: query.into(),
            analysis,
            initial_score: initial_score.min(100),
            status: CaseStatus::Pending,
            votes: Vec::new(),
            created_at: now,
            voting_deadline: now + Duration::days(VOTING_PERIOD_DAYS),
            on_chain_id: None,
            final_verdict: None,
            consensus_score: None,
            resolved_at: None,
        }
    }

    /// Link the case to the history entry it escalates
    pub fn with_history(mut self, history_id: impl Into<String>) -> Self {
        self.history_id = Some(history_id.into());
        self
    }

    /// Count votes per choice.
    pub fn tally(&self) -> VoteTally {
        self.votes.iter().fold(VoteTally::default(), |mut t, v| {
            match v.choice {
                VoteChoice::True => t.true_votes += 1,
                VoteChoice::False => t.false_votes += 1,
            }
            t
        })
    }

    /// Whether `voter_id` already voted on this case.
    pub fn has_voted(&self, voter_id: &str) -> bool {
        self.votes.iter().any(|v| v.voter_id == voter_id)
    }
}

/// Canonical form of an entity id for lookups.
///
/// UUIDs in any accepted textual form (upper-case, simple, braced, URN)
/// become lower-case hyphenated; anything else is trimmed and kept verbatim.
pub fn normalize_id(raw: &str) -> String {
    let trimmed = raw.trim();
    Uuid::parse_str(trimmed)
        .map(|id| id.hyphenated().to_string())
        .unwrap_or_else(|_| trimmed.to_string())
}

/// Storage trait for database operations.
///
/// Implementations take ids as given; callers normalize them with
/// [`normalize_id`] first.
#[async_trait]
pub trait Storage: Send + Sync {
    // History operations

    /// Persist a new history entry.
    async fn insert_history(&self, entry: &HistoryEntry) -> StorageResult<()>;
    /// Get a history entry by ID, with its vote tally when escalated.
    async fn get_history(&self, id: &str) -> StorageResult<Option<HistoryEntry>>;
    /// Most recent entries first, at most `limit`.
    async fn list_history(&self, limit: u32) -> StorageResult<Vec<HistoryEntry>>;

    // Escalation

    /// Mark an entry escalated and open `case` for it in one transaction.
    ///
    /// Returns `false` without writing anything if the entry is missing or
    /// already escalated.
    async fn escalate_history(&self, history_id: &str, case: &DaoCase) -> StorageResult<bool>;

    // DAO case operations

    /// Get a case by ID with its votes.
    async fn get_case(&self, id: &str) -> StorageResult<Option<DaoCase>>;
    /// Cases in the given state, oldest first, with their votes.
    async fn list_cases_by_status(&self, status: CaseStatus) -> StorageResult<Vec<DaoCase>>;
    /// Append a vote if the case is pending and the voter has not voted yet.
    async fn append_vote(&self, case_id: &str, vote: &Vote) -> StorageResult<VoteAppend>;
    /// Resolve a pending case. Returns `false` if it was not pending.
    async fn resolve_case(&self, case_id: &str, resolution: &Resolution) -> StorageResult<bool>;
    /// Record the external ledger id. Returns `false` if the case is missing.
    async fn set_on_chain_id(&self, case_id: &str, on_chain_id: &str) -> StorageResult<bool>;
}
