use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    CaseStatus, DaoCase, HistoryEntry, Resolution, Storage, Vote, VoteAppend, VoteChoice,
    VoteTally,
};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const HISTORY_COLUMNS: &str = r#"
    h.id, h.query, h.analysis, h.grading, h.score, h.snapshot, h.created_at, h.is_escalated,
    (SELECT COUNT(*) FROM dao_votes v JOIN dao_cases c ON c.id = v.case_id
        WHERE c.history_id = h.id AND v.choice = 'true') AS true_votes,
    (SELECT COUNT(*) FROM dao_votes v JOIN dao_cases c ON c.id = v.case_id
        WHERE c.history_id = h.id AND v.choice = 'false') AS false_votes
"#;

const CASE_COLUMNS: &str = r#"
    id, history_id, query, analysis, initial_score, status, created_at, voting_deadline,
    on_chain_id, final_verdict, consensus_score, resolved_at
"#;

/// SQLite-backed storage implementation
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        if config.path.as_os_str() == ":memory:" {
            return Self::new_in_memory().await;
        }

        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Create an ephemeral in-memory database.
    ///
    /// The pool holds a single connection that is never recycled, since the
    /// database lives only as long as that connection.
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn case_votes(&self, case_id: &str) -> StorageResult<Vec<Vote>> {
        let rows: Vec<VoteRow> = sqlx::query_as(
            r#"
            SELECT voter_id, choice, reasoning, stake_weight, created_at
            FROM dao_votes
            WHERE case_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Vote::from).collect())
    }

    async fn with_votes(&self, row: CaseRow) -> StorageResult<DaoCase> {
        let mut case = DaoCase::from(row);
        case.votes = self.case_votes(&case.id).await?;
        Ok(case)
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn insert_history(&self, entry: &HistoryEntry) -> StorageResult<()> {
        let snapshot = entry
            .snapshot
            .as_ref()
            .map(|s| serde_json::to_string(s).unwrap_or_default());

        sqlx::query(
            r#"
            INSERT INTO history (id, query, analysis, grading, score, snapshot, created_at, is_escalated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.query)
        .bind(serde_json::to_string(&entry.analysis).unwrap_or_default())
        .bind(serde_json::to_string(&entry.grading).unwrap_or_default())
        .bind(i64::from(entry.score))
        .bind(&snapshot)
        .bind(entry.created_at.to_rfc3339())
        .bind(entry.is_escalated)
        .execute(&self.pool)
        .await?;

        debug!(history_id = %entry.id, score = entry.score, "History entry stored");
        Ok(())
    }

    async fn get_history(&self, id: &str) -> StorageResult<Option<HistoryEntry>> {
        let row: Option<HistoryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM history h WHERE h.id = ?",
            HISTORY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_history(&self, limit: u32) -> StorageResult<Vec<HistoryEntry>> {
        let rows: Vec<HistoryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM history h ORDER BY h.created_at DESC, h.rowid DESC LIMIT ?",
            HISTORY_COLUMNS
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn escalate_history(&self, history_id: &str, case: &DaoCase) -> StorageResult<bool> {
        let mut tx = self.pool.begin().await?;

        let flagged = sqlx::query(
            "UPDATE history SET is_escalated = 1 WHERE id = ? AND is_escalated = 0",
        )
        .bind(history_id)
        .execute(&mut *tx)
        .await?;

        if flagged.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO dao_cases (id, history_id, query, analysis, initial_score, status, created_at, voting_deadline)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&case.id)
        .bind(history_id)
        .bind(&case.query)
        .bind(serde_json::to_string(&case.analysis).unwrap_or_default())
        .bind(i64::from(case.initial_score))
        .bind(case.status.to_string())
        .bind(case.created_at.to_rfc3339())
        .bind(case.voting_deadline.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(history_id = %history_id, case_id = %case.id, "History entry escalated");
        Ok(true)
    }

    async fn get_case(&self, id: &str) -> StorageResult<Option<DaoCase>> {
        let row: Option<CaseRow> = sqlx::query_as(&format!(
            "SELECT {} FROM dao_cases WHERE id = ?",
            CASE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(self.with_votes(r).await?)),
            None => Ok(None),
        }
    }

    async fn list_cases_by_status(&self, status: CaseStatus) -> StorageResult<Vec<DaoCase>> {
        let rows: Vec<CaseRow> = sqlx::query_as(&format!(
            "SELECT {} FROM dao_cases WHERE status = ? ORDER BY created_at ASC, rowid ASC",
            CASE_COLUMNS
        ))
        .bind(status.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut cases = Vec::with_capacity(rows.len());
        for row in rows {
            cases.push(self.with_votes(row).await?);
        }
        Ok(cases)
    }

    async fn append_vote(&self, case_id: &str, vote: &Vote) -> StorageResult<VoteAppend> {
        let mut tx = self.pool.begin().await?;

        // Inserts only while the case is pending; the unique key drops repeats.
        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO dao_votes (case_id, voter_id, choice, reasoning, stake_weight, created_at)
            SELECT ?, ?, ?, ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM dao_cases WHERE id = ? AND status = 'pending')
            "#,
        )
        .bind(case_id)
        .bind(&vote.voter_id)
        .bind(vote.choice.to_string())
        .bind(&vote.reasoning)
        .bind(i64::from(vote.stake_weight))
        .bind(vote.timestamp.to_rfc3339())
        .bind(case_id)
        .execute(&mut *tx)
        .await?;

        let outcome = if inserted.rows_affected() == 1 {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM dao_votes WHERE case_id = ?")
                .bind(case_id)
                .fetch_one(&mut *tx)
                .await?;
            VoteAppend::Appended {
                vote_count: u32::try_from(count).unwrap_or(u32::MAX),
            }
        } else {
            let status: Option<String> =
                sqlx::query_scalar("SELECT status FROM dao_cases WHERE id = ?")
                    .bind(case_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            match status.as_deref().map(CaseStatus::from_str) {
                None => VoteAppend::CaseMissing,
                Some(Ok(CaseStatus::Pending)) => VoteAppend::Duplicate,
                Some(_) => VoteAppend::CaseResolved,
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn resolve_case(&self, case_id: &str, resolution: &Resolution) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE dao_cases
            SET status = 'resolved', final_verdict = ?, consensus_score = ?, resolved_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(resolution.final_verdict.to_string())
        .bind(i64::from(resolution.consensus_score))
        .bind(resolution.resolved_at.to_rfc3339())
        .bind(case_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_on_chain_id(&self, case_id: &str, on_chain_id: &str) -> StorageResult<bool> {
        let result = sqlx::query("UPDATE dao_cases SET on_chain_id = ? WHERE id = ?")
            .bind(on_chain_id)
            .bind(case_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

// Internal row types for SQLx mapping

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!(value = %raw, error = %e, "Unparseable timestamp in database");
            Utc::now()
        })
}

fn parse_json(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

fn score_from_db(raw: i64) -> u8 {
    raw.clamp(0, 100) as u8
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: String,
    query: String,
    analysis: String,
    grading: String,
    score: i64,
    snapshot: Option<String>,
    created_at: String,
    is_escalated: bool,
    true_votes: i64,
    false_votes: i64,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        let dao_votes = row.is_escalated.then(|| VoteTally {
            true_votes: u32::try_from(row.true_votes).unwrap_or(0),
            false_votes: u32::try_from(row.false_votes).unwrap_or(0),
        });

        Self {
            id: row.id,
            query: row.query,
            analysis: parse_json(&row.analysis),
            grading: parse_json(&row.grading),
            score: score_from_db(row.score),
            snapshot: row.snapshot.as_deref().map(parse_json),
            created_at: parse_timestamp(&row.created_at),
            is_escalated: row.is_escalated,
            dao_votes,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CaseRow {
    id: String,
    history_id: Option<String>,
    query: String,
    analysis: String,
    initial_score: i64,
    status: String,
    created_at: String,
    voting_deadline: String,
    on_chain_id: Option<String>,
    final_verdict: Option<String>,
    consensus_score: Option<i64>,
    resolved_at: Option<String>,
}

impl From<CaseRow> for DaoCase {
    fn from(row: CaseRow) -> Self {
        Self {
            id: row.id,
            history_id: row.history_id,
            query: row.query,
            analysis: parse_json(&row.analysis),
            initial_score: score_from_db(row.initial_score),
            status: row.status.parse().unwrap_or_default(),
            votes: Vec::new(),
            created_at: parse_timestamp(&row.created_at),
            voting_deadline: parse_timestamp(&row.voting_deadline),
            on_chain_id: row.on_chain_id,
            final_verdict: row.final_verdict.and_then(|v| v.parse().ok()),
            consensus_score: row.consensus_score.map(score_from_db),
            resolved_at: row.resolved_at.as_deref().map(parse_timestamp),
        }
    }
}

#[derive(sqlx::FromRow)]
struct VoteRow {
    voter_id: String,
    choice: String,
    reasoning: String,
    stake_weight: i64,
    created_at: String,
}

impl From<VoteRow> for Vote {
    fn from(row: VoteRow) -> Self {
        Self {
            voter_id: row.voter_id,
            choice: row.choice.parse().unwrap_or(VoteChoice::False),
            reasoning: row.reasoning,
            timestamp: parse_timestamp(&row.created_at),
            stake_weight: u32::try_from(row.stake_weight).unwrap_or_default(),
        }
    }
}
