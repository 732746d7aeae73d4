use async_trait::async_trait;

use crate::error::AppResult;
use crate::storage::{DaoCase, Resolution, Vote};

/// Optional external record of case lifecycle events.
///
/// Storage stays the source of truth. Mirror failures are logged by the
/// engine and never affect the outcome of the operation that raised them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerMirror: Send + Sync {
    /// A case was opened for voting.
    async fn case_created(&self, case: &DaoCase) -> AppResult<()>;

    /// A vote was accepted.
    async fn vote_cast(&self, case_id: &str, vote: &Vote) -> AppResult<()>;

    /// A case reached its verdict.
    async fn case_resolved(&self, case_id: &str, resolution: &Resolution) -> AppResult<()>;
}
