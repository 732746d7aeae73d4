use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::SharedState;
use crate::error::{ConsensusError, McpError, McpResult};
use crate::storage::{normalize_id, Storage, VoteChoice};

/// Entries returned by `factcheck_history_list` when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<Value> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        // Fact-check tools
        "factcheck_check_claim" => handle_check_claim(state, arguments).await,
        "factcheck_history_list" => handle_history_list(state, arguments).await,
        "factcheck_history_get" => handle_history_get(state, arguments).await,
        // DAO tools
        "dao_escalate" => handle_escalate(state, arguments).await,
        "dao_cases_pending" => handle_cases_pending(state).await,
        "dao_case_get" => handle_case_get(state, arguments).await,
        "dao_case_attach_chain_id" => handle_case_attach_chain_id(state, arguments).await,
        "dao_vote" => handle_vote(state, arguments).await,
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

// ============================================================================
// Parameter types
// ============================================================================

/// Arguments for `factcheck_check_claim`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckClaimParams {
    /// Claim text to check.
    pub claim: String,
}

/// Arguments for `factcheck_history_list`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HistoryListParams {
    /// Entries to return, newest first.
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Arguments for `factcheck_history_get`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryGetParams {
    /// History entry id, in any UUID form.
    pub id: String,
}

/// Arguments for `dao_escalate`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EscalateParams {
    /// History entry to escalate.
    pub history_id: String,
}

/// Arguments for `dao_case_get`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaseGetParams {
    /// DAO case id.
    pub case_id: String,
}

/// Arguments for `dao_case_attach_chain_id`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttachChainIdParams {
    /// DAO case id.
    pub case_id: String,
    /// Identifier of the case on an external ledger.
    pub on_chain_id: String,
}

/// Arguments for `dao_vote`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VoteParams {
    /// DAO case id.
    pub case_id: String,
    /// Voter identity, usually a wallet address.
    pub voter_id: String,
    /// `"true"` or `"false"`.
    pub choice: String,
    /// Optional free-text justification.
    #[serde(default)]
    pub reasoning: Option<String>,
}

// ============================================================================
// Fact-check handlers
// ============================================================================

async fn handle_check_claim(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("factcheck_check_claim", arguments, |params: CheckClaimParams| async move {
        state.pipeline.check_claim(&params.claim).await
    })
    .await
}

async fn handle_history_list(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    // Every argument is optional, so a bare call is fine.
    let params: HistoryListParams = match arguments {
        Some(args) => parse_arguments("factcheck_history_list", Some(args))?,
        None => HistoryListParams::default(),
    };
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    let entries = state
        .storage
        .list_history(limit)
        .await
        .map_err(|e| McpError::ExecutionFailed {
            message: format!("Failed to list history: {}", e),
        })?;

    Ok(serde_json::json!({
        "count": entries.len(),
        "entries": entries,
    }))
}

async fn handle_history_get(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: HistoryGetParams = parse_arguments("factcheck_history_get", arguments)?;
    let id = normalize_id(&params.id);

    let entry = state
        .storage
        .get_history(&id)
        .await
        .map_err(|e| McpError::ExecutionFailed {
            message: format!("Failed to get history entry: {}", e),
        })?
        .ok_or_else(|| McpError::ExecutionFailed {
            message: format!("History entry not found: {}", id),
        })?;

    serde_json::to_value(entry).map_err(McpError::Json)
}

// ============================================================================
// DAO handlers
// ============================================================================

async fn handle_escalate(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("dao_escalate", arguments, |params: EscalateParams| async move {
        state.escalation.escalate(&params.history_id).await
    })
    .await
}

async fn handle_cases_pending(state: &SharedState) -> McpResult<Value> {
    let cases = state
        .dao
        .list_pending()
        .await
        .map_err(|e| McpError::ExecutionFailed {
            message: e.to_string(),
        })?;

    Ok(serde_json::json!({
        "count": cases.len(),
        "cases": cases,
    }))
}

async fn handle_case_get(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("dao_case_get", arguments, |params: CaseGetParams| async move {
        state.dao.get_case(&params.case_id).await
    })
    .await
}

async fn handle_case_attach_chain_id(
    state: &SharedState,
    arguments: Option<Value>,
) -> McpResult<Value> {
    execute_handler(
        "dao_case_attach_chain_id",
        arguments,
        |params: AttachChainIdParams| async move {
            state
                .dao
                .attach_on_chain_id(&params.case_id, &params.on_chain_id)
                .await?;
            state.dao.get_case(&params.case_id).await
        },
    )
    .await
}

async fn handle_vote(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("dao_vote", arguments, |params: VoteParams| async move {
        let choice: VoteChoice =
            params
                .choice
                .parse()
                .map_err(|_| ConsensusError::InvalidChoice {
                    choice: params.choice.clone(),
                })?;
        state
            .dao
            .submit_vote(
                &params.case_id,
                &params.voter_id,
                choice,
                params.reasoning.as_deref().unwrap_or_default(),
            )
            .await
    })
    .await
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e.to_string(),
        }),
        None => Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: "Missing arguments".to_string(),
        }),
    }
}

/// Parse arguments, run the operation and serialize its result.
///
/// Operation errors become [`McpError::ExecutionFailed`] carrying the
/// error's display text, so callers see actionable messages.
async fn execute_handler<P, R, E, F, Fut>(
    tool_name: &str,
    arguments: Option<Value>,
    operation: F,
) -> McpResult<Value>
where
    P: serde::de::DeserializeOwned,
    R: Serialize,
    E: std::fmt::Display,
    F: FnOnce(P) -> Fut,
    Fut: std::future::Future<Output = Result<R, E>>,
{
    let params: P = parse_arguments(tool_name, arguments)?;

    let result = operation(params)
        .await
        .map_err(|e| McpError::ExecutionFailed {
            message: e.to_string(),
        })?;

    serde_json::to_value(result).map_err(McpError::Json)
}
