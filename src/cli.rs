//! One-shot CLI commands.
//!
//! Runs the same operations the MCP tools expose, printing a readable
//! summary instead of JSON-RPC responses.

use clap::Subcommand;

use crate::server::{AppState, DEFAULT_HISTORY_LIMIT};
use crate::storage::{CaseStatus, DaoCase, HistoryEntry, Storage, VoteChoice};

const RULE: &str = "───────────────────────────────────────────────────────────────────────────────\n";

/// Fact-check and DAO subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum FactCheckCommands {
    /// Fact-check a claim
    Check {
        /// The claim to verify
        claim: String,
    },

    /// Show recent claim checks
    History {
        /// Maximum number of entries to show
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: u32,
    },

    /// Show DAO cases open for voting
    Cases,

    /// Cast a vote on a DAO case
    Vote {
        /// DAO case id
        #[arg(long = "case")]
        case_id: String,

        /// Voter identity
        #[arg(long = "voter")]
        voter_id: String,

        /// "true" or "false"
        #[arg(long)]
        choice: VoteChoice,

        /// Explanation shown with the vote
        #[arg(long, default_value = "")]
        reasoning: String,
    },
}

/// Result of CLI command execution.
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

/// Execute a fact-check CLI command.
pub async fn execute_command(command: FactCheckCommands, state: &AppState) -> CliResult {
    match command {
        FactCheckCommands::Check { claim } => execute_check(state, &claim).await,
        FactCheckCommands::History { limit } => execute_history(state, limit).await,
        FactCheckCommands::Cases => execute_cases(state).await,
        FactCheckCommands::Vote {
            case_id,
            voter_id,
            choice,
            reasoning,
        } => execute_vote(state, &case_id, &voter_id, choice, &reasoning).await,
    }
}

async fn execute_check(state: &AppState, claim: &str) -> CliResult {
    let verdict = match state.pipeline.check_claim(claim).await {
        Ok(v) => v,
        Err(e) => return CliResult::error(format!("Claim check failed: {}", e)),
    };

    let mut output = String::new();
    output.push_str("\nClaim Check\n");
    output.push_str(RULE);
    output.push_str(&format!("Claim:       {}\n", claim.trim()));
    output.push_str(&format!("History id:  {}\n", verdict.history_id));
    output.push_str(&format!(
        "Trust score: {} ({})\n",
        verdict.grading.score,
        verdict.grading.tier.as_str()
    ));
    if let Some(record) = verdict.analysis.record.structured() {
        output.push_str(&format!("Conclusion:  {:?}\n", record.conclusion));
        output.push_str(&format!("Summary:     {}\n", record.summary));
        for source in &record.sources {
            output.push_str(&format!("  - {} <{}>\n", source.title, source.url));
        }
    }
    output.push_str(&format!("Reasoning:   {}\n", verdict.grading.reasoning));

    if let Some(notice) = &verdict.dao_case {
        output.push('\n');
        output.push_str(&format!("{}\n", notice.message));
        output.push_str(&format!(
            "DAO case {} open until {}\n",
            notice.case_id,
            notice.voting_deadline.to_rfc3339()
        ));
    }

    CliResult::success(output)
}

async fn execute_history(state: &AppState, limit: u32) -> CliResult {
    match state.storage.list_history(limit).await {
        Ok(entries) if entries.is_empty() => CliResult::success("No claim checks recorded yet."),
        Ok(entries) => {
            let mut output = String::new();
            output.push_str(&format!("\nClaim History ({} entries)\n", entries.len()));
            output.push_str(RULE);
            for entry in &entries {
                output.push_str(&format_history_line(entry));
            }
            CliResult::success(output)
        }
        Err(e) => CliResult::error(format!("Failed to load history: {}", e)),
    }
}

async fn execute_cases(state: &AppState) -> CliResult {
    match state.dao.list_pending().await {
        Ok(cases) if cases.is_empty() => CliResult::success("No DAO cases are open for voting."),
        Ok(cases) => {
            let mut output = String::new();
            output.push_str(&format!("\nPending DAO Cases ({})\n", cases.len()));
            output.push_str(RULE);
            for case in &cases {
                output.push_str(&format_case_line(case));
            }
            CliResult::success(output)
        }
        Err(e) => CliResult::error(format!("Failed to load cases: {}", e)),
    }
}

async fn execute_vote(
    state: &AppState,
    case_id: &str,
    voter_id: &str,
    choice: VoteChoice,
    reasoning: &str,
) -> CliResult {
    match state.dao.submit_vote(case_id, voter_id, choice, reasoning).await {
        Ok(receipt) => {
            let mut output = format!(
                "Vote recorded on case {} ({} votes)\n",
                receipt.case_id, receipt.vote_count
            );
            if let Some(resolution) = receipt.resolution {
                output.push_str(&format!(
                    "Case resolved: verdict {} with {}% consensus\n",
                    resolution.final_verdict, resolution.consensus_score
                ));
            }
            CliResult::success(output)
        }
        Err(e) => CliResult::error(e.to_string()),
    }
}

fn format_history_line(entry: &HistoryEntry) -> String {
    let escalated = match entry.dao_votes {
        Some(tally) => format!(
            " [DAO {} true / {} false]",
            tally.true_votes, tally.false_votes
        ),
        None if entry.is_escalated => " [DAO]".to_string(),
        None => String::new(),
    };
    format!(
        "{:>3}  {}  {}{}\n     {}\n",
        entry.score,
        entry.created_at.format("%Y-%m-%d %H:%M"),
        truncate(&entry.query, 60),
        escalated,
        entry.id
    )
}

fn format_case_line(case: &DaoCase) -> String {
    let tally = case.tally();
    let status = match case.status {
        CaseStatus::Pending => "pending",
        CaseStatus::Resolved => "resolved",
    };
    format!(
        "{}  [{}] score {}  votes {}/{}  closes {}\n     {}\n",
        case.id,
        status,
        case.initial_score,
        tally.true_votes,
        tally.false_votes,
        case.voting_deadline.format("%Y-%m-%d"),
        truncate(&case.query, 70)
    )
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
