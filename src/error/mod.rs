use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or invalid configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },

    /// Persistence failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Langbase transport failure.
    #[error("Langbase error: {0}")]
    Langbase(#[from] LangbaseError),

    /// Search provider transport failure.
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// No reasoning backend could answer.
    #[error("Reasoning error: {0}")]
    Reasoning(#[from] ReasoningError),

    /// A DAO voting rule was violated.
    #[error("Consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    /// A history entry could not be escalated.
    #[error("Escalation error: {0}")]
    Escalation(#[from] EscalationError),

    /// MCP protocol failure.
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// Anything else.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// The database could not be opened.
    #[error("Database connection failed: {message}")]
    Connection {
        /// Driver message.
        message: String,
    },

    /// A statement failed or returned unusable data.
    #[error("Query failed: {message}")]
    Query {
        /// Driver or decoding message.
        message: String,
    },

    /// No history entry has this id.
    #[error("History entry not found: {history_id}")]
    HistoryNotFound {
        /// Requested id.
        history_id: String,
    },

    /// No DAO case has this id.
    #[error("DAO case not found: {case_id}")]
    CaseNotFound {
        /// Requested id.
        case_id: String,
    },

    /// Embedded migrations failed to apply.
    #[error("Migration failed: {message}")]
    Migration {
        /// Migrator message.
        message: String,
    },

    /// Raw sqlx failure.
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Langbase API errors
#[derive(Debug, Error)]
pub enum LangbaseError {
    /// Non-success HTTP status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The body did not match the expected shape.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Decoding message.
        message: String,
    },

    /// The request exceeded the configured timeout.
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Search provider transport errors
#[derive(Debug, Error)]
pub enum SearchError {
    /// HTTP 429 from the provider.
    #[error("Search rate limit exceeded")]
    RateLimited,

    /// Any other non-success HTTP status.
    #[error("Search API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The body did not match the expected shape.
    #[error("Invalid search response: {message}")]
    InvalidResponse {
        /// Decoding message.
        message: String,
    },

    /// The request exceeded the configured timeout.
    #[error("Search timeout after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Evidence retrieval outcomes that are not a usable evidence set.
///
/// These never abort the pipeline; the analysis stage consumes them as
/// in-band signals.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "signal", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetrievalError {
    /// Nothing relevant came back.
    #[error("No results: {message}")]
    NoResults {
        /// Message shown as the analysis summary.
        message: String,
    },

    /// The provider is rate limiting; retrying later may succeed.
    #[error("Search service busy: {message}")]
    ServiceBusy {
        /// Message shown as the analysis summary.
        message: String,
    },

    /// The search call failed outright.
    #[error("Retrieval failed: {message}")]
    Fatal {
        /// Message shown as the analysis summary.
        message: String,
    },
}

impl RetrievalError {
    /// Whether the caller may retry the same retrieval later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RetrievalError::ServiceBusy { .. })
    }

    /// Human-readable message carried by the signal.
    pub fn message(&self) -> &str {
        match self {
            RetrievalError::NoResults { message }
            | RetrievalError::ServiceBusy { message }
            | RetrievalError::Fatal { message } => message,
        }
    }
}

/// Reasoning backend errors
#[derive(Debug, Clone, Error)]
pub enum ReasoningError {
    /// Every configured backend failed, or none was configured.
    #[error("All {attempts} reasoning backends failed. Last error: {last_error}")]
    AllBackendsExhausted {
        /// Backends tried.
        attempts: usize,
        /// Error of the last backend tried.
        last_error: String,
    },
}

/// Backend output that could not be parsed into the expected shape
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ParseError {
    /// JSON was found but did not deserialize.
    #[error("Malformed output: {message}")]
    Malformed {
        /// Deserializer message.
        message: String,
    },
}

/// DAO consensus violations
#[derive(Debug, Error)]
pub enum ConsensusError {
    /// The voter already has a vote on this case.
    #[error("Voter {voter_id} has already voted on case {case_id}")]
    DuplicateVote {
        /// Case voted on.
        case_id: String,
        /// Repeat voter.
        voter_id: String,
    },

    /// Voting is closed.
    #[error("Case {case_id} is already resolved; voting is closed")]
    CaseAlreadyResolved {
        /// Resolved case.
        case_id: String,
    },

    /// No case has this id.
    #[error("DAO case not found: {case_id}")]
    CaseNotFound {
        /// Requested id.
        case_id: String,
    },

    /// The choice is neither `"true"` nor `"false"`.
    #[error("Invalid vote choice '{choice}': expected \"true\" or \"false\"")]
    InvalidChoice {
        /// Rejected input.
        choice: String,
    },

    /// The voter id is empty after trimming.
    #[error("Voter id must not be empty")]
    InvalidVoter,

    /// Persistence failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Escalation violations
#[derive(Debug, Error)]
pub enum EscalationError {
    /// The entry already has a DAO case.
    #[error("History entry {history_id} has already been escalated")]
    AlreadyEscalated {
        /// Escalated entry.
        history_id: String,
    },

    /// No history entry has this id.
    #[error("History entry not found: {history_id}")]
    HistoryNotFound {
        /// Requested id.
        history_id: String,
    },

    /// Persistence failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// MCP protocol errors
#[derive(Debug, Error)]
pub enum McpError {
    /// The request was not valid JSON-RPC.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What was wrong.
        message: String,
    },

    /// No tool has this name.
    #[error("Unknown tool: {tool_name}")]
    UnknownTool {
        /// Requested tool.
        tool_name: String,
    },

    /// Tool arguments did not deserialize.
    #[error("Invalid parameters for {tool_name}: {message}")]
    InvalidParameters {
        /// Called tool.
        tool_name: String,
        /// Deserializer message.
        message: String,
    },

    /// The tool ran and failed.
    #[error("Tool execution failed: {message}")]
    ExecutionFailed {
        /// Error text returned to the client.
        message: String,
    },

    /// Response serialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tool-specific errors with structured details
#[derive(Debug, Error)]
pub enum ToolError {
    /// An argument failed validation.
    #[error("Validation failed: {field} - {reason}")]
    Validation {
        /// Offending argument.
        field: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<ToolError> for AppError {
    fn from(err: ToolError) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<AppError> for McpError {
    fn from(err: AppError) -> Self {
        McpError::ExecutionFailed {
            message: err.to_string(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for Langbase operations
pub type LangbaseResult<T> = Result<T, LangbaseError>;

/// Result type alias for search provider operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;
