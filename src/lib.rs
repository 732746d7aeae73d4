//! # MCP Truth DAO Server
//!
//! A Model Context Protocol (MCP) server that fact-checks claims against
//! trusted news sources and hands ambiguous verdicts to community voting.
//!
//! ## Features
//!
//! - **Evidence Retrieval**: Domain-restricted search with keyword relevance filtering
//! - **Backend Fallback**: Ordered Langbase pipes tried until one succeeds
//! - **Analysis & Grading**: Structured verdicts and a 0-100 trust score
//! - **Deep Audit**: Three-stream investigation for escalated claims
//! - **DAO Consensus**: One vote per voter, majority resolution at 10 votes
//!
//! ## Architecture
//!
//! ```text
//! MCP Client → MCP Server (Rust) → Search API (HTTP)
//!                    ↓           → Langbase Pipes (HTTP)
//!              SQLite (History, DAO cases)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mcp_truth_dao::{Config, AppState, McpServer};
//! use mcp_truth_dao::langbase::LangbaseClient;
//! use mcp_truth_dao::search::SearchClient;
//! use mcp_truth_dao::storage::SqliteStorage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let storage = SqliteStorage::new(&config.database).await?;
//!     let langbase = LangbaseClient::new(&config.langbase, config.request.clone())?;
//!     let search = SearchClient::new(&config.search, &config.request)?;
//!     let state = Arc::new(AppState::new(config, storage, langbase, Arc::new(search)));
//!     McpServer::new(state).run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// One-shot CLI commands.
pub mod cli;
/// Configuration management for the MCP server.
pub mod config;
/// DAO consensus engine for gray-area claims.
pub mod dao;
/// Error types and result aliases for the application.
pub mod error;
/// Langbase API client and the pipe-backed reasoning backend.
pub mod langbase;
/// System prompts for the reasoning stages.
pub mod prompts;
/// Domain-restricted web search client.
pub mod search;
/// MCP server implementation and request handling.
pub mod server;
/// Claim verification pipeline stages.
pub mod stages;
/// SQLite storage layer for persistence.
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, McpServer, SharedState};
