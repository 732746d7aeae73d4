//! Server module for MCP protocol handling.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Tool call handlers and routing
//! - Shared application state wiring the claim pipeline and DAO engine

mod handlers;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::sync::Arc;

use crate::config::Config;
use crate::dao::ConsensusEngine;
use crate::langbase::{LangbaseClient, PipeBackend};
use crate::search::SearchProvider;
use crate::stages::{
    AnalysisStage, AuditStage, ClaimPipeline, EscalationService, EvidenceAggregator,
    GradingStage, ReasoningBackend, ReasoningInvoker,
};
use crate::storage::SqliteStorage;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// SQLite storage backend.
    pub storage: SqliteStorage,
    /// Claim check pipeline.
    pub pipeline: ClaimPipeline,
    /// Manual escalation with deep audit.
    pub escalation: EscalationService,
    /// DAO case lifecycle.
    pub dao: ConsensusEngine,
}

impl AppState {
    /// Wire the pipeline stages over the configured backends and search provider.
    pub fn new(
        config: Config,
        storage: SqliteStorage,
        langbase: LangbaseClient,
        search: Arc<dyn SearchProvider>,
    ) -> Self {
        let backends: Vec<Arc<dyn ReasoningBackend>> =
            PipeBackend::from_descriptors(&langbase, &config.backends.backends)
                .into_iter()
                .map(|b| Arc::new(b) as Arc<dyn ReasoningBackend>)
                .collect();
        let invoker = ReasoningInvoker::new(backends).with_max_tokens(config.request.max_output_tokens);

        tracing::info!(
            backends = ?invoker.backend_names(),
            allowed_domains = config.search.allowed_domains.len(),
            "AppState initializing"
        );

        Self::from_parts(config, storage, invoker, search)
    }

    /// Wire the state from an already-built invoker.
    pub fn from_parts(
        config: Config,
        storage: SqliteStorage,
        invoker: ReasoningInvoker,
        search: Arc<dyn SearchProvider>,
    ) -> Self {
        let aggregator = EvidenceAggregator::new(search, config.search.allowed_domains.clone());
        let dao = ConsensusEngine::new(storage.clone());

        let pipeline = ClaimPipeline::new(
            aggregator.clone(),
            AnalysisStage::new(invoker.clone()),
            GradingStage::new(invoker.clone()),
            storage.clone(),
            dao.clone(),
        );
        let escalation = EscalationService::new(
            storage.clone(),
            aggregator,
            AuditStage::new(invoker),
            dao.clone(),
        );

        Self {
            config,
            storage,
            pipeline,
            escalation,
            dao,
        }
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;
