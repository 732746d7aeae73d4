//! Integration tests for DAO consensus
//!
//! Drives the consensus engine the way MCP clients do: one case, many
//! voters, some of them racing each other.

use serde_json::json;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

use mcp_truth_dao::config::DatabaseConfig;
use mcp_truth_dao::dao::{ConsensusEngine, RESOLUTION_THRESHOLD};
use mcp_truth_dao::error::ConsensusError;
use mcp_truth_dao::storage::{CaseStatus, DaoCase, HistoryEntry, SqliteStorage, Storage, VoteChoice};

async fn engine_with_case(storage: SqliteStorage) -> (ConsensusEngine, String) {
    let entry = HistoryEntry::new("Claim for the community", json!({}), json!({}), 50);
    storage.insert_history(&entry).await.unwrap();

    let engine = ConsensusEngine::new(storage);
    let case = engine
        .open_case(&entry.id, DaoCase::new(&entry.query, json!({"summary": "unclear"}), 50))
        .await
        .unwrap()
        .expect("case should open");
    (engine, case.id)
}

async fn in_memory() -> (ConsensusEngine, String) {
    engine_with_case(SqliteStorage::new_in_memory().await.unwrap()).await
}

fn voter(i: usize) -> String {
    format!("0x{:04x}", i)
}

mod voting_tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_vote_rejected_and_count_unchanged() {
        let (engine, case_id) = in_memory().await;

        assert_ok!(engine.submit_vote(&case_id, "0xabc", VoteChoice::True, "").await);
        let err = assert_err!(
            engine
                .submit_vote(&case_id, "0xabc", VoteChoice::False, "changed my mind")
                .await
        );

        assert!(matches!(err, ConsensusError::DuplicateVote { .. }));
        assert_eq!(
            err.to_string(),
            format!("Voter 0xabc has already voted on case {}", case_id)
        );
        assert_eq!(engine.get_case(&case_id).await.unwrap().votes.len(), 1);
    }

    #[tokio::test]
    async fn test_tenth_vote_resolves_and_eleventh_fails() {
        let (engine, case_id) = in_memory().await;

        for i in 0..9 {
            let choice = if i < 7 { VoteChoice::True } else { VoteChoice::False };
            let receipt = engine
                .submit_vote(&case_id, &voter(i), choice, "")
                .await
                .unwrap();
            assert!(receipt.resolution.is_none());
        }

        let receipt = engine
            .submit_vote(&case_id, &voter(9), VoteChoice::False, "")
            .await
            .unwrap();
        assert_eq!(receipt.vote_count, RESOLUTION_THRESHOLD);
        let resolution = receipt.resolution.expect("tenth vote resolves");
        assert_eq!(resolution.final_verdict, VoteChoice::True);
        assert_eq!(resolution.consensus_score, 70);

        let err = engine
            .submit_vote(&case_id, &voter(10), VoteChoice::True, "")
            .await
            .unwrap_err();
        assert!(matches!(err, ConsensusError::CaseAlreadyResolved { .. }));

        let case = engine.get_case(&case_id).await.unwrap();
        assert_eq!(case.status, CaseStatus::Resolved);
        assert_eq!(case.votes.len(), 10);
        assert_eq!(case.final_verdict, Some(VoteChoice::True));
        assert_eq!(case.consensus_score, Some(70));
        assert!(engine.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tie_resolves_false() {
        let (engine, case_id) = in_memory().await;

        for i in 0..10 {
            let choice = if i % 2 == 0 { VoteChoice::True } else { VoteChoice::False };
            engine
                .submit_vote(&case_id, &voter(i), choice, "")
                .await
                .unwrap();
        }

        let case = engine.get_case(&case_id).await.unwrap();
        assert_eq!(case.final_verdict, Some(VoteChoice::False));
        assert_eq!(case.consensus_score, Some(50));
    }

    #[tokio::test]
    async fn test_vote_on_unknown_case() {
        let (engine, _) = in_memory().await;

        let err = engine
            .submit_vote("no-such-case", "0xabc", VoteChoice::True, "")
            .await
            .unwrap_err();
        assert!(matches!(err, ConsensusError::CaseNotFound { .. }));
    }

    #[tokio::test]
    async fn test_explicit_resolution_with_few_votes() {
        let (engine, case_id) = in_memory().await;

        engine
            .submit_vote(&case_id, "0x1", VoteChoice::False, "")
            .await
            .unwrap();
        let resolution = engine.resolve_case(&case_id).await.unwrap();
        assert_eq!(resolution.final_verdict, VoteChoice::False);
        assert_eq!(resolution.consensus_score, 100);

        assert!(matches!(
            engine.resolve_case(&case_id).await,
            Err(ConsensusError::CaseAlreadyResolved { .. })
        ));
    }
}

mod concurrency_tests {
    use super::*;

    async fn file_backed(dir: &TempDir) -> (ConsensusEngine, String) {
        let storage = SqliteStorage::new(&DatabaseConfig {
            path: dir.path().join("dao.db"),
            max_connections: 4,
        })
        .await
        .unwrap();
        engine_with_case(storage).await
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_twelve_concurrent_voters() {
        let dir = TempDir::new().unwrap();
        let (engine, case_id) = file_backed(&dir).await;

        let handles: Vec<_> = (0..12)
            .map(|i| {
                let engine = engine.clone();
                let case_id = case_id.clone();
                tokio::spawn(async move {
                    engine
                        .submit_vote(&case_id, &voter(i), VoteChoice::True, "")
                        .await
                })
            })
            .collect();

        let mut accepted = 0;
        let mut resolutions = 0;
        let mut closed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(receipt) => {
                    accepted += 1;
                    if receipt.resolution.is_some() {
                        resolutions += 1;
                    }
                }
                Err(ConsensusError::CaseAlreadyResolved { .. }) => closed += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(accepted, 10);
        assert_eq!(resolutions, 1);
        assert_eq!(closed, 2);

        let case = engine.get_case(&case_id).await.unwrap();
        assert_eq!(case.votes.len(), 10);
        assert_eq!(case.status, CaseStatus::Resolved);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicates_accept_one() {
        let dir = TempDir::new().unwrap();
        let (engine, case_id) = file_backed(&dir).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                let case_id = case_id.clone();
                tokio::spawn(async move {
                    engine
                        .submit_vote(&case_id, "0xsame", VoteChoice::False, "")
                        .await
                })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(e) => assert!(matches!(e, ConsensusError::DuplicateVote { .. })),
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(engine.get_case(&case_id).await.unwrap().votes.len(), 1);
    }
}
