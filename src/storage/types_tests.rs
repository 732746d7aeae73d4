//! Unit tests for storage types and builder patterns.
//!
//! Tests constructors, id normalization, tallies and the string forms
//! of CaseStatus and VoteChoice.

use super::*;
use serde_json::json;

// ============================================================================
// HistoryEntry tests
// ============================================================================

#[test]
fn test_history_entry_new() {
    let entry = HistoryEntry::new("claim", json!({}), json!({"score": 42}), 42);
    assert!(Uuid::parse_str(&entry.id).is_ok());
    assert_eq!(entry.score, 42);
    assert!(!entry.is_escalated);
    assert!(entry.snapshot.is_none());
    assert!(entry.dao_votes.is_none());
}

#[test]
fn test_history_entry_score_capped() {
    let entry = HistoryEntry::new("claim", json!({}), json!({}), 250);
    assert_eq!(entry.score, 100);
}

#[test]
fn test_history_entry_serialization_skips_empty_decorations() {
    let entry = HistoryEntry::new("claim", json!({}), json!({}), 10);
    let value = serde_json::to_value(&entry).unwrap();
    assert!(value.get("snapshot").is_none());
    assert!(value.get("dao_votes").is_none());
}

// ============================================================================
// DaoCase tests
// ============================================================================

#[test]
fn test_dao_case_new() {
    let case = DaoCase::new("claim", json!({"summary": "s"}), 55).with_history("h1");
    assert_eq!(case.status, CaseStatus::Pending);
    assert_eq!(case.history_id.as_deref(), Some("h1"));
    assert_eq!(case.initial_score, 55);
    assert!(case.votes.is_empty());
    assert_eq!(
        case.voting_deadline - case.created_at,
        Duration::days(VOTING_PERIOD_DAYS)
    );
}

#[test]
fn test_dao_case_tally_and_has_voted() {
    let mut case = DaoCase::new("claim", json!({}), 50);
    case.votes.push(Vote::new("a", VoteChoice::True, ""));
    case.votes.push(Vote::new("b", VoteChoice::False, ""));
    case.votes.push(Vote::new("c", VoteChoice::True, ""));

    let tally = case.tally();
    assert_eq!(tally.true_votes, 2);
    assert_eq!(tally.false_votes, 1);
    assert_eq!(tally.total(), 3);
    assert!(case.has_voted("b"));
    assert!(!case.has_voted("d"));
}

#[test]
fn test_vote_new_default_stake() {
    let vote = Vote::new("0xabc", VoteChoice::False, "fake");
    assert_eq!(vote.stake_weight, DEFAULT_STAKE_WEIGHT);
    assert_eq!(vote.stake_weight, 10);
}

// ============================================================================
// Enum string forms
// ============================================================================

#[test]
fn test_case_status_round_trip() {
    for status in [CaseStatus::Pending, CaseStatus::Resolved] {
        assert_eq!(status.to_string().parse::<CaseStatus>().unwrap(), status);
    }
    assert!("closed".parse::<CaseStatus>().is_err());
}

#[test]
fn test_vote_choice_parse() {
    assert_eq!(" TRUE ".parse::<VoteChoice>().unwrap(), VoteChoice::True);
    assert_eq!("false".parse::<VoteChoice>().unwrap(), VoteChoice::False);
    assert!("maybe".parse::<VoteChoice>().is_err());
    assert_eq!(serde_json::to_value(VoteChoice::True).unwrap(), json!("true"));
}

// ============================================================================
// normalize_id tests
// ============================================================================

#[test]
fn test_normalize_id_uuid_forms() {
    let canonical = "67e55044-10b1-426f-9247-bb680e5fe0c8";
    for raw in [
        "67e55044-10b1-426f-9247-bb680e5fe0c8",
        "67E55044-10B1-426F-9247-BB680E5FE0C8",
        "67e5504410b1426f9247bb680e5fe0c8",
        "{67e55044-10b1-426f-9247-bb680e5fe0c8}",
        "urn:uuid:67e55044-10b1-426f-9247-bb680e5fe0c8",
        "  67e55044-10b1-426f-9247-bb680e5fe0c8\n",
    ] {
        assert_eq!(normalize_id(raw), canonical, "input: {:?}", raw);
    }
}

#[test]
fn test_normalize_id_legacy_ids_verbatim() {
    assert_eq!(normalize_id(" 65a1f0c2e4b0a1b2c3d4e5f6 "), "65a1f0c2e4b0a1b2c3d4e5f6");
}
