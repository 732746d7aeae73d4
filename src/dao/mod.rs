//! DAO consensus engine.
//!
//! Gray-area claims become DAO cases that community members vote on. A case
//! resolves by simple majority once it has [`RESOLUTION_THRESHOLD`] votes,
//! or when resolved explicitly.

mod engine;
mod ledger;
mod locks;

pub use engine::{ConsensusEngine, VoteReceipt};
pub use ledger::LedgerMirror;
#[cfg(test)]
pub use ledger::MockLedgerMirror;
pub use locks::CaseLocks;

use crate::storage::{VoteChoice, VoteTally};

/// Votes after which a case resolves automatically.
pub const RESOLUTION_THRESHOLD: u32 = 10;

/// Verdict and consensus score for a tally.
///
/// The verdict is the choice with strictly more votes; a tie goes to
/// `false`. The score is the winning share of all votes, rounded to a
/// whole percent, and 0 when nobody voted.
pub fn decide(tally: VoteTally) -> (VoteChoice, u8) {
    let verdict = if tally.true_votes > tally.false_votes {
        VoteChoice::True
    } else {
        VoteChoice::False
    };

    let total = tally.total();
    if total == 0 {
        return (verdict, 0);
    }

    let winning = tally.true_votes.max(tally.false_votes);
    let score = (f64::from(winning) * 100.0 / f64::from(total)).round();
    (verdict, score.clamp(0.0, 100.0) as u8)
}
