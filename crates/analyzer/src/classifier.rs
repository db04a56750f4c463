//! Transaction classification by invoked program.

use vantage_core::programs::{SYSTEM_PROGRAM, VOTE_PROGRAM};
use vantage_core::{RawTransaction, TxCategory};

/// Assigns exactly one category to `tx`.
///
/// First match wins over the whole instruction list:
///   1. any instruction targets the vote program -> `Vote`
///   2. any instruction targets the system program -> `Transfer`
///   3. at least one instruction -> `Program`
///   4. otherwise -> `Other`
///
/// A transaction that both votes and transfers counts as a vote.
pub fn classify(tx: &RawTransaction) -> TxCategory {
    let invokes = |program: &str| tx.program_ids.iter().any(|p| p == program);

    if invokes(VOTE_PROGRAM) {
        TxCategory::Vote
    } else if invokes(SYSTEM_PROGRAM) {
        TxCategory::Transfer
    } else if !tx.program_ids.is_empty() {
        TxCategory::Program
    } else {
        TxCategory::Other
    }
}
