// library crate for mergegate
// the binary in main.rs is a thin wrapper around `cli`

pub mod cli;
pub mod conclusion;
pub mod conditions;
pub mod config;
pub mod snapshot;

pub use conclusion::{conclude, conclude_batch, Conclusion, GatePolicy};
pub use conditions::{
    evaluate, parse_atomic, ConditionError, ConditionSet, EvalContext, Evaluation, MatchResult,
};
pub use snapshot::{Snapshot, SnapshotError};
