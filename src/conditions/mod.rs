//! condition evaluation system for merge rules
//!
//! provides:
//! - string conditions: `[-][#]attribute<operator>value`
//! - groups: `{"or": [...]}`, `{"and": [...]}`, implicit AND at the top level
//! - tri-state evaluation (matched, not matched, pending) against snapshots
//! - weekly schedules and clock attributes read from an explicit moment
//! - markdown checklist summaries

mod attributes;
mod error;
pub(crate) mod eval;
mod parser;
mod schedule;
mod summary;
mod types;

pub use attributes::{is_shared, suggest, AttributeKind, ATTRIBUTES};
pub use error::ConditionError;
pub use eval::{evaluate, EvalContext, Evaluation, NodeResult};
pub use parser::{parse_atomic, ConditionSet};
pub use schedule::{parse_offset, DayRange, Schedule, TimeRange};
pub use types::{
    is_check_attribute, AtomicCondition, Condition, MatchResult, Operand, Operator, Pattern,
    Value,
};
