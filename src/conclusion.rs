//! gating decisions
//!
//! maps match results to a `Conclusion`, the single value an external
//! caller needs to decide whether a pull request may proceed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::conditions::eval::{gate, Mode, Verdict};
use crate::conditions::{evaluate, ConditionSet, EvalContext, MatchResult};
use crate::snapshot::Snapshot;

/// final gating decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Conclusion {
    Success,
    Failure,
    Pending,
}

impl Conclusion {
    /// map a match result under `policy`
    pub fn from_match(result: MatchResult, policy: GatePolicy) -> Self {
        match result {
            MatchResult::Matched => Conclusion::Success,
            MatchResult::Pending => Conclusion::Pending,
            MatchResult::NotMatched if policy.unmatched_conditions_return_failure => {
                Conclusion::Failure
            }
            MatchResult::NotMatched => Conclusion::Pending,
        }
    }

    /// combine two conclusions: failure wins, then pending
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Conclusion::Failure, _) | (_, Conclusion::Failure) => Conclusion::Failure,
            (Conclusion::Pending, _) | (_, Conclusion::Pending) => Conclusion::Pending,
            _ => Conclusion::Success,
        }
    }

    /// combine many conclusions; an empty batch is pending
    pub fn reduce(conclusions: impl IntoIterator<Item = Conclusion>) -> Self {
        conclusions
            .into_iter()
            .reduce(Conclusion::combine)
            .unwrap_or(Conclusion::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Conclusion::Success => "SUCCESS",
            Conclusion::Failure => "FAILURE",
            Conclusion::Pending => "PENDING",
        }
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// how a rule's unmatched conditions are gated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePolicy {
    /// an unmatched non-check condition fails the gate instead of waiting
    pub unmatched_conditions_return_failure: bool,
}

impl GatePolicy {
    /// merge gating: unmatched conditions fail
    pub fn merge() -> Self {
        Self {
            unmatched_conditions_return_failure: true,
        }
    }

    /// queue gating: unmatched conditions keep the gate pending
    pub fn queue() -> Self {
        Self {
            unmatched_conditions_return_failure: false,
        }
    }
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self::merge()
    }
}

/// gating decision for one subject
pub fn conclude(
    conditions: &ConditionSet,
    subject: &Snapshot,
    context: &EvalContext,
    policy: GatePolicy,
) -> Conclusion {
    let root = evaluate(conditions, std::slice::from_ref(subject), context).match_result();
    conclude_from(root, conditions, subject, context, policy)
}

/// gating decision for a batch: failure dominates, then pending
pub fn conclude_batch(
    conditions: &ConditionSet,
    subjects: &[Snapshot],
    context: &EvalContext,
    policy: GatePolicy,
) -> Conclusion {
    evaluate(conditions, subjects, context).conclusion(policy)
}

/// gating decision for one subject given its kleene root result
pub(crate) fn conclude_from(
    root: MatchResult,
    conditions: &ConditionSet,
    subject: &Snapshot,
    context: &EvalContext,
    policy: GatePolicy,
) -> Conclusion {
    let label = subject.label().unwrap_or_default();

    if root == MatchResult::Matched {
        log::debug!("{} conditions matched", label);
        return Conclusion::Success;
    }

    // non-check conditions decide first, under the policy flag
    let without_checks = gate(conditions.root(), subject, context, Mode::WithoutChecks).kleene();
    let conclusion = Conclusion::from_match(without_checks, policy);
    if conclusion != Conclusion::Success {
        log::debug!(
            "{} non-check conditions are {}: {}",
            label,
            without_checks,
            conclusion
        );
        return conclusion;
    }

    let conclusion = match gate(conditions.root(), subject, context, Mode::CheckStatus) {
        Verdict::Matched => Conclusion::Success,
        Verdict::NotMatched => Conclusion::Failure,
        Verdict::Pending | Verdict::Unreported => Conclusion::Pending,
    };
    log::debug!("{} checks status: {}", label, conclusion);
    conclusion
}
