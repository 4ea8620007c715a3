//! condition evaluator
//!
//! evaluates a condition tree against attribute snapshots at a fixed moment.
//! evaluation is pure: the same tree, snapshot and context always give the
//! same result, and nothing here reads the wall clock.

use std::borrow::Cow;

use chrono::{DateTime, Datelike, FixedOffset, Utc};

use super::attributes::AttributeKind;
use super::parser::ConditionSet;
use super::types::{AtomicCondition, Condition, MatchResult, Operand, Operator, Value};
use crate::conclusion::{self, Conclusion, GatePolicy};
use crate::snapshot::Snapshot;

/// context for evaluating conditions
///
/// holds the evaluation moment, already converted to the offset used for
/// clock attributes and schedules that carry no zone of their own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalContext {
    pub now: DateTime<FixedOffset>,
}

impl EvalContext {
    /// create a context at `now`, read in UTC
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: now.fixed_offset(),
        }
    }

    /// read the moment in another utc offset
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.now = self.now.with_timezone(&offset);
        self
    }
}

/// outcome of one node for one subject, mirroring the tree shape
#[derive(Debug, Clone, PartialEq)]
pub struct NodeResult {
    pub result: MatchResult,
    /// one entry per child for groups, empty for atomic conditions
    pub children: Vec<NodeResult>,
}

/// results of a condition set evaluated against a batch of subjects
#[derive(Debug, Clone)]
pub struct Evaluation<'a> {
    pub(crate) conditions: &'a ConditionSet,
    pub(crate) subjects: &'a [Snapshot],
    pub(crate) context: EvalContext,
    /// root node per subject, in subject order
    pub(crate) results: Vec<NodeResult>,
}

/// evaluate `conditions` against every subject independently
pub fn evaluate<'a>(
    conditions: &'a ConditionSet,
    subjects: &'a [Snapshot],
    context: &EvalContext,
) -> Evaluation<'a> {
    let results = subjects
        .iter()
        .map(|s| evaluate_node(conditions.root(), s, context))
        .collect();

    Evaluation {
        conditions,
        subjects,
        context: *context,
        results,
    }
}

impl<'a> Evaluation<'a> {
    /// kleene AND of every subject's root result; `Pending` for an empty batch
    pub fn match_result(&self) -> MatchResult {
        if self.results.is_empty() {
            return MatchResult::Pending;
        }
        self.results
            .iter()
            .fold(MatchResult::Matched, |acc, r| acc.and(r.result))
    }

    /// root result per subject, in subject order
    pub fn subject_results(&self) -> Vec<MatchResult> {
        self.results.iter().map(|r| r.result).collect()
    }

    /// per-node results of one subject
    pub fn node_results(&self, subject: usize) -> Option<&NodeResult> {
        self.results.get(subject)
    }

    pub fn conditions(&self) -> &ConditionSet {
        self.conditions
    }

    pub fn subjects(&self) -> &[Snapshot] {
        self.subjects
    }

    /// markdown checklist, one line per condition
    pub fn summary(&self) -> String {
        super::summary::render(self)
    }

    /// checklist with per-pull-request lines for non-shared attributes
    pub fn queue_summary(&self) -> String {
        super::summary::render_queue(self)
    }

    /// conclusion per subject, in subject order
    pub fn subject_conclusions(&self, policy: GatePolicy) -> Vec<Conclusion> {
        self.subjects
            .iter()
            .zip(&self.results)
            .map(|(s, r)| {
                conclusion::conclude_from(r.result, self.conditions, s, &self.context, policy)
            })
            .collect()
    }

    /// gating decision for the whole batch
    pub fn conclusion(&self, policy: GatePolicy) -> Conclusion {
        Conclusion::reduce(self.subject_conclusions(policy))
    }
}

// ============================================================================
// Kleene Evaluation
// ============================================================================

fn evaluate_node(condition: &Condition, subject: &Snapshot, ctx: &EvalContext) -> NodeResult {
    let node = match condition {
        Condition::Atomic(atom) => NodeResult {
            result: evaluate_atom(atom, subject, ctx, Mode::Kleene).kleene(),
            children: Vec::new(),
        },
        Condition::All(conditions) => {
            let children: Vec<_> = conditions
                .iter()
                .map(|c| evaluate_node(c, subject, ctx))
                .collect();
            let result = children
                .iter()
                .fold(MatchResult::Matched, |acc, c| acc.and(c.result));
            NodeResult { result, children }
        }
        Condition::Any(conditions) => {
            let children: Vec<_> = conditions
                .iter()
                .map(|c| evaluate_node(c, subject, ctx))
                .collect();
            let result = children
                .iter()
                .fold(MatchResult::NotMatched, |acc, c| acc.or(c.result));
            NodeResult { result, children }
        }
    };

    log::trace!("{} -> {}", condition.label(), node.result);
    node
}

// ============================================================================
// Gating Passes
// ============================================================================

/// how atomic check conditions are read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Kleene,
    /// every check condition is taken as matched
    WithoutChecks,
    /// kleene atoms plus the failure-bucket rule, groups keep unreported apart
    CheckStatus,
}

/// result of an atom or group during a gating pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Matched,
    NotMatched,
    Pending,
    /// the referenced check never showed up in any bucket
    Unreported,
}

impl Verdict {
    fn from_bool(b: bool) -> Self {
        if b {
            Verdict::Matched
        } else {
            Verdict::NotMatched
        }
    }

    fn negate(self) -> Self {
        match self {
            Verdict::Matched => Verdict::NotMatched,
            Verdict::NotMatched => Verdict::Matched,
            other => other,
        }
    }

    fn from_kleene(result: MatchResult) -> Self {
        match result {
            MatchResult::Matched => Verdict::Matched,
            MatchResult::NotMatched => Verdict::NotMatched,
            MatchResult::Pending => Verdict::Pending,
        }
    }

    pub(crate) fn kleene(self) -> MatchResult {
        match self {
            Verdict::Matched => MatchResult::Matched,
            Verdict::NotMatched => MatchResult::NotMatched,
            Verdict::Pending | Verdict::Unreported => MatchResult::Pending,
        }
    }
}

/// evaluate the whole tree for one subject in the given gating mode
pub(crate) fn gate(
    condition: &Condition,
    subject: &Snapshot,
    ctx: &EvalContext,
    mode: Mode,
) -> Verdict {
    match condition {
        Condition::Atomic(atom) => evaluate_atom(atom, subject, ctx, mode),
        Condition::All(conditions) => {
            let verdicts: Vec<_> = conditions
                .iter()
                .map(|c| gate(c, subject, ctx, mode))
                .collect();
            match mode {
                Mode::CheckStatus => all_check_status(&verdicts),
                _ => Verdict::from_kleene(
                    verdicts
                        .iter()
                        .fold(MatchResult::Matched, |acc, v| acc.and(v.kleene())),
                ),
            }
        }
        Condition::Any(conditions) => {
            let verdicts: Vec<_> = conditions
                .iter()
                .map(|c| gate(c, subject, ctx, mode))
                .collect();
            match mode {
                Mode::CheckStatus => any_check_status(&verdicts),
                _ => Verdict::from_kleene(
                    verdicts
                        .iter()
                        .fold(MatchResult::NotMatched, |acc, v| acc.or(v.kleene())),
                ),
            }
        }
    }
}

fn all_check_status(verdicts: &[Verdict]) -> Verdict {
    let undetermined = |v: &Verdict| matches!(v, Verdict::Pending | Verdict::Unreported);

    if verdicts.iter().any(undetermined) {
        if verdicts.iter().all(|v| *v == Verdict::Unreported) {
            Verdict::Unreported
        } else {
            Verdict::Pending
        }
    } else if verdicts.contains(&Verdict::NotMatched) {
        Verdict::NotMatched
    } else {
        Verdict::Matched
    }
}

fn any_check_status(verdicts: &[Verdict]) -> Verdict {
    if verdicts.contains(&Verdict::Matched) {
        Verdict::Matched
    } else if verdicts.contains(&Verdict::Pending) {
        Verdict::Pending
    } else if !verdicts.is_empty() && verdicts.iter().all(|v| *v == Verdict::Unreported) {
        Verdict::Pending
    } else {
        Verdict::NotMatched
    }
}

// ============================================================================
// Atomic Conditions
// ============================================================================

fn evaluate_atom(
    atom: &AtomicCondition,
    subject: &Snapshot,
    ctx: &EvalContext,
    mode: Mode,
) -> Verdict {
    if mode == Mode::WithoutChecks && atom.is_check() {
        return Verdict::Matched;
    }

    if let Some(name) = atom.check_name() {
        if let Some(verdict) = check_determinacy(atom, name, subject, mode) {
            log::debug!("`{}`: check `{}` is {:?}", atom.raw, name, verdict);
            return verdict;
        }
    }

    let verdict = match compare(atom, subject, ctx) {
        Some(b) => Verdict::from_bool(b),
        None => Verdict::Pending,
    };

    if atom.negated {
        verdict.negate()
    } else {
        verdict
    }
}

/// decide a check condition before comparing, when the check is not settled
fn check_determinacy(
    atom: &AtomicCondition,
    name: &str,
    subject: &Snapshot,
    mode: Mode,
) -> Option<Verdict> {
    let has = |bucket: &str| subject.list(bucket).iter().any(|c| c == name);

    if has("check-pending") {
        return Some(Verdict::Pending);
    }

    let reported =
        has("check") || has("status-success") || has("status-failure") || has("status-neutral");
    if !reported {
        return Some(Verdict::Unreported);
    }

    // a reported check outside the failure bucket has not failed *yet*;
    // negated, the same data already settles `-check-failure=X`
    let failure_bucket = matches!(atom.attribute.as_str(), "check-failure" | "status-failure");
    if mode == Mode::CheckStatus && failure_bucket && !atom.negated && !has(&atom.attribute) {
        return Some(Verdict::Pending);
    }

    None
}

/// compare an atom against the subject; `None` when the attribute is missing
fn compare(atom: &AtomicCondition, subject: &Snapshot, ctx: &EvalContext) -> Option<bool> {
    match &atom.operand {
        Operand::Schedule(schedule) => {
            let inside = schedule.matches(&ctx.now);
            return Some(if atom.operator == Operator::Ne { !inside } else { inside });
        }
        Operand::TimeOfDay(time, offset) => {
            let local = match offset {
                Some(offset) => ctx.now.with_timezone(offset),
                None => ctx.now,
            };
            return Some(atom.operator.holds(local.time().cmp(time)));
        }
        _ => {}
    }

    let value: Cow<Value> = match AttributeKind::of(&atom.attribute) {
        Some(kind) if kind.is_clock() => Cow::Owned(clock_value(&atom.attribute, ctx)?),
        _ => Cow::Borrowed(subject.get(&atom.attribute)?),
    };

    if atom.length {
        let len = value.as_list()?.len() as i64;
        return match &atom.operand {
            Operand::Value(Value::Number(n)) => Some(atom.operator.holds(len.cmp(n))),
            _ => Some(false),
        };
    }

    match &atom.operand {
        Operand::Pattern(pattern) => Some(match value.as_ref() {
            Value::Text(s) => pattern.0.is_match(s),
            Value::List(items) => items.iter().any(|i| pattern.0.is_match(i)),
            _ => false,
        }),
        Operand::Value(expected) => Some(compare_values(atom.operator, &value, expected)),
        _ => Some(false),
    }
}

fn compare_values(op: Operator, actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::List(items), Value::Text(x)) => {
            let contains = items.iter().any(|i| i == x);
            match op {
                Operator::Eq => contains,
                Operator::Ne => !contains,
                _ => false,
            }
        }
        (Value::Text(a), Value::Text(b)) => op.holds(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => op.holds(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => op.holds(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => op.holds(a.cmp(b)),
        (Value::DayOfWeek(a), Value::DayOfWeek(b))
        | (Value::DayOfMonth(a), Value::DayOfMonth(b))
        | (Value::Month(a), Value::Month(b)) => op.holds(a.cmp(b)),
        (Value::Year(a), Value::Year(b)) => op.holds(a.cmp(b)),
        _ => {
            log::debug!("cannot compare {:?} with {:?}", actual, expected);
            false
        }
    }
}

/// value of a clock attribute at the context moment
fn clock_value(attribute: &str, ctx: &EvalContext) -> Option<Value> {
    let now = ctx.now;
    match attribute {
        "current-timestamp" => Some(Value::Timestamp(now)),
        "current-day" => Some(Value::DayOfMonth(now.day() as u8)),
        "current-month" => Some(Value::Month(now.month() as u8)),
        "current-year" => Some(Value::Year(now.year())),
        "current-day-of-week" => Some(Value::DayOfWeek(now.weekday().number_from_monday() as u8)),
        "current-time" => Some(Value::TimeOfDay(now.time())),
        _ => None,
    }
}
