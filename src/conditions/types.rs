//! core types for the condition system

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveTime};
use regex::Regex;
use serde::Serialize;

use super::schedule::Schedule;

/// comparison operators supported in conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// equality or list membership: =, :
    Eq,
    /// inequality or list non-membership: !=, ≠
    Ne,
    /// less than: <
    Lt,
    /// less than or equal: <=, ≤
    Le,
    /// greater than: >
    Gt,
    /// greater than or equal: >=, ≥
    Ge,
    /// regex search: ~=
    Regex,
}

impl Operator {
    /// parse operator from its token (supports all forms)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "=" | ":" => Some(Operator::Eq),
            "!=" | "≠" => Some(Operator::Ne),
            "<" => Some(Operator::Lt),
            "<=" | "≤" => Some(Operator::Le),
            ">" => Some(Operator::Gt),
            ">=" | "≥" => Some(Operator::Ge),
            "~=" => Some(Operator::Regex),
            _ => None,
        }
    }

    /// true for the four ordering operators
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge
        )
    }

    /// apply this operator to an ordering between actual and expected
    pub(crate) fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Operator::Eq => ordering == Equal,
            Operator::Ne => ordering != Equal,
            Operator::Lt => ordering == Less,
            Operator::Le => ordering != Greater,
            Operator::Gt => ordering == Greater,
            Operator::Ge => ordering != Less,
            Operator::Regex => false,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Eq => write!(f, "="),
            Operator::Ne => write!(f, "!="),
            Operator::Lt => write!(f, "<"),
            Operator::Le => write!(f, "<="),
            Operator::Gt => write!(f, ">"),
            Operator::Ge => write!(f, ">="),
            Operator::Regex => write!(f, "~="),
        }
    }
}

/// a compiled `~=` pattern, compared by its source text
#[derive(Debug, Clone)]
pub struct Pattern(pub Regex);

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

/// a typed attribute value
///
/// snapshots only ever hold `Text`, `Number`, `Bool` and `List`; the clock
/// variants are produced from the evaluation moment.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(i64),
    Bool(bool),
    /// ordered list of names, compared as a set
    List(Vec<String>),
    Timestamp(DateTime<FixedOffset>),
    TimeOfDay(NaiveTime),
    /// 1 (monday) to 7 (sunday)
    DayOfWeek(u8),
    DayOfMonth(u8),
    Month(u8),
    Year(i32),
}

impl Value {
    /// try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// try to get as list
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// try to get as integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::List(l) => write!(f, "[{}]", l.join(", ")),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Value::TimeOfDay(t) => write!(f, "{}", t.format("%H:%M")),
            Value::DayOfWeek(d) | Value::DayOfMonth(d) | Value::Month(d) => write!(f, "{}", d),
            Value::Year(y) => write!(f, "{}", y),
        }
    }
}

/// the right-hand side of an atomic condition, typed at parse time
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// plain value compared against the attribute
    Value(Value),
    /// time of day, optionally pinned to its own utc offset
    TimeOfDay(NaiveTime, Option<FixedOffset>),
    /// compiled pattern for `~=`
    Pattern(Pattern),
    /// weekly time window
    Schedule(Schedule),
}

/// a single attribute comparison, optionally negated
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicCondition {
    /// leading `-`
    pub negated: bool,
    /// attribute name (e.g., "check-success", "current-day-of-week")
    pub attribute: String,
    /// leading `#`: compare the length of a list attribute
    pub length: bool,
    pub operator: Operator,
    pub operand: Operand,
    /// the expression as written by the rule author
    pub raw: String,
}

impl AtomicCondition {
    /// true for `check-*` and `status-*` attributes
    pub fn is_check(&self) -> bool {
        is_check_attribute(&self.attribute)
    }

    /// the check name referenced by an `=`/`!=` check condition
    pub fn check_name(&self) -> Option<&str> {
        if !self.is_check() || self.length {
            return None;
        }
        match (&self.operator, &self.operand) {
            (Operator::Eq | Operator::Ne, Operand::Value(Value::Text(name))) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for AtomicCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// true for `check-*` and `status-*` attributes
pub fn is_check_attribute(name: &str) -> bool {
    name == "check" || name.starts_with("check-") || name.starts_with("status-")
}

/// the condition tree
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// a single comparison
    Atomic(AtomicCondition),
    /// all conditions must match (AND)
    All(Vec<Condition>),
    /// any condition must match (OR)
    Any(Vec<Condition>),
}

impl Condition {
    /// label used for group header lines in summaries
    pub fn label(&self) -> String {
        match self {
            Condition::Atomic(a) => a.raw.clone(),
            Condition::All(_) => "and".to_string(),
            Condition::Any(_) => "or".to_string(),
        }
    }

    /// visit every atomic condition in input order
    pub fn atoms(&self) -> Vec<&AtomicCondition> {
        let mut out = Vec::new();
        self.collect_atoms(&mut out);
        out
    }

    fn collect_atoms<'a>(&'a self, out: &mut Vec<&'a AtomicCondition>) {
        match self {
            Condition::Atomic(a) => out.push(a),
            Condition::All(children) | Condition::Any(children) => {
                for c in children {
                    c.collect_atoms(out);
                }
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Atomic(a) => write!(f, "{}", a),
            Condition::All(conditions) | Condition::Any(conditions) => {
                write!(f, "{}(", self.label())?;
                for (i, c) in conditions.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// tri-state outcome of a condition for one subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    Matched,
    NotMatched,
    /// not yet determinable (kleene "unknown")
    Pending,
}

impl MatchResult {
    pub fn from_bool(b: bool) -> Self {
        if b {
            MatchResult::Matched
        } else {
            MatchResult::NotMatched
        }
    }

    /// negation swaps matched and not matched; pending stays pending
    pub fn negate(self) -> Self {
        match self {
            MatchResult::Matched => MatchResult::NotMatched,
            MatchResult::NotMatched => MatchResult::Matched,
            MatchResult::Pending => MatchResult::Pending,
        }
    }

    /// kleene AND
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (MatchResult::NotMatched, _) | (_, MatchResult::NotMatched) => MatchResult::NotMatched,
            (MatchResult::Pending, _) | (_, MatchResult::Pending) => MatchResult::Pending,
            _ => MatchResult::Matched,
        }
    }

    /// kleene OR
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (MatchResult::Matched, _) | (_, MatchResult::Matched) => MatchResult::Matched,
            (MatchResult::Pending, _) | (_, MatchResult::Pending) => MatchResult::Pending,
            _ => MatchResult::NotMatched,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, MatchResult::Matched)
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchResult::Matched => write!(f, "matched"),
            MatchResult::NotMatched => write!(f, "not matched"),
            MatchResult::Pending => write!(f, "pending"),
        }
    }
}
