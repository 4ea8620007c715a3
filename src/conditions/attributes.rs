//! registry of attribute names and their value kinds

use std::fmt;

use strsim::levenshtein;

use super::types::is_check_attribute;

/// maximum edit distance for "did you mean" suggestions
const SUGGESTION_THRESHOLD: usize = 3;

/// the kind of value an attribute holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Text,
    Number,
    Bool,
    /// list of names compared as a set
    List,
    TimeOfDay,
    Timestamp,
    DayOfWeek,
    DayOfMonth,
    Month,
    Year,
    Schedule,
}

/// every attribute a condition or snapshot may reference
pub const ATTRIBUTES: &[(&str, AttributeKind)] = &[
    ("number", AttributeKind::Number),
    ("base", AttributeKind::Text),
    ("head", AttributeKind::Text),
    ("author", AttributeKind::Text),
    ("title", AttributeKind::Text),
    ("body", AttributeKind::Text),
    ("milestone", AttributeKind::Text),
    ("merged-by", AttributeKind::Text),
    ("draft", AttributeKind::Bool),
    ("merged", AttributeKind::Bool),
    ("closed", AttributeKind::Bool),
    ("locked", AttributeKind::Bool),
    ("conflict", AttributeKind::Bool),
    ("label", AttributeKind::List),
    ("assignee", AttributeKind::List),
    ("files", AttributeKind::List),
    ("approved-reviews-by", AttributeKind::List),
    ("changes-requested-reviews-by", AttributeKind::List),
    ("commented-reviews-by", AttributeKind::List),
    ("review-requested", AttributeKind::List),
    ("check", AttributeKind::List),
    ("check-success", AttributeKind::List),
    ("check-failure", AttributeKind::List),
    ("check-pending", AttributeKind::List),
    ("check-neutral", AttributeKind::List),
    ("check-skipped", AttributeKind::List),
    ("check-success-or-neutral", AttributeKind::List),
    ("check-success-or-neutral-or-pending", AttributeKind::List),
    ("status-success", AttributeKind::List),
    ("status-failure", AttributeKind::List),
    ("status-neutral", AttributeKind::List),
    ("current-time", AttributeKind::TimeOfDay),
    ("current-timestamp", AttributeKind::Timestamp),
    ("current-day", AttributeKind::DayOfMonth),
    ("current-month", AttributeKind::Month),
    ("current-year", AttributeKind::Year),
    ("current-day-of-week", AttributeKind::DayOfWeek),
    ("schedule", AttributeKind::Schedule),
];

impl AttributeKind {
    /// look up the kind of a registered attribute
    pub fn of(name: &str) -> Option<Self> {
        ATTRIBUTES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, kind)| *kind)
    }

    /// attributes derived from the evaluation moment rather than a snapshot
    pub fn is_clock(&self) -> bool {
        matches!(
            self,
            AttributeKind::TimeOfDay
                | AttributeKind::Timestamp
                | AttributeKind::DayOfWeek
                | AttributeKind::DayOfMonth
                | AttributeKind::Month
                | AttributeKind::Year
                | AttributeKind::Schedule
        )
    }

    /// kinds whose values can be ordered with <, <=, >, >=
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            AttributeKind::Number
                | AttributeKind::TimeOfDay
                | AttributeKind::Timestamp
                | AttributeKind::DayOfWeek
                | AttributeKind::DayOfMonth
                | AttributeKind::Month
                | AttributeKind::Year
        )
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttributeKind::Text => "text",
            AttributeKind::Number => "number",
            AttributeKind::Bool => "boolean",
            AttributeKind::List => "list",
            AttributeKind::TimeOfDay => "time of day",
            AttributeKind::Timestamp => "timestamp",
            AttributeKind::DayOfWeek => "day of week",
            AttributeKind::DayOfMonth => "day of month",
            AttributeKind::Month => "month",
            AttributeKind::Year => "year",
            AttributeKind::Schedule => "schedule",
        };
        write!(f, "{}", s)
    }
}

/// registered names close to `name`, closest first
pub fn suggest(name: &str) -> Vec<String> {
    let mut candidates: Vec<_> = ATTRIBUTES
        .iter()
        .map(|(n, _)| (*n, levenshtein(name, n)))
        .filter(|(_, distance)| *distance <= SUGGESTION_THRESHOLD)
        .collect();

    candidates.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    candidates.into_iter().map(|(n, _)| n.to_string()).collect()
}

/// attributes whose value is the same for every pull request of a queued
/// batch; queue summaries render them as a single checkbox
pub fn is_shared(name: &str) -> bool {
    name == "base"
        || is_check_attribute(name)
        || AttributeKind::of(name).map(|k| k.is_clock()).unwrap_or(false)
}
