//! per-subject attribute snapshots
//!
//! a snapshot is the read-only view of one pull request handed to the
//! evaluator. values are validated against the attribute registry when
//! inserted, so evaluation never sees a mistyped attribute.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::conditions::{suggest, AttributeKind, Value};

/// buckets merged into `check`
const CHECK_BUCKETS: &[&str] = &[
    "check-success",
    "check-neutral",
    "check-pending",
    "check-failure",
    "check-skipped",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("unknown attribute `{name}`{}", format_suggestions(.suggestions))]
    UnknownAttribute {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("attribute `{name}` expects a {expected} value, got {found}")]
    KindMismatch {
        name: String,
        expected: AttributeKind,
        found: String,
    },

    #[error("attribute `{0}` is derived from the evaluation time and cannot be set")]
    ClockAttribute(String),

    #[error("expected a JSON object of attributes, got {0}")]
    NotAnObject(String),
}

fn format_suggestions(suggestions: &[String]) -> String {
    match suggestions.first() {
        Some(s) => format!(" (did you mean `{}`?)", s),
        None => String::new(),
    }
}

/// typed attribute values of one subject
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    attributes: BTreeMap<String, Value>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// set an attribute, replacing any previous value
    pub fn insert(&mut self, name: &str, value: Value) -> Result<(), SnapshotError> {
        let kind = AttributeKind::of(name).ok_or_else(|| SnapshotError::UnknownAttribute {
            name: name.to_string(),
            suggestions: suggest(name),
        })?;

        if kind.is_clock() {
            return Err(SnapshotError::ClockAttribute(name.to_string()));
        }

        let fits = matches!(
            (kind, &value),
            (AttributeKind::Text, Value::Text(_))
                | (AttributeKind::Number, Value::Number(_))
                | (AttributeKind::Bool, Value::Bool(_))
                | (AttributeKind::List, Value::List(_))
        );
        if !fits {
            return Err(SnapshotError::KindMismatch {
                name: name.to_string(),
                expected: kind,
                found: value.to_string(),
            });
        }

        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    /// builder form of `insert`
    pub fn with(mut self, name: &str, value: Value) -> Result<Self, SnapshotError> {
        self.insert(name, value)?;
        Ok(self)
    }

    /// build from a JSON object; `null` values are treated as absent
    pub fn from_json(json: &JsonValue) -> Result<Self, SnapshotError> {
        let object = json
            .as_object()
            .ok_or_else(|| SnapshotError::NotAnObject(json_type(json).to_string()))?;

        let mut snapshot = Self::new();
        for (name, raw) in object {
            if raw.is_null() {
                continue;
            }
            let kind = AttributeKind::of(name).ok_or_else(|| SnapshotError::UnknownAttribute {
                name: name.clone(),
                suggestions: suggest(name),
            })?;
            if kind.is_clock() {
                return Err(SnapshotError::ClockAttribute(name.clone()));
            }
            let value = value_from_json(raw, kind).ok_or_else(|| SnapshotError::KindMismatch {
                name: name.clone(),
                expected: kind,
                found: json_type(raw).to_string(),
            })?;
            snapshot.insert(name, value)?;
        }
        Ok(snapshot)
    }

    /// recompute the derived check buckets from the primary ones
    ///
    /// - `check`: success, neutral, pending, failure and skipped
    /// - `check-success-or-neutral-or-pending`: success, neutral and pending
    /// - `check-success-or-neutral`: success and neutral
    pub fn sync_checks(&mut self) {
        let merged = |snapshot: &Self, buckets: &[&str]| {
            let mut out: Vec<String> = Vec::new();
            for bucket in buckets {
                for name in snapshot.list(bucket) {
                    if !out.contains(name) {
                        out.push(name.clone());
                    }
                }
            }
            Value::List(out)
        };

        let all = merged(self, CHECK_BUCKETS);
        let ok_or_pending = merged(self, &CHECK_BUCKETS[..3]);
        let ok = merged(self, &CHECK_BUCKETS[..2]);

        self.attributes.insert("check".to_string(), all);
        self.attributes
            .insert("check-success-or-neutral-or-pending".to_string(), ok_or_pending);
        self.attributes
            .insert("check-success-or-neutral".to_string(), ok);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// the list held by `name`, empty when absent
    pub fn list(&self, name: &str) -> &[String] {
        self.get(name).and_then(Value::as_list).unwrap_or(&[])
    }

    /// `#<number>`, used to label per-subject summary lines
    pub fn label(&self) -> Option<String> {
        self.get("number")
            .and_then(Value::as_i64)
            .map(|n| format!("#{}", n))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

fn value_from_json(raw: &JsonValue, kind: AttributeKind) -> Option<Value> {
    match kind {
        AttributeKind::Text => raw.as_str().map(|s| Value::Text(s.to_string())),
        AttributeKind::Number => raw.as_i64().map(Value::Number),
        AttributeKind::Bool => raw.as_bool().map(Value::Bool),
        AttributeKind::List => raw
            .as_array()?
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(Value::List),
        _ => None,
    }
}

fn json_type(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
