//! condition parser - converts rule text and JSON groups to the condition tree
//!
//! supports:
//! - string conditions: `[-][#]attribute<operator>value`
//! - operators: =, :, !=, ≠, <, <=, ≤, >, >=, ≥, ~= (regex)
//! - bare boolean attributes: `draft`, `-draft`
//! - groups: `{"or": [...]}`, `{"and": [...]}`, nested freely
//! - implicit AND for the top-level list

use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value as JsonValue;

use super::attributes::{suggest, AttributeKind};
use super::error::ConditionError;
use super::schedule::{parse_offset, parse_time, parse_weekday, Schedule};
use super::types::{AtomicCondition, Condition, Operand, Operator, Pattern, Value};

lazy_static! {
    /// `[-][#]attribute[<op>value]`
    static ref CONDITION_RE: Regex = Regex::new(
        r"^(-)?(#)?([a-z][a-z0-9-]*)\s*(?:(!=|<=|>=|~=|=|:|<|>|≠|≤|≥)\s*(.*))?$"
    )
    .expect("condition grammar is a valid regex");
}

/// location used for errors of a standalone expression
const STANDALONE: &str = "condition";

/// an immutable, validated rule tree
///
/// built once per rule definition and shared read-only across subjects
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSet {
    root: Condition,
}

impl ConditionSet {
    /// build a tree from the rule's condition list
    ///
    /// the list is an implicit AND; a list made of a single `or` group
    /// becomes that group. the first invalid entry aborts the build.
    pub fn build(inputs: &[JsonValue]) -> Result<Self, ConditionError> {
        let mut conditions = inputs
            .iter()
            .enumerate()
            .map(|(i, v)| parse_condition(v, &format!("conditions[{}]", i), false))
            .collect::<Result<Vec<_>, _>>()?;

        let root = if matches!(conditions.as_slice(), [Condition::Any(_)])
            && is_or_group(&inputs[0])
        {
            conditions.remove(0)
        } else {
            Condition::All(conditions)
        };

        log::trace!("built condition tree: {}", root);
        Ok(Self { root })
    }

    /// build a tree from plain string conditions
    pub fn from_strs(inputs: &[&str]) -> Result<Self, ConditionError> {
        let values: Vec<JsonValue> = inputs
            .iter()
            .map(|s| JsonValue::String(s.to_string()))
            .collect();
        Self::build(&values)
    }

    pub fn root(&self) -> &Condition {
        &self.root
    }

    /// the conditions as listed by the rule author, for summaries
    pub fn top_level(&self) -> &[Condition] {
        match &self.root {
            Condition::All(children) => children,
            other => std::slice::from_ref(other),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.top_level().is_empty()
    }

    /// every atomic condition in input order
    pub fn atoms(&self) -> Vec<&AtomicCondition> {
        self.root.atoms()
    }
}

fn is_or_group(json: &JsonValue) -> bool {
    json.as_object()
        .map(|obj| obj.len() == 1 && obj.contains_key("or"))
        .unwrap_or(false)
}

fn parse_condition(
    json: &JsonValue,
    location: &str,
    in_any: bool,
) -> Result<Condition, ConditionError> {
    match json {
        JsonValue::String(s) => {
            let atom = parse_atomic(s).map_err(|e| e.at(location))?;
            if in_any && atom.negated {
                return Err(ConditionError::UnsupportedCombination {
                    expression: atom.raw,
                    location: location.to_string(),
                });
            }
            Ok(Condition::Atomic(atom))
        }
        JsonValue::Object(obj) => {
            let expression = json.to_string();
            let (key, value) = match obj.iter().next() {
                Some(entry) if obj.len() == 1 => entry,
                _ => {
                    return Err(ConditionError::configuration(
                        expression,
                        location,
                        "a group must have exactly one key, `or` or `and`",
                    ))
                }
            };

            let is_or = match key.as_str() {
                "or" => true,
                "and" => false,
                other => {
                    return Err(ConditionError::configuration(
                        expression,
                        location,
                        format!("unknown group `{}`: expected `or` or `and`", other),
                    ))
                }
            };

            let items = match value.as_array() {
                Some(items) if !items.is_empty() => items,
                Some(_) => {
                    return Err(ConditionError::configuration(
                        expression,
                        location,
                        format!("`{}` needs at least one condition", key),
                    ))
                }
                None => {
                    return Err(ConditionError::configuration(
                        expression,
                        location,
                        format!("`{}` must be an array", key),
                    ))
                }
            };

            let children = items
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    parse_condition(v, &format!("{}.{}[{}]", location, key, i), in_any || is_or)
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok(if is_or {
                Condition::Any(children)
            } else {
                Condition::All(children)
            })
        }
        other => Err(ConditionError::configuration(
            other.to_string(),
            location,
            "expected a condition string or an `or`/`and` group",
        )),
    }
}

/// parse one string condition like `check-success=ci` or `-label=wip`
pub fn parse_atomic(expression: &str) -> Result<AtomicCondition, ConditionError> {
    let raw = expression.trim();
    let invalid = |message: String| ConditionError::configuration(raw, STANDALONE, message);

    let caps = CONDITION_RE.captures(raw).ok_or_else(|| {
        invalid("expected `[-][#]attribute<operator>value`".to_string())
    })?;

    let negated = caps.get(1).is_some();
    let length = caps.get(2).is_some();
    let attribute = &caps[3];

    let kind = AttributeKind::of(attribute).ok_or_else(|| ConditionError::Configuration {
        expression: raw.to_string(),
        location: STANDALONE.to_string(),
        message: format!("unknown attribute `{}`", attribute),
        suggestions: suggest(attribute),
    })?;

    if length && kind != AttributeKind::List {
        return Err(invalid(format!(
            "`#` only applies to list attributes, `{}` is {}",
            attribute, kind
        )));
    }

    let (operator, operand) = match caps.get(4) {
        None if kind == AttributeKind::Bool && !length => {
            (Operator::Eq, Operand::Value(Value::Bool(true)))
        }
        None => return Err(invalid("missing operator and value".to_string())),
        Some(token) => {
            let operator = Operator::parse(token.as_str())
                .ok_or_else(|| invalid(format!("unknown operator `{}`", token.as_str())))?;
            let text = caps.get(5).map(|m| m.as_str().trim()).unwrap_or("");
            if text.is_empty() {
                return Err(invalid("missing value".to_string()));
            }
            let operand = parse_operand(attribute, kind, length, operator, text).map_err(invalid)?;
            (operator, operand)
        }
    };

    Ok(AtomicCondition {
        negated,
        attribute: attribute.to_string(),
        length,
        operator,
        operand,
        raw: raw.to_string(),
    })
}

fn parse_operand(
    attribute: &str,
    kind: AttributeKind,
    length: bool,
    operator: Operator,
    text: &str,
) -> Result<Operand, String> {
    let illegal = || {
        format!(
            "operator `{}` is not valid for {} attribute `{}`",
            operator, kind, attribute
        )
    };

    if length {
        if operator == Operator::Regex {
            return Err(illegal());
        }
        return parse_integer(text).map(|n| Operand::Value(Value::Number(n)));
    }

    if operator == Operator::Regex {
        if !matches!(kind, AttributeKind::Text | AttributeKind::List) {
            return Err(illegal());
        }
        return Regex::new(text)
            .map(|re| Operand::Pattern(Pattern(re)))
            .map_err(|e| format!("invalid regex: {}", e));
    }

    if operator.is_ordering() && !kind.is_ordered() {
        return Err(illegal());
    }

    let value = match kind {
        AttributeKind::Text | AttributeKind::List => Value::Text(text.to_string()),
        AttributeKind::Number => Value::Number(parse_integer(text)?),
        AttributeKind::Bool => match text.to_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err(format!("expected true or false, got `{}`", text)),
        },
        AttributeKind::TimeOfDay => {
            let (time, offset) = parse_time_of_day(text)?;
            return Ok(Operand::TimeOfDay(time, offset));
        }
        AttributeKind::Timestamp => Value::Timestamp(parse_timestamp(text)?),
        AttributeKind::DayOfWeek => Value::DayOfWeek(parse_day_of_week(text)?),
        AttributeKind::DayOfMonth => Value::DayOfMonth(parse_bounded(text, 1, 31)? as u8),
        AttributeKind::Month => Value::Month(parse_month(text)?),
        AttributeKind::Year => Value::Year(parse_bounded(text, 1900, 9999)? as i32),
        AttributeKind::Schedule => {
            return Schedule::parse(text)
                .map(Operand::Schedule)
                .map_err(|e| format!("invalid schedule: {}", e));
        }
    };

    Ok(Operand::Value(value))
}

fn parse_integer(text: &str) -> Result<i64, String> {
    text.parse::<i64>()
        .map_err(|_| format!("expected an integer, got `{}`", text))
}

fn parse_bounded(text: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = parse_integer(text)?;
    if n < min || n > max {
        return Err(format!("{} is out of range ({}-{})", n, min, max));
    }
    Ok(n)
}

/// `HH:MM` with an optional `[zone]` suffix
fn parse_time_of_day(text: &str) -> Result<(NaiveTime, Option<FixedOffset>), String> {
    let (time, offset) = match text.strip_suffix(']').and_then(|t| t.rsplit_once('[')) {
        Some((time, zone)) => {
            let offset =
                parse_offset(zone).ok_or_else(|| format!("invalid utc offset `{}`", zone))?;
            (time.trim(), Some(offset))
        }
        None => (text, None),
    };

    let minutes = parse_time(time).ok_or_else(|| format!("invalid time `{}`", time))?;
    let time = NaiveTime::from_hms_opt(u32::from(minutes / 60), u32::from(minutes % 60), 0)
        .ok_or_else(|| format!("invalid time `{}`", time))?;
    Ok((time, offset))
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS]` read as UTC
fn parse_timestamp(text: &str) -> Result<DateTime<FixedOffset>, String> {
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Ok(t);
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc().fixed_offset())
        .ok_or_else(|| format!("invalid timestamp `{}`", text))
}

fn parse_day_of_week(text: &str) -> Result<u8, String> {
    if let Some(day) = parse_weekday(text) {
        return Ok(day.number_from_monday() as u8);
    }
    parse_bounded(text, 1, 7)
        .map(|n| n as u8)
        .map_err(|_| format!("expected a weekday name or 1-7, got `{}`", text))
}

fn parse_month(text: &str) -> Result<u8, String> {
    if let Ok(month) = text.parse::<chrono::Month>() {
        return Ok(month.number_from_month() as u8);
    }
    parse_bounded(text, 1, 12)
        .map(|n| n as u8)
        .map_err(|_| format!("expected a month name or 1-12, got `{}`", text))
}
