use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::conclusion::GatePolicy;
use crate::conditions::{parse_offset, ConditionError, ConditionSet};

pub const DEFAULT_UTC_OFFSET: &str = "+00:00";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub settings: Settings,
}

impl Config {
    pub fn find_rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }
}

/// a named condition list and how its outcome gates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    #[serde(default)]
    pub gate: Gate,
    /// condition strings and `or`/`and` groups, implicitly AND-ed
    #[serde(default)]
    pub conditions: Vec<JsonValue>,
    /// overrides the flag implied by `gate`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unmatched_conditions_return_failure: Option<bool>,
}

impl Rule {
    pub fn policy(&self) -> GatePolicy {
        match self.unmatched_conditions_return_failure {
            Some(flag) => GatePolicy {
                unmatched_conditions_return_failure: flag,
            },
            None => self.gate.policy(),
        }
    }

    pub fn build(&self) -> Result<ConditionSet, ConditionError> {
        ConditionSet::build(&self.conditions)
    }
}

/// which gate a rule drives
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Gate {
    /// unmatched conditions fail the merge
    #[default]
    Merge,
    /// unmatched conditions keep the queue waiting
    Queue,
}

impl Gate {
    pub fn policy(self) -> GatePolicy {
        match self {
            Gate::Merge => GatePolicy::merge(),
            Gate::Queue => GatePolicy::queue(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// offset used for clock conditions and schedules without their own zone
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

fn default_utc_offset() -> String {
    DEFAULT_UTC_OFFSET.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
        }
    }
}

impl Settings {
    pub fn offset(&self) -> Option<FixedOffset> {
        parse_offset(&self.utc_offset)
    }
}
