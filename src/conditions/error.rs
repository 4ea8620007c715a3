//! errors raised while building a condition tree

use thiserror::Error;

/// a rejected rule definition
///
/// both variants are raised at build time, before any subject is evaluated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    /// malformed expression, unknown attribute, illegal operator or operand
    #[error("{location}: invalid condition `{expression}`: {message}")]
    Configuration {
        expression: String,
        location: String,
        message: String,
        /// close attribute names when the attribute is unknown
        suggestions: Vec<String>,
    },

    /// a negated condition inside an `or` group
    #[error("{location}: negated condition `{expression}` inside an `or` group is not supported")]
    UnsupportedCombination { expression: String, location: String },
}

impl ConditionError {
    pub fn configuration(
        expression: impl Into<String>,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ConditionError::Configuration {
            expression: expression.into(),
            location: location.into(),
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    /// relocate an error produced by `parse_atomic` to its place in a rule
    pub(crate) fn at(self, location: &str) -> Self {
        match self {
            ConditionError::Configuration {
                expression,
                message,
                suggestions,
                ..
            } => ConditionError::Configuration {
                expression,
                location: location.to_string(),
                message,
                suggestions,
            },
            ConditionError::UnsupportedCombination { expression, .. } => {
                ConditionError::UnsupportedCombination {
                    expression,
                    location: location.to_string(),
                }
            }
        }
    }

    pub fn expression(&self) -> &str {
        match self {
            ConditionError::Configuration { expression, .. }
            | ConditionError::UnsupportedCombination { expression, .. } => expression,
        }
    }

    pub fn suggestions(&self) -> &[String] {
        match self {
            ConditionError::Configuration { suggestions, .. } => suggestions,
            ConditionError::UnsupportedCombination { .. } => &[],
        }
    }

    pub fn is_unsupported_combination(&self) -> bool {
        matches!(self, ConditionError::UnsupportedCombination { .. })
    }
}
