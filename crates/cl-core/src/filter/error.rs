//! Error types for the filter compiler.

use thiserror::Error;

use crate::value::ValueError;

/// Errors that can occur while compiling a filter expression.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    /// The filter expression is empty.
    #[error("filter expression is empty")]
    EmptyExpression,

    /// The expression does not follow `[!] [extractor [operator]] value`.
    #[error("invalid filter '{expression}': {reason}")]
    Syntax {
        /// The whole expression.
        expression: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The value token could not be parsed.
    #[error("invalid filter value: {0}")]
    InvalidValue(#[from] ValueError),

    /// The comparison is not defined for the value's type.
    #[error("operator '{operator}' is not supported for {kind} value {value}")]
    UnsupportedOperator {
        /// The operator as written, or the implied comparison name.
        operator: String,
        /// Shape of the parsed value.
        kind: &'static str,
        /// The parsed value.
        value: String,
    },

    /// The named extractor is not in the extractor table.
    #[error("unknown extractor '{name}'")]
    UnknownExtractor {
        /// The extractor name as written.
        name: String,
    },

    /// No extractor was named and the table has no default.
    #[error("no extractor given and no default extractor defined")]
    NoDefaultExtractor,

    /// The extractor table has no entries.
    #[error("no extractors defined")]
    NoExtractors,
}

impl FilterError {
    /// Creates a syntax error for an expression.
    pub fn syntax(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        FilterError::Syntax {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unknown extractor error.
    pub fn unknown_extractor(name: impl Into<String>) -> Self {
        FilterError::UnknownExtractor { name: name.into() }
    }
}
