//! Filter values: JSON literals and regular expressions
//!
//! A value token is either a regular expression delimited by `/.../` (the
//! closing slash may be omitted at the end of the input) or a JSON literal.
//! Extractors return the same [`Value`] type, so comparisons are a closed
//! match over value shapes.

use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A value token that could not be parsed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid value '{token}': {reason}")]
pub struct ValueError {
    /// The offending token
    pub token: String,
    /// Why the token was rejected
    pub reason: String,
}

impl ValueError {
    fn new(token: &str, reason: impl fmt::Display) -> Self {
        Self {
            token: token.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A parsed filter value or an extracted field value
#[derive(Debug, Clone)]
pub enum Value {
    /// JSON `null`, also used for absent fields
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value
    Number(serde_json::Number),
    /// String value
    String(String),
    /// Array of values
    List(Vec<Value>),
    /// Object with string keys
    Map(BTreeMap<String, Value>),
    /// Regular expression
    Pattern(Regex),
}

impl Value {
    /// Parse a value token
    ///
    /// An empty (or all-whitespace) token parses to `None`.
    pub fn parse(token: &str) -> Result<Option<Value>, ValueError> {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        if let Some(body) = trimmed.strip_prefix('/') {
            let pattern = body.strip_suffix('/').unwrap_or(body);
            let regex = Regex::new(pattern).map_err(|e| ValueError::new(trimmed, e))?;
            return Ok(Some(Value::Pattern(regex)));
        }

        let json: serde_json::Value =
            serde_json::from_str(trimmed).map_err(|e| ValueError::new(trimmed, e))?;
        Ok(Some(Value::from(json)))
    }

    /// Short name of the value's shape, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "array",
            Value::Map(_) => "object",
            Value::Pattern(_) => "regex",
        }
    }

    /// Textual form of a scalar value, `None` for null and containers
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Pattern(r) => Some(r.as_str().to_string()),
            Value::Null | Value::List(_) | Value::Map(_) => None,
        }
    }

    /// Ordering between two scalars of the same shape
    ///
    /// Numbers compare numerically and strings lexically; every other pairing
    /// is unordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Test a field against this value as a regular expression
    ///
    /// Scalar fields are matched on their textual form, list fields match when
    /// any element does. Null and object fields never match.
    pub fn is_match(&self, field: &Value) -> bool {
        let Value::Pattern(regex) = self else {
            return false;
        };
        match field {
            Value::List(items) => items.iter().any(|item| self.is_match(item)),
            Value::Map(_) => false,
            other => other.as_text().is_some_and(|text| regex.is_match(&text)),
        }
    }

    /// Membership test of a field in this value
    ///
    /// Arrays test element equality, objects test their keys and strings test
    /// for a substring.
    pub fn contains(&self, field: &Value) -> bool {
        match (self, field) {
            (Value::List(items), _) => items.iter().any(|item| item == field),
            (Value::Map(map), Value::String(key)) => map.contains_key(key),
            (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
            _ => false,
        }
    }

    /// Check if this object has the field as a key
    pub fn has_key(&self, field: &Value) -> bool {
        match (self, field) {
            (Value::Map(map), Value::String(key)) => map.contains_key(key),
            _ => false,
        }
    }

    /// Check if this object has the field among its values
    pub fn has_value(&self, field: &Value) -> bool {
        match self {
            Value::Map(map) => map.values().any(|v| v == field),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => a == b,
            },
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Pattern(a), Value::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{:?}:{}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Pattern(r) => write!(f, "/{}/", r.as_str()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}
