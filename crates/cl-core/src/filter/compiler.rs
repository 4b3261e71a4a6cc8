//! Compiler from filter expression text to a [`FilterSpec`].
//!
//! # Grammar
//!
//! ```text
//! expression ::= ["!"] [extractor [operator]] value
//! extractor  ::= [A-Za-z_][A-Za-z0-9_]*
//! operator   ::= "<" | "<=" | "==" | "!=" | ">=" | ">" | "~" | "=~" | "!~"
//!              | "in" | "keyin" | "valuein"
//! value      ::= JSON literal | "/" regex ["/"]
//! ```
//!
//! The value consumes the rest of the expression. Comparisons are applied as
//! `value.method(field)`, so `year < 2016` evaluates `2016 > year`.

use std::cmp::Ordering;

use super::error::FilterError;
use super::extractor::ExtractorTable;
use crate::value::Value;

/// A comparison method applied to the parsed value with the field as argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Matches,
    Contains,
    HasKey,
    HasValue,
}

impl Comparison {
    /// Method name, used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Comparison::Equals => "equals",
            Comparison::NotEquals => "not_equals",
            Comparison::GreaterThan => "greater_than",
            Comparison::GreaterOrEqual => "greater_or_equal",
            Comparison::LessThan => "less_than",
            Comparison::LessOrEqual => "less_or_equal",
            Comparison::Matches => "matches",
            Comparison::Contains => "contains",
            Comparison::HasKey => "has_key",
            Comparison::HasValue => "has_value",
        }
    }

    /// The comparison used when no operator is written
    pub fn default_for(value: &Value) -> Self {
        match value {
            Value::List(_) | Value::Map(_) => Comparison::Contains,
            Value::Pattern(_) => Comparison::Matches,
            _ => Comparison::Equals,
        }
    }

    /// Check if the comparison is defined for the value's shape
    pub fn supports(self, value: &Value) -> bool {
        match self {
            Comparison::Equals | Comparison::NotEquals => true,
            Comparison::GreaterThan
            | Comparison::GreaterOrEqual
            | Comparison::LessThan
            | Comparison::LessOrEqual => matches!(value, Value::Number(_) | Value::String(_)),
            Comparison::Matches => matches!(value, Value::Pattern(_)),
            Comparison::Contains => {
                matches!(value, Value::List(_) | Value::Map(_) | Value::String(_))
            }
            Comparison::HasKey | Comparison::HasValue => matches!(value, Value::Map(_)),
        }
    }

    /// Apply the comparison as `value.method(field)`
    pub fn apply(self, value: &Value, field: &Value) -> bool {
        match self {
            Comparison::Equals => value == field,
            Comparison::NotEquals => value != field,
            Comparison::GreaterThan => value.compare(field) == Some(Ordering::Greater),
            Comparison::GreaterOrEqual => {
                matches!(value.compare(field), Some(Ordering::Greater | Ordering::Equal))
            }
            Comparison::LessThan => value.compare(field) == Some(Ordering::Less),
            Comparison::LessOrEqual => {
                matches!(value.compare(field), Some(Ordering::Less | Ordering::Equal))
            }
            Comparison::Matches => value.is_match(field),
            Comparison::Contains => value.contains(field),
            Comparison::HasKey => value.has_key(field),
            Comparison::HasValue => value.has_value(field),
        }
    }
}

/// An operator as written in a filter expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
    Tilde,
    MatchEq,
    NotMatch,
    In,
    KeyIn,
    ValueIn,
}

/// Symbolic operators, longest first so that `<=` wins over `<`
const SYMBOLIC_OPERATORS: &[(&str, Operator)] = &[
    ("<=", Operator::Le),
    (">=", Operator::Ge),
    ("==", Operator::Eq),
    ("!=", Operator::Ne),
    ("=~", Operator::MatchEq),
    ("!~", Operator::NotMatch),
    ("<", Operator::Lt),
    (">", Operator::Gt),
    ("~", Operator::Tilde),
];

impl Operator {
    /// The operator's text
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Ge => ">=",
            Operator::Gt => ">",
            Operator::Tilde => "~",
            Operator::MatchEq => "=~",
            Operator::NotMatch => "!~",
            Operator::In => "in",
            Operator::KeyIn => "keyin",
            Operator::ValueIn => "valuein",
        }
    }

    /// The comparison invoked on the value
    pub fn comparison(self) -> Comparison {
        match self {
            Operator::Lt => Comparison::GreaterThan,
            Operator::Le => Comparison::GreaterOrEqual,
            Operator::Eq => Comparison::Equals,
            Operator::Ne => Comparison::NotEquals,
            Operator::Ge => Comparison::LessOrEqual,
            Operator::Gt => Comparison::LessThan,
            Operator::Tilde | Operator::MatchEq | Operator::NotMatch => Comparison::Matches,
            Operator::In => Comparison::Contains,
            Operator::KeyIn => Comparison::HasKey,
            Operator::ValueIn => Comparison::HasValue,
        }
    }

    /// Whether the operator negates its comparison
    pub fn negates(self) -> bool {
        matches!(self, Operator::NotMatch)
    }

    fn word(word: &str) -> Option<Self> {
        match word {
            "in" => Some(Operator::In),
            "keyin" => Some(Operator::KeyIn),
            "valuein" => Some(Operator::ValueIn),
            _ => None,
        }
    }

    /// Split a leading symbolic operator off `input`
    fn strip_symbolic(input: &str) -> Option<(Self, &str)> {
        SYMBOLIC_OPERATORS
            .iter()
            .find_map(|(symbol, op)| input.strip_prefix(symbol).map(|rest| (*op, rest)))
    }
}

/// A compiled filter expression
///
/// Immutable once built; bind it to an extractor with
/// [`Filter::new`](super::Filter::new) or compile straight to a filter with
/// [`ExtractorTable::compile`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    /// The expression as written
    pub source: String,
    /// The parsed value
    pub value: Value,
    /// The comparison applied to the value
    pub comparison: Comparison,
    /// The operator as written, if any
    pub operator: Option<Operator>,
    /// The extractor name as written, `None` for the table default
    pub extractor: Option<String>,
    /// Effective negation: leading `!` XOR the operator's own negation
    pub negate: bool,
}

impl FilterSpec {
    /// Parse a filter expression, validating it against an extractor table
    ///
    /// # Errors
    ///
    /// Returns a [`FilterError`] if the expression is empty or malformed, the
    /// value cannot be parsed, the operator is not defined for the value, or
    /// the extractor cannot be resolved from `table`.
    pub fn parse<Y, C, K>(
        expression: &str,
        table: &ExtractorTable<Y, C, K>,
    ) -> Result<Self, FilterError> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(FilterError::EmptyExpression);
        }
        if table.is_empty() {
            return Err(FilterError::NoExtractors);
        }

        let (leading_not, rest) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        let (extractor, operator, value_text) = split_expression(trimmed, rest)?;

        let value = Value::parse(value_text)?
            .ok_or_else(|| FilterError::syntax(trimmed, "missing value"))?;

        table.resolve(extractor)?;

        let comparison =
            operator.map_or_else(|| Comparison::default_for(&value), Operator::comparison);
        if !comparison.supports(&value) {
            return Err(FilterError::UnsupportedOperator {
                operator: operator.map_or(comparison.name(), Operator::symbol).to_string(),
                kind: value.kind(),
                value: value.to_string(),
            });
        }

        Ok(Self {
            source: trimmed.to_string(),
            value,
            comparison,
            operator,
            extractor: extractor.map(str::to_string),
            negate: leading_not ^ operator.is_some_and(Operator::negates),
        })
    }

    /// Apply the comparison and negation to an extracted field
    pub fn test(&self, field: &Value) -> bool {
        self.comparison.apply(&self.value, field) ^ self.negate
    }
}

/// Split `rest` into extractor name, operator and value text
fn split_expression<'a>(
    expression: &str,
    rest: &'a str,
) -> Result<(Option<&'a str>, Option<Operator>, &'a str), FilterError> {
    let ident_len = identifier_len(rest);
    let after = &rest[ident_len..];
    if ident_len == 0 || after.trim().is_empty() {
        return Ok((None, None, rest));
    }

    let name = &rest[..ident_len];
    let spaced = after.starts_with(char::is_whitespace);
    let after = after.trim_start();

    if let Some((op, tail)) = Operator::strip_symbolic(after) {
        return Ok((Some(name), Some(op), operator_value(expression, op, tail)?));
    }
    if !spaced {
        return Err(FilterError::syntax(
            expression,
            format!("expected whitespace or an operator after '{}'", name),
        ));
    }

    let word_len = identifier_len(after);
    if let Some(op) = Operator::word(&after[..word_len]) {
        let tail = &after[word_len..];
        if tail.is_empty() || tail.starts_with(char::is_whitespace) {
            return Ok((Some(name), Some(op), operator_value(expression, op, tail)?));
        }
    }

    Ok((Some(name), None, after))
}

fn operator_value<'a>(
    expression: &str,
    op: Operator,
    tail: &'a str,
) -> Result<&'a str, FilterError> {
    let tail = tail.trim();
    if tail.is_empty() {
        return Err(FilterError::syntax(
            expression,
            format!("missing value after operator '{}'", op.symbol()),
        ));
    }
    Ok(tail)
}

/// Byte length of the identifier at the start of `input`, 0 if none
fn identifier_len(input: &str) -> usize {
    let mut chars = input.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map_or(input.len(), |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn table() -> ExtractorTable<(), (), ()> {
        ExtractorTable::new()
            .with("code", |_: &(), _: &(), _: Option<&()>| Value::from("CS101"))
            .with("year", |_: &(), _: &(), _: Option<&()>| Value::from(2016i64))
            .with_default("code")
    }

    fn parse(expr: &str) -> FilterSpec {
        FilterSpec::parse(expr, &table()).unwrap()
    }

    #[test]
    fn test_parse_equals_with_spaces() {
        let spec = parse("code == \"CS101\"");
        assert_eq!(spec.extractor.as_deref(), Some("code"));
        assert_eq!(spec.operator, Some(Operator::Eq));
        assert_eq!(spec.comparison, Comparison::Equals);
        assert_eq!(spec.value, Value::from("CS101"));
        assert!(!spec.negate);
    }

    #[test]
    fn test_parse_without_spaces_around_symbolic_operator() {
        let spec = parse("!code==\"X\"");
        assert_eq!(spec.extractor.as_deref(), Some("code"));
        assert_eq!(spec.operator, Some(Operator::Eq));
        assert!(spec.negate);
    }

    #[test]
    fn test_parse_longest_operator_wins() {
        assert_eq!(parse("year <= 2016").operator, Some(Operator::Le));
        assert_eq!(parse("year >=2016").operator, Some(Operator::Ge));
        assert_eq!(parse("code =~ /^CS/").operator, Some(Operator::MatchEq));
        assert_eq!(parse("code != \"A\"").comparison, Comparison::NotEquals);
    }

    #[test]
    fn test_ordering_operators_map_to_inverted_methods() {
        assert_eq!(parse("year < 2017").comparison, Comparison::GreaterThan);
        assert_eq!(parse("year <= 2017").comparison, Comparison::GreaterOrEqual);
        assert_eq!(parse("year >= 2017").comparison, Comparison::LessOrEqual);
        assert_eq!(parse("year > 2017").comparison, Comparison::LessThan);

        assert!(parse("year < 2017").test(&Value::from(2016i64)));
        assert!(!parse("year < 2017").test(&Value::from(2017i64)));
        assert!(parse("year > 2015").test(&Value::from(2016i64)));
        assert!(parse("year >= 2016").test(&Value::from(2016i64)));
    }

    #[test]
    fn test_parse_word_operators() {
        let spec = parse("code in [\"CS101\", \"CS102\"]");
        assert_eq!(spec.operator, Some(Operator::In));
        assert_eq!(spec.comparison, Comparison::Contains);

        assert_eq!(parse("code keyin {\"A\": \"1\"}").comparison, Comparison::HasKey);
        assert_eq!(parse("code valuein {\"A\": \"1\"}").comparison, Comparison::HasValue);
    }

    #[test]
    fn test_not_match_negates() {
        let spec = parse("code !~ /^CS/");
        assert_eq!(spec.comparison, Comparison::Matches);
        assert!(spec.negate);

        let double = parse("! code !~ /^CS/");
        assert!(!double.negate);
    }

    #[test]
    fn test_default_comparison_by_value_shape() {
        assert_eq!(parse("code [\"A\"]").comparison, Comparison::Contains);
        assert_eq!(parse("code {\"A\": 1}").comparison, Comparison::Contains);
        assert_eq!(parse("code /^CS/").comparison, Comparison::Matches);
        assert_eq!(parse("code \"A\"").comparison, Comparison::Equals);
    }

    #[test]
    fn test_value_only_uses_default_extractor() {
        let spec = parse("\"CS101\"");
        assert_eq!(spec.extractor, None);
        assert_eq!(spec.comparison, Comparison::Equals);

        let spec = parse("! [2015, 2016]");
        assert_eq!(spec.extractor, None);
        assert!(spec.negate);

        let spec = parse("true");
        assert_eq!(spec.value, Value::Bool(true));
    }

    #[test]
    fn test_parse_empty_expression() {
        assert_eq!(
            FilterSpec::parse("   ", &table()),
            Err(FilterError::EmptyExpression)
        );
    }

    #[test]
    fn test_parse_unknown_extractor() {
        let err = FilterSpec::parse("room == \"A\"", &table()).unwrap_err();
        assert_eq!(err, FilterError::unknown_extractor("room"));
        assert!(err.to_string().contains("room"));
    }

    #[test]
    fn test_parse_without_default_extractor() {
        let table: ExtractorTable<(), (), ()> =
            ExtractorTable::new().with("code", |_: &(), _: &(), _: Option<&()>| Value::Null);
        assert_eq!(
            FilterSpec::parse("\"A\"", &table),
            Err(FilterError::NoDefaultExtractor)
        );
        assert!(FilterSpec::parse("code \"A\"", &table).is_ok());
    }

    #[test]
    fn test_parse_with_empty_table() {
        let table: ExtractorTable<(), (), ()> = ExtractorTable::new();
        assert_eq!(
            FilterSpec::parse("code == \"A\"", &table),
            Err(FilterError::NoExtractors)
        );
    }

    #[test]
    fn test_keyin_rejects_array_value() {
        let err = FilterSpec::parse("code keyin [\"A\"]", &table()).unwrap_err();
        match err {
            FilterError::UnsupportedOperator { operator, kind, .. } => {
                assert_eq!(operator, "keyin");
                assert_eq!(kind, "array");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_comparisons_rejected() {
        assert!(FilterSpec::parse("year < [2016]", &table()).is_err());
        assert!(FilterSpec::parse("code ~ \"CS\"", &table()).is_err());
        assert!(FilterSpec::parse("year in 2016", &table()).is_err());
        assert!(FilterSpec::parse("code valuein \"A\"", &table()).is_err());
    }

    #[test]
    fn test_missing_value_after_operator() {
        let err = FilterSpec::parse("code ==", &table()).unwrap_err();
        assert!(matches!(err, FilterError::Syntax { .. }));

        let err = FilterSpec::parse("code in   ", &table()).unwrap_err();
        assert!(matches!(err, FilterError::Syntax { .. }));
    }

    #[test]
    fn test_extractor_glued_to_value_is_syntax_error() {
        let err = FilterSpec::parse("code\"A\"", &table()).unwrap_err();
        assert!(matches!(err, FilterError::Syntax { .. }));
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let err = FilterSpec::parse("code == CS101", &table()).unwrap_err();
        let FilterError::InvalidValue(value_err) = err else {
            panic!("expected invalid value");
        };
        assert_eq!(value_err.token, "CS101");

        assert!(matches!(
            FilterSpec::parse("code ~ /(/", &table()),
            Err(FilterError::InvalidValue(_))
        ));
    }
}
