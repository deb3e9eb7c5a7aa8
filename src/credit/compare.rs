//! Coercing comparison between a recorded trial value and a condition's
//! comparator string.
//!
//! Precedence follows the recorded value: boolean, then numeric, then
//! string. A comparator that cannot be read as the value's type never
//! matches.

use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;

use crate::model::Operator;

/// A comparable operand after coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    /// Boolean operand; `false < true`.
    Bool(bool),
    /// Numeric operand.
    Number(f64),
    /// Raw string operand, ordered lexicographically.
    Text(String),
}

impl PartialOrd for Coerced {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.partial_cmp(b),
            (Self::Number(a), Self::Number(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for Coerced {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Parse a boolean comparator (`true`/`false`/`1`/`0`, any case).
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Coerce a recorded value and a comparator into a comparable pair.
///
/// Returns `None` when the pair cannot be compared (null or structured
/// values, or a comparator that does not parse as the value's type).
#[must_use]
pub fn coerce(value: &Value, comparator: &str) -> Option<(Coerced, Coerced)> {
    match value {
        Value::Bool(b) => Some((Coerced::Bool(*b), Coerced::Bool(parse_bool(comparator)?))),
        Value::Number(n) => Some((
            Coerced::Number(n.as_f64()?),
            Coerced::Number(parse_number(comparator)?),
        )),
        Value::String(s) => {
            if let (Some(a), Some(b)) = (parse_number(s), parse_number(comparator)) {
                Some((Coerced::Number(a), Coerced::Number(b)))
            } else if let (Some(a), Some(b)) = (parse_bool(s), parse_bool(comparator)) {
                Some((Coerced::Bool(a), Coerced::Bool(b)))
            } else {
                Some((Coerced::Text(s.clone()), Coerced::Text(comparator.to_string())))
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Evaluate `value OPERATOR comparator`.
///
/// On a match returns the coerced pair, for use in descriptions.
#[must_use]
pub fn compare(value: &Value, operator: Operator, comparator: &str) -> Option<(Coerced, Coerced)> {
    let (lhs, rhs) = coerce(value, comparator)?;
    operator.apply(&lhs, &rhs).then_some((lhs, rhs))
}
