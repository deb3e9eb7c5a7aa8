//! Credit Condition - researcher rule mapping a variable comparison to an outcome

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Comparison operator of a credit condition.
///
/// Serialized with the upper-case symbols researchers pick from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    /// `==`
    Equals,
    /// `<`
    LessThan,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanEqualTo,
    /// `<=`
    LessThanEqualTo,
    /// `!=`
    NotEqualTo,
}

impl Operator {
    /// All operators, in the order researchers are offered them.
    pub const ALL: [Self; 6] = [
        Self::Equals,
        Self::LessThan,
        Self::GreaterThan,
        Self::GreaterThanEqualTo,
        Self::LessThanEqualTo,
        Self::NotEqualTo,
    ];

    /// The stored symbol, e.g. `GREATERTHAN`.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equals => "EQUALS",
            Self::LessThan => "LESSTHAN",
            Self::GreaterThan => "GREATERTHAN",
            Self::GreaterThanEqualTo => "GREATERTHANEQUALTO",
            Self::LessThanEqualTo => "LESSTHANEQUALTO",
            Self::NotEqualTo => "NOTEQUALTO",
        }
    }

    /// Apply the operator to two partially ordered values.
    ///
    /// Uncomparable pairs (e.g. `NaN`) satisfy only `NOTEQUALTO`.
    pub fn apply<T: PartialOrd + ?Sized>(self, lhs: &T, rhs: &T) -> bool {
        match self {
            Self::Equals => lhs == rhs,
            Self::LessThan => lhs < rhs,
            Self::GreaterThan => lhs > rhs,
            Self::GreaterThanEqualTo => lhs >= rhs,
            Self::LessThanEqualTo => lhs <= rhs,
            Self::NotEqualTo => lhs != rhs,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.symbol() == s)
            .ok_or_else(|| Error::InvalidOperator(s.to_string()))
    }
}

/// A credit condition: `variable OPERATOR value` grants `amount` dollars.
///
/// Whether the condition drives a bonus or a rejection depends on whether
/// its variable is the template's performance or rejection variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCondition {
    id: u64,
    variable_id: u64,
    value: String,
    operator: Operator,
    amount: Option<f64>,
}

impl CreditCondition {
    /// Create a new credit condition without an amount.
    #[must_use]
    pub fn new(id: u64, variable_id: u64, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            id,
            variable_id,
            value: value.into(),
            operator,
            amount: None,
        }
    }

    /// Set the dollar amount granted when the condition holds.
    #[must_use]
    pub const fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Get the condition ID.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Get the referenced variable ID.
    #[must_use]
    pub const fn variable_id(&self) -> u64 {
        self.variable_id
    }

    /// Get the raw comparator value entered by the researcher.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Get the operator.
    #[must_use]
    pub const fn operator(&self) -> Operator {
        self.operator
    }

    /// Get the dollar amount, if set.
    #[must_use]
    pub const fn amount(&self) -> Option<f64> {
        self.amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_symbols_roundtrip() {
        for op in Operator::ALL {
            assert_eq!(op.symbol().parse::<Operator>().unwrap(), op);
        }
    }

    #[test]
    fn test_operator_rejects_unknown_symbol() {
        let err = "BETWEEN".parse::<Operator>().unwrap_err();
        assert!(format!("{err}").contains("BETWEEN"));
    }

    #[test]
    fn test_operator_serde_uses_symbol() {
        let json = serde_json::to_string(&Operator::GreaterThanEqualTo).unwrap();
        assert_eq!(json, "\"GREATERTHANEQUALTO\"");
    }

    #[test]
    fn test_operator_apply() {
        assert!(Operator::LessThan.apply(&1.0, &2.0));
        assert!(Operator::GreaterThanEqualTo.apply(&2.0, &2.0));
        assert!(!Operator::Equals.apply(&f64::NAN, &f64::NAN));
        assert!(Operator::NotEqualTo.apply(&f64::NAN, &f64::NAN));
        assert!(Operator::LessThan.apply("apple", "banana"));
    }
}
