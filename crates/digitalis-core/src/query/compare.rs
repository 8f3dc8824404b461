//! Comparison operators used to locate condition blocks
//!
//! `=`/`!=` compare loosely (numeric strings equal numbers, empty values
//! equal each other), `==`/`!==` compare the JSON values exactly. The `IN`
//! family tests membership of the left value in a right-hand list and falls
//! back to equality when the right-hand side is not a list.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::errors::DigitalisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `==`
    StrictEq,
    /// `!==`
    StrictNotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `IN`
    In,
    /// `!IN`
    NotIn,
    /// `IN=`
    StrictIn,
    /// `!IN=`
    StrictNotIn,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::StrictEq => "==",
            CompareOp::StrictNotEq => "!==",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::In => "IN",
            CompareOp::NotIn => "!IN",
            CompareOp::StrictIn => "IN=",
            CompareOp::StrictNotIn => "!IN=",
        }
    }

    /// Does `left <op> right` hold?
    pub fn evaluate(&self, left: &Value, right: &Value) -> bool {
        match self {
            CompareOp::Eq => loose_eq(left, right),
            CompareOp::NotEq => !loose_eq(left, right),
            CompareOp::StrictEq => left == right,
            CompareOp::StrictNotEq => left != right,
            CompareOp::Lt => order(left, right) == Some(Ordering::Less),
            CompareOp::Le => matches!(
                order(left, right),
                Some(Ordering::Less | Ordering::Equal)
            ),
            CompareOp::Gt => order(left, right) == Some(Ordering::Greater),
            CompareOp::Ge => matches!(
                order(left, right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            CompareOp::In => contains(right, left, false),
            CompareOp::NotIn => !contains(right, left, false),
            CompareOp::StrictIn => contains(right, left, true),
            CompareOp::StrictNotIn => !contains(right, left, true),
        }
    }
}

impl Default for CompareOp {
    fn default() -> Self {
        CompareOp::Eq
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareOp {
    type Err = DigitalisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_uppercase().as_str() {
            "=" => CompareOp::Eq,
            "!=" => CompareOp::NotEq,
            "==" => CompareOp::StrictEq,
            "!==" => CompareOp::StrictNotEq,
            "<" => CompareOp::Lt,
            "<=" => CompareOp::Le,
            ">" => CompareOp::Gt,
            ">=" => CompareOp::Ge,
            "IN" => CompareOp::In,
            "!IN" => CompareOp::NotIn,
            "IN=" => CompareOp::StrictIn,
            "!IN=" => CompareOp::StrictNotIn,
            _ => {
                return Err(DigitalisError::UnknownOperator {
                    operator: s.to_string(),
                })
            }
        };
        Ok(op)
    }
}

fn contains(haystack: &Value, needle: &Value, strict: bool) -> bool {
    match haystack {
        Value::Array(items) => items
            .iter()
            .any(|item| if strict { item == needle } else { loose_eq(needle, item) }),
        other if strict => needle == other,
        other => loose_eq(needle, other),
    }
}

/// Truthiness of a query-argument value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Loose equality between two argument values.
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    if left == right {
        return true;
    }
    match (left, right) {
        (Value::Null, other) | (other, Value::Null) => !is_truthy(other) && !is_zero_string(other),
        (Value::Bool(b), other) | (other, Value::Bool(b)) => *b == is_truthy(other),
        (Value::Number(_), Value::String(s)) | (Value::String(s), Value::Number(_)) => {
            match (numeric(left), numeric(right)) {
                (Some(a), Some(b)) => a == b,
                _ => {
                    let n = if left.is_number() { left } else { right };
                    n.to_string() == *s
                }
            }
        }
        (Value::Number(_), Value::Number(_)) => numeric(left) == numeric(right),
        (Value::String(a), Value::String(b)) => match (numeric(left), numeric(right)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(k, v)| b.get(k).is_some_and(|other| loose_eq(v, other)))
        }
        _ => false,
    }
}

// null loosely equals "" but not "0"
fn is_zero_string(value: &Value) -> bool {
    matches!(value, Value::String(s) if s == "0")
}

fn order(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (numeric(left), numeric(right)) {
        return a.partial_cmp(&b);
    }
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
