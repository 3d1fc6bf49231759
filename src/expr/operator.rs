//! Binary operators
//!
//! Arithmetic keeps integers exact and promotes to double on overflow or
//! when either operand is a double. `NULL` operands propagate. Division or
//! modulo by zero yields `NULL`. Arithmetic on non-numeric values is a type
//! mismatch.
//!
//! Comparisons use the total value order and yield `NULL` when either side
//! is `NULL`. `AND`/`OR` follow three-valued logic over truthiness.

use std::cmp::Ordering;
use std::fmt;

use crate::types::Value;

use super::errors::{ExprError, ExprResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "=",
            BinaryOp::Neq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }

    /// Binding strength, higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq
            | BinaryOp::Neq
            | BinaryOp::Lt
            | BinaryOp::Lte
            | BinaryOp::Gt
            | BinaryOp::Gte => 3,
            BinaryOp::Add | BinaryOp::Sub => 4,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 5,
        }
    }

    /// Applies the operator to two evaluated operands
    pub fn apply(&self, lhs: &Value, rhs: &Value) -> ExprResult<Value> {
        match self {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                self.arithmetic(lhs, rhs)
            }
            BinaryOp::Eq => Ok(compare(lhs, rhs, |o| o == Ordering::Equal)),
            BinaryOp::Neq => Ok(compare(lhs, rhs, |o| o != Ordering::Equal)),
            BinaryOp::Lt => Ok(compare(lhs, rhs, |o| o == Ordering::Less)),
            BinaryOp::Lte => Ok(compare(lhs, rhs, |o| o != Ordering::Greater)),
            BinaryOp::Gt => Ok(compare(lhs, rhs, |o| o == Ordering::Greater)),
            BinaryOp::Gte => Ok(compare(lhs, rhs, |o| o != Ordering::Less)),
            BinaryOp::And => Ok(match (truth(lhs), truth(rhs)) {
                (Some(false), _) | (_, Some(false)) => Value::Bool(false),
                (Some(true), Some(true)) => Value::Bool(true),
                _ => Value::Null,
            }),
            BinaryOp::Or => Ok(match (truth(lhs), truth(rhs)) {
                (Some(true), _) | (_, Some(true)) => Value::Bool(true),
                (Some(false), Some(false)) => Value::Bool(false),
                _ => Value::Null,
            }),
        }
    }

    fn arithmetic(&self, lhs: &Value, rhs: &Value) -> ExprResult<Value> {
        match (lhs, rhs) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Integer(a), Value::Integer(b)) => Ok(self.integer(*a, *b)),
            (a, b) if a.value_type().is_number() && b.value_type().is_number() => {
                // Both are numbers, as_f64 cannot fail
                let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                Ok(self.double(a, b))
            }
            (a, b) => Err(ExprError::TypeMismatch {
                op: self.as_str(),
                left: a.value_type(),
                right: b.value_type(),
            }),
        }
    }

    fn integer(&self, a: i64, b: i64) -> Value {
        let exact = match self {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div | BinaryOp::Mod if b == 0 => return Value::Null,
            BinaryOp::Div => a.checked_div(b),
            BinaryOp::Mod => a.checked_rem(b),
            _ => None,
        };

        match exact {
            Some(i) => Value::Integer(i),
            None => self.double(a as f64, b as f64),
        }
    }

    fn double(&self, a: f64, b: f64) -> Value {
        match self {
            BinaryOp::Add => Value::Double(a + b),
            BinaryOp::Sub => Value::Double(a - b),
            BinaryOp::Mul => Value::Double(a * b),
            BinaryOp::Div | BinaryOp::Mod if b == 0.0 => Value::Null,
            BinaryOp::Div => Value::Double(a / b),
            BinaryOp::Mod => Value::Double(a % b),
            _ => Value::Null,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn compare(lhs: &Value, rhs: &Value, test: impl Fn(Ordering) -> bool) -> Value {
    if lhs.is_null() || rhs.is_null() {
        return Value::Null;
    }
    Value::Bool(test(lhs.cmp(rhs)))
}

fn truth(v: &Value) -> Option<bool> {
    if v.is_null() {
        None
    } else {
        Some(v.is_truthy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> Value {
        Value::Integer(i)
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(BinaryOp::Add.apply(&int(2), &int(3)).unwrap(), int(5));
        assert_eq!(BinaryOp::Mod.apply(&int(7), &int(2)).unwrap(), int(1));
        assert_eq!(BinaryOp::Mod.apply(&int(-7), &int(2)).unwrap(), int(-1));
        assert_eq!(BinaryOp::Div.apply(&int(7), &int(2)).unwrap(), int(3));
    }

    #[test]
    fn test_overflow_promotes_to_double() {
        let result = BinaryOp::Add.apply(&int(i64::MAX), &int(1)).unwrap();
        assert!(matches!(result, Value::Double(_)));
    }

    #[test]
    fn test_mixed_arithmetic_is_double() {
        let result = BinaryOp::Mul.apply(&int(2), &Value::Double(1.5)).unwrap();
        assert!(matches!(result, Value::Double(d) if d == 3.0));
    }

    #[test]
    fn test_division_by_zero_is_null() {
        assert_eq!(BinaryOp::Div.apply(&int(1), &int(0)).unwrap(), Value::Null);
        assert_eq!(BinaryOp::Mod.apply(&int(1), &int(0)).unwrap(), Value::Null);
        assert_eq!(
            BinaryOp::Div.apply(&Value::Double(1.0), &Value::Double(0.0)).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_null_propagates() {
        assert_eq!(BinaryOp::Add.apply(&Value::Null, &int(1)).unwrap(), Value::Null);
        assert_eq!(BinaryOp::Lt.apply(&int(1), &Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_arithmetic_type_mismatch() {
        let err = BinaryOp::Add
            .apply(&Value::Text("a".into()), &int(1))
            .unwrap_err();
        assert!(matches!(err, ExprError::TypeMismatch { op: "+", .. }));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(BinaryOp::Eq.apply(&int(1), &Value::Double(1.0)).unwrap(), Value::Bool(true));
        assert_eq!(BinaryOp::Lte.apply(&int(1), &int(1)).unwrap(), Value::Bool(true));
        assert_eq!(
            BinaryOp::Gt.apply(&Value::Text("b".into()), &int(100)).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_three_valued_logic() {
        let t = Value::Bool(true);
        let f = Value::Bool(false);
        assert_eq!(BinaryOp::And.apply(&f, &Value::Null).unwrap(), f);
        assert_eq!(BinaryOp::And.apply(&t, &Value::Null).unwrap(), Value::Null);
        assert_eq!(BinaryOp::Or.apply(&t, &Value::Null).unwrap(), t);
        assert_eq!(BinaryOp::Or.apply(&f, &Value::Null).unwrap(), Value::Null);
    }
}
