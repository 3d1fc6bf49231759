//! Expressions evaluated against an execution environment
//!
//! Parsing happens elsewhere; the pipeline receives already-built [`Expr`]
//! trees. An expression evaluates against an [`Environment`] to a typed
//! [`Value`], and renders back to query text through `Display`, which is
//! also how grouping expressions name their output field.
//!
//! Aggregate functions live in [`functions`] and implement the
//! [`AggregatorBuilder`]/[`Aggregator`] contract from [`aggregate`].

pub mod aggregate;
mod errors;
pub mod functions;
mod operator;
mod path;

pub use aggregate::{Aggregator, AggregatorBuilder};
pub use errors::{ExprError, ExprResult};
pub use operator::BinaryOp;
pub use path::{Path, PathFragment};

use std::fmt;

use crate::environment::Environment;
use crate::types::Value;

/// An expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant value
    Literal(Value),
    /// Field of the current document
    Path(Path),
    /// `?`, 1-based position among the query parameters
    PositionalParam(usize),
    /// `$name`: innermost variable binding, then named query parameter
    NamedParam(String),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Not(Box<Expr>),
    Neg(Box<Expr>),
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Top-level field, name taken verbatim
    pub fn field(name: impl Into<String>) -> Self {
        Expr::Path(Path::field(name))
    }

    /// Dotted path such as `a.b[0]`
    pub fn parse_path(path: &str) -> ExprResult<Self> {
        Path::parse(path).map(Expr::Path)
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn add(self, rhs: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Add, self, rhs.into())
    }

    pub fn sub(self, rhs: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Sub, self, rhs.into())
    }

    pub fn mul(self, rhs: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Mul, self, rhs.into())
    }

    pub fn div(self, rhs: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Div, self, rhs.into())
    }

    pub fn modulo(self, rhs: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Mod, self, rhs.into())
    }

    /// Evaluates the expression against `env`.
    pub fn eval(&self, env: &Environment<'_>) -> ExprResult<Value> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Path(path) => {
                let doc = env.document().ok_or(ExprError::NoDocument)?;
                Ok(path.resolve(doc).cloned().unwrap_or(Value::Null))
            }
            Expr::PositionalParam(index) => env
                .param_by_index(*index)
                .cloned()
                .ok_or_else(|| ExprError::UnknownParam(format!("?{}", index))),
            Expr::NamedParam(name) => env
                .var(name)
                .or_else(|| env.param_by_name(name))
                .cloned()
                .ok_or_else(|| ExprError::UnknownParam(format!("${}", name))),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = lhs.eval(env)?;
                let rhs = rhs.eval(env)?;
                op.apply(&lhs, &rhs)
            }
            Expr::Not(inner) => match inner.eval(env)? {
                Value::Null => Ok(Value::Null),
                value => Ok(Value::Bool(!value.is_truthy())),
            },
            Expr::Neg(inner) => match inner.eval(env)? {
                Value::Null => Ok(Value::Null),
                Value::Integer(i) => Ok(i
                    .checked_neg()
                    .map(Value::Integer)
                    .unwrap_or(Value::Double(-(i as f64)))),
                Value::Double(d) => Ok(Value::Double(-d)),
                other => Err(ExprError::TypeMismatch {
                    op: "-",
                    left: other.value_type(),
                    right: other.value_type(),
                }),
            },
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary { op, .. } => op.precedence(),
            _ => u8::MAX,
        }
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Literal(value)
    }
}

impl From<i64> for Expr {
    fn from(i: i64) -> Self {
        Expr::Literal(Value::Integer(i))
    }
}

impl From<i32> for Expr {
    fn from(i: i32) -> Self {
        Expr::Literal(Value::Integer(i64::from(i)))
    }
}

impl From<f64> for Expr {
    fn from(d: f64) -> Self {
        Expr::Literal(Value::Double(d))
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::Literal(Value::Text(s.to_string()))
    }
}

impl From<Path> for Expr {
    fn from(path: Path) -> Self {
        Expr::Path(path)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Path(path) => write!(f, "{}", path),
            Expr::PositionalParam(_) => write!(f, "?"),
            Expr::NamedParam(name) => write!(f, "${}", name),
            Expr::Binary { op, lhs, rhs } => {
                let precedence = op.precedence();
                if lhs.precedence() < precedence {
                    write!(f, "({})", lhs)?;
                } else {
                    write!(f, "{}", lhs)?;
                }
                write!(f, " {} ", op)?;
                // Operators are left-associative: equal precedence on the
                // right needs parentheses
                if rhs.precedence() <= precedence {
                    write!(f, "({})", rhs)
                } else {
                    write!(f, "{}", rhs)
                }
            }
            Expr::Not(inner) => write_unary(f, "NOT ", inner),
            Expr::Neg(inner) => write_unary(f, "-", inner),
        }
    }
}

/// Unary operators bind tighter than any binary operator
fn write_unary(f: &mut fmt::Formatter<'_>, op: &str, inner: &Expr) -> fmt::Result {
    if inner.precedence() < u8::MAX {
        write!(f, "{}({})", op, inner)
    } else {
        write!(f, "{}{}", op, inner)
    }
}
