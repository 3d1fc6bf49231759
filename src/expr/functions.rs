//! Built-in aggregate functions
//!
//! | Function     | Result over no rows |
//! |--------------|---------------------|
//! | `COUNT(*)`   | `0`                 |
//! | `COUNT(x)`   | `0`                 |
//! | `AVG(x)`     | `0.0`               |
//! | `SUM(x)`     | `NULL`              |
//! | `MIN(x)`     | `NULL`              |
//! | `MAX(x)`     | `NULL`              |

use std::cmp::Ordering;
use std::fmt;

use crate::environment::Environment;
use crate::types::Value;

use super::aggregate::{Aggregator, AggregatorBuilder};
use super::errors::ExprResult;
use super::Expr;

/// `COUNT(*)` counts rows, `COUNT(x)` counts rows where `x` is not `NULL`
#[derive(Debug, Clone, PartialEq)]
pub struct Count {
    pub expr: Option<Expr>,
}

impl Count {
    pub fn wildcard() -> Self {
        Self { expr: None }
    }

    pub fn of(expr: Expr) -> Self {
        Self { expr: Some(expr) }
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expr {
            Some(expr) => write!(f, "COUNT({})", expr),
            None => write!(f, "COUNT(*)"),
        }
    }
}

impl AggregatorBuilder for Count {
    fn aggregator(&self) -> Box<dyn Aggregator> {
        Box::new(CountAggregator {
            expr: self.expr.clone(),
            count: 0,
        })
    }
}

struct CountAggregator {
    expr: Option<Expr>,
    count: i64,
}

impl Aggregator for CountAggregator {
    fn feed(&mut self, env: &Environment<'_>) -> ExprResult<()> {
        let counted = match &self.expr {
            None => true,
            Some(expr) => !expr.eval(env)?.is_null(),
        };
        if counted {
            self.count += 1;
        }
        Ok(())
    }

    fn finalize(self: Box<Self>, _env: &Environment<'_>) -> ExprResult<Value> {
        Ok(Value::Integer(self.count))
    }
}

/// `AVG(x)`: mean of the numeric values of `x`, as a double
#[derive(Debug, Clone, PartialEq)]
pub struct Avg {
    pub expr: Expr,
}

impl Avg {
    pub fn of(expr: Expr) -> Self {
        Self { expr }
    }
}

impl fmt::Display for Avg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AVG({})", self.expr)
    }
}

impl AggregatorBuilder for Avg {
    fn aggregator(&self) -> Box<dyn Aggregator> {
        Box::new(AvgAggregator {
            expr: self.expr.clone(),
            sum: 0.0,
            count: 0,
        })
    }
}

struct AvgAggregator {
    expr: Expr,
    sum: f64,
    count: u64,
}

impl Aggregator for AvgAggregator {
    fn feed(&mut self, env: &Environment<'_>) -> ExprResult<()> {
        if let Some(n) = self.expr.eval(env)?.as_f64() {
            self.sum += n;
            self.count += 1;
        }
        Ok(())
    }

    fn finalize(self: Box<Self>, _env: &Environment<'_>) -> ExprResult<Value> {
        if self.count == 0 {
            return Ok(Value::Double(0.0));
        }
        Ok(Value::Double(self.sum / self.count as f64))
    }
}

/// `SUM(x)`: integer sum while every value is an integer, double otherwise
#[derive(Debug, Clone, PartialEq)]
pub struct Sum {
    pub expr: Expr,
}

impl Sum {
    pub fn of(expr: Expr) -> Self {
        Self { expr }
    }
}

impl fmt::Display for Sum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SUM({})", self.expr)
    }
}

impl AggregatorBuilder for Sum {
    fn aggregator(&self) -> Box<dyn Aggregator> {
        Box::new(SumAggregator {
            expr: self.expr.clone(),
            total: None,
        })
    }
}

#[derive(Clone, Copy)]
enum Total {
    Integer(i64),
    Double(f64),
}

struct SumAggregator {
    expr: Expr,
    total: Option<Total>,
}

impl Aggregator for SumAggregator {
    fn feed(&mut self, env: &Environment<'_>) -> ExprResult<()> {
        let value = self.expr.eval(env)?;
        let total = match (self.total, &value) {
            (None, Value::Integer(i)) => Total::Integer(*i),
            (None, Value::Double(d)) => Total::Double(*d),
            (Some(Total::Integer(t)), Value::Integer(i)) => match t.checked_add(*i) {
                Some(sum) => Total::Integer(sum),
                None => Total::Double(t as f64 + *i as f64),
            },
            (Some(Total::Integer(t)), Value::Double(d)) => Total::Double(t as f64 + d),
            (Some(Total::Double(t)), Value::Integer(i)) => Total::Double(t + *i as f64),
            (Some(Total::Double(t)), Value::Double(d)) => Total::Double(t + d),
            // Non-numeric values are skipped
            _ => return Ok(()),
        };
        self.total = Some(total);
        Ok(())
    }

    fn finalize(self: Box<Self>, _env: &Environment<'_>) -> ExprResult<Value> {
        Ok(match self.total {
            None => Value::Null,
            Some(Total::Integer(i)) => Value::Integer(i),
            Some(Total::Double(d)) => Value::Double(d),
        })
    }
}

/// `MIN(x)`: smallest non-null value of `x` in the total value order
#[derive(Debug, Clone, PartialEq)]
pub struct Min {
    pub expr: Expr,
}

impl Min {
    pub fn of(expr: Expr) -> Self {
        Self { expr }
    }
}

impl fmt::Display for Min {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MIN({})", self.expr)
    }
}

impl AggregatorBuilder for Min {
    fn aggregator(&self) -> Box<dyn Aggregator> {
        Box::new(ExtremeAggregator {
            expr: self.expr.clone(),
            keep: Ordering::Less,
            current: None,
        })
    }
}

/// `MAX(x)`: largest non-null value of `x` in the total value order
#[derive(Debug, Clone, PartialEq)]
pub struct Max {
    pub expr: Expr,
}

impl Max {
    pub fn of(expr: Expr) -> Self {
        Self { expr }
    }
}

impl fmt::Display for Max {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MAX({})", self.expr)
    }
}

impl AggregatorBuilder for Max {
    fn aggregator(&self) -> Box<dyn Aggregator> {
        Box::new(ExtremeAggregator {
            expr: self.expr.clone(),
            keep: Ordering::Greater,
            current: None,
        })
    }
}

/// Shared state of MIN and MAX. A new value replaces the current one when
/// it compares as `keep` against it.
struct ExtremeAggregator {
    expr: Expr,
    keep: Ordering,
    current: Option<Value>,
}

impl Aggregator for ExtremeAggregator {
    fn feed(&mut self, env: &Environment<'_>) -> ExprResult<()> {
        let value = self.expr.eval(env)?;
        if value.is_null() {
            return Ok(());
        }
        let replace = match &self.current {
            None => true,
            Some(current) => value.cmp(current) == self.keep,
        };
        if replace {
            self.current = Some(value);
        }
        Ok(())
    }

    fn finalize(self: Box<Self>, _env: &Environment<'_>) -> ExprResult<Value> {
        Ok(self.current.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Document;

    fn run(builder: &dyn AggregatorBuilder, docs: &[Document]) -> ExprResult<Value> {
        let root = Environment::new();
        let mut agg = builder.aggregator();
        for doc in docs {
            let mut env = root.child();
            env.set_document(doc);
            agg.feed(&env)?;
        }
        agg.finalize(&root)
    }

    fn docs(json: &[&str]) -> Vec<Document> {
        json.iter()
            .map(|s| Document::from_json_str(s).unwrap())
            .collect()
    }

    #[test]
    fn test_labels() {
        assert_eq!(Count::wildcard().label(), "COUNT(*)");
        assert_eq!(Count::of(Expr::field("a")).label(), "COUNT(a)");
        assert_eq!(Avg::of(Expr::field("a")).label(), "AVG(a)");
        assert_eq!(Sum::of(Expr::field("a").mul(2)).label(), "SUM(a * 2)");
        assert_eq!(Min::of(Expr::field("a")).label(), "MIN(a)");
        assert_eq!(Max::of(Expr::field("a")).label(), "MAX(a)");
    }

    #[test]
    fn test_zero_input_results() {
        let a = || Expr::field("a");
        assert_eq!(run(&Count::wildcard(), &[]).unwrap(), Value::Integer(0));
        assert_eq!(run(&Count::of(a()), &[]).unwrap(), Value::Integer(0));
        assert!(matches!(run(&Avg::of(a()), &[]).unwrap(), Value::Double(d) if d == 0.0));
        assert_eq!(run(&Sum::of(a()), &[]).unwrap(), Value::Null);
        assert_eq!(run(&Min::of(a()), &[]).unwrap(), Value::Null);
        assert_eq!(run(&Max::of(a()), &[]).unwrap(), Value::Null);
    }

    #[test]
    fn test_count_skips_nulls_unless_wildcard() {
        let input = docs(&[r#"{"a": 1}"#, r#"{"a": null}"#, r#"{"b": 2}"#]);
        assert_eq!(run(&Count::wildcard(), &input).unwrap(), Value::Integer(3));
        assert_eq!(run(&Count::of(Expr::field("a")), &input).unwrap(), Value::Integer(1));
    }

    #[test]
    fn test_avg() {
        let input = docs(&[r#"{"a": 1}"#, r#"{"a": 2.5}"#, r#"{"a": "x"}"#, r#"{"a": 3}"#]);
        assert!(matches!(
            run(&Avg::of(Expr::field("a")), &input).unwrap(),
            Value::Double(d) if (d - 6.5 / 3.0).abs() < 1e-12
        ));
    }

    #[test]
    fn test_sum_integer_then_double() {
        let ints = docs(&[r#"{"a": 1}"#, r#"{"a": 2}"#]);
        assert!(matches!(run(&Sum::of(Expr::field("a")), &ints).unwrap(), Value::Integer(3)));

        let mixed = docs(&[r#"{"a": 1}"#, r#"{"a": 0.5}"#, r#"{"a": null}"#]);
        assert!(matches!(
            run(&Sum::of(Expr::field("a")), &mixed).unwrap(),
            Value::Double(d) if d == 1.5
        ));

        let overflow = vec![
            Document::new().with_field("a", i64::MAX),
            Document::new().with_field("a", 1),
        ];
        assert!(matches!(
            run(&Sum::of(Expr::field("a")), &overflow).unwrap(),
            Value::Double(_)
        ));
    }

    #[test]
    fn test_min_max() {
        let input = docs(&[r#"{"a": 3}"#, r#"{"a": null}"#, r#"{"a": -1.5}"#, r#"{"a": "z"}"#]);
        assert!(matches!(
            run(&Min::of(Expr::field("a")), &input).unwrap(),
            Value::Double(d) if d == -1.5
        ));
        assert_eq!(
            run(&Max::of(Expr::field("a")), &input).unwrap(),
            Value::Text("z".into())
        );
    }

    #[test]
    fn test_feed_propagates_evaluation_errors() {
        let input = docs(&[r#"{"a": "text"}"#]);
        let builder = Sum::of(Expr::field("a").add(1));
        assert!(run(&builder, &input).is_err());
    }

    #[test]
    fn test_aggregators_are_independent() {
        let builder = Count::wildcard();
        let input = docs(&[r#"{"a": 1}"#]);
        let root = Environment::new();

        let mut first = builder.aggregator();
        let second = builder.aggregator();
        let mut env = root.child();
        env.set_document(&input[0]);
        first.feed(&env).unwrap();

        assert_eq!(first.finalize(&root).unwrap(), Value::Integer(1));
        assert_eq!(second.finalize(&root).unwrap(), Value::Integer(0));
    }
}
