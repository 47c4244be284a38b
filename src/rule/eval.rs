//! Rule evaluation over prerequisite grids.
//!
//! Values are scalars or 2-D arrays, numeric or boolean. Scalars broadcast
//! against arrays, booleans count as 0/1 in arithmetic and numbers as `!= 0`
//! in logic. Arrays in one operation must share a shape.

use std::collections::HashMap;
use ndarray::{Array2, Zip};

use super::ast::{BinaryOp, Expr, Function, UnaryOp};
use crate::raster::check_shape;
use crate::{Error, Result};

/// Prerequisite grids keyed by element id.
pub type Bindings = HashMap<String, Array2<f64>>;

/// A scalar or a grid.
#[derive(Debug, Clone, PartialEq)]
pub enum Grid<T> {
    Scalar(T),
    Array(Array2<T>),
}

impl<T: Copy> Grid<T> {
    fn map<U>(self, f: impl Fn(T) -> U) -> Grid<U> {
        match self {
            Grid::Scalar(v) => Grid::Scalar(f(v)),
            Grid::Array(a) => Grid::Array(a.mapv(f)),
        }
    }

    fn zip<U: Copy, R>(self, other: Grid<U>, f: impl Fn(T, U) -> R) -> Result<Grid<R>> {
        Ok(match (self, other) {
            (Grid::Scalar(a), Grid::Scalar(b)) => Grid::Scalar(f(a, b)),
            (Grid::Scalar(a), Grid::Array(b)) => Grid::Array(b.mapv(|y| f(a, y))),
            (Grid::Array(a), Grid::Scalar(b)) => Grid::Array(a.mapv(|x| f(x, b))),
            (Grid::Array(a), Grid::Array(b)) => {
                check_shape(a.dim(), b.dim())?;
                Grid::Array(Zip::from(&a).and(&b).map_collect(|&x, &y| f(x, y)))
            }
        })
    }

    fn any(&self, f: impl Fn(T) -> bool) -> bool {
        match self {
            Grid::Scalar(v) => f(*v),
            Grid::Array(a) => a.iter().any(|&v| f(v)),
        }
    }
}

/// Evaluated value of a sub-expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(Grid<f64>),
    Logic(Grid<bool>),
}

impl Value {
    fn into_num(self) -> Grid<f64> {
        match self {
            Value::Num(g) => g,
            Value::Logic(g) => g.map(|b| if b { 1.0 } else { 0.0 }),
        }
    }

    fn into_logic(self) -> Grid<bool> {
        match self {
            Value::Logic(g) => g,
            Value::Num(g) => g.map(|v| v != 0.0),
        }
    }
}

/// Evaluate `expr` to a boolean grid of `shape`.
pub fn evaluate_predicate(expr: &Expr, bindings: &Bindings, shape: (usize, usize)) -> Result<Array2<bool>> {
    match evaluate(expr, bindings)?.into_logic() {
        Grid::Scalar(b) => Ok(Array2::from_elem(shape, b)),
        Grid::Array(mask) => {
            check_shape(shape, mask.dim())?;
            Ok(mask)
        }
    }
}

/// Evaluate `expr` to a value.
pub fn evaluate(expr: &Expr, bindings: &Bindings) -> Result<Value> {
    match expr {
        Expr::Number(v) => Ok(Value::Num(Grid::Scalar(*v))),
        Expr::Bool(b) => Ok(Value::Logic(Grid::Scalar(*b))),
        Expr::Placeholder(id) => bindings
            .get(id)
            .map(|a| Value::Num(Grid::Array(a.clone())))
            .ok_or_else(|| Error::RuleError(format!("[{id}] is not bound to a grid"))),
        Expr::UnaryOp { op, expr } => {
            let value = evaluate(expr, bindings)?;
            Ok(match op {
                UnaryOp::Not => Value::Logic(value.into_logic().map(|b| !b)),
                UnaryOp::Negate => Value::Num(value.into_num().map(|v| -v)),
            })
        }
        Expr::BinaryOp { left, op, right } => {
            let left = evaluate(left, bindings)?;
            let right = evaluate(right, bindings)?;
            binary(*op, left, right)
        }
        Expr::Call { function, args } => {
            let args = args
                .iter()
                .map(|a| evaluate(a, bindings))
                .collect::<Result<Vec<_>>>()?;
            call(*function, args)
        }
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value> {
    use BinaryOp::*;
    match op {
        And => Ok(Value::Logic(left.into_logic().zip(right.into_logic(), |a, b| a && b)?)),
        Or => Ok(Value::Logic(left.into_logic().zip(right.into_logic(), |a, b| a || b)?)),
        Eq | Neq | Lt | Lte | Gt | Gte => {
            let cmp: fn(f64, f64) -> bool = match op {
                Eq => |a, b| a == b,
                Neq => |a, b| a != b,
                Lt => |a, b| a < b,
                Lte => |a, b| a <= b,
                Gt => |a, b| a > b,
                _ => |a, b| a >= b,
            };
            Ok(Value::Logic(left.into_num().zip(right.into_num(), cmp)?))
        }
        Add | Sub | Mul | Div | Mod | Pow => {
            let (left, right) = (left.into_num(), right.into_num());
            if matches!(op, Div | Mod) && right.any(|v| v == 0.0) {
                return Err(Error::RuleError("division by zero".into()));
            }
            let f: fn(f64, f64) -> f64 = match op {
                Add => |a, b| a + b,
                Sub => |a, b| a - b,
                Mul => |a, b| a * b,
                Div => |a, b| a / b,
                // floored modulo: result takes the divisor's sign
                Mod => |a, b| a - b * (a / b).floor(),
                _ => f64::powf,
            };
            Ok(Value::Num(left.zip(right, f)?))
        }
    }
}

fn call(function: Function, args: Vec<Value>) -> Result<Value> {
    let (min, max) = function.arity();
    if args.len() < min || max.is_some_and(|m| args.len() > m) {
        return Err(Error::RuleError(format!("{function:?} called with {} argument(s)", args.len())));
    }
    let mut args = args.into_iter();
    let mut next = || args.next().ok_or_else(|| Error::RuleError(format!("{function:?} is missing an argument")));

    match function {
        Function::LogicalAnd | Function::LogicalOr | Function::LogicalXor => {
            let f: fn(bool, bool) -> bool = match function {
                Function::LogicalAnd => |a, b| a && b,
                Function::LogicalOr => |a, b| a || b,
                _ => |a, b| a ^ b,
            };
            let mut acc = next()?.into_logic();
            while let Ok(arg) = next() {
                acc = acc.zip(arg.into_logic(), f)?;
            }
            Ok(Value::Logic(acc))
        }
        Function::LogicalNot => Ok(Value::Logic(next()?.into_logic().map(|b| !b))),
        Function::Where => {
            let cond = next()?.into_logic();
            let yes = next()?.into_num();
            let no = next()?.into_num();
            let picked = cond
                .zip(yes, |c, y| (c, y))?
                .zip(no, |(c, y), n| if c { y } else { n })?;
            Ok(Value::Num(picked))
        }
        Function::Minimum => Ok(Value::Num(next()?.into_num().zip(next()?.into_num(), f64::min)?)),
        Function::Maximum => Ok(Value::Num(next()?.into_num().zip(next()?.into_num(), f64::max)?)),
        Function::Sqrt => {
            let arg = next()?.into_num();
            if arg.any(|v| v < 0.0) {
                return Err(Error::RuleError("sqrt of a negative value".into()));
            }
            Ok(Value::Num(arg.map(f64::sqrt)))
        }
        Function::Abs => Ok(Value::Num(next()?.into_num().map(f64::abs))),
        Function::Floor => Ok(Value::Num(next()?.into_num().map(f64::floor))),
        Function::Ceil => Ok(Value::Num(next()?.into_num().map(f64::ceil))),
        Function::Round => Ok(Value::Num(next()?.into_num().map(f64::round_ties_even))),
    }
}
