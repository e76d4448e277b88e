//! Native backend: eager evaluation against an in-memory property
//! structure.
//!
//! Value semantics follow the predicate surface language: rich
//! truthiness, numeric promotion from integer to float on overflow,
//! flooring division and divisor-signed modulo, and per-container
//! membership. Logical `&`/`|` short-circuit here and canonicalize to
//! booleans.

use std::cmp::Ordering;

use serde_json::Value;

use crate::ast::{BinaryOp, Expr, Func, Literal, UnaryOp};
use crate::error::EvalError;
use crate::functions::{has_key_value, json_contains, json_list_sum, regexp_match};
use crate::props::{kind_of, NativeProps};

/// Evaluate an expression against one record's properties.
pub fn evaluate(expr: &Expr, props: &Value) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(lit) => Ok(literal_value(lit)),
        Expr::Prop(path) => Ok(NativeProps::new(props).resolve(path)?.value().clone()),
        Expr::PropGet { path, default } => {
            // All steps but the last resolve strictly; the last is lenient.
            let Some((last, prefix)) = path.split_last() else {
                return Err(EvalError::TypeMismatch(
                    "get() without a key".to_string(),
                ));
            };
            let base = NativeProps::new(props).resolve(prefix)?;
            match base.try_item(last) {
                Some(found) => Ok(found.value().clone()),
                None => match default {
                    Some(default) => evaluate(default, props),
                    None => Ok(Value::Null),
                },
            }
        }
        Expr::Array(items) => {
            let values = items
                .iter()
                .map(|item| evaluate(item, props))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(values))
        }
        Expr::Unary { op, expr } => {
            let value = evaluate(expr, props)?;
            unary(*op, &value)
        }
        Expr::Binary { op, lhs, rhs } => match op {
            // Short-circuit: the right operand is only evaluated on demand.
            BinaryOp::And => {
                if !matches(lhs, props)? {
                    Ok(Value::Bool(false))
                } else {
                    Ok(Value::Bool(matches(rhs, props)?))
                }
            }
            BinaryOp::Or => {
                if matches(lhs, props)? {
                    Ok(Value::Bool(true))
                } else {
                    Ok(Value::Bool(matches(rhs, props)?))
                }
            }
            _ => {
                let l = evaluate(lhs, props)?;
                let r = evaluate(rhs, props)?;
                binary(*op, &l, &r)
            }
        },
        Expr::Call { func, args } => {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, props))
                .collect::<Result<Vec<_>, _>>()?;
            call(*func, &values)
        }
    }
}

/// Evaluate an expression and apply truthiness, for use as a row filter.
pub fn matches(expr: &Expr, props: &Value) -> Result<bool, EvalError> {
    Ok(truthy(&evaluate(expr, props)?))
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Int(i) => Value::from(*i),
        Literal::Float(f) => Value::from(*f),
        Literal::Str(s) => Value::from(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

/// Truthiness: null is false, numbers by non-zeroness, containers and
/// strings by non-emptiness.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Num::Int(i) => i == 0,
            Num::Float(f) => f == 0.0,
        }
    }
}

/// Numeric view of a value; booleans count as 0/1 like the surface
/// language's.
pub(crate) fn as_num(value: &Value) -> Option<Num> {
    match value {
        Value::Bool(b) => Some(Num::Int(*b as i64)),
        Value::Number(n) => n
            .as_i64()
            .map(Num::Int)
            .or_else(|| n.as_f64().map(Num::Float)),
        _ => None,
    }
}

fn num_value(num: Num) -> Value {
    match num {
        Num::Int(i) => Value::from(i),
        Num::Float(f) => Value::from(f),
    }
}

/// Equality across numeric representations, deep for containers, and
/// false (never an error) across kinds.
pub(crate) fn loose_eq(l: &Value, r: &Value) -> bool {
    if let (Some(a), Some(b)) = (as_num(l), as_num(r)) {
        return match (a, b) {
            (Num::Int(a), Num::Int(b)) => a == b,
            _ => a.as_f64() == b.as_f64(),
        };
    }
    match (l, r) {
        (Value::Null, Value::Null) => true,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|w| loose_eq(v, w)))
        }
        _ => false,
    }
}

fn compare(l: &Value, r: &Value) -> Result<Ordering, EvalError> {
    if let (Some(a), Some(b)) = (as_num(l), as_num(r)) {
        return match (a, b) {
            (Num::Int(a), Num::Int(b)) => Ok(a.cmp(&b)),
            _ => a.as_f64().partial_cmp(&b.as_f64()).ok_or_else(|| {
                EvalError::TypeMismatch("comparison with a non-finite number".to_string())
            }),
        };
    }
    match (l, r) {
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => Err(EvalError::TypeMismatch(format!(
            "{} and {} are not orderable",
            kind_of(l),
            kind_of(r)
        ))),
    }
}

fn unary(op: UnaryOp, value: &Value) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!truthy(value))),
        UnaryOp::Neg => match as_num(value) {
            Some(Num::Int(i)) => Ok(i
                .checked_neg()
                .map(Value::from)
                .unwrap_or_else(|| Value::from(-(i as f64)))),
            Some(Num::Float(f)) => Ok(Value::from(-f)),
            None => Err(EvalError::TypeMismatch(format!(
                "cannot negate {}",
                kind_of(value)
            ))),
        },
        UnaryOp::Abs => match as_num(value) {
            Some(Num::Int(i)) => Ok(i
                .checked_abs()
                .map(Value::from)
                .unwrap_or_else(|| Value::from((i as f64).abs()))),
            Some(Num::Float(f)) => Ok(Value::from(f.abs())),
            None => Err(EvalError::TypeMismatch(format!(
                "abs() expects a number, got {}",
                kind_of(value)
            ))),
        },
    }
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add => {
            if let (Value::String(a), Value::String(b)) = (l, r) {
                return Ok(Value::from(format!("{a}{b}")));
            }
            arith(op, l, r)
        }
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Pow
        | BinaryOp::Mod => arith(op, l, r),
        BinaryOp::Lt => Ok(Value::Bool(compare(l, r)? == Ordering::Less)),
        BinaryOp::Gt => Ok(Value::Bool(compare(l, r)? == Ordering::Greater)),
        BinaryOp::Le => Ok(Value::Bool(compare(l, r)? != Ordering::Greater)),
        BinaryOp::Ge => Ok(Value::Bool(compare(l, r)? != Ordering::Less)),
        BinaryOp::Eq => Ok(Value::Bool(loose_eq(l, r))),
        BinaryOp::Ne => Ok(Value::Bool(!loose_eq(l, r))),
        BinaryOp::In => membership(l, r),
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuited by the caller"),
    }
}

fn arith(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    let (Some(a), Some(b)) = (as_num(l), as_num(r)) else {
        return Err(EvalError::TypeMismatch(format!(
            "unsupported operand types for {op:?}: {} and {}",
            kind_of(l),
            kind_of(r)
        )));
    };
    match op {
        BinaryOp::Add => Ok(int_or_float(a, b, i64::checked_add, |x, y| x + y)),
        BinaryOp::Sub => Ok(int_or_float(a, b, i64::checked_sub, |x, y| x - y)),
        BinaryOp::Mul => Ok(int_or_float(a, b, i64::checked_mul, |x, y| x * y)),
        BinaryOp::Div => {
            if b.is_zero() {
                return Err(EvalError::DivisionByZero);
            }
            // True division always yields a float.
            Ok(Value::from(a.as_f64() / b.as_f64()))
        }
        BinaryOp::FloorDiv => {
            if b.is_zero() {
                return Err(EvalError::DivisionByZero);
            }
            match (a, b) {
                (Num::Int(x), Num::Int(y)) => {
                    let mut q = x / y;
                    if x % y != 0 && (x < 0) != (y < 0) {
                        q -= 1;
                    }
                    Ok(Value::from(q))
                }
                _ => Ok(Value::from((a.as_f64() / b.as_f64()).floor())),
            }
        }
        BinaryOp::Mod => {
            if b.is_zero() {
                return Err(EvalError::DivisionByZero);
            }
            match (a, b) {
                (Num::Int(x), Num::Int(y)) => {
                    // The result carries the divisor's sign.
                    let mut m = x % y;
                    if m != 0 && (m < 0) != (y < 0) {
                        m += y;
                    }
                    Ok(Value::from(m))
                }
                _ => {
                    let (x, y) = (a.as_f64(), b.as_f64());
                    Ok(Value::from(x - y * (x / y).floor()))
                }
            }
        }
        BinaryOp::Pow => match (a, b) {
            (Num::Int(x), Num::Int(e)) if e >= 0 => Ok(u32::try_from(e)
                .ok()
                .and_then(|e| x.checked_pow(e))
                .map(Value::from)
                .unwrap_or_else(|| Value::from((x as f64).powf(e as f64)))),
            _ => Ok(Value::from(a.as_f64().powf(b.as_f64()))),
        },
        _ => unreachable!("non-arithmetic operator"),
    }
}

fn int_or_float(
    a: Num,
    b: Num,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Value {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => match int_op(x, y) {
            Some(v) => Value::from(v),
            None => Value::from(float_op(x as f64, y as f64)),
        },
        _ => num_value(Num::Float(float_op(a.as_f64(), b.as_f64()))),
    }
}

fn membership(item: &Value, container: &Value) -> Result<Value, EvalError> {
    match container {
        Value::Array(items) => Ok(Value::Bool(items.iter().any(|v| loose_eq(v, item)))),
        Value::Object(map) => Ok(Value::Bool(match item {
            Value::String(k) => map.contains_key(k),
            _ => false,
        })),
        Value::String(text) => match item {
            Value::String(sub) => Ok(Value::Bool(text.contains(sub.as_str()))),
            other => Err(EvalError::TypeMismatch(format!(
                "'in <str>' requires str, got {}",
                kind_of(other)
            ))),
        },
        other => Err(EvalError::TypeMismatch(format!(
            "argument of type {} is not iterable",
            kind_of(other)
        ))),
    }
}

fn call(func: Func, args: &[Value]) -> Result<Value, EvalError> {
    match func {
        Func::Regexp => {
            let flags = match args {
                [_, _] => 0,
                [_, _, flags] => match as_num(flags) {
                    Some(Num::Int(i)) => i,
                    _ => {
                        return Err(EvalError::TypeMismatch(
                            "regexp() flags must be an integer".to_string(),
                        ))
                    }
                },
                _ => return Err(arity(func, "2 or 3", args.len())),
            };
            regexp_match(&args[0], &args[1], flags)
        }
        Func::HasKey => match args {
            [obj, key] => Ok(Value::Bool(has_key_value(obj, key)?)),
            _ => Err(arity(func, "2", args.len())),
        },
        Func::IsNone => match args {
            [x] => Ok(Value::Bool(x.is_null())),
            _ => Err(arity(func, "1", args.len())),
        },
        Func::IsNotNone => match args {
            [x] => Ok(Value::Bool(!x.is_null())),
            _ => Err(arity(func, "1", args.len())),
        },
        Func::ListSum => match args {
            [x] => json_list_sum(x),
            _ => Err(arity(func, "1", args.len())),
        },
        Func::Contains => match args {
            [value, item] => Ok(Value::Bool(json_contains(value, item))),
            _ => Err(arity(func, "2", args.len())),
        },
    }
}

fn arity(func: Func, expected: &str, found: usize) -> EvalError {
    EvalError::TypeMismatch(format!(
        "{}() expects {expected} argument(s), got {found}",
        func.name()
    ))
}
