//! Registered predicate functions.
//!
//! Each function has one native implementation here, shared by the native
//! evaluator and (via the store's scalar-function bridge) by the SQL
//! engine, so both backends agree on every sample. Builder functions
//! produce the corresponding call nodes.

use regex::RegexBuilder;
use serde_json::Value;

use crate::ast::{Expr, Func, UnaryOp};
use crate::error::EvalError;
use crate::eval::loose_eq;
use crate::props::kind_of;

/// Case-insensitive matching flag for [`regexp_flags`]; predicate text
/// spells it `re.IGNORECASE`.
pub const IGNORECASE: i64 = 2;

/// `regexp(pattern, text)`: the first match's text, or null.
pub fn regexp(pattern: impl Into<Expr>, text: impl Into<Expr>) -> Expr {
    Expr::call(Func::Regexp, vec![pattern.into(), text.into()])
}

/// `regexp(pattern, text, flags)`.
pub fn regexp_flags(pattern: impl Into<Expr>, text: impl Into<Expr>, flags: i64) -> Expr {
    Expr::call(Func::Regexp, vec![pattern.into(), text.into(), flags.into()])
}

/// `has_key(obj, key)`: key membership in a mapping (or decoded JSON text).
pub fn has_key(obj: impl Into<Expr>, key: impl Into<Expr>) -> Expr {
    Expr::call(Func::HasKey, vec![obj.into(), key.into()])
}

/// Strict null test; `0`, `""` and an empty sequence are not none.
pub fn is_none(x: impl Into<Expr>) -> Expr {
    Expr::call(Func::IsNone, vec![x.into()])
}

pub fn is_not_none(x: impl Into<Expr>) -> Expr {
    Expr::call(Func::IsNotNone, vec![x.into()])
}

/// `sum(x)` over a list-valued property.
pub fn list_sum(x: impl Into<Expr>) -> Expr {
    Expr::call(Func::ListSum, vec![x.into()])
}

/// JSON containment: list membership, mapping-key membership, or exact
/// scalar equality.
pub fn contains(value: impl Into<Expr>, item: impl Into<Expr>) -> Expr {
    Expr::call(Func::Contains, vec![value.into(), item.into()])
}

/// `abs(x)`.
pub fn abs(x: impl Into<Expr>) -> Expr {
    Expr::unary(UnaryOp::Abs, x)
}

/// Native `regexp`: the matched text of the first match, or null.
///
/// Both operands must be strings; a match failure is not an error.
pub fn regexp_match(pattern: &Value, text: &Value, flags: i64) -> Result<Value, EvalError> {
    let (Value::String(pattern), Value::String(text)) = (pattern, text) else {
        return Err(EvalError::TypeMismatch(format!(
            "regexp() expects string arguments, got {} and {}",
            kind_of(pattern),
            kind_of(text)
        )));
    };
    let re = RegexBuilder::new(pattern)
        .case_insensitive(flags & IGNORECASE != 0)
        .build()?;
    Ok(match re.find(text) {
        Some(m) => Value::String(m.as_str().to_string()),
        None => Value::Null,
    })
}

/// Native `has_key`.
///
/// Mapping: key membership. Sequence: element membership. JSON text is
/// decoded first. Anything else is a type error.
pub fn has_key_value(obj: &Value, key: &Value) -> Result<bool, EvalError> {
    match obj {
        Value::Object(map) => Ok(match key {
            Value::String(k) => map.contains_key(k),
            _ => false,
        }),
        Value::Array(items) => Ok(items.iter().any(|v| loose_eq(v, key))),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(decoded @ (Value::Object(_) | Value::Array(_))) => has_key_value(&decoded, key),
            _ => Err(not_iterable(obj)),
        },
        _ => Err(not_iterable(obj)),
    }
}

/// Native `json_contains`.
///
/// Never fails: a value that decodes to neither container kind matches
/// only by exact scalar equality.
pub fn json_contains(value: &Value, item: &Value) -> bool {
    match value {
        Value::Object(map) => match item {
            Value::String(k) => map.contains_key(k),
            _ => false,
        },
        Value::Array(items) => items.iter().any(|v| loose_eq(v, item)),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(decoded @ (Value::Object(_) | Value::Array(_))) => json_contains(&decoded, item),
            Ok(decoded) => loose_eq(&decoded, item),
            Err(_) => loose_eq(value, item),
        },
        scalar => loose_eq(scalar, item),
    }
}

/// Native `sum` over a JSON list of numbers (decoding text first).
pub fn json_list_sum(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Array(items) => {
            let mut int_sum = 0i64;
            let mut float_sum = 0f64;
            let mut all_int = true;
            for item in items {
                if let Some(i) = item.as_i64() {
                    int_sum = int_sum
                        .checked_add(i)
                        .ok_or_else(|| EvalError::TypeMismatch("sum overflow".to_string()))?;
                    float_sum += i as f64;
                } else if let Some(f) = item.as_f64() {
                    all_int = false;
                    float_sum += f;
                } else {
                    return Err(EvalError::TypeMismatch(format!(
                        "sum() expects a list of numbers, found {}",
                        kind_of(item)
                    )));
                }
            }
            if all_int {
                Ok(Value::from(int_sum))
            } else {
                Ok(Value::from(float_sum))
            }
        }
        Value::String(text) => {
            let decoded: Value = serde_json::from_str(text).map_err(|_| {
                EvalError::TypeMismatch("sum() expects a JSON list of numbers".to_string())
            })?;
            match decoded {
                Value::Array(_) => json_list_sum(&decoded),
                _ => Err(EvalError::TypeMismatch(format!(
                    "sum() expects a list, got {}",
                    kind_of(&decoded)
                ))),
            }
        }
        other => Err(EvalError::TypeMismatch(format!(
            "sum() expects a list, got {}",
            kind_of(other)
        ))),
    }
}

fn not_iterable(value: &Value) -> EvalError {
    EvalError::TypeMismatch(format!(
        "argument of type {} is not iterable",
        kind_of(value)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn regexp_returns_match_text() {
        let m = regexp_match(&json!("Hello"), &json!("Hello world!"), 0).unwrap();
        assert_eq!(m, json!("Hello"));
    }

    #[test]
    fn regexp_no_match_is_null() {
        let m = regexp_match(&json!("Yello"), &json!("Hello world!"), 0).unwrap();
        assert_eq!(m, Value::Null);
    }

    #[test]
    fn regexp_ignore_case() {
        let m = regexp_match(&json!("hello"), &json!("Hello world!"), IGNORECASE).unwrap();
        assert_eq!(m, json!("Hello"));
    }

    #[test]
    fn regexp_rejects_non_strings() {
        let err = regexp_match(&json!(1), &json!("x"), 0).unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch(_)));
    }

    #[test]
    fn has_key_on_mappings_and_json_text() {
        assert!(has_key_value(&json!({"a": 1}), &json!("a")).unwrap());
        assert!(!has_key_value(&json!({"a": 1}), &json!("b")).unwrap());
        assert!(has_key_value(&json!(r#"{"int": 2}"#), &json!("int")).unwrap());
    }

    #[test]
    fn has_key_on_a_number_is_a_type_error() {
        let err = has_key_value(&json!(1), &json!("a")).unwrap_err();
        assert!(err.to_string().contains("not iterable"));
    }

    #[test]
    fn json_contains_per_container_kind() {
        assert!(json_contains(&json!("[1]"), &json!(1)));
        assert!(json_contains(&json!({"int": 2}), &json!("int")));
        assert!(!json_contains(&json!({"int": 2}), &json!("foo")));
        assert!(json_contains(&json!(5), &json!(5)));
        assert!(!json_contains(&json!(5), &json!(6)));
    }

    #[test]
    fn list_sum_over_text_and_decoded_lists() {
        assert_eq!(json_list_sum(&json!([0, 1, 2, 3])).unwrap(), json!(6));
        assert_eq!(json_list_sum(&json!("[0,1,2,3]")).unwrap(), json!(6));
        assert_eq!(json_list_sum(&json!([1, 0.5])).unwrap(), json!(1.5));
        assert!(json_list_sum(&json!("{}")).is_err());
    }
}
