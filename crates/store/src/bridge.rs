//! Scalar-function bridge between the predicate registry and the SQL
//! engine.
//!
//! Compiled fragments reference `REGEXP`, `LISTSUM` and `CONTAINS`; this
//! module registers those names on a connection, wrapping the same native
//! implementations the in-process evaluator uses, so both backends agree
//! on every sample. `REGEXP` is registered at two arities because SQL
//! scalar functions have no default parameters.

use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;

use annolake_predicate::functions::{json_contains, json_list_sum, regexp_match};
use annolake_predicate::EvalError;

/// Register the predicate scalar functions on `conn`.
///
/// Must run before any compiled fragment referencing them executes.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_scalar_function("REGEXP", 2, flags, |ctx| regexp_udf(ctx, false))?;
    conn.create_scalar_function("REGEXP", 3, flags, |ctx| regexp_udf(ctx, true))?;
    conn.create_scalar_function("LISTSUM", 1, flags, listsum_udf)?;
    conn.create_scalar_function("CONTAINS", 2, flags, contains_udf)?;
    Ok(())
}

/// `REGEXP(text, pattern[, flags])`.
fn regexp_udf(ctx: &Context<'_>, with_flags: bool) -> rusqlite::Result<rusqlite::types::Value> {
    let text = decode(ctx.get_raw(0));
    let pattern = decode(ctx.get_raw(1));
    let flags = if with_flags {
        match ctx.get_raw(2) {
            ValueRef::Integer(i) => i,
            other => {
                return Err(user_error(EvalError::TypeMismatch(format!(
                    "regexp() flags must be an integer, got {}",
                    other.data_type()
                ))))
            }
        }
    } else {
        0
    };
    let matched = regexp_match(&pattern, &text, flags).map_err(user_error)?;
    Ok(encode(matched))
}

/// `LISTSUM(json_list_text)`.
fn listsum_udf(ctx: &Context<'_>) -> rusqlite::Result<rusqlite::types::Value> {
    let value = decode(ctx.get_raw(0));
    let sum = json_list_sum(&value).map_err(user_error)?;
    Ok(encode(sum))
}

/// `CONTAINS(json_value_or_text, item)`.
fn contains_udf(ctx: &Context<'_>) -> rusqlite::Result<rusqlite::types::Value> {
    let value = decode(ctx.get_raw(0));
    let item = decode(ctx.get_raw(1));
    Ok(rusqlite::types::Value::Integer(
        json_contains(&value, &item) as i64,
    ))
}

fn decode(raw: ValueRef<'_>) -> Value {
    match raw {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}

/// The engine has no boolean or null-distinct JSON types; booleans become
/// 0/1 and containers JSON text.
fn encode(value: Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Bool(b) => rusqlite::types::Value::Integer(b as i64),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                rusqlite::types::Value::Integer(i)
            } else {
                rusqlite::types::Value::Real(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => rusqlite::types::Value::Text(s),
        container => rusqlite::types::Value::Text(container.to_string()),
    }
}

fn user_error(err: EvalError) -> rusqlite::Error {
    rusqlite::Error::UserFunctionError(Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        register_functions(&conn).unwrap();
        conn
    }

    fn scalar<T: rusqlite::types::FromSql>(conn: &Connection, sql: &str) -> T {
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn regexp_both_arities() {
        let conn = connection();
        let m: String = scalar(&conn, "SELECT REGEXP('Hello world!', 'Hello')");
        assert_eq!(m, "Hello");

        let m: Option<String> = scalar(&conn, "SELECT REGEXP('Hello world!', 'Yello')");
        assert_eq!(m, None);

        let m: String = scalar(&conn, "SELECT REGEXP('Hello world!', 'hello', 2)");
        assert_eq!(m, "Hello");
    }

    #[test]
    fn listsum_over_json_text() {
        let conn = connection();
        let sum: i64 = scalar(&conn, "SELECT LISTSUM('[0,1,2,3]')");
        assert_eq!(sum, 6);
    }

    #[test]
    fn listsum_propagates_registry_errors() {
        let conn = connection();
        let result: Result<i64, _> =
            conn.query_row("SELECT LISTSUM('{}')", [], |row| row.get(0));
        assert!(result.is_err());
    }

    #[test]
    fn contains_per_container_kind() {
        let conn = connection();
        let hit: i64 = scalar(&conn, "SELECT CONTAINS('[1]', 1)");
        assert_eq!(hit, 1);

        let hit: i64 = scalar(&conn, r#"SELECT CONTAINS('{"int": 2}', 'int')"#);
        assert_eq!(hit, 1);

        let miss: i64 = scalar(&conn, r#"SELECT CONTAINS('{"int": 2}', 'foo')"#);
        assert_eq!(miss, 0);
    }
}
