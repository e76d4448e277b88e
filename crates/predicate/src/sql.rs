//! SQL backend: render an expression tree to one SQL text fragment.
//!
//! The fragment operates on a single column holding JSON-encoded
//! properties and is meant to be embedded in a `WHERE`/`SELECT` clause.
//! Rendering is a pure function of the tree: the same tree always yields
//! byte-identical text, and no SQL reaches an engine before rendering
//! succeeds.
//!
//! The target engine has no boolean type, so boolean literals render as
//! `1`/`0` and logical operators rely on the engine's 0/1 coercion.
//! Every infix operation is parenthesized unconditionally to make
//! precedence explicit regardless of operator mix.

use crate::ast::{BinaryOp, Expr, Func, Literal, PathKey, UnaryOp};
use crate::error::CompileError;

/// Renders expression trees against a named properties column.
#[derive(Debug, Clone)]
pub struct SqlRenderer {
    column: String,
}

/// Render `expr` against `column` in one call.
pub fn compile(expr: &Expr, column: &str) -> Result<String, CompileError> {
    let sql = SqlRenderer::new(column)?.render(expr)?;
    tracing::debug!(column, sql, "compiled predicate fragment");
    Ok(sql)
}

impl SqlRenderer {
    pub fn new(column: impl Into<String>) -> Result<Self, CompileError> {
        let column = column.into();
        if column.trim().is_empty() {
            return Err(CompileError::InvalidExpression(
                "no properties column to render against".to_string(),
            ));
        }
        Ok(SqlRenderer { column })
    }

    pub fn render(&self, expr: &Expr) -> Result<String, CompileError> {
        match expr {
            Expr::Literal(lit) => literal(lit),
            Expr::Prop(path) => self.prop(path),
            Expr::PropGet { path, default } => {
                let extract = self.prop(path)?;
                match default {
                    Some(default) => Ok(format!("IFNULL({extract}, {})", self.render(default)?)),
                    None => Ok(extract),
                }
            }
            Expr::Array(_) => Err(CompileError::UnsupportedOperation(
                "sequence literal outside a membership test".to_string(),
            )),
            Expr::Unary { op, expr } => {
                let operand = self.render(expr)?;
                Ok(match op {
                    UnaryOp::Neg => format!("-({operand})"),
                    UnaryOp::Not => format!("NOT ({operand})"),
                    UnaryOp::Abs => format!("ABS({operand})"),
                })
            }
            Expr::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs),
            Expr::Call { func, args } => self.call(*func, args),
        }
    }

    fn binary(&self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<String, CompileError> {
        match op {
            BinaryOp::In => self.membership(lhs, rhs),
            BinaryOp::Pow => Ok(format!(
                "POW({}, {})",
                self.render(lhs)?,
                self.render(rhs)?
            )),
            BinaryOp::FloorDiv => Ok(format!(
                "FLOOR({} / {})",
                self.render(lhs)?,
                self.render(rhs)?
            )),
            _ => Ok(format!(
                "({} {} {})",
                self.render(lhs)?,
                infix_token(op),
                self.render(rhs)?
            )),
        }
    }

    /// `in` picks its SQL shape from the right operand: a literal
    /// sequence becomes `IN (...)`, a literal string a substring test,
    /// and a property path (shape unknown until the row is read) a
    /// `CONTAINS` call.
    fn membership(&self, lhs: &Expr, rhs: &Expr) -> Result<String, CompileError> {
        let item = self.render(lhs)?;
        match rhs {
            Expr::Array(elements) => {
                if elements.is_empty() {
                    return Ok("0".to_string());
                }
                let rendered = elements
                    .iter()
                    .map(|e| self.render(e))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({item} IN ({}))", rendered.join(", ")))
            }
            Expr::Literal(Literal::Str(text)) => {
                Ok(format!("(INSTR('{}', {item}) > 0)", escape(text)))
            }
            Expr::Literal(other) => Err(CompileError::UnsupportedOperation(format!(
                "membership in a {} literal",
                literal_kind(other)
            ))),
            _ => Ok(format!("CONTAINS({}, {item})", self.render(rhs)?)),
        }
    }

    fn call(&self, func: Func, args: &[Expr]) -> Result<String, CompileError> {
        match func {
            Func::Regexp => match args {
                [pattern, text] => Ok(format!(
                    "REGEXP({}, {})",
                    self.render(text)?,
                    self.render(pattern)?
                )),
                [pattern, text, flags] => Ok(format!(
                    "REGEXP({}, {}, {})",
                    self.render(text)?,
                    self.render(pattern)?,
                    self.render(flags)?
                )),
                _ => Err(arity(func, "2 or 3", args.len())),
            },
            Func::HasKey => match args {
                [obj, key] => self.has_key(obj, key),
                _ => Err(arity(func, "2", args.len())),
            },
            Func::IsNone => match args {
                [x] => Ok(format!("({} IS NULL)", self.render(x)?)),
                _ => Err(arity(func, "1", args.len())),
            },
            Func::IsNotNone => match args {
                [x] => Ok(format!("({} IS NOT NULL)", self.render(x)?)),
                _ => Err(arity(func, "1", args.len())),
            },
            Func::ListSum => match args {
                [x] => Ok(format!("LISTSUM({})", self.render(x)?)),
                _ => Err(arity(func, "1", args.len())),
            },
            Func::Contains => match args {
                [value, item] => Ok(format!(
                    "CONTAINS({}, {})",
                    self.render(value)?,
                    self.render(item)?
                )),
                _ => Err(arity(func, "2", args.len())),
            },
        }
    }

    /// Key existence via `json_type`, which distinguishes an absent key
    /// (NULL) from a key holding a JSON null ('null').
    fn has_key(&self, obj: &Expr, key: &Expr) -> Result<String, CompileError> {
        let target = match obj {
            // Properties and JSON text work; a scalar literal can never
            // be a container.
            Expr::Literal(Literal::Str(_)) | Expr::Prop(_) | Expr::PropGet { .. }
            | Expr::Call { .. } => self.render(obj)?,
            Expr::Literal(other) => {
                return Err(CompileError::UnsupportedOperation(format!(
                    "has_key(): argument of type {} is not iterable",
                    literal_kind(other)
                )))
            }
            _ => {
                return Err(CompileError::UnsupportedOperation(
                    "has_key(): unsupported object operand".to_string(),
                ))
            }
        };
        let path = match key {
            Expr::Literal(Literal::Str(k)) => {
                if k.contains('"') {
                    return Err(CompileError::UnsupportedOperation(
                        "property key containing a double quote".to_string(),
                    ));
                }
                format!("'$.\"{}\"'", escape(k))
            }
            Expr::Literal(Literal::Int(i)) => format!("'$.\"{i}\"'"),
            other => format!("('$.\"' || {} || '\"')", self.render(other)?),
        };
        Ok(format!("(json_type({target}, {path}) IS NOT NULL)"))
    }

    fn prop(&self, path: &[PathKey]) -> Result<String, CompileError> {
        if path.is_empty() {
            return Ok(self.column.clone());
        }
        Ok(format!(
            "json_extract({}, '{}')",
            self.column,
            json_path(path)?
        ))
    }
}

fn literal(lit: &Literal) -> Result<String, CompileError> {
    match lit {
        Literal::Int(i) => Ok(i.to_string()),
        Literal::Float(f) => {
            if !f.is_finite() {
                return Err(CompileError::UnsupportedOperation(
                    "non-finite float literal".to_string(),
                ));
            }
            Ok(format!("{f:?}"))
        }
        Literal::Str(s) => Ok(format!("'{}'", escape(s))),
        Literal::Bool(true) => Ok("1".to_string()),
        Literal::Bool(false) => Ok("0".to_string()),
        Literal::Null => Ok("NULL".to_string()),
    }
}

fn literal_kind(lit: &Literal) -> &'static str {
    match lit {
        Literal::Int(_) => "int",
        Literal::Float(_) => "float",
        Literal::Str(_) => "str",
        Literal::Bool(_) => "bool",
        Literal::Null => "null",
    }
}

fn escape(text: &str) -> String {
    text.replace('\'', "''")
}

/// `$.k1.k2[3]` for text keys and sequence indices; keys that are not
/// bare-safe are quoted inside the path.
fn json_path(path: &[PathKey]) -> Result<String, CompileError> {
    let mut out = String::from("$");
    for key in path {
        match key {
            PathKey::Key(k) => {
                if is_bare_key(k) {
                    out.push('.');
                    out.push_str(k);
                } else if k.contains('"') || k.contains('\'') {
                    return Err(CompileError::UnsupportedOperation(format!(
                        "property key {k:?} cannot be expressed as a JSON path"
                    )));
                } else {
                    out.push_str(&format!(".\"{k}\""));
                }
            }
            PathKey::Index(i) => out.push_str(&format!("[{i}]")),
        }
    }
    Ok(out)
}

fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn infix_token(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Lt => "<",
        BinaryOp::Gt => ">",
        BinaryOp::Le => "<=",
        BinaryOp::Ge => ">=",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::And => "AND",
        BinaryOp::Or => "OR",
        BinaryOp::Pow | BinaryOp::FloorDiv | BinaryOp::In => {
            unreachable!("rendered as function or membership forms")
        }
    }
}

fn arity(func: Func, expected: &str, found: usize) -> CompileError {
    CompileError::UnsupportedOperation(format!(
        "{}() expects {expected} argument(s), got {found}",
        func.name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{has_key, is_none, list_sum, regexp, regexp_flags, IGNORECASE};
    use crate::props::props;

    fn render(expr: &Expr) -> String {
        compile(expr, "properties").unwrap()
    }

    #[test]
    fn prop_or_prop() {
        let expr = props().item("int").eq(2) | props().item("int").eq(3);
        assert_eq!(
            render(&expr),
            "((json_extract(properties, '$.int') == 2) OR \
             (json_extract(properties, '$.int') == 3))"
        );
    }

    #[test]
    fn nested_paths_mix_keys_and_indices() {
        let expr: Expr = props().item("nesting").item("fib").item(4usize).into();
        assert_eq!(render(&expr), "json_extract(properties, '$.nesting.fib[4]')");
    }

    #[test]
    fn bare_root_renders_the_column() {
        let expr: Expr = props().into();
        assert_eq!(render(&expr), "properties");
    }

    #[test]
    fn literals() {
        assert_eq!(render(&Expr::from(true)), "1");
        assert_eq!(render(&Expr::from(false)), "0");
        assert_eq!(render(&Expr::null()), "NULL");
        assert_eq!(render(&Expr::from(4.0)), "4.0");
        assert_eq!(render(&Expr::from(2.5)), "2.5");
        assert_eq!(render(&Expr::from("O'Brien")), "'O''Brien'");
    }

    #[test]
    fn prefix_forms() {
        assert_eq!(render(&-Expr::from(1)), "-(1)");
        assert_eq!(render(&!Expr::from(props().item("bool"))), "NOT (json_extract(properties, '$.bool'))");
        assert_eq!(render(&props().item("neg").abs()), "ABS(json_extract(properties, '$.neg'))");
    }

    #[test]
    fn power_and_floor_division_use_function_forms() {
        assert_eq!(render(&Expr::from(2).pow(3)), "POW(2, 3)");
        assert_eq!(render(&Expr::from(7).floor_div(2)), "FLOOR(7 / 2)");
    }

    #[test]
    fn membership_by_right_operand_shape() {
        let in_list = Expr::from(1).is_in(Expr::Array(vec![
            Expr::from(1),
            Expr::from(2),
            Expr::from(3),
        ]));
        assert_eq!(render(&in_list), "(1 IN (1, 2, 3))");

        let in_str = Expr::from("Hello").is_in(Expr::from("Hello world!"));
        assert_eq!(render(&in_str), "(INSTR('Hello world!', 'Hello') > 0)");

        let in_prop = Expr::from(1).is_in(props().item("list"));
        assert_eq!(
            render(&in_prop),
            "CONTAINS(json_extract(properties, '$.list'), 1)"
        );

        let in_empty = Expr::from(1).is_in(Expr::Array(vec![]));
        assert_eq!(render(&in_empty), "0");
    }

    #[test]
    fn function_renderings() {
        let expr = regexp("Hello", props().item("string"));
        assert_eq!(
            render(&expr),
            "REGEXP(json_extract(properties, '$.string'), 'Hello')"
        );

        let expr = regexp_flags("hello", props().item("string"), IGNORECASE);
        assert_eq!(
            render(&expr),
            "REGEXP(json_extract(properties, '$.string'), 'hello', 2)"
        );

        let expr = is_none(props().item("null"));
        assert_eq!(render(&expr), "(json_extract(properties, '$.null') IS NULL)");

        let expr = list_sum(props().item("list"));
        assert_eq!(render(&expr), "LISTSUM(json_extract(properties, '$.list'))");
    }

    #[test]
    fn has_key_forms() {
        let expr = has_key(props(), "foo");
        assert_eq!(
            render(&expr),
            "(json_type(properties, '$.\"foo\"') IS NOT NULL)"
        );

        let expr = has_key(props().item("dict"), "a");
        assert_eq!(
            render(&expr),
            "(json_type(json_extract(properties, '$.dict'), '$.\"a\"') IS NOT NULL)"
        );
    }

    #[test]
    fn has_key_on_a_scalar_literal_fails_at_render() {
        let expr = has_key(1, "a");
        let err = compile(&expr, "properties").unwrap_err();
        assert!(err.to_string().contains("not iterable"));
    }

    #[test]
    fn get_renders_ifnull_only_with_a_default() {
        assert_eq!(
            render(&props().get("foo")),
            "json_extract(properties, '$.foo')"
        );
        assert_eq!(
            render(&props().get_or("foo", 42)),
            "IFNULL(json_extract(properties, '$.foo'), 42)"
        );
    }

    #[test]
    fn blank_column_is_invalid() {
        let err = compile(&Expr::from(1), " ").unwrap_err();
        assert!(matches!(err, CompileError::InvalidExpression(_)));
    }

    #[test]
    fn sequence_literal_outside_membership_is_unsupported() {
        let err = compile(&Expr::Array(vec![Expr::from(1)]), "properties").unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedOperation(_)));
    }

    #[test]
    fn rendering_is_deterministic() {
        let expr = (props().item("bool") | props().item("int").lt(2))
            & props().item("neg").abs();
        let first = render(&expr);
        let second = render(&expr);
        assert_eq!(first, second);
    }
}
