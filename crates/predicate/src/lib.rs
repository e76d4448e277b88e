//! Property predicate DSL with two evaluation backends.
//!
//! A predicate is composed once — programmatically through operator
//! overloads on [`props()`], or parsed from text with [`parse`] — and can
//! then be evaluated two ways with identical boolean/numeric semantics:
//!
//! - natively, in process, against a decoded property structure
//!   ([`evaluate`] / [`matches`]);
//! - compiled to a SQL text fragment over a JSON-encoded properties
//!   column ([`compile`]), for embedding in a store's `WHERE` clause.
//!
//! ```
//! use annolake_predicate::{compile, evaluate, props};
//! use serde_json::json;
//!
//! let predicate = props().item("int").eq(2) | props().item("int").eq(3);
//!
//! let value = evaluate(&predicate, &json!({"int": 2})).unwrap();
//! assert_eq!(value, json!(true));
//!
//! let fragment = compile(&predicate, "properties").unwrap();
//! assert!(fragment.contains("json_extract(properties, '$.int')"));
//! ```

pub mod ast;
pub mod error;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod ops;
pub mod parser;
pub mod props;
pub mod sql;

pub use ast::{BinaryOp, Expr, Func, Literal, PathKey, UnaryOp};
pub use error::{CompileError, EvalError};
pub use eval::{evaluate, matches, truthy};
pub use functions::{
    abs, contains, has_key, is_none, is_not_none, list_sum, regexp, regexp_flags, IGNORECASE,
};
pub use parser::{parse, ParseError};
pub use props::{props, NativeProps, PropsRoot};
pub use sql::{compile, SqlRenderer};
