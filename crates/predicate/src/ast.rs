use serde::{Deserialize, Serialize};

/// Predicate expression tree.
///
/// Trees are immutable once built: composing expressions always produces
/// new nodes and never edits existing ones, so any subtree can be cloned
/// or shared freely between evaluations.

/// A literal operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
}

/// One step of a property path: a mapping key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathKey {
    Key(String),
    Index(usize),
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    Abs,
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Pow,
    Mod,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    In,
}

/// Registered predicate functions.
///
/// A closed set: the native evaluator and the SQL renderer each match
/// exhaustively over it, so adding a function forces both backends to be
/// updated together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Func {
    Regexp,
    HasKey,
    IsNone,
    IsNotNone,
    ListSum,
    Contains,
}

impl Func {
    /// The function's surface name, as written in predicate text.
    pub fn name(&self) -> &'static str {
        match self {
            Func::Regexp => "regexp",
            Func::HasKey => "has_key",
            Func::IsNone => "is_none",
            Func::IsNotNone => "is_not_none",
            Func::ListSum => "sum",
            Func::Contains => "json_contains",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    /// A path into the properties structure. An empty path denotes the
    /// whole properties root.
    Prop(Vec<PathKey>),
    /// Like `Prop`, but the final path step resolves leniently: a missing
    /// key yields the default (or null) instead of an error.
    PropGet {
        path: Vec<PathKey>,
        default: Option<Box<Expr>>,
    },
    /// A literal sequence, e.g. the right-hand side of a membership test.
    Array(Vec<Expr>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Func,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn unary(op: UnaryOp, expr: impl Into<Expr>) -> Expr {
        Expr::Unary {
            op,
            expr: Box::new(expr.into()),
        }
    }

    pub fn binary(op: BinaryOp, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs.into()),
            rhs: Box::new(rhs.into()),
        }
    }

    pub fn call(func: Func, args: Vec<Expr>) -> Expr {
        Expr::Call { func, args }
    }

    pub fn null() -> Expr {
        Expr::Literal(Literal::Null)
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Expr {
        Expr::Literal(Literal::Int(v))
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Expr {
        Expr::Literal(Literal::Float(v))
    }
}

impl From<&str> for Expr {
    fn from(v: &str) -> Expr {
        Expr::Literal(Literal::Str(v.to_string()))
    }
}

impl From<String> for Expr {
    fn from(v: String) -> Expr {
        Expr::Literal(Literal::Str(v))
    }
}

impl From<bool> for Expr {
    fn from(v: bool) -> Expr {
        Expr::Literal(Literal::Bool(v))
    }
}

impl From<&str> for PathKey {
    fn from(v: &str) -> PathKey {
        PathKey::Key(v.to_string())
    }
}

impl From<String> for PathKey {
    fn from(v: String) -> PathKey {
        PathKey::Key(v)
    }
}

impl From<usize> for PathKey {
    fn from(v: usize) -> PathKey {
        PathKey::Index(v)
    }
}
