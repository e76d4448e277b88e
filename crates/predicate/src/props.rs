use serde_json::Value;

use crate::ast::{Expr, PathKey};
use crate::error::EvalError;

static NULL: Value = Value::Null;

/// Deferred accessor for the properties root.
///
/// Subscripting only extends the recorded path; nothing is resolved and
/// nothing can fail until the expression is evaluated or rendered. This is
/// the accessor to use when composing predicates programmatically.
#[derive(Debug, Clone, Default)]
pub struct PropsRoot {
    path: Vec<PathKey>,
}

/// The bare properties root.
pub fn props() -> PropsRoot {
    PropsRoot::default()
}

impl PropsRoot {
    /// Extend the path by one key or index.
    pub fn item(mut self, key: impl Into<PathKey>) -> PropsRoot {
        self.path.push(key.into());
        self
    }

    /// Lenient lookup: a missing final key evaluates to null instead of
    /// raising.
    pub fn get(mut self, key: impl Into<PathKey>) -> Expr {
        self.path.push(key.into());
        Expr::PropGet {
            path: self.path,
            default: None,
        }
    }

    /// Lenient lookup with a default for the missing case.
    pub fn get_or(mut self, key: impl Into<PathKey>, default: impl Into<Expr>) -> Expr {
        self.path.push(key.into());
        Expr::PropGet {
            path: self.path,
            default: Some(Box::new(default.into())),
        }
    }
}

impl From<PropsRoot> for Expr {
    fn from(root: PropsRoot) -> Expr {
        Expr::Prop(root.path)
    }
}

/// Eager accessor over a decoded property structure.
///
/// Wraps the concrete value for one record; `item` resolves a step
/// immediately and fails on a miss, `get` never fails.
#[derive(Debug, Clone, Copy)]
pub struct NativeProps<'a> {
    value: &'a Value,
}

impl<'a> NativeProps<'a> {
    pub fn new(value: &'a Value) -> Self {
        NativeProps { value }
    }

    /// The wrapped value.
    pub fn value(&self) -> &'a Value {
        self.value
    }

    /// Resolve one path step.
    ///
    /// Fails with `KeyLookup` for an absent mapping key, `IndexLookup` for
    /// an out-of-range sequence index, and `TypeMismatch` when the current
    /// value supports neither kind of subscript.
    pub fn item(&self, key: &PathKey) -> Result<NativeProps<'a>, EvalError> {
        match (self.value, key) {
            (Value::Object(map), PathKey::Key(k)) => map
                .get(k)
                .map(NativeProps::new)
                .ok_or_else(|| EvalError::KeyLookup(k.clone())),
            (Value::Array(items), PathKey::Index(i)) => items
                .get(*i)
                .map(NativeProps::new)
                .ok_or(EvalError::IndexLookup {
                    index: *i,
                    len: items.len(),
                }),
            (value, PathKey::Key(k)) => Err(EvalError::TypeMismatch(format!(
                "cannot look up key '{k}' in {}",
                kind_of(value)
            ))),
            (value, PathKey::Index(i)) => Err(EvalError::TypeMismatch(format!(
                "cannot index {} with {i}",
                kind_of(value)
            ))),
        }
    }

    /// Resolve one path step without failing: any miss yields null.
    pub fn get(&self, key: &PathKey) -> NativeProps<'a> {
        self.try_item(key)
            .unwrap_or(NativeProps { value: &NULL })
    }

    /// Resolve one path step, `None` on any miss.
    pub fn try_item(&self, key: &PathKey) -> Option<NativeProps<'a>> {
        match (self.value, key) {
            (Value::Object(map), PathKey::Key(k)) => map.get(k).map(NativeProps::new),
            (Value::Array(items), PathKey::Index(i)) => items.get(*i).map(NativeProps::new),
            _ => None,
        }
    }

    /// Resolve a whole path strictly.
    pub fn resolve(&self, path: &[PathKey]) -> Result<NativeProps<'a>, EvalError> {
        let mut current = *self;
        for key in path {
            current = current.item(key)?;
        }
        Ok(current)
    }
}

/// Human-readable name of a value's kind, for error messages.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
