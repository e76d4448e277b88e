use thiserror::Error;

/// Errors raised while evaluating a predicate against an in-memory
/// property structure, or by the shared function implementations on
/// either backend.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("key not found: '{0}'")]
    KeyLookup(String),
    #[error("index {index} out of range for sequence of length {len}")]
    IndexLookup { index: usize, len: usize },
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("invalid regular expression: {0}")]
    Regex(#[from] regex::Error),
}

/// Errors raised when rendering an expression tree to SQL text.
///
/// Rendering happens before any SQL reaches the engine, so a predicate
/// that cannot be expressed never executes.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("invalid expression: {0}")]
    InvalidExpression(String),
}
