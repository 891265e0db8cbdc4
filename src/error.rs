// ABOUTME: Error types surfaced to the embedding host for parse and evaluation failures

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("index {index} out of range [0, {len})")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("map key must be a string, got {0}")]
    KeyTypeMismatch(&'static str),

    #[error("{callee}: expected {expected} argument(s), got {actual}")]
    ArgCountMismatch {
        callee: String,
        expected: String,
        actual: usize,
    },

    #[error("cannot assign to field {field} of {type_name}: value is not addressable")]
    FieldNotAssignable {
        field: String,
        type_name: &'static str,
    },

    #[error("unsupported construct: {0}")]
    UnsupportedNode(String),

    /// Only produced when strict name resolution is enabled; the default
    /// resolution mode yields `null` with a diagnostic instead.
    #[error("undefined name: {0}")]
    UndefinedName(String),
}

impl Error {
    /// Create a type mismatch error from any printable context
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Error::TypeMismatch(message.into())
    }

    /// Create an argument count error; `expected` is free-form ("2", "at least 1")
    pub fn arg_count(callee: &str, expected: impl Into<String>, actual: usize) -> Self {
        Error::ArgCountMismatch {
            callee: callee.to_string(),
            expected: expected.into(),
            actual,
        }
    }
}
