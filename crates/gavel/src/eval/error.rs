//! Evaluation error types.

use thiserror::Error;

/// An error raised while evaluating a program.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct EvalError {
    /// The kind of error.
    pub kind: EvalErrorKind,
    /// The error message.
    pub message: String,
}

/// The kind of evaluation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalErrorKind {
    /// A referenced variable has no binding.
    NoSuchAttribute,
    /// Field missing on an object, or select on a value without fields.
    NoSuchField,
    /// Map index with a key that is not present.
    NoSuchKey,
    /// Checked integer arithmetic overflowed or a conversion was out of range.
    NumericOverflow,
    /// Integer division or modulo by zero.
    DivisionByZero,
    IndexOutOfBounds,
    /// An operator or call received a value kind it cannot handle.
    ArgumentTypeMismatch,
    /// The step or stack depth budget ran out.
    BudgetExceeded,
    /// A host function returned an error.
    HostFunctionError,
    /// A builtin rejected its argument, e.g. an invalid regex.
    InvalidArgument,
    /// A malformed program. Not reachable from compiled programs.
    Internal,
}

impl std::fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EvalErrorKind::NoSuchAttribute => "no such attribute",
            EvalErrorKind::NoSuchField => "no such field",
            EvalErrorKind::NoSuchKey => "no such key",
            EvalErrorKind::NumericOverflow => "numeric overflow",
            EvalErrorKind::DivisionByZero => "division by zero",
            EvalErrorKind::IndexOutOfBounds => "index out of bounds",
            EvalErrorKind::ArgumentTypeMismatch => "argument type mismatch",
            EvalErrorKind::BudgetExceeded => "budget exceeded",
            EvalErrorKind::HostFunctionError => "host function error",
            EvalErrorKind::InvalidArgument => "invalid argument",
            EvalErrorKind::Internal => "internal error",
        };
        f.write_str(name)
    }
}

impl EvalError {
    /// Create a new error with the given kind and message.
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn no_such_attribute(name: &str) -> Self {
        Self::new(
            EvalErrorKind::NoSuchAttribute,
            format!("no binding for variable '{name}'"),
        )
    }

    pub fn no_such_field(field: &str) -> Self {
        Self::new(EvalErrorKind::NoSuchField, format!("field '{field}' not found"))
    }

    /// Select or presence test on a value that has no fields.
    pub fn not_selectable(field: &str, kind: &str) -> Self {
        Self::new(
            EvalErrorKind::NoSuchField,
            format!("cannot select field '{field}' from {kind}"),
        )
    }

    pub fn no_such_key(key: impl std::fmt::Display) -> Self {
        Self::new(EvalErrorKind::NoSuchKey, format!("key {key} not found"))
    }

    pub fn overflow(operation: &str) -> Self {
        Self::new(
            EvalErrorKind::NumericOverflow,
            format!("{operation} overflowed"),
        )
    }

    pub fn division_by_zero() -> Self {
        Self::new(EvalErrorKind::DivisionByZero, "division by zero")
    }

    pub fn modulo_by_zero() -> Self {
        Self::new(EvalErrorKind::DivisionByZero, "modulo by zero")
    }

    pub fn index_out_of_bounds(index: impl std::fmt::Display, len: usize) -> Self {
        Self::new(
            EvalErrorKind::IndexOutOfBounds,
            format!("index {index} out of bounds for length {len}"),
        )
    }

    /// An operator received operands it has no overload for.
    pub fn no_matching_operator(operator: &str, operands: &[&str]) -> Self {
        Self::new(
            EvalErrorKind::ArgumentTypeMismatch,
            format!(
                "no overload of '{operator}' for ({})",
                operands.join(", ")
            ),
        )
    }

    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        Self::new(
            EvalErrorKind::ArgumentTypeMismatch,
            format!("expected {expected}, got {actual}"),
        )
    }

    pub fn budget_exceeded(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::BudgetExceeded, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::InvalidArgument, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Internal, message)
    }
}

/// Host functions may return plain messages with `?` or `.into()`.
impl From<String> for EvalError {
    fn from(message: String) -> Self {
        Self::new(EvalErrorKind::HostFunctionError, message)
    }
}

impl From<&str> for EvalError {
    fn from(message: &str) -> Self {
        Self::new(EvalErrorKind::HostFunctionError, message)
    }
}
