//! Error types for type checking.

use std::fmt;

use gavel_parser::Span;

use crate::types::Type;

/// A type checking error.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckError {
    /// The kind of error.
    pub kind: CheckErrorKind,
    /// The source span where the error occurred.
    pub span: Span,
    /// The expression ID where the error occurred.
    pub expr_id: i64,
}

impl CheckError {
    pub fn new(kind: CheckErrorKind, span: Span, expr_id: i64) -> Self {
        Self { kind, span, expr_id }
    }

    pub fn unknown_identifier(name: &str, span: Span, expr_id: i64) -> Self {
        Self::new(
            CheckErrorKind::UnknownIdentifier {
                name: name.to_string(),
            },
            span,
            expr_id,
        )
    }

    pub fn unknown_field(type_name: &str, field: &str, span: Span, expr_id: i64) -> Self {
        Self::new(
            CheckErrorKind::UnknownField {
                type_name: type_name.to_string(),
                field: field.to_string(),
            },
            span,
            expr_id,
        )
    }

    pub fn type_mismatch(expected: impl Into<String>, found: Vec<Type>, span: Span, expr_id: i64) -> Self {
        Self::new(
            CheckErrorKind::TypeMismatch {
                expected: expected.into(),
                found,
            },
            span,
            expr_id,
        )
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for CheckError {}

/// The kind of type checking error.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckErrorKind {
    /// Reference to an undeclared variable or function.
    UnknownIdentifier { name: String },

    /// Field not declared on an object type, or select on a type without fields.
    UnknownField { type_name: String, field: String },

    /// No overload accepts the argument types, or several accept them equally well.
    NoMatchingOverload {
        function: String,
        arg_types: Vec<Type>,
        /// Signatures of the overloads that were considered.
        candidates: Vec<String>,
    },

    /// Operand types an operator or construct does not accept.
    TypeMismatch { expected: String, found: Vec<Type> },
}

fn join_types(types: &[Type]) -> String {
    types
        .iter()
        .map(Type::display_name)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for CheckErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckErrorKind::UnknownIdentifier { name } => {
                write!(f, "undeclared reference to '{}'", name)
            }
            CheckErrorKind::UnknownField { type_name, field } => {
                write!(f, "undefined field '{}' on type '{}'", field, type_name)
            }
            CheckErrorKind::NoMatchingOverload {
                function,
                arg_types,
                candidates,
            } => {
                write!(
                    f,
                    "no matching overload for '{}' with argument types ({})",
                    function,
                    join_types(arg_types)
                )?;
                if !candidates.is_empty() {
                    write!(f, "; candidates: {}", candidates.join(", "))?;
                }
                Ok(())
            }
            CheckErrorKind::TypeMismatch { expected, found } => {
                write!(f, "expected {} but found ({})", expected, join_types(found))
            }
        }
    }
}
