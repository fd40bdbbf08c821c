//! Static types, object type registry, and declarations.

mod decls;
mod operators;
mod registry;

use std::fmt;
use std::sync::Arc;

pub use decls::{Declarations, FunctionDecl, OverloadDecl};
pub use operators::{resolve_binary, resolve_unary, OperandKind, OperatorBinding};
pub use registry::{ObjectType, TypeRegistry};

use crate::eval::Value;

/// A static type.
///
/// Types compare structurally, except `Object` which compares by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Type {
    Null,
    Bool,
    Int,
    UInt,
    Double,
    String,
    Bytes,
    List(Arc<Type>),
    Map(Arc<Type>, Arc<Type>),
    /// Unknown until run time. Assignable to and from every type.
    #[default]
    Dyn,
    /// A host record type, described by a [`TypeRegistry`] entry.
    Object(Arc<str>),
}

impl Type {
    pub fn list(elem: Type) -> Self {
        Type::List(Arc::new(elem))
    }

    pub fn map(key: Type, value: Type) -> Self {
        Type::Map(Arc::new(key), Arc::new(value))
    }

    pub fn object(name: impl Into<Arc<str>>) -> Self {
        Type::Object(name.into())
    }

    pub fn is_dyn(&self) -> bool {
        matches!(self, Type::Dyn)
    }

    /// True if `Dyn` appears anywhere in this type.
    pub fn contains_dyn(&self) -> bool {
        match self {
            Type::Dyn => true,
            Type::List(elem) => elem.contains_dyn(),
            Type::Map(key, value) => key.contains_dyn() || value.contains_dyn(),
            _ => false,
        }
    }

    /// Whether a value of type `other` may be used where `self` is expected.
    ///
    /// Identical types are assignable, `Dyn` is assignable in both
    /// directions, and lists and maps recurse into their parameters. There is
    /// no implicit numeric widening.
    pub fn is_assignable_from(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Dyn, _) | (_, Type::Dyn) => true,
            (Type::List(a), Type::List(b)) => a.is_assignable_from(b),
            (Type::Map(ka, va), Type::Map(kb, vb)) => {
                ka.is_assignable_from(kb) && va.is_assignable_from(vb)
            }
            (a, b) => a == b,
        }
    }

    /// The most specific type that covers both `self` and `other`.
    pub fn join(&self, other: &Type) -> Type {
        match (self, other) {
            (a, b) if a == b => a.clone(),
            (Type::List(a), Type::List(b)) => Type::list(a.join(b)),
            (Type::Map(ka, va), Type::Map(kb, vb)) => Type::map(ka.join(kb), va.join(vb)),
            _ => Type::Dyn,
        }
    }

    /// Whether `value` has a runtime kind compatible with this type.
    ///
    /// Only the outer kind is inspected; list elements and map entries are
    /// not walked. A map value is accepted where an object type is expected.
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (Type::Dyn, _) => true,
            (Type::Null, Value::Null)
            | (Type::Bool, Value::Bool(_))
            | (Type::Int, Value::Int(_))
            | (Type::UInt, Value::UInt(_))
            | (Type::Double, Value::Double(_))
            | (Type::String, Value::String(_))
            | (Type::Bytes, Value::Bytes(_))
            | (Type::List(_), Value::List(_))
            | (Type::Map(..), Value::Map(_))
            | (Type::Object(_), Value::Map(_)) => true,
            (Type::Object(name), Value::Object(object)) => object.type_name() == &**name,
            _ => false,
        }
    }

    /// Returns the type name as it appears in diagnostics.
    pub fn display_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Null => f.write_str("null"),
            Type::Bool => f.write_str("bool"),
            Type::Int => f.write_str("int"),
            Type::UInt => f.write_str("uint"),
            Type::Double => f.write_str("double"),
            Type::String => f.write_str("string"),
            Type::Bytes => f.write_str("bytes"),
            Type::List(elem) => write!(f, "list({elem})"),
            Type::Map(key, value) => write!(f, "map({key}, {value})"),
            Type::Dyn => f.write_str("dyn"),
            Type::Object(name) => f.write_str(name),
        }
    }
}

/// How unsuffixed integer literals are typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericLiteralPolicy {
    /// Unsuffixed integers are always `int`; `1u` is `uint` and `1.0` is `double`.
    #[default]
    Strict,
    /// An unsuffixed integer operand is retyped to `uint` or `double` when
    /// the other operand of a binary operator has that type and the value
    /// converts without loss.
    Adaptive,
}
