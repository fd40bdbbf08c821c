//! The fixed operator typing table.
//!
//! Each operator accepts a small set of operand type combinations. The
//! checker uses [`resolve_binary`] and [`resolve_unary`] to type operator
//! nodes; the compiler uses the resulting [`OperandKind`] to bind a kernel.

use gavel_parser::{BinaryOp, UnaryOp};

use super::Type;

/// Operand kind an operator was resolved for.
///
/// `Dyn` selects a kernel that inspects the runtime values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    Bool,
    Int,
    UInt,
    Double,
    String,
    Bytes,
    List,
    Map,
    Dyn,
}

impl OperandKind {
    /// The kind of a concrete scalar type, or `None`.
    fn scalar(ty: &Type) -> Option<Self> {
        match ty {
            Type::Bool => Some(OperandKind::Bool),
            Type::Int => Some(OperandKind::Int),
            Type::UInt => Some(OperandKind::UInt),
            Type::Double => Some(OperandKind::Double),
            Type::String => Some(OperandKind::String),
            Type::Bytes => Some(OperandKind::Bytes),
            _ => None,
        }
    }
}

/// A resolved operator: which kernel kind to use and the result type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorBinding {
    pub kind: OperandKind,
    pub result: Type,
}

impl OperatorBinding {
    fn new(kind: OperandKind, result: Type) -> Self {
        Self { kind, result }
    }

    fn relation(kind: OperandKind) -> Self {
        Self::new(kind, Type::Bool)
    }
}

/// Types a binary operator, or returns `None` when no overload accepts the
/// operand types.
pub fn resolve_binary(op: BinaryOp, lhs: &Type, rhs: &Type) -> Option<OperatorBinding> {
    match op {
        BinaryOp::And | BinaryOp::Or => {
            let logical = |t: &Type| matches!(t, Type::Bool | Type::Dyn);
            (logical(lhs) && logical(rhs)).then(|| OperatorBinding::relation(OperandKind::Bool))
        }
        BinaryOp::Eq | BinaryOp::Ne => resolve_equality(lhs, rhs),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => resolve_ordering(lhs, rhs),
        BinaryOp::In => resolve_membership(lhs, rhs),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            resolve_arithmetic(op, lhs, rhs)
        }
    }
}

/// Types a unary operator.
pub fn resolve_unary(op: UnaryOp, operand: &Type) -> Option<OperatorBinding> {
    match (op, operand) {
        (_, Type::Dyn) => Some(OperatorBinding::new(
            OperandKind::Dyn,
            match op {
                UnaryOp::Not => Type::Bool,
                UnaryOp::Neg => Type::Dyn,
            },
        )),
        (UnaryOp::Neg, Type::Int) => Some(OperatorBinding::new(OperandKind::Int, Type::Int)),
        (UnaryOp::Neg, Type::Double) => {
            Some(OperatorBinding::new(OperandKind::Double, Type::Double))
        }
        (UnaryOp::Not, Type::Bool) => Some(OperatorBinding::new(OperandKind::Bool, Type::Bool)),
        _ => None,
    }
}

fn resolve_equality(lhs: &Type, rhs: &Type) -> Option<OperatorBinding> {
    let comparable = lhs.is_assignable_from(rhs)
        || rhs.is_assignable_from(lhs)
        || matches!(lhs, Type::Null)
        || matches!(rhs, Type::Null);
    if !comparable {
        return None;
    }
    let kind = match (OperandKind::scalar(lhs), OperandKind::scalar(rhs)) {
        (Some(a), Some(b)) if a == b => a,
        _ => OperandKind::Dyn,
    };
    Some(OperatorBinding::relation(kind))
}

fn resolve_ordering(lhs: &Type, rhs: &Type) -> Option<OperatorBinding> {
    match (lhs, rhs) {
        (Type::Dyn, other) | (other, Type::Dyn) => {
            (other.is_dyn() || OperandKind::scalar(other).is_some())
                .then(|| OperatorBinding::relation(OperandKind::Dyn))
        }
        _ => match (OperandKind::scalar(lhs), OperandKind::scalar(rhs)) {
            (Some(a), Some(b)) if a == b => Some(OperatorBinding::relation(a)),
            _ => None,
        },
    }
}

fn resolve_membership(lhs: &Type, rhs: &Type) -> Option<OperatorBinding> {
    match rhs {
        Type::Dyn => Some(OperatorBinding::relation(OperandKind::Dyn)),
        Type::List(elem) if elem.is_assignable_from(lhs) => Some(OperatorBinding::relation(
            kind_or_dyn(lhs, elem, OperandKind::List),
        )),
        Type::Map(key, _) if key.is_assignable_from(lhs) => Some(OperatorBinding::relation(
            kind_or_dyn(lhs, key, OperandKind::Map),
        )),
        _ => None,
    }
}

fn resolve_arithmetic(op: BinaryOp, lhs: &Type, rhs: &Type) -> Option<OperatorBinding> {
    let numeric = |t: &Type| match t {
        Type::Int | Type::UInt => true,
        Type::Double => op != BinaryOp::Mod,
        _ => false,
    };
    let concatenable = |t: &Type| {
        op == BinaryOp::Add && matches!(t, Type::String | Type::Bytes | Type::List(_))
    };

    match (lhs, rhs) {
        (Type::Dyn, Type::Dyn) => Some(OperatorBinding::new(OperandKind::Dyn, Type::Dyn)),
        (Type::Dyn, other) | (other, Type::Dyn) => (numeric(other) || concatenable(other))
            .then(|| OperatorBinding::new(OperandKind::Dyn, Type::Dyn)),
        (Type::List(a), Type::List(b)) if op == BinaryOp::Add => Some(OperatorBinding::new(
            OperandKind::List,
            Type::list(a.join(b)),
        )),
        (a, b) if a == b && (numeric(a) || concatenable(a)) => {
            let kind = OperandKind::scalar(a)?;
            Some(OperatorBinding::new(kind, a.clone()))
        }
        _ => None,
    }
}

/// Membership tests where the needle or the element (key) type is partly
/// dynamic use numeric-aware equality, like `==` on the same values.
fn kind_or_dyn(lhs: &Type, element: &Type, kind: OperandKind) -> OperandKind {
    if lhs.contains_dyn() || element.contains_dyn() {
        OperandKind::Dyn
    } else {
        kind
    }
}
