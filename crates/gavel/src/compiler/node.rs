//! The compiled, immutable program tree.

use std::sync::Arc;

use crate::eval::kernels::{BinaryKernel, UnaryKernel};
use crate::eval::{Overload, Value};

/// One node of a compiled program.
///
/// Identifiers are slots, operators carry their kernel and calls carry
/// their bound overloads. Nothing is looked up by name except object
/// fields and map keys.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    Const(Value),
    Slot {
        index: usize,
        name: Arc<str>,
    },
    Select {
        operand: Box<Node>,
        field: Arc<str>,
    },
    Has {
        operand: Box<Node>,
        field: Arc<str>,
    },
    Index {
        operand: Box<Node>,
        index: Box<Node>,
    },
    Unary {
        kernel: UnaryKernel,
        operand: Box<Node>,
    },
    Binary {
        kernel: BinaryKernel,
        left: Box<Node>,
        right: Box<Node>,
    },
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Conditional {
        cond: Box<Node>,
        then: Box<Node>,
        otherwise: Box<Node>,
    },
    List(Vec<Node>),
    Map(Vec<(Node, Node)>),
    Call(CallSite),
}

/// A call bound to its candidate overloads.
#[derive(Debug, Clone)]
pub(crate) struct CallSite {
    pub function: Arc<str>,
    /// Tried in order; the first whose parameters admit the arguments runs.
    pub candidates: Vec<Overload>,
    /// Receiver first for method calls.
    pub args: Vec<Node>,
}

impl Node {
    pub fn as_const(&self) -> Option<&Value> {
        match self {
            Node::Const(value) => Some(value),
            _ => None,
        }
    }
}
