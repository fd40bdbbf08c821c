//! Compiled program ready for evaluation.

use std::sync::Arc;

use super::{Activation, EmptyActivation, EvalError, Evaluator, SlotActivation, Value};
use crate::compiler::Node;
use crate::types::Type;

/// Evaluation limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalOptions {
    /// Maximum number of evaluation steps. `None` means unbounded.
    pub max_steps: Option<u64>,
    /// Maximum number of pending tasks on the evaluator's work stack.
    pub max_stack_depth: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            max_steps: None,
            max_stack_depth: 10_000,
        }
    }
}

/// A compiled expression.
///
/// Immutable and cheap to clone. A program keeps no source text or syntax
/// tree; it holds the compiled node tree, the slot table and the result
/// type. It may be evaluated from many threads at once.
#[derive(Debug, Clone)]
pub struct Program {
    inner: Arc<ProgramInner>,
}

#[derive(Debug)]
struct ProgramInner {
    root: Node,
    slots: Arc<[Arc<str>]>,
    result_type: Type,
    options: EvalOptions,
}

impl Program {
    pub(crate) fn new(root: Node, slots: Vec<Arc<str>>, result_type: Type, options: EvalOptions) -> Self {
        Self {
            inner: Arc::new(ProgramInner {
                root,
                slots: slots.into(),
                result_type,
                options,
            }),
        }
    }

    /// Evaluate the program with the given variable bindings.
    pub fn evaluate(&self, activation: &dyn Activation) -> Result<Value, EvalError> {
        self.evaluate_with(activation, &self.inner.options)
    }

    /// Evaluate with limits other than the program's own.
    pub fn evaluate_with(
        &self,
        activation: &dyn Activation,
        options: &EvalOptions,
    ) -> Result<Value, EvalError> {
        Evaluator::new(activation, options).eval(&self.inner.root)
    }

    /// Evaluate the program with no variable bindings.
    pub fn evaluate_empty(&self) -> Result<Value, EvalError> {
        self.evaluate(&EmptyActivation)
    }

    /// Returns a copy of this program with different limits.
    pub fn with_options(&self, options: EvalOptions) -> Self {
        Self {
            inner: Arc::new(ProgramInner {
                root: self.inner.root.clone(),
                slots: self.inner.slots.clone(),
                result_type: self.inner.result_type.clone(),
                options,
            }),
        }
    }

    /// Variable names in slot order.
    pub fn slots(&self) -> &[Arc<str>] {
        &self.inner.slots
    }

    /// An empty activation laid out for this program's slots.
    pub fn activation(&self) -> SlotActivation {
        SlotActivation::new(self.inner.slots.clone())
    }

    /// The static result type; `Dyn` for unchecked programs.
    pub fn result_type(&self) -> &Type {
        &self.inner.result_type
    }

    pub fn options(&self) -> &EvalOptions {
        &self.inner.options
    }

    /// The folded value, if the whole expression was constant.
    pub fn constant(&self) -> Option<&Value> {
        self.inner.root.as_const()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn program_is_shareable() {
        assert_send_sync::<Program>();
    }

    #[test]
    fn evaluates_with_slot_activation() {
        let program = Program::new(
            Node::Slot {
                index: 0,
                name: Arc::from("x"),
            },
            vec![Arc::from("x")],
            Type::Int,
            EvalOptions::default(),
        );

        let mut activation = program.activation();
        assert!(activation.set("x", 7i64));
        assert_eq!(program.evaluate(&activation), Ok(Value::Int(7)));
        assert_eq!(program.constant(), None);
        assert_eq!(program.slots().len(), 1);
    }
}
