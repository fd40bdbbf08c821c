//! Work-stack evaluator for compiled programs.
//!
//! The evaluator never recurses natively. Pending work lives on an explicit
//! task stack and intermediate results on a value stack, so expression
//! depth is limited by [`EvalOptions::max_stack_depth`] rather than by the
//! thread's stack. Each task popped counts as one step against
//! [`EvalOptions::max_steps`].

use std::slice;

use super::kernels::{self, BinaryKernel, UnaryKernel};
use super::{Activation, EvalError, EvalOptions, Value};
use crate::compiler::{CallSite, Node};

enum Task<'p> {
    Eval(&'p Node),
    /// Evaluates the remaining nodes one at a time, left to right.
    Items(slice::Iter<'p, Node>),
    Entries(slice::Iter<'p, (Node, Node)>),
    Select(&'p str),
    Has(&'p str),
    Index,
    Unary(UnaryKernel),
    Binary(BinaryKernel),
    AndRhs(&'p Node),
    OrRhs(&'p Node),
    /// Checks that the right operand of `&&`/`||` produced a bool.
    ExpectBool(&'static str),
    Branch {
        then: &'p Node,
        otherwise: &'p Node,
    },
    List(usize),
    Map(usize),
    Call(&'p CallSite),
}

/// Evaluates one compiled program against one activation.
pub(crate) struct Evaluator<'a> {
    activation: &'a dyn Activation,
    options: &'a EvalOptions,
}

impl<'a> Evaluator<'a> {
    pub fn new(activation: &'a dyn Activation, options: &'a EvalOptions) -> Self {
        Self {
            activation,
            options,
        }
    }

    pub fn eval(&self, root: &Node) -> Result<Value, EvalError> {
        let mut tasks = vec![Task::Eval(root)];
        let mut values: Vec<Value> = Vec::new();
        let mut steps: u64 = 0;

        while let Some(task) = tasks.pop() {
            steps += 1;
            if let Some(max_steps) = self.options.max_steps {
                if steps > max_steps {
                    tracing::debug!(max_steps, "evaluation step budget exhausted");
                    return Err(EvalError::budget_exceeded(format!(
                        "evaluation exceeded {max_steps} steps"
                    )));
                }
            }

            match task {
                Task::Eval(node) => self.schedule(node, &mut tasks, &mut values)?,
                Task::Items(mut rest) => {
                    if let Some(node) = rest.next() {
                        tasks.push(Task::Items(rest));
                        tasks.push(Task::Eval(node));
                    }
                }
                Task::Entries(mut rest) => {
                    if let Some((key, value)) = rest.next() {
                        tasks.push(Task::Entries(rest));
                        tasks.push(Task::Eval(value));
                        tasks.push(Task::Eval(key));
                    }
                }
                Task::Select(field) => {
                    let operand = pop(&mut values)?;
                    values.push(kernels::select(&operand, field)?);
                }
                Task::Has(field) => {
                    let operand = pop(&mut values)?;
                    values.push(kernels::has_field(&operand, field)?);
                }
                Task::Index => {
                    let index = pop(&mut values)?;
                    let operand = pop(&mut values)?;
                    values.push(kernels::index(&operand, &index)?);
                }
                Task::Unary(kernel) => {
                    let operand = pop(&mut values)?;
                    values.push(kernel(&operand)?);
                }
                Task::Binary(kernel) => {
                    let right = pop(&mut values)?;
                    let left = pop(&mut values)?;
                    values.push(kernel(&left, &right)?);
                }
                Task::AndRhs(rhs) => match pop(&mut values)? {
                    Value::Bool(false) => values.push(Value::Bool(false)),
                    Value::Bool(true) => {
                        tasks.push(Task::ExpectBool("&&"));
                        tasks.push(Task::Eval(rhs));
                    }
                    other => return Err(logical_operand("&&", &other)),
                },
                Task::OrRhs(rhs) => match pop(&mut values)? {
                    Value::Bool(true) => values.push(Value::Bool(true)),
                    Value::Bool(false) => {
                        tasks.push(Task::ExpectBool("||"));
                        tasks.push(Task::Eval(rhs));
                    }
                    other => return Err(logical_operand("||", &other)),
                },
                Task::ExpectBool(op) => match values.last() {
                    Some(Value::Bool(_)) => {}
                    Some(other) => return Err(logical_operand(op, other)),
                    None => return Err(underflow()),
                },
                Task::Branch { then, otherwise } => match pop(&mut values)? {
                    Value::Bool(true) => tasks.push(Task::Eval(then)),
                    Value::Bool(false) => tasks.push(Task::Eval(otherwise)),
                    other => return Err(EvalError::type_mismatch("bool condition", other.kind_name())),
                },
                Task::List(len) => {
                    let items = take(&mut values, len)?;
                    values.push(kernels::build_list(items));
                }
                Task::Map(len) => {
                    let flat = take(&mut values, len * 2)?;
                    let mut flat = flat.into_iter();
                    let entries = std::iter::from_fn(|| Some((flat.next()?, flat.next()?)));
                    values.push(kernels::build_map(entries)?);
                }
                Task::Call(site) => {
                    let args = take(&mut values, site.args.len())?;
                    values.push(call(site, &args)?);
                }
            }

            if tasks.len() > self.options.max_stack_depth {
                tracing::debug!(
                    max_stack_depth = self.options.max_stack_depth,
                    "evaluation stack depth exhausted"
                );
                return Err(EvalError::budget_exceeded(format!(
                    "evaluation exceeded stack depth {}",
                    self.options.max_stack_depth
                )));
            }
        }

        let result = pop(&mut values)?;
        if values.is_empty() {
            Ok(result)
        } else {
            Err(EvalError::internal("values left on the stack after evaluation"))
        }
    }

    /// Pushes the work for `node`, or its value when no work is needed.
    fn schedule<'p>(
        &self,
        node: &'p Node,
        tasks: &mut Vec<Task<'p>>,
        values: &mut Vec<Value>,
    ) -> Result<(), EvalError> {
        match node {
            Node::Const(value) => values.push(value.clone()),
            Node::Slot { index, name } => {
                let value = self
                    .activation
                    .resolve_slot(*index, name)
                    .ok_or_else(|| EvalError::no_such_attribute(name))?;
                values.push(value);
            }
            Node::Select { operand, field } => {
                tasks.push(Task::Select(field));
                tasks.push(Task::Eval(operand));
            }
            Node::Has { operand, field } => {
                tasks.push(Task::Has(field));
                tasks.push(Task::Eval(operand));
            }
            Node::Index { operand, index } => {
                tasks.push(Task::Index);
                tasks.push(Task::Eval(index));
                tasks.push(Task::Eval(operand));
            }
            Node::Unary { kernel, operand } => {
                tasks.push(Task::Unary(*kernel));
                tasks.push(Task::Eval(operand));
            }
            Node::Binary {
                kernel,
                left,
                right,
            } => {
                tasks.push(Task::Binary(*kernel));
                tasks.push(Task::Eval(right));
                tasks.push(Task::Eval(left));
            }
            Node::And(left, right) => {
                tasks.push(Task::AndRhs(right));
                tasks.push(Task::Eval(left));
            }
            Node::Or(left, right) => {
                tasks.push(Task::OrRhs(right));
                tasks.push(Task::Eval(left));
            }
            Node::Conditional {
                cond,
                then,
                otherwise,
            } => {
                tasks.push(Task::Branch { then, otherwise });
                tasks.push(Task::Eval(cond));
            }
            Node::List(items) => {
                tasks.push(Task::List(items.len()));
                tasks.push(Task::Items(items.iter()));
            }
            Node::Map(entries) => {
                tasks.push(Task::Map(entries.len()));
                tasks.push(Task::Entries(entries.iter()));
            }
            Node::Call(site) => {
                tasks.push(Task::Call(site));
                tasks.push(Task::Items(site.args.iter()));
            }
        }
        Ok(())
    }
}

/// Runs the first candidate whose parameters admit `args`.
fn call(site: &CallSite, args: &[Value]) -> Result<Value, EvalError> {
    match site.candidates.iter().find(|overload| overload.admits(args)) {
        Some(overload) => overload.call(args),
        None => {
            let kinds: Vec<&str> = args.iter().map(Value::kind_name).collect();
            Err(EvalError::type_mismatch(
                &format!("an overload of '{}'", site.function),
                &format!("({})", kinds.join(", ")),
            ))
        }
    }
}

fn logical_operand(op: &str, value: &Value) -> EvalError {
    EvalError::no_matching_operator(op, &[value.kind_name()])
}

fn underflow() -> EvalError {
    EvalError::internal("value stack underflow")
}

fn pop(values: &mut Vec<Value>) -> Result<Value, EvalError> {
    values.pop().ok_or_else(underflow)
}

fn take(values: &mut Vec<Value>, len: usize) -> Result<Vec<Value>, EvalError> {
    let start = values.len().checked_sub(len).ok_or_else(underflow)?;
    Ok(values.split_off(start))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::eval::{EmptyActivation, EvalErrorKind, MapActivation};
    use crate::types::OperandKind;
    use gavel_parser::BinaryOp;

    fn constant(value: impl Into<Value>) -> Box<Node> {
        Box::new(Node::Const(value.into()))
    }

    fn add(left: Box<Node>, right: Box<Node>) -> Node {
        Node::Binary {
            kernel: kernels::binary_kernel(BinaryOp::Add, OperandKind::Int).expect("kernel"),
            left,
            right,
        }
    }

    fn run(node: &Node, options: &EvalOptions) -> Result<Value, EvalError> {
        Evaluator::new(&EmptyActivation, options).eval(node)
    }

    #[test]
    fn evaluates_binary() {
        let node = add(constant(1), constant(2));
        assert_eq!(run(&node, &EvalOptions::default()), Ok(Value::Int(3)));
    }

    #[test]
    fn and_skips_right_operand() {
        // The right side would fail with NoSuchAttribute if evaluated.
        let node = Node::And(
            constant(false),
            Box::new(Node::Slot {
                index: 0,
                name: Arc::from("missing"),
            }),
        );
        assert_eq!(run(&node, &EvalOptions::default()), Ok(Value::Bool(false)));
    }

    #[test]
    fn or_requires_bool_right_operand() {
        let node = Node::Or(constant(false), constant(1));
        let err = run(&node, &EvalOptions::default()).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::ArgumentTypeMismatch);
    }

    #[test]
    fn missing_binding() {
        let node = Node::Slot {
            index: 0,
            name: Arc::from("x"),
        };
        let err = Evaluator::new(&MapActivation::new(), &EvalOptions::default())
            .eval(&node)
            .unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::NoSuchAttribute);
    }

    #[test]
    fn collections_keep_source_order() {
        let node = Node::Map(vec![
            (Node::Const(Value::from("b")), Node::List(vec![Node::Const(Value::Int(1))])),
            (Node::Const(Value::from("a")), add(constant(2), constant(3))),
        ]);
        let value = run(&node, &EvalOptions::default()).expect("map");
        assert_eq!(value.to_string(), "{\"a\": 5, \"b\": [1]}");
    }

    #[test]
    fn step_budget() {
        let node = add(constant(1), constant(2));
        let options = EvalOptions {
            max_steps: Some(2),
            ..EvalOptions::default()
        };
        let err = run(&node, &options).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::BudgetExceeded);
    }

    #[test]
    fn deep_trees_do_not_recurse() {
        let mut node = Node::Const(Value::Int(0));
        for _ in 0..50_000 {
            node = add(Box::new(node), constant(1));
        }
        let unbounded = EvalOptions {
            max_stack_depth: usize::MAX,
            ..EvalOptions::default()
        };
        assert_eq!(run(&node, &unbounded), Ok(Value::Int(50_000)));

        let err = run(&node, &EvalOptions::default()).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::BudgetExceeded);

        // Dropping a boxed chain this deep would recurse; unwind it by hand.
        let mut current = node;
        while let Node::Binary { left, .. } = current {
            current = *left;
        }
    }
}
