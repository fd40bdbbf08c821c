//! Compiler from syntax trees to programs.
//!
//! Lowering assigns every distinct variable name a slot (in order of first
//! occurrence), binds each operator to a kernel and each call to concrete
//! overloads from the [`FunctionRegistry`], lowers `&&`, `||` and `?:` to
//! control nodes and folds constant subtrees.
//!
//! With a [`CheckResult`] the compiler uses the operand kinds and overloads
//! the checker chose. Without one (untyped mode) operators use dynamic
//! kernels and calls keep every overload with matching style and arity.

mod node;

use std::collections::HashMap;
use std::sync::Arc;

use gavel_parser::{BinaryOp, Expr, Span, SpannedExpr};
use thiserror::Error;

use crate::checker::CheckResult;
use crate::eval::kernels::{self, binary_kernel, unary_kernel};
use crate::eval::{EvalOptions, FunctionRegistry, Overload, Program, Value};
use crate::types::{Declarations, OperandKind, Type};

pub(crate) use node::{CallSite, Node};

/// Failure to turn a syntax tree into a program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("unresolved identifier '{name}'")]
    UnresolvedIdentifier { name: String, span: Span },

    #[error("{}", unresolved_function(.function, .overload_id))]
    UnresolvedFunction {
        function: String,
        /// The overload chosen by the checker, when there was one.
        overload_id: Option<String>,
        span: Span,
    },

    /// The tree cannot be compiled, e.g. it still holds error placeholders.
    #[error("{message}")]
    Malformed { message: String, span: Span },
}

fn unresolved_function(function: &str, overload_id: &Option<String>) -> String {
    match overload_id {
        Some(id) => format!("no implementation registered for '{function}' overload '{id}'"),
        None => format!("no implementation registered for '{function}' with matching arguments"),
    }
}

impl CompileError {
    pub fn span(&self) -> Span {
        match self {
            CompileError::UnresolvedIdentifier { span, .. }
            | CompileError::UnresolvedFunction { span, .. }
            | CompileError::Malformed { span, .. } => span.clone(),
        }
    }
}

/// Compiles syntax trees against borrowed declarations and functions.
pub struct Compiler<'a> {
    declarations: &'a Declarations,
    functions: &'a FunctionRegistry,
    options: EvalOptions,
}

impl<'a> Compiler<'a> {
    pub fn new(declarations: &'a Declarations, functions: &'a FunctionRegistry) -> Self {
        Self {
            declarations,
            functions,
            options: EvalOptions::default(),
        }
    }

    /// Limits stored in compiled programs.
    pub fn with_eval_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    /// Compiles `ast`. Pass the checker's result for typed compilation, or
    /// `None` for untyped mode.
    #[tracing::instrument(level = "debug", skip_all, fields(typed = checked.is_some()))]
    pub fn compile(
        &self,
        ast: &SpannedExpr,
        checked: Option<&CheckResult>,
    ) -> Result<Program, CompileError> {
        if let Some(first) = checked.and_then(|c| c.errors.first()) {
            return Err(CompileError::Malformed {
                message: format!("expression failed type checking: {first}"),
                span: first.span.clone(),
            });
        }

        let mut lowering = Lowering {
            compiler: self,
            checked,
            slots: Vec::new(),
            slot_index: HashMap::new(),
        };
        let root = lowering.lower(ast)?;
        let result_type = checked.map_or(Type::Dyn, |c| c.result_type.clone());

        tracing::debug!(
            slots = lowering.slots.len(),
            constant = root.as_const().is_some(),
            "compiled program"
        );
        Ok(Program::new(root, lowering.slots, result_type, self.options))
    }
}

struct Lowering<'c, 'a> {
    compiler: &'c Compiler<'a>,
    checked: Option<&'c CheckResult>,
    slots: Vec<Arc<str>>,
    slot_index: HashMap<Arc<str>, usize>,
}

impl Lowering<'_, '_> {
    fn lower(&mut self, expr: &SpannedExpr) -> Result<Node, CompileError> {
        let node = match &expr.node {
            Expr::Null => Node::Const(Value::Null),
            Expr::Bool(b) => Node::Const(Value::Bool(*b)),
            Expr::Int(i) => Node::Const(self.int_literal(*i, expr.id)),
            Expr::UInt(u) => Node::Const(Value::UInt(*u)),
            Expr::Float(f) => Node::Const(Value::Double(*f)),
            Expr::String(s) => Node::Const(Value::from(s.as_str())),
            Expr::Bytes(b) => Node::Const(Value::bytes(b.as_slice())),
            Expr::Ident(name) => self.slot(name, expr)?,
            Expr::List(items) => {
                let items = items
                    .iter()
                    .map(|item| self.lower(item))
                    .collect::<Result<Vec<_>, _>>()?;
                fold_list(items)
            }
            Expr::Map(entries) => {
                let entries = entries
                    .iter()
                    .map(|(k, v)| Ok((self.lower(k)?, self.lower(v)?)))
                    .collect::<Result<Vec<_>, CompileError>>()?;
                fold_map(entries)
            }
            Expr::Unary { op, expr: operand } => {
                let kernel = unary_kernel(*op, self.operand_kind(expr.id));
                let operand = self.lower(operand)?;
                match operand.as_const().map(kernel) {
                    Some(Ok(value)) => Node::Const(value),
                    _ => Node::Unary {
                        kernel,
                        operand: Box::new(operand),
                    },
                }
            }
            Expr::Binary {
                op: BinaryOp::And,
                left,
                right,
            } => self.lower_logical(true, left, right)?,
            Expr::Binary {
                op: BinaryOp::Or,
                left,
                right,
            } => self.lower_logical(false, left, right)?,
            Expr::Binary { op, left, right } => {
                let kernel = binary_kernel(*op, self.operand_kind(expr.id)).ok_or_else(|| {
                    CompileError::Malformed {
                        message: format!("operator '{}' has no kernel", op.symbol()),
                        span: expr.span.clone(),
                    }
                })?;
                let left = self.lower(left)?;
                let right = self.lower(right)?;
                fold_binary(kernel, left, right)
            }
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                let cond = self.lower(cond)?;
                match cond.as_const() {
                    Some(Value::Bool(true)) => self.lower(then_expr)?,
                    Some(Value::Bool(false)) => self.lower(else_expr)?,
                    _ => Node::Conditional {
                        cond: Box::new(cond),
                        then: Box::new(self.lower(then_expr)?),
                        otherwise: Box::new(self.lower(else_expr)?),
                    },
                }
            }
            Expr::Member { expr: operand, field } => {
                let operand = self.lower(operand)?;
                match operand.as_const().map(|v| kernels::select(v, field)) {
                    Some(Ok(value)) => Node::Const(value),
                    _ => Node::Select {
                        operand: Box::new(operand),
                        field: Arc::from(field.as_str()),
                    },
                }
            }
            Expr::Has { expr: operand, field } => {
                let operand = self.lower(operand)?;
                match operand.as_const().map(|v| kernels::has_field(v, field)) {
                    Some(Ok(value)) => Node::Const(value),
                    _ => Node::Has {
                        operand: Box::new(operand),
                        field: Arc::from(field.as_str()),
                    },
                }
            }
            Expr::Index { expr: operand, index } => {
                let operand = self.lower(operand)?;
                let index = self.lower(index)?;
                match (operand.as_const(), index.as_const()) {
                    (Some(o), Some(i)) => match kernels::index(o, i) {
                        Ok(value) => Node::Const(value),
                        Err(_) => unfolded_index(operand, index),
                    },
                    _ => unfolded_index(operand, index),
                }
            }
            Expr::Call { expr: callee, args } => self.lower_call(callee, args, expr)?,
            Expr::Error => {
                return Err(CompileError::Malformed {
                    message: "expression contains syntax errors".to_string(),
                    span: expr.span.clone(),
                })
            }
        };
        Ok(node)
    }

    fn int_literal(&self, value: i64, id: i64) -> Value {
        match self.checked.and_then(|c| c.coercions.get(&id)) {
            Some(Type::UInt) => u64::try_from(value).map_or(Value::Int(value), Value::UInt),
            Some(Type::Double) => Value::Double(value as f64),
            _ => Value::Int(value),
        }
    }

    fn operand_kind(&self, id: i64) -> OperandKind {
        self.checked
            .and_then(|c| c.operators.get(&id).copied())
            .unwrap_or(OperandKind::Dyn)
    }

    fn slot(&mut self, name: &str, expr: &SpannedExpr) -> Result<Node, CompileError> {
        if self.compiler.declarations.variable(name).is_none() {
            return Err(CompileError::UnresolvedIdentifier {
                name: name.to_string(),
                span: expr.span.clone(),
            });
        }
        let index = match self.slot_index.get(name) {
            Some(index) => *index,
            None => {
                let name: Arc<str> = Arc::from(name);
                let index = self.slots.len();
                self.slots.push(name.clone());
                self.slot_index.insert(name, index);
                index
            }
        };
        Ok(Node::Slot {
            index,
            name: self.slots[index].clone(),
        })
    }

    /// `&&` when `is_and`, otherwise `||`. A constant left operand that
    /// decides the result means the right operand is never compiled.
    fn lower_logical(
        &mut self,
        is_and: bool,
        left: &SpannedExpr,
        right: &SpannedExpr,
    ) -> Result<Node, CompileError> {
        let left = self.lower(left)?;
        match left.as_const() {
            Some(Value::Bool(b)) if *b != is_and => return Ok(Node::Const(Value::Bool(*b))),
            Some(Value::Bool(_)) => {
                let right = self.lower(right)?;
                if let Some(Value::Bool(b)) = right.as_const() {
                    return Ok(Node::Const(Value::Bool(*b)));
                }
                return Ok(logical(is_and, left, right));
            }
            _ => {}
        }
        let right = self.lower(right)?;
        Ok(logical(is_and, left, right))
    }

    fn lower_call(
        &mut self,
        callee: &SpannedExpr,
        args: &[SpannedExpr],
        expr: &SpannedExpr,
    ) -> Result<Node, CompileError> {
        let Some((name, receiver)) = callee.node.call_target() else {
            return Err(CompileError::Malformed {
                message: "only named functions can be called".to_string(),
                span: expr.span.clone(),
            });
        };

        let mut lowered = Vec::with_capacity(args.len() + 1);
        if let Some(receiver) = receiver {
            lowered.push(self.lower(receiver)?);
        }
        for arg in args {
            lowered.push(self.lower(arg)?);
        }

        let candidates = self.bind_overloads(name, receiver.is_some(), lowered.len(), expr)?;
        Ok(Node::Call(CallSite {
            function: Arc::from(name),
            candidates,
            args: lowered,
        }))
    }

    fn bind_overloads(
        &self,
        name: &str,
        is_member: bool,
        arity: usize,
        expr: &SpannedExpr,
    ) -> Result<Vec<Overload>, CompileError> {
        let functions = self.compiler.functions;
        let reference = self.checked.and_then(|c| c.get_reference(expr.id));

        if let Some(reference) = reference {
            return reference
                .overload_ids
                .iter()
                .map(|id| {
                    functions
                        .find_overload(name, id)
                        .cloned()
                        .ok_or_else(|| CompileError::UnresolvedFunction {
                            function: name.to_string(),
                            overload_id: Some(id.clone()),
                            span: expr.span.clone(),
                        })
                })
                .collect();
        }

        let candidates: Vec<Overload> = functions
            .find_overloads(name, arity, is_member)
            .into_iter()
            .cloned()
            .collect();
        if candidates.is_empty() {
            return Err(CompileError::UnresolvedFunction {
                function: name.to_string(),
                overload_id: None,
                span: expr.span.clone(),
            });
        }
        Ok(candidates)
    }
}

fn logical(is_and: bool, left: Node, right: Node) -> Node {
    if is_and {
        Node::And(Box::new(left), Box::new(right))
    } else {
        Node::Or(Box::new(left), Box::new(right))
    }
}

fn fold_binary(kernel: kernels::BinaryKernel, left: Node, right: Node) -> Node {
    if let (Some(l), Some(r)) = (left.as_const(), right.as_const()) {
        if let Ok(value) = kernel(l, r) {
            return Node::Const(value);
        }
    }
    Node::Binary {
        kernel,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn fold_list(items: Vec<Node>) -> Node {
    if items.iter().all(|item| item.as_const().is_some()) {
        let values = items
            .into_iter()
            .filter_map(|item| match item {
                Node::Const(value) => Some(value),
                _ => None,
            })
            .collect();
        return Node::Const(kernels::build_list(values));
    }
    Node::List(items)
}

fn fold_map(entries: Vec<(Node, Node)>) -> Node {
    let constant: Option<Vec<(Value, Value)>> = entries
        .iter()
        .map(|(k, v)| Some((k.as_const()?.clone(), v.as_const()?.clone())))
        .collect();
    match constant.map(kernels::build_map) {
        Some(Ok(value)) => Node::Const(value),
        _ => Node::Map(entries),
    }
}

fn unfolded_index(operand: Node, index: Node) -> Node {
    Node::Index {
        operand: Box::new(operand),
        index: Box::new(index),
    }
}
