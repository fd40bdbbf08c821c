//! Core type checker implementation.
//!
//! The checker walks the syntax tree once, assigning a type to every node.
//! Errors do not stop the walk: the offending node is typed `Dyn` and
//! checking continues, so one pass reports every problem.

use std::collections::HashMap;

use gavel_parser::{BinaryOp, Expr, SpannedExpr};

use super::errors::CheckError;
use super::overload::resolve_overload;
use crate::types::{
    resolve_binary, resolve_unary, Declarations, NumericLiteralPolicy, OperandKind, Type,
    TypeRegistry,
};

/// Reference information for a resolved identifier or function.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceInfo {
    pub name: String,
    /// Matching overload IDs for function calls.
    pub overload_ids: Vec<String>,
}

impl ReferenceInfo {
    pub fn ident(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overload_ids: Vec::new(),
        }
    }

    pub fn function(name: impl Into<String>, overload_ids: Vec<String>) -> Self {
        Self {
            name: name.into(),
            overload_ids,
        }
    }
}

/// Result of type checking an expression.
#[derive(Debug, Clone, Default)]
pub struct CheckResult {
    /// Map from expression ID to inferred type.
    pub type_map: HashMap<i64, Type>,
    /// Map from expression ID to resolved reference.
    pub reference_map: HashMap<i64, ReferenceInfo>,
    /// Operand kind chosen for each operator node.
    pub operators: HashMap<i64, OperandKind>,
    /// Integer literals retyped under [`NumericLiteralPolicy::Adaptive`].
    pub coercions: HashMap<i64, Type>,
    /// Type of the whole expression.
    pub result_type: Type,
    /// Errors encountered during type checking.
    pub errors: Vec<CheckError>,
}

impl CheckResult {
    /// Check if type checking was successful (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the type for an expression ID.
    pub fn get_type(&self, expr_id: i64) -> Option<&Type> {
        self.type_map.get(&expr_id)
    }

    /// Get the reference for an expression ID.
    pub fn get_reference(&self, expr_id: i64) -> Option<&ReferenceInfo> {
        self.reference_map.get(&expr_id)
    }
}

/// Type-check `ast` with strict numeric literals.
pub fn check(ast: &SpannedExpr, declarations: &Declarations, registry: &TypeRegistry) -> CheckResult {
    check_with_policy(ast, declarations, registry, NumericLiteralPolicy::Strict)
}

/// Type-check `ast` under the given numeric literal policy.
pub fn check_with_policy(
    ast: &SpannedExpr,
    declarations: &Declarations,
    registry: &TypeRegistry,
    policy: NumericLiteralPolicy,
) -> CheckResult {
    let mut checker = Checker::new(declarations, registry, policy);
    let result_type = checker.check_expr(ast);
    checker.result.result_type = result_type;
    checker.result
}

/// Type checker for expressions. Borrows declarations and registry
/// read-only.
struct Checker<'a> {
    declarations: &'a Declarations,
    registry: &'a TypeRegistry,
    policy: NumericLiteralPolicy,
    result: CheckResult,
}

impl<'a> Checker<'a> {
    fn new(
        declarations: &'a Declarations,
        registry: &'a TypeRegistry,
        policy: NumericLiteralPolicy,
    ) -> Self {
        Self {
            declarations,
            registry,
            policy,
            result: CheckResult::default(),
        }
    }

    fn check_expr(&mut self, expr: &SpannedExpr) -> Type {
        let ty = match &expr.node {
            Expr::Null => Type::Null,
            Expr::Bool(_) => Type::Bool,
            Expr::Int(_) => Type::Int,
            Expr::UInt(_) => Type::UInt,
            Expr::Float(_) => Type::Double,
            Expr::String(_) => Type::String,
            Expr::Bytes(_) => Type::Bytes,
            Expr::Ident(name) => self.check_ident(name, expr),
            Expr::List(items) => self.check_list(items),
            Expr::Map(entries) => self.check_map(entries),
            Expr::Unary { op, expr: operand } => {
                let operand_type = self.check_expr(operand);
                match resolve_unary(*op, &operand_type) {
                    Some(binding) => {
                        self.result.operators.insert(expr.id, binding.kind);
                        binding.result
                    }
                    None => self.mismatch(
                        format!("an operand supported by '{}'", op.symbol()),
                        vec![operand_type],
                        expr,
                    ),
                }
            }
            Expr::Binary { op, left, right } => self.check_binary(*op, left, right, expr),
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => self.check_ternary(cond, then_expr, else_expr, expr),
            Expr::Member { expr: operand, field } => {
                let operand_type = self.check_expr(operand);
                self.field_type(&operand_type, field, expr)
            }
            Expr::Has { expr: operand, field } => {
                let operand_type = self.check_expr(operand);
                self.field_type(&operand_type, field, expr);
                Type::Bool
            }
            Expr::Index { expr: operand, index } => self.check_index(operand, index, expr),
            Expr::Call { expr: callee, args } => self.check_call(callee, args, expr),
            // Already reported by the parser.
            Expr::Error => Type::Dyn,
        };
        self.result.type_map.insert(expr.id, ty.clone());
        ty
    }

    fn mismatch(&mut self, expected: impl Into<String>, found: Vec<Type>, expr: &SpannedExpr) -> Type {
        self.result.errors.push(CheckError::type_mismatch(
            expected,
            found,
            expr.span.clone(),
            expr.id,
        ));
        Type::Dyn
    }

    fn check_ident(&mut self, name: &str, expr: &SpannedExpr) -> Type {
        match self.declarations.variable(name) {
            Some(ty) => {
                self.result
                    .reference_map
                    .insert(expr.id, ReferenceInfo::ident(name));
                ty.clone()
            }
            None => {
                self.result.errors.push(CheckError::unknown_identifier(
                    name,
                    expr.span.clone(),
                    expr.id,
                ));
                Type::Dyn
            }
        }
    }

    fn check_list(&mut self, items: &[SpannedExpr]) -> Type {
        let elem = items
            .iter()
            .map(|item| self.check_expr(item))
            .reduce(|acc, ty| acc.join(&ty))
            .unwrap_or(Type::Dyn);
        Type::list(elem)
    }

    fn check_map(&mut self, entries: &[(SpannedExpr, SpannedExpr)]) -> Type {
        let mut key_type: Option<Type> = None;
        let mut value_type: Option<Type> = None;
        for (key, value) in entries {
            let k = self.check_expr(key);
            if !matches!(k, Type::Bool | Type::Int | Type::UInt | Type::String | Type::Dyn) {
                self.mismatch("a bool, int, uint or string map key", vec![k.clone()], key);
            }
            let v = self.check_expr(value);
            key_type = Some(key_type.map_or(k.clone(), |acc| acc.join(&k)));
            value_type = Some(value_type.map_or(v.clone(), |acc| acc.join(&v)));
        }
        Type::map(
            key_type.unwrap_or(Type::Dyn),
            value_type.unwrap_or(Type::Dyn),
        )
    }

    fn check_binary(
        &mut self,
        op: BinaryOp,
        left: &SpannedExpr,
        right: &SpannedExpr,
        expr: &SpannedExpr,
    ) -> Type {
        let mut left_type = self.check_expr(left);
        let mut right_type = self.check_expr(right);

        if self.policy == NumericLiteralPolicy::Adaptive && !matches!(op, BinaryOp::And | BinaryOp::Or) {
            if let Some(ty) = self.coerce_literal(left, &right_type) {
                left_type = ty;
            } else if let Some(ty) = self.coerce_literal(right, &left_type) {
                right_type = ty;
            }
        }

        match resolve_binary(op, &left_type, &right_type) {
            Some(binding) => {
                self.result.operators.insert(expr.id, binding.kind);
                binding.result
            }
            None => {
                let expected = match op {
                    BinaryOp::And | BinaryOp::Or => format!("bool operands for '{}'", op.symbol()),
                    _ => format!("operands supported by '{}'", op.symbol()),
                };
                self.mismatch(expected, vec![left_type, right_type], expr)
            }
        }
    }

    /// Retypes an unsuffixed integer literal to `target` when the value
    /// converts exactly.
    fn coerce_literal(&mut self, literal: &SpannedExpr, target: &Type) -> Option<Type> {
        let Expr::Int(value) = literal.node else {
            return None;
        };
        let lossless = match target {
            Type::UInt => value >= 0,
            // Integers up to 2^53 are exact in a double.
            Type::Double => value.unsigned_abs() <= 1u64 << 53,
            _ => false,
        };
        if !lossless {
            return None;
        }
        self.result.coercions.insert(literal.id, target.clone());
        self.result.type_map.insert(literal.id, target.clone());
        Some(target.clone())
    }

    fn check_ternary(
        &mut self,
        cond: &SpannedExpr,
        then_expr: &SpannedExpr,
        else_expr: &SpannedExpr,
        expr: &SpannedExpr,
    ) -> Type {
        let cond_type = self.check_expr(cond);
        if !matches!(cond_type, Type::Bool | Type::Dyn) {
            self.mismatch("a bool condition", vec![cond_type], cond);
        }

        let then_type = self.check_expr(then_expr);
        let else_type = self.check_expr(else_expr);
        if then_type == else_type {
            then_type
        } else if then_type.is_dyn() || else_type.is_dyn() {
            Type::Dyn
        } else if then_type.is_assignable_from(&else_type) && else_type.is_assignable_from(&then_type) {
            then_type.join(&else_type)
        } else {
            self.mismatch("branches of the same type", vec![then_type, else_type], expr)
        }
    }

    /// Type of `operand.field`. Reports `UnknownField` when the operand
    /// type has no such field.
    fn field_type(&mut self, operand: &Type, field: &str, expr: &SpannedExpr) -> Type {
        let found = match operand {
            Type::Dyn => Some(Type::Dyn),
            Type::Map(key, value) if matches!(**key, Type::String | Type::Dyn) => {
                Some((**value).clone())
            }
            Type::Object(name) => self.registry.field_type(name, field).cloned(),
            _ => None,
        };
        found.unwrap_or_else(|| {
            self.result.errors.push(CheckError::unknown_field(
                &operand.display_name(),
                field,
                expr.span.clone(),
                expr.id,
            ));
            Type::Dyn
        })
    }

    fn check_index(&mut self, operand: &SpannedExpr, index: &SpannedExpr, expr: &SpannedExpr) -> Type {
        let operand_type = self.check_expr(operand);
        let index_type = self.check_expr(index);
        match &operand_type {
            Type::Dyn => Type::Dyn,
            Type::List(elem) if matches!(index_type, Type::Int | Type::Dyn) => (**elem).clone(),
            Type::Map(key, value) if key.is_assignable_from(&index_type) => (**value).clone(),
            _ => self.mismatch(
                "a list indexed by int or a map indexed by its key type",
                vec![operand_type, index_type],
                expr,
            ),
        }
    }

    fn check_call(&mut self, callee: &SpannedExpr, args: &[SpannedExpr], expr: &SpannedExpr) -> Type {
        let Some((name, receiver)) = callee.node.call_target() else {
            return self.mismatch("a named function", Vec::new(), expr);
        };

        let mut arg_types = Vec::with_capacity(args.len() + 1);
        if let Some(receiver) = receiver {
            arg_types.push(self.check_expr(receiver));
        }
        arg_types.extend(args.iter().map(|arg| self.check_expr(arg)));

        let Some(decl) = self.declarations.function(name) else {
            self.result.errors.push(CheckError::unknown_identifier(
                name,
                expr.span.clone(),
                expr.id,
            ));
            return Type::Dyn;
        };

        match resolve_overload(decl, receiver.is_some(), &arg_types) {
            Ok(resolved) => {
                self.result.reference_map.insert(
                    expr.id,
                    ReferenceInfo::function(name, resolved.overload_ids),
                );
                resolved.result_type
            }
            Err(kind) => {
                self.result
                    .errors
                    .push(CheckError::new(kind, expr.span.clone(), expr.id));
                Type::Dyn
            }
        }
    }
}
