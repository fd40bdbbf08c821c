//! Function implementations and registry for evaluation.
//!
//! The compiler binds every call site to `Overload`s taken from a
//! `FunctionRegistry`, so programs never look functions up by name while
//! they run.

use std::collections::HashMap;
use std::sync::Arc;

use super::{EvalError, Value};
use crate::types::{FunctionDecl, Type};

/// A function implementation that takes arguments and returns a value.
///
/// The implementation receives a slice of already-evaluated argument values
/// (including the receiver for member functions as the first argument).
pub type FunctionImpl = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// A function overload with its implementation.
#[derive(Clone)]
pub struct Overload {
    /// The overload ID (e.g., "size_string").
    pub id: String,
    /// Whether this is a member function (receiver.method(args)).
    pub is_member: bool,
    /// Declared parameter types, receiver first. Used for runtime dispatch.
    pub params: Vec<Type>,
    pub implementation: FunctionImpl,
}

impl Overload {
    pub fn new(
        id: impl Into<String>,
        is_member: bool,
        params: Vec<Type>,
        implementation: FunctionImpl,
    ) -> Self {
        Self {
            id: id.into(),
            is_member,
            params,
            implementation,
        }
    }

    /// Number of parameters, including the receiver.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Whether every argument's kind is admitted by the matching parameter.
    pub fn admits(&self, args: &[Value]) -> bool {
        self.params.len() == args.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(param, arg)| param.admits(arg))
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        (self.implementation)(args)
    }
}

impl std::fmt::Debug for Overload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overload")
            .field("id", &self.id)
            .field("is_member", &self.is_member)
            .field("params", &self.params)
            .finish()
    }
}

/// A function with all its overloads.
#[derive(Debug, Clone, Default)]
pub struct Function {
    pub name: String,
    pub overloads: Vec<Overload>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overloads: Vec::new(),
        }
    }

    pub fn with_overload(mut self, overload: Overload) -> Self {
        self.overloads.push(overload);
        self
    }

    /// Builds a function from the overloads of `decl` that carry an
    /// implementation.
    pub fn from_decl(decl: &FunctionDecl) -> Self {
        let overloads = decl
            .overloads
            .iter()
            .filter_map(|o| {
                let implementation = o.implementation.clone()?;
                Some(Overload::new(
                    o.id.clone(),
                    o.is_member,
                    o.params.clone(),
                    implementation,
                ))
            })
            .collect();
        Self {
            name: decl.name.clone(),
            overloads,
        }
    }

    pub fn find_overload(&self, id: &str) -> Option<&Overload> {
        self.overloads.iter().find(|o| o.id == id)
    }

    /// Find overloads that match the given arity and member status.
    pub fn find_matching_overloads(&self, arity: usize, is_member: bool) -> Vec<&Overload> {
        self.overloads
            .iter()
            .filter(|o| o.arity() == arity && o.is_member == is_member)
            .collect()
    }
}

/// Native implementations available to compiled programs.
///
/// Owned by the host. The compiler clones the `Arc` implementations it
/// binds, so a registry may be dropped once compilation is done.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Function>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function. Overloads of an already registered name are
    /// merged; an overload with a known id replaces the old one.
    pub fn register(&mut self, function: Function) {
        match self.functions.get_mut(&function.name) {
            Some(existing) => {
                for overload in function.overloads {
                    existing.overloads.retain(|o| o.id != overload.id);
                    existing.overloads.push(overload);
                }
            }
            None => {
                self.functions.insert(function.name.clone(), function);
            }
        }
    }

    /// Registers the implemented overloads of a declaration.
    pub fn register_decl(&mut self, decl: &FunctionDecl) {
        let function = Function::from_decl(decl);
        if !function.overloads.is_empty() {
            self.register(function);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Find an overload by function name and overload ID.
    pub fn find_overload(&self, function_name: &str, overload_id: &str) -> Option<&Overload> {
        self.functions
            .get(function_name)
            .and_then(|f| f.find_overload(overload_id))
    }

    /// Find overloads for a function call with the given arity.
    pub fn find_overloads(
        &self,
        function_name: &str,
        arity: usize,
        is_member: bool,
    ) -> Vec<&Overload> {
        self.functions
            .get(function_name)
            .map(|f| f.find_matching_overloads(arity, is_member))
            .unwrap_or_default()
    }

    /// Merge another registry into this one.
    pub fn merge(&mut self, other: FunctionRegistry) {
        for function in other.functions.into_values() {
            self.register(function);
        }
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Function)> {
        self.functions.iter().map(|(name, f)| (name.as_str(), f))
    }
}
