//! Declarations of variables and functions.
//!
//! Declarations describe what an expression may reference. They carry
//! types for the checker and, optionally, native implementations that
//! `Env` copies into a [`FunctionRegistry`](crate::eval::FunctionRegistry).

use std::collections::HashMap;
use std::sync::Arc;

use super::Type;
use crate::eval::{EvalError, FunctionImpl, Value};

/// One signature of a function.
#[derive(Clone)]
pub struct OverloadDecl {
    /// Unique identifier for this overload (e.g. "starts_with_string").
    pub id: String,
    /// Parameter types, receiver first for methods.
    pub params: Vec<Type>,
    pub result: Type,
    /// Whether this overload is called as `receiver.name(args)`.
    pub is_member: bool,
    pub implementation: Option<FunctionImpl>,
}

impl std::fmt::Debug for OverloadDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverloadDecl")
            .field("id", &self.id)
            .field("params", &self.params)
            .field("result", &self.result)
            .field("is_member", &self.is_member)
            .field("has_impl", &self.implementation.is_some())
            .finish()
    }
}

impl OverloadDecl {
    /// A global function overload: `name(args)`.
    pub fn function(id: impl Into<String>, params: Vec<Type>, result: Type) -> Self {
        Self {
            id: id.into(),
            params,
            result,
            is_member: false,
            implementation: None,
        }
    }

    /// A method overload: `receiver.name(args)`. The first entry of
    /// `params` is the receiver type.
    pub fn method(id: impl Into<String>, params: Vec<Type>, result: Type) -> Self {
        Self {
            id: id.into(),
            params,
            result,
            is_member: true,
            implementation: None,
        }
    }

    /// Attaches the native implementation.
    pub fn with_impl<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.implementation = Some(Arc::new(f));
        self
    }

    /// Renders the signature, e.g. `string.startsWith(string) -> bool`.
    pub fn signature(&self, function: &str) -> String {
        let join = |types: &[Type]| {
            types
                .iter()
                .map(Type::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self.params.split_first() {
            Some((receiver, rest)) if self.is_member => {
                format!("{receiver}.{function}({}) -> {}", join(rest), self.result)
            }
            _ => format!("{function}({}) -> {}", join(&self.params), self.result),
        }
    }
}

/// A function name with all of its overloads.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub overloads: Vec<OverloadDecl>,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overloads: Vec::new(),
        }
    }

    pub fn with_overload(mut self, overload: OverloadDecl) -> Self {
        self.overloads.push(overload);
        self
    }

    pub fn with_overloads(mut self, overloads: impl IntoIterator<Item = OverloadDecl>) -> Self {
        self.overloads.extend(overloads);
        self
    }

    pub fn find_overload(&self, id: &str) -> Option<&OverloadDecl> {
        self.overloads.iter().find(|o| o.id == id)
    }
}

/// Variables and functions an expression may reference.
///
/// Owned by the host and only borrowed by the checker and compiler.
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    variables: HashMap<String, Type>,
    functions: HashMap<String, FunctionDecl>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: impl Into<String>, var_type: Type) -> Self {
        self.add_variable(name, var_type);
        self
    }

    /// Declares a variable, replacing any earlier declaration of the name.
    pub fn add_variable(&mut self, name: impl Into<String>, var_type: Type) {
        self.variables.insert(name.into(), var_type);
    }

    pub fn with_function(mut self, decl: FunctionDecl) -> Self {
        self.add_function(decl);
        self
    }

    /// Declares a function. Overloads of an already declared name are merged.
    pub fn add_function(&mut self, decl: FunctionDecl) {
        match self.functions.get_mut(&decl.name) {
            Some(existing) => existing.overloads.extend(decl.overloads),
            None => {
                self.functions.insert(decl.name.clone(), decl);
            }
        }
    }

    pub fn variable(&self, name: &str) -> Option<&Type> {
        self.variables.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.get(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &Type)> {
        self.variables.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.functions.values()
    }
}
