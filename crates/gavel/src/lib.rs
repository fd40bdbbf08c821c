//! gavel: an embeddable, sandboxed expression engine.
//!
//! Expressions are compiled once into an immutable [`Program`] and evaluated
//! many times, from any number of threads, against host-supplied bindings.
//!
//! # Quick Start
//!
//! ```
//! use gavel::{Env, MapActivation, Type, Value};
//!
//! let env = Env::with_standard_library()
//!     .with_variable("Origin", Type::String)
//!     .with_variable("Value", Type::Int);
//!
//! let program = env.compile(r#"Origin == "MOW" && Value >= 100"#).unwrap();
//! let activation = MapActivation::new()
//!     .with("Origin", "MOW")
//!     .with("Value", 120);
//! assert_eq!(program.evaluate(&activation), Ok(Value::Bool(true)));
//! ```
//!
//! # Architecture
//!
//! - **Parser** (`gavel-parser`): source text to a spanned syntax tree
//! - **Checker**: optional static typing against [`Declarations`] and a
//!   [`TypeRegistry`]
//! - **Compiler**: slots, overload binding and constant folding
//! - **Evaluator**: an explicit work stack bounded by [`EvalOptions`]
//!
//! [`Env`] ties the stages together; [`compile`] does the same for
//! host-owned declarations and registries.

mod diagnostic;
mod env;

pub mod checker;
pub mod compiler;
pub mod eval;
pub mod stdlib;
pub mod types;

pub use diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
pub use env::{compile, Env};

pub use checker::{check, check_with_policy, CheckError, CheckErrorKind, CheckResult, ReferenceInfo};
pub use compiler::{CompileError, Compiler};

pub use eval::{
    Activation, EmptyActivation, EvalError, EvalErrorKind, EvalOptions, Function, FunctionImpl,
    FunctionRegistry, MapActivation, MapKey, Object, Overload, Program, SlotActivation, Value,
    ValueMap,
};

pub use types::{
    Declarations, FunctionDecl, NumericLiteralPolicy, ObjectType, OverloadDecl, Type, TypeRegistry,
};

pub use gavel_parser::{
    parse, parse_with_options, BinaryOp, Expr, ParseError, ParseErrorKind, ParseOptions,
    ParseResult, Span, Spanned, SpannedExpr, UnaryOp,
};
