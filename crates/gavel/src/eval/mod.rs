//! Runtime: values, bindings, native functions and the evaluator.
//!
//! - `Value` represents runtime values
//! - `Activation` provides variable bindings
//! - `FunctionRegistry` holds native implementations bound at compile time
//! - `Program` is the compiled, shareable expression
//!
//! # Example
//!
//! ```
//! use gavel::{Env, Type};
//! use gavel::eval::{MapActivation, Value};
//!
//! let env = Env::with_standard_library().with_variable("x", Type::Int);
//! let program = env.compile("x + 1").unwrap();
//!
//! let activation = MapActivation::new().with("x", 41);
//! assert_eq!(program.evaluate(&activation), Ok(Value::Int(42)));
//! ```

mod activation;
mod error;
mod evaluator;
mod functions;
pub(crate) mod kernels;
mod program;
mod value;

pub use activation::{Activation, EmptyActivation, MapActivation, SlotActivation};
pub use error::{EvalError, EvalErrorKind};
pub(crate) use evaluator::Evaluator;
pub use functions::{Function, FunctionImpl, FunctionRegistry, Overload};
pub use program::{EvalOptions, Program};
pub use value::{MapKey, Object, Value, ValueMap};
