//! Type checker.
//!
//! Checking is optional. It takes the parsed tree plus borrowed
//! [`Declarations`](crate::Declarations) and
//! [`TypeRegistry`](crate::TypeRegistry) and produces a [`CheckResult`]
//! that the compiler uses to bind typed kernels and overloads.

mod checker;
mod errors;
mod overload;

pub use checker::{check, check_with_policy, CheckResult, ReferenceInfo};
pub use errors::{CheckError, CheckErrorKind};
