//! Standard library functions.
//!
//! # Functions
//!
//! - `size` - length of a string (in code points), bytes, list or map; global and method form
//! - `contains`, `startsWith`, `endsWith` - substring tests on strings
//! - `matches` - regular expression search; global and method form
//! - `int`, `uint`, `double`, `string`, `bool` - conversions

use regex::Regex;

use crate::eval::kernels::{double_to_int, double_to_uint};
use crate::eval::{EvalError, Value};
use crate::types::{FunctionDecl, OverloadDecl, Type};

fn string_arg<'v>(args: &'v [Value], index: usize) -> Result<&'v str, EvalError> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(EvalError::type_mismatch("string", other.kind_name())),
        None => Err(EvalError::internal("missing argument")),
    }
}

fn single(args: &[Value]) -> Result<&Value, EvalError> {
    match args {
        [value] => Ok(value),
        _ => Err(EvalError::internal("expected one argument")),
    }
}

// ==================== Size ====================

fn size(args: &[Value]) -> Result<Value, EvalError> {
    let len = match single(args)? {
        Value::String(s) => s.chars().count(),
        Value::Bytes(b) => b.len(),
        Value::List(l) => l.len(),
        Value::Map(m) => m.len(),
        other => return Err(EvalError::type_mismatch("string, bytes, list or map", other.kind_name())),
    };
    i64::try_from(len)
        .map(Value::Int)
        .map_err(|_| EvalError::overflow("size"))
}

fn size_decl() -> FunctionDecl {
    let sized = [
        ("string", Type::String),
        ("bytes", Type::Bytes),
        ("list", Type::list(Type::Dyn)),
        ("map", Type::map(Type::Dyn, Type::Dyn)),
    ];
    let mut decl = FunctionDecl::new("size");
    for (name, ty) in sized {
        decl = decl
            .with_overload(
                OverloadDecl::function(format!("size_{name}"), vec![ty.clone()], Type::Int)
                    .with_impl(size),
            )
            .with_overload(
                OverloadDecl::method(format!("{name}_size"), vec![ty], Type::Int).with_impl(size),
            );
    }
    decl
}

// ==================== Strings ====================

fn string_predicate(
    name: &str,
    id: &str,
    test: fn(&str, &str) -> bool,
) -> FunctionDecl {
    FunctionDecl::new(name).with_overload(
        OverloadDecl::method(id, vec![Type::String, Type::String], Type::Bool).with_impl(
            move |args| {
                let s = string_arg(args, 0)?;
                let needle = string_arg(args, 1)?;
                Ok(Value::Bool(test(s, needle)))
            },
        ),
    )
}

fn regex_matches(args: &[Value]) -> Result<Value, EvalError> {
    let s = string_arg(args, 0)?;
    let pattern = string_arg(args, 1)?;
    let re = Regex::new(pattern)
        .map_err(|e| EvalError::invalid_argument(format!("invalid regex '{pattern}': {e}")))?;
    Ok(Value::Bool(re.is_match(s)))
}

fn matches_decl() -> FunctionDecl {
    FunctionDecl::new("matches")
        .with_overload(
            OverloadDecl::method("matches_string", vec![Type::String, Type::String], Type::Bool)
                .with_impl(regex_matches),
        )
        .with_overload(
            OverloadDecl::function("matches", vec![Type::String, Type::String], Type::Bool)
                .with_impl(regex_matches),
        )
}

// ==================== Conversions ====================

fn parse_arg<T: std::str::FromStr>(s: &str, target: &str) -> Result<T, EvalError>
where
    T::Err: std::fmt::Display,
{
    s.trim()
        .parse()
        .map_err(|e| EvalError::invalid_argument(format!("cannot convert '{s}' to {target}: {e}")))
}

fn to_int(args: &[Value]) -> Result<Value, EvalError> {
    let value = match single(args)? {
        Value::Int(i) => *i,
        Value::UInt(u) => i64::try_from(*u).map_err(|_| EvalError::overflow("int conversion"))?,
        Value::Double(d) => double_to_int(*d).ok_or_else(|| EvalError::overflow("int conversion"))?,
        Value::String(s) => parse_arg(s, "int")?,
        other => return Err(EvalError::type_mismatch("int, uint, double or string", other.kind_name())),
    };
    Ok(Value::Int(value))
}

fn to_uint(args: &[Value]) -> Result<Value, EvalError> {
    let value = match single(args)? {
        Value::Int(i) => u64::try_from(*i).map_err(|_| EvalError::overflow("uint conversion"))?,
        Value::UInt(u) => *u,
        Value::Double(d) => {
            double_to_uint(*d).ok_or_else(|| EvalError::overflow("uint conversion"))?
        }
        Value::String(s) => parse_arg(s, "uint")?,
        other => return Err(EvalError::type_mismatch("int, uint, double or string", other.kind_name())),
    };
    Ok(Value::UInt(value))
}

fn to_double(args: &[Value]) -> Result<Value, EvalError> {
    let value = match single(args)? {
        Value::Int(i) => *i as f64,
        Value::UInt(u) => *u as f64,
        Value::Double(d) => *d,
        Value::String(s) => parse_arg(s, "double")?,
        other => return Err(EvalError::type_mismatch("int, uint, double or string", other.kind_name())),
    };
    Ok(Value::Double(value))
}

fn to_string(args: &[Value]) -> Result<Value, EvalError> {
    let value = match single(args)? {
        Value::String(s) => return Ok(Value::String(s.clone())),
        Value::Int(i) => i.to_string(),
        Value::UInt(u) => u.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Bytes(b) => String::from_utf8(b.to_vec())
            .map_err(|_| EvalError::invalid_argument("bytes are not valid UTF-8"))?,
        other => {
            return Err(EvalError::type_mismatch(
                "int, uint, double, string, bool or bytes",
                other.kind_name(),
            ))
        }
    };
    Ok(Value::from(value))
}

fn to_bool(args: &[Value]) -> Result<Value, EvalError> {
    match single(args)? {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::String(s) => match &**s {
            "1" | "t" | "true" | "TRUE" | "True" => Ok(Value::Bool(true)),
            "0" | "f" | "false" | "FALSE" | "False" => Ok(Value::Bool(false)),
            _ => Err(EvalError::invalid_argument(format!("cannot convert '{s}' to bool"))),
        },
        other => Err(EvalError::type_mismatch("bool or string", other.kind_name())),
    }
}

fn conversion(
    name: &str,
    result: Type,
    sources: &[(&str, Type)],
    implementation: fn(&[Value]) -> Result<Value, EvalError>,
) -> FunctionDecl {
    sources.iter().fold(FunctionDecl::new(name), |decl, (source, ty)| {
        decl.with_overload(
            OverloadDecl::function(format!("{source}_to_{name}"), vec![ty.clone()], result.clone())
                .with_impl(implementation),
        )
    })
}

// ==================== Library ====================

/// Returns the standard library function declarations, with implementations.
pub fn standard_library() -> Vec<FunctionDecl> {
    let numeric = [
        ("int", Type::Int),
        ("uint", Type::UInt),
        ("double", Type::Double),
        ("string", Type::String),
    ];
    let printable = [
        ("int", Type::Int),
        ("uint", Type::UInt),
        ("double", Type::Double),
        ("string", Type::String),
        ("bool", Type::Bool),
        ("bytes", Type::Bytes),
    ];

    vec![
        size_decl(),
        string_predicate("contains", "contains_string", |s, n| s.contains(n)),
        string_predicate("startsWith", "starts_with_string", |s, n| s.starts_with(n)),
        string_predicate("endsWith", "ends_with_string", |s, n| s.ends_with(n)),
        matches_decl(),
        conversion("int", Type::Int, &numeric, to_int),
        conversion("uint", Type::UInt, &numeric, to_uint),
        conversion("double", Type::Double, &numeric, to_double),
        conversion("string", Type::String, &printable, to_string),
        conversion(
            "bool",
            Type::Bool,
            &[("bool", Type::Bool), ("string", Type::String)],
            to_bool,
        ),
    ]
}
