//! Shared helpers for the engine integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gavel::{Env, MapActivation, Object, OverloadDecl, Program, Type, Value};

/// Compiles `source` with type checking, panicking with rendered
/// diagnostics if it fails.
#[allow(dead_code)]
pub fn assert_compiles(env: &Env, source: &str) -> Program {
    match env.compile(source) {
        Ok(program) => program,
        Err(diagnostics) => panic!(
            "failed to compile '{}':\n{}",
            source,
            diagnostics.render(source)
        ),
    }
}

/// Compiles and evaluates `source` against `activation`.
#[allow(dead_code)]
pub fn eval(env: &Env, source: &str, activation: &MapActivation) -> Value {
    let program = assert_compiles(env, source);
    match program.evaluate(activation) {
        Ok(value) => value,
        Err(err) => panic!("failed to evaluate '{}': {}", source, err),
    }
}

/// An HTTP request exposed to expressions as a host object.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
}

impl Request {
    #[allow(dead_code)]
    pub fn sample() -> Self {
        Request {
            method: "GET".to_string(),
            url: "http://www.google.com".to_string(),
            headers: HashMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]),
        }
    }

    /// The same request as a plain map value.
    #[allow(dead_code)]
    pub fn to_map(&self) -> Value {
        let mut fields = HashMap::new();
        fields.insert("method", Value::from(self.method.as_str()));
        fields.insert("url", Value::from(self.url.as_str()));
        fields.insert("headers", Value::from(self.headers.clone()));
        Value::from(fields)
    }
}

impl Object for Request {
    fn type_name(&self) -> &str {
        "Request"
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "method" => Some(Value::from(self.method.as_str())),
            "url" => Some(Value::from(self.url.as_str())),
            "headers" => Some(Value::from(self.headers.clone())),
            _ => None,
        }
    }
}

/// Standard library plus a `request` variable of object type `Request`.
#[allow(dead_code)]
pub fn request_env() -> Env {
    Env::with_standard_library()
        .with_object_type(
            "Request",
            [
                ("method", Type::String),
                ("url", Type::String),
                ("headers", Type::map(Type::String, Type::String)),
            ],
        )
        .with_variable("request", Type::object("Request"))
}

/// The flight-filter variables used by the benchmark suite.
#[allow(dead_code)]
pub fn flights_env() -> Env {
    Env::with_standard_library()
        .with_variable("Origin", Type::String)
        .with_variable("Country", Type::String)
        .with_variable("Value", Type::Int)
        .with_variable("Adults", Type::Int)
}

#[allow(dead_code)]
pub fn flights_activation() -> MapActivation {
    MapActivation::new()
        .with("Origin", "MOW")
        .with("Country", "RU")
        .with("Adults", 1)
        .with("Value", 100)
}

/// Declares `hello(string) -> string` returning `"hello " + s`.
#[allow(dead_code)]
pub fn hello_env() -> Env {
    Env::new().with_native(
        "hello",
        OverloadDecl::function("hello_string", vec![Type::String], Type::String).with_impl(
            |args| match args {
                [Value::String(s)] => Ok(Value::from(format!("hello {s}"))),
                _ => Err("hello expects a string".into()),
            },
        ),
    )
}

/// Declares a zero-argument `undefined_call() -> bool` that counts its
/// invocations.
#[allow(dead_code)]
pub fn counting_env(calls: Arc<AtomicUsize>) -> Env {
    Env::new()
        .with_variable("flag", Type::Bool)
        .with_native(
            "undefined_call",
            OverloadDecl::function("undefined_call", vec![], Type::Bool).with_impl(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Bool(true))
            }),
        )
}
