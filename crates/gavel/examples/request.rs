//! Host objects, step budgets and diagnostics.
//!
//! Run with: RUST_LOG=gavel=debug cargo run -p gavel --example request

use std::collections::HashMap;

use gavel::{Env, EvalOptions, MapActivation, Object, Type, Value};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug)]
struct Request {
    method: String,
    url: String,
    headers: HashMap<String, String>,
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

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env())
        .init();

    let env = Env::with_standard_library()
        .with_object_type(
            "Request",
            [
                ("method", Type::String),
                ("url", Type::String),
                ("headers", Type::map(Type::String, Type::String)),
            ],
        )
        .with_variable("request", Type::object("Request"))
        .with_eval_options(EvalOptions {
            max_steps: Some(1_000),
            ..EvalOptions::default()
        });

    let request = Request {
        method: "GET".to_string(),
        url: "http://www.google.com".to_string(),
        headers: HashMap::from([(
            "Content-Type".to_string(),
            "application/json".to_string(),
        )]),
    };
    let activation = MapActivation::new().with("request", Value::object(request));

    let sources = [
        r#"request.method == "GET" && request.url.startsWith("http://")"#,
        r#"request.headers["Content-Type"] == "application/json""#,
        r#"request.headers["Accept"]"#,
        r#"request.body == "" "#,
        r#"request.method + 1"#,
    ];

    for source in sources {
        println!("=== {} ===", source.trim());
        let program = match env.compile(source) {
            Ok(program) => program,
            Err(diagnostics) => {
                println!("{}", diagnostics.render(source));
                continue;
            }
        };
        match program.evaluate(&activation) {
            Ok(value) => println!("Result: {}", value),
            Err(err) => println!("Error: {}", err),
        }
    }
}
