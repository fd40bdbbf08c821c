//! Well-typed expressions never fail with a type error at run time.

mod common;

use std::collections::HashMap;

use gavel::{Env, EvalErrorKind, MapActivation, NumericLiteralPolicy, Type, Value};

fn typed_env() -> Env {
    Env::with_standard_library()
        .with_variable("i", Type::Int)
        .with_variable("u", Type::UInt)
        .with_variable("d", Type::Double)
        .with_variable("s", Type::String)
        .with_variable("b", Type::Bool)
        .with_variable("xs", Type::list(Type::Int))
        .with_variable("tags", Type::map(Type::String, Type::String))
        .with_variable("any", Type::Dyn)
}

fn bindings() -> Vec<MapActivation> {
    let tags = HashMap::from([("env".to_string(), "prod".to_string())]);
    [
        (0i64, 0u64, 0.0f64, "", false, vec![]),
        (7, 3, 2.5, "abc", true, vec![1, 2, 3]),
        (-4, 10, -0.5, "héllo", false, vec![-1]),
    ]
    .into_iter()
    .map(|(i, u, d, s, b, xs)| {
        MapActivation::new()
            .with("i", i)
            .with("u", u)
            .with("d", d)
            .with("s", s)
            .with("b", b)
            .with("xs", xs.into_iter().map(Value::Int).collect::<Vec<_>>())
            .with("tags", tags.clone())
            .with("any", i)
    })
    .collect()
}

const SAMPLES: &[&str] = &[
    "i + 1",
    "i * i - 3",
    "u + 2u",
    "d * 2.0",
    "i < 10 && u > 1u",
    "s + \"!\"",
    "size(s) + size(xs)",
    "s.startsWith(\"a\") || s.endsWith(\"o\")",
    "b ? i : -i",
    "i in xs",
    "\"env\" in tags && tags[\"env\"] == \"prod\"",
    "[i, i + 1][1]",
    "{\"k\": s}.k",
    "double(i) + d",
    "string(u) + s",
    "any == 7",
    "b || !b",
    "xs + [i]",
];

#[test]
fn sampled_expressions_are_type_sound() {
    let env = typed_env();
    for source in SAMPLES {
        let program = common::assert_compiles(&env, source);
        for activation in bindings() {
            match program.evaluate(&activation) {
                Ok(value) => assert!(
                    program.result_type().admits(&value),
                    "'{}' produced {} which is not a {}",
                    source,
                    value,
                    program.result_type()
                ),
                Err(err) => assert_ne!(
                    err.kind,
                    EvalErrorKind::ArgumentTypeMismatch,
                    "'{}' failed with a type error: {}",
                    source,
                    err
                ),
            }
        }
    }
}

#[test]
fn adaptive_literals_stay_sound() {
    let env = typed_env().with_numeric_literals(NumericLiteralPolicy::Adaptive);
    for source in ["u + 1", "d * 2", "u == 3", "d < 1"] {
        let program = common::assert_compiles(&env, source);
        for activation in bindings() {
            let value = program
                .evaluate(&activation)
                .unwrap_or_else(|e| panic!("'{source}' failed: {e}"));
            assert!(program.result_type().admits(&value), "'{source}' produced {value}");
        }
    }
}
