//! Minimal example: one variable, one host function.
//!
//! Run with: cargo run -p gavel --example hello

use gavel::{Env, MapActivation, OverloadDecl, Type, Value};

fn main() {
    let env = Env::with_standard_library()
        .with_variable("name", Type::String)
        .with_native(
            "shout",
            OverloadDecl::function("shout_string", vec![Type::String], Type::String).with_impl(
                |args| match args {
                    [Value::String(s)] => Ok(Value::from(s.to_uppercase())),
                    _ => Err("shout expects a string".into()),
                },
            ),
        );

    let source = r#""Hello, " + shout(name) + "!""#;
    let program = match env.compile(source) {
        Ok(program) => program,
        Err(diagnostics) => {
            eprintln!("{}", diagnostics.render(source));
            std::process::exit(1);
        }
    };

    let activation = MapActivation::new().with("name", "World");
    match program.evaluate(&activation) {
        Ok(value) => println!("{}", value),
        Err(err) => eprintln!("evaluation failed: {}", err),
    }
}
