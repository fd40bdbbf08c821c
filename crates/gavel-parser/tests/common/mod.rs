//! Shared helpers for the parser integration tests.

use gavel_parser::{parse, ParseError, SpannedExpr};

/// Parses `input`, panicking with every diagnostic if it fails.
#[allow(dead_code)]
pub fn assert_parses(input: &str) -> SpannedExpr {
    let result = parse(input);
    if !result.errors.is_empty() {
        panic!(
            "failed to parse '{}': {:?}",
            input,
            result
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
        );
    }
    result.ast.expect("expected AST")
}

/// Parses `input`, panicking if it succeeds, and returns the diagnostics.
#[allow(dead_code)]
pub fn assert_parse_error(input: &str) -> Vec<ParseError> {
    let result = parse(input);
    if result.errors.is_empty() {
        panic!("expected parse error for '{}', but got: {:?}", input, result.ast);
    }
    result.errors
}
