//! Lexer and parser for the gavel expression language.
//!
//! [`parse`] turns source text into a [`SpannedExpr`] tree, collecting every
//! lexical and syntax problem it can find instead of stopping at the first.

pub mod ast;
mod lexer;
mod parser;

pub use ast::{BinaryOp, Expr, Span, Spanned, SpannedExpr, UnaryOp};
pub use lexer::{tokenize, LexError, SpannedToken, Token, Tokens};

/// Which stage rejected the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A character sequence that is not a token.
    Lexical,
    /// Tokens that do not form an expression.
    Syntax,
}

/// A parse error with source location.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::Syntax,
            message: message.into(),
            span,
        }
    }

    pub fn lexical(err: LexError) -> Self {
        Self {
            kind: ParseErrorKind::Lexical,
            message: err.message,
            span: err.span,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}

/// Limits applied while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum nesting of subexpressions. Each link of an arithmetic or
    /// relational chain counts as a level; `&&` and `||` chains count the
    /// height of their balanced tree.
    pub max_nesting_depth: usize,
    /// Parsing stops recovering once this many errors were collected.
    pub max_errors: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_nesting_depth: 100,
            max_errors: 32,
        }
    }
}

/// Result of parsing an expression.
///
/// Supports error recovery: may return both an AST and errors.
/// The AST may contain `Expr::Error` nodes where parsing failed.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// The parsed AST, if any parsing succeeded.
    pub ast: Option<SpannedExpr>,
    /// Errors in source order.
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    /// Returns true if parsing completed without errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty() && self.ast.is_some()
    }

    /// Returns true if there are any parse errors.
    pub fn is_err(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Converts to a Result, discarding a partial AST on error.
    pub fn into_result(self) -> Result<SpannedExpr, Vec<ParseError>> {
        match (self.ast, self.errors.is_empty()) {
            (Some(ast), true) => Ok(ast),
            (None, true) => Err(vec![ParseError::syntax("empty input", 0..0)]),
            (_, false) => Err(self.errors),
        }
    }

    /// Unwraps the errors, panicking if there are none.
    pub fn unwrap_err(self) -> Vec<ParseError> {
        if self.errors.is_empty() {
            panic!("called unwrap_err on a ParseResult with no errors");
        }
        self.errors
    }
}

/// Parses an expression with default limits.
pub fn parse(input: &str) -> ParseResult {
    parse_with_options(input, ParseOptions::default())
}

/// Parses an expression with explicit limits.
pub fn parse_with_options(input: &str, options: ParseOptions) -> ParseResult {
    parser::parse_source(input, options)
}
