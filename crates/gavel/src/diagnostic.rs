//! Compile-time diagnostics.
//!
//! Every stage before evaluation reports problems as a [`Diagnostic`]. A
//! failed compilation returns all of them at once as [`Diagnostics`].

use std::fmt;

use gavel_parser::{ParseError, ParseErrorKind, Span};
use thiserror::Error;

use crate::checker::CheckError;
use crate::compiler::CompileError;

/// The stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    Lexical,
    Syntax,
    Type,
    Compile,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::Lexical => "lexical error",
            DiagnosticKind::Syntax => "syntax error",
            DiagnosticKind::Type => "type error",
            DiagnosticKind::Compile => "compile error",
        };
        f.write_str(name)
    }
}

/// A single problem found while compiling an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Check(#[from] CheckError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl Diagnostic {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Diagnostic::Parse(e) => match e.kind {
                ParseErrorKind::Lexical => DiagnosticKind::Lexical,
                ParseErrorKind::Syntax => DiagnosticKind::Syntax,
            },
            Diagnostic::Check(_) => DiagnosticKind::Type,
            Diagnostic::Compile(_) => DiagnosticKind::Compile,
        }
    }

    /// Byte range in the source.
    pub fn span(&self) -> Span {
        match self {
            Diagnostic::Parse(e) => e.span.clone(),
            Diagnostic::Check(e) => e.span.clone(),
            Diagnostic::Compile(e) => e.span(),
        }
    }

    /// The message without location.
    pub fn message(&self) -> String {
        match self {
            Diagnostic::Parse(e) => e.message.clone(),
            Diagnostic::Check(e) => e.message(),
            Diagnostic::Compile(e) => e.to_string(),
        }
    }
}

/// All diagnostics from one compilation, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Error)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: impl Into<Diagnostic>) {
        self.0.push(diagnostic.into());
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if any diagnostic has the given kind.
    pub fn has_kind(&self, kind: DiagnosticKind) -> bool {
        self.0.iter().any(|d| d.kind() == kind)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }

    /// Renders one line per diagnostic as `line:column: kind: message`.
    ///
    /// Lines and columns are 1-based; columns count characters.
    pub fn render(&self, source: &str) -> String {
        self.0
            .iter()
            .map(|d| {
                let (line, column) = line_column(source, d.span().start);
                format!("{line}:{column}: {}: {}", d.kind(), d.message())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let mut end = offset.min(source.len());
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    let before = &source[..end];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "no diagnostics"),
            [single] => write!(f, "{}: {single}", single.kind()),
            [first, rest @ ..] => write!(
                f,
                "{}: {first} (and {} more)",
                first.kind(),
                rest.len()
            ),
        }
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self(diagnostics)
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_reports_line_and_column() {
        let source = "a &&\n  #";
        let diagnostics: Diagnostics = vec![Diagnostic::Parse(ParseError {
            kind: ParseErrorKind::Lexical,
            message: "unexpected character '#'".to_string(),
            span: 7..8,
        })]
        .into();
        assert_eq!(
            diagnostics.render(source),
            "2:3: lexical error: unexpected character '#'"
        );
    }

    #[test]
    fn test_display_summarizes_count() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(ParseError::syntax("expected expression", 0..1));
        diagnostics.push(ParseError::syntax("expected ')'", 2..3));
        assert_eq!(
            diagnostics.to_string(),
            "syntax error: expected expression at 0..1 (and 1 more)"
        );
        assert!(diagnostics.has_kind(DiagnosticKind::Syntax));
        assert!(!diagnostics.has_kind(DiagnosticKind::Type));
    }

    #[test]
    fn test_compile_error_kind() {
        let d = Diagnostic::from(CompileError::UnresolvedIdentifier {
            name: "x".to_string(),
            span: 0..1,
        });
        assert_eq!(d.kind(), DiagnosticKind::Compile);
        assert_eq!(d.message(), "unresolved identifier 'x'");
        assert_eq!(d.span(), 0..1);
    }
}
