//! Token definitions and the lazy tokenizer.

use logos::Logos;

/// A span in the source input (byte offsets).
pub type Span = std::ops::Range<usize>;

/// A token with its source span.
pub type SpannedToken = (Token, Span);

/// A character sequence the lexer could not turn into a token.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl LexError {
    fn from_slice(slice: &str, span: Span) -> Self {
        let message = match slice.chars().next() {
            Some('"' | '\'') => "unterminated or malformed string literal".to_string(),
            Some('r' | 'R') => "unterminated raw string literal".to_string(),
            Some('b' | 'B') => "unterminated or malformed bytes literal".to_string(),
            Some(c) if c.is_ascii_digit() => format!("malformed numeric literal '{slice}'"),
            Some(c) => format!("unexpected character '{c}'"),
            None => "unexpected end of input".to_string(),
        };
        Self { message, span }
    }
}

/// Expression language tokens.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    // Numeric literals, most specific first
    #[regex(r"0[xX][0-9a-fA-F]+[uU]", lex_hex_uint)]
    #[regex(r"[0-9]+[uU]", lex_decimal_uint, priority = 4)]
    UInt(u64),

    /// Magnitude of a signed literal. The parser range-checks it, folding a
    /// leading `-` first so that `i64::MIN` can be written.
    #[regex(r"0[xX][0-9a-fA-F]+", lex_hex_int, priority = 3)]
    #[regex(r"[0-9]+", lex_decimal_int, priority = 1)]
    Int(u64),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", lex_float, priority = 5)]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", lex_float, priority = 2)]
    Float(f64),

    // Triple-quoted forms must win over the single-quote openers.
    #[regex(r#"""""#, |lex| lex_triple(lex, "\"\"\""))]
    #[regex(r"'''", |lex| lex_triple(lex, "'''"))]
    #[regex(r#"[rR]""#, |lex| lex_raw(lex, '"'))]
    #[regex(r"[rR]'", |lex| lex_raw(lex, '\''))]
    #[regex(r#"""#, |lex| lex_string(lex, '"'))]
    #[regex(r"'", |lex| lex_string(lex, '\''))]
    String(String),

    #[regex(r#"[bB]""#, |lex| scan_quoted(lex, '"', Escapes::Bytes))]
    #[regex(r"[bB]'", |lex| scan_quoted(lex, '\'', Escapes::Bytes))]
    Bytes(Vec<u8>),

    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("in")]
    In,

    /// Words held back for future syntax; never valid identifiers.
    #[token("as", |_| "as".to_string())]
    #[token("break", |_| "break".to_string())]
    #[token("const", |_| "const".to_string())]
    #[token("continue", |_| "continue".to_string())]
    #[token("else", |_| "else".to_string())]
    #[token("for", |_| "for".to_string())]
    #[token("function", |_| "function".to_string())]
    #[token("if", |_| "if".to_string())]
    #[token("import", |_| "import".to_string())]
    #[token("let", |_| "let".to_string())]
    #[token("loop", |_| "loop".to_string())]
    #[token("package", |_| "package".to_string())]
    #[token("namespace", |_| "namespace".to_string())]
    #[token("return", |_| "return".to_string())]
    #[token("var", |_| "var".to_string())]
    #[token("void", |_| "void".to_string())]
    #[token("while", |_| "while".to_string())]
    Reserved(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 0)]
    Ident(String),

    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Not,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Int(n) => write!(f, "{n}"),
            Token::UInt(n) => write!(f, "{n}u"),
            Token::Float(n) => write!(f, "{n}"),
            Token::String(s) => write!(f, "{s:?}"),
            Token::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
            Token::Reserved(s) | Token::Ident(s) => f.write_str(s),
            other => f.write_str(other.symbol()),
        }
    }
}

impl Token {
    fn symbol(&self) -> &'static str {
        match self {
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            Token::In => "in",
            Token::EqEq => "==",
            Token::Ne => "!=",
            Token::Le => "<=",
            Token::Ge => ">=",
            Token::And => "&&",
            Token::Or => "||",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Not => "!",
            Token::Question => "?",
            Token::Colon => ":",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Dot => ".",
            Token::Comma => ",",
            Token::Int(_)
            | Token::UInt(_)
            | Token::Float(_)
            | Token::String(_)
            | Token::Bytes(_)
            | Token::Reserved(_)
            | Token::Ident(_) => "literal",
        }
    }
}

fn lex_decimal_int(lex: &mut logos::Lexer<Token>) -> Option<u64> {
    lex.slice().parse().ok()
}

fn lex_decimal_uint(lex: &mut logos::Lexer<Token>) -> Option<u64> {
    let s = lex.slice();
    s[..s.len() - 1].parse().ok()
}

fn lex_hex_int(lex: &mut logos::Lexer<Token>) -> Option<u64> {
    u64::from_str_radix(&lex.slice()[2..], 16).ok()
}

fn lex_hex_uint(lex: &mut logos::Lexer<Token>) -> Option<u64> {
    let s = lex.slice();
    u64::from_str_radix(&s[2..s.len() - 1], 16).ok()
}

fn lex_float(lex: &mut logos::Lexer<Token>) -> Option<f64> {
    lex.slice().parse().ok()
}

/// How `\x` and octal escapes are interpreted.
#[derive(Clone, Copy, PartialEq)]
enum Escapes {
    /// The escape names a code point, stored as UTF-8.
    Text,
    /// The escape names a single raw byte.
    Bytes,
}

fn lex_string(lex: &mut logos::Lexer<Token>, quote: char) -> Option<String> {
    String::from_utf8(scan_quoted(lex, quote, Escapes::Text)?).ok()
}

/// Scans the body of a quoted literal, decoding escapes, and bumps the lexer past the closing quote.
///
/// A malformed literal is skipped whole (to its closing quote, or to the end
/// of the line when unterminated) so it yields a single error.
fn scan_quoted(lex: &mut logos::Lexer<Token>, quote: char, escapes: Escapes) -> Option<Vec<u8>> {
    let remainder = lex.remainder();
    let decoded = decode_quoted(remainder, quote, escapes);
    let consumed = match &decoded {
        Some((_, len)) => *len,
        None => skip_quoted(remainder, quote),
    };
    lex.bump(consumed);
    decoded.map(|(out, _)| out)
}

/// Decodes up to and including the closing quote, returning the bytes and
/// the consumed length.
fn decode_quoted(body: &str, quote: char, escapes: Escapes) -> Option<(Vec<u8>, usize)> {
    let mut chars = body.char_indices();
    let mut out = Vec::new();

    while let Some((pos, c)) = chars.next() {
        match c {
            c if c == quote => return Some((out, pos + c.len_utf8())),
            '\n' => return None,
            '\\' => {
                let (_, escape) = chars.next()?;
                match escape {
                    '\\' | '/' | '"' | '\'' | '`' | '?' => push_char(&mut out, escape),
                    'a' => out.push(0x07),
                    'b' => out.push(0x08),
                    'f' => out.push(0x0C),
                    'n' => out.push(b'\n'),
                    'r' => out.push(b'\r'),
                    't' => out.push(b'\t'),
                    'v' => out.push(0x0B),
                    'x' | 'X' => {
                        let value = take_digits(&mut chars, 2, 16)?;
                        push_escaped(&mut out, value, escapes)?;
                    }
                    'u' if escapes == Escapes::Text => {
                        let value = take_digits(&mut chars, 4, 16)?;
                        push_char(&mut out, char::from_u32(value)?);
                    }
                    'U' if escapes == Escapes::Text => {
                        let value = take_digits(&mut chars, 8, 16)?;
                        push_char(&mut out, char::from_u32(value)?);
                    }
                    d @ '0'..='3' => {
                        let rest = take_digits(&mut chars, 2, 8)?;
                        let value = (d as u32 - '0' as u32) * 64 + rest;
                        push_escaped(&mut out, value, escapes)?;
                    }
                    _ => return None,
                }
            }
            c => push_char(&mut out, c),
        }
    }

    None
}

/// Length of a malformed quoted body: through the closing quote if one
/// follows on the same line, otherwise up to the line break.
fn skip_quoted(body: &str, quote: char) -> usize {
    let mut chars = body.char_indices();
    while let Some((pos, c)) = chars.next() {
        match c {
            '\n' => return pos,
            '\\' => {
                if let Some((pos, '\n')) = chars.next() {
                    return pos;
                }
            }
            c if c == quote => return pos + c.len_utf8(),
            _ => {}
        }
    }
    body.len()
}

fn take_digits(chars: &mut std::str::CharIndices<'_>, count: usize, radix: u32) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..count {
        let (_, c) = chars.next()?;
        value = value * radix + c.to_digit(radix)?;
    }
    Some(value)
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

fn push_escaped(out: &mut Vec<u8>, value: u32, escapes: Escapes) -> Option<()> {
    match escapes {
        Escapes::Bytes => out.push(u8::try_from(value).ok()?),
        Escapes::Text => push_char(out, char::from_u32(value)?),
    }
    Some(())
}

fn lex_raw(lex: &mut logos::Lexer<Token>, quote: char) -> Option<String> {
    let remainder = lex.remainder();
    let Some(end) = remainder.find(|c| c == quote || c == '\n') else {
        lex.bump(remainder.len());
        return None;
    };
    if !remainder[end..].starts_with(quote) {
        lex.bump(end);
        return None;
    }
    let content = remainder[..end].to_string();
    lex.bump(end + quote.len_utf8());
    Some(content)
}

fn lex_triple(lex: &mut logos::Lexer<Token>, end_quote: &str) -> Option<String> {
    let remainder = lex.remainder();
    let Some(end) = remainder.find(end_quote) else {
        lex.bump(remainder.len());
        return None;
    };
    let content = remainder[..end].to_string();
    lex.bump(end + end_quote.len());
    Some(content)
}

/// Lazy token stream over a source string.
///
/// Yields `Err` for each character sequence that is not a valid token and
/// then resumes after it, so callers can collect every lexical problem in
/// one pass. Calling [`tokenize`] again on the same input restarts the
/// stream and yields the same sequence.
pub struct Tokens<'a> {
    inner: logos::Lexer<'a, Token>,
}

impl Iterator for Tokens<'_> {
    type Item = Result<SpannedToken, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.inner.next()?;
        let span = self.inner.span();
        Some(match result {
            Ok(token) => Ok((token, span)),
            Err(()) => Err(LexError::from_slice(self.inner.slice(), span)),
        })
    }
}

/// Starts tokenizing `input`.
pub fn tokenize(input: &str) -> Tokens<'_> {
    Tokens {
        inner: Token::lexer(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_tokens(input: &str) -> Vec<Token> {
        tokenize(input)
            .map(|result| result.expect("lex error").0)
            .collect()
    }

    #[test]
    fn lex_integers() {
        assert_eq!(lex_tokens("123"), vec![Token::Int(123)]);
        assert_eq!(lex_tokens("0"), vec![Token::Int(0)]);
        assert_eq!(lex_tokens("0x1F"), vec![Token::Int(31)]);
        assert_eq!(lex_tokens("0XAB"), vec![Token::Int(171)]);
    }

    #[test]
    fn lex_unsigned_integers() {
        assert_eq!(lex_tokens("123u"), vec![Token::UInt(123)]);
        assert_eq!(lex_tokens("123U"), vec![Token::UInt(123)]);
        assert_eq!(lex_tokens("0x1Fu"), vec![Token::UInt(31)]);
    }

    #[test]
    fn lex_floats() {
        assert_eq!(lex_tokens("1.5"), vec![Token::Float(1.5)]);
        assert_eq!(lex_tokens("1e10"), vec![Token::Float(1e10)]);
        assert_eq!(lex_tokens("1.5e-3"), vec![Token::Float(1.5e-3)]);
    }

    #[test]
    fn lex_strings() {
        assert_eq!(lex_tokens(r#""hello""#), vec![Token::String("hello".into())]);
        assert_eq!(lex_tokens("'world'"), vec![Token::String("world".into())]);
        assert_eq!(
            lex_tokens(r#""hello\nworld""#),
            vec![Token::String("hello\nworld".into())]
        );
    }

    #[test]
    fn lex_raw_and_triple_strings() {
        assert_eq!(lex_tokens(r#"r"a\n""#), vec![Token::String(r"a\n".into())]);
        assert_eq!(
            lex_tokens("'''multi\nline'''"),
            vec![Token::String("multi\nline".into())]
        );
    }

    #[test]
    fn lex_escapes() {
        assert_eq!(lex_tokens(r#""α""#), vec![Token::String("α".into())]);
        assert_eq!(lex_tokens(r#""\U0001F600""#), vec![Token::String("😀".into())]);
        assert_eq!(lex_tokens(r#""\101""#), vec![Token::String("A".into())]);
        assert_eq!(lex_tokens(r#""\x41""#), vec![Token::String("A".into())]);
    }

    #[test]
    fn bytes_escapes_are_raw_bytes() {
        assert_eq!(lex_tokens(r#"b"\xff\000""#), vec![Token::Bytes(vec![0xff, 0])]);
        assert_eq!(lex_tokens("b'hi'"), vec![Token::Bytes(b"hi".to_vec())]);
    }

    #[test]
    fn lex_keywords_and_reserved() {
        assert_eq!(
            lex_tokens("true false null in"),
            vec![Token::True, Token::False, Token::Null, Token::In]
        );
        assert_eq!(lex_tokens("while"), vec![Token::Reserved("while".into())]);
        assert_eq!(lex_tokens("inner"), vec![Token::Ident("inner".into())]);
    }

    #[test]
    fn lex_operators() {
        assert_eq!(
            lex_tokens("== != < <= > >= && || ! ? :"),
            vec![
                Token::EqEq,
                Token::Ne,
                Token::Lt,
                Token::Le,
                Token::Gt,
                Token::Ge,
                Token::And,
                Token::Or,
                Token::Not,
                Token::Question,
                Token::Colon,
            ]
        );
    }

    #[test]
    fn lex_with_comments() {
        assert_eq!(
            lex_tokens("a // comment\n+ b"),
            vec![Token::Ident("a".into()), Token::Plus, Token::Ident("b".into())]
        );
    }

    #[test]
    fn unknown_character_reports_offset_and_resumes() {
        let items: Vec<_> = tokenize("a @ b").collect();
        assert_eq!(items.len(), 3);
        let err = items[1].clone().unwrap_err();
        assert_eq!(err.span, 2..3);
        assert!(err.message.contains('@'));
        assert_eq!(items[2].clone().unwrap().0, Token::Ident("b".into()));
    }

    #[test]
    fn tokenize_is_restartable() {
        let first: Vec<_> = tokenize("x + 1").collect();
        let second: Vec<_> = tokenize("x + 1").collect();
        assert_eq!(first, second);
    }

    #[test]
    fn integer_overflow_is_a_lex_error() {
        let items: Vec<_> = tokenize("99999999999999999999").collect();
        assert!(items[0].is_err());
    }

    #[test]
    fn int_magnitude_may_exceed_i64() {
        assert_eq!(
            lex_tokens("9223372036854775808"),
            vec![Token::Int(9_223_372_036_854_775_808)]
        );
    }

    #[test]
    fn unterminated_string_is_one_error() {
        let items: Vec<_> = tokenize("name == \"it's\nsize").collect();
        let errors: Vec<_> = items.iter().filter_map(|item| item.clone().err()).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].span, 8..13);
        assert_eq!(
            items.last().cloned().map(|item| item.map(|(token, _)| token)),
            Some(Ok(Token::Ident("size".into())))
        );
    }

    #[test]
    fn malformed_escape_skips_to_closing_quote() {
        let items: Vec<_> = tokenize(r#""a\qb" + 'c'"#).collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].clone().unwrap_err().span, 0..6);
        assert_eq!(items[1].clone().unwrap().0, Token::Plus);
        assert_eq!(items[2].clone().unwrap().0, Token::String("c".into()));
    }

    #[test]
    fn unterminated_raw_string_stops_at_line_end() {
        let errors = tokenize("r'abc + x\ny").filter(Result::is_err).count();
        assert_eq!(errors, 1);
    }
}
