//! Hand-written recursive descent parser.

use crate::ast::{BinaryOp, Expr, Spanned, SpannedExpr, UnaryOp};
use crate::lexer::{tokenize, Span, SpannedToken, Token};
use crate::{ParseError, ParseOptions, ParseResult};

/// Recursive descent parser over a fully lexed token buffer.
struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    /// Counter for generating unique node IDs (starts at 1)
    next_id: i64,
    /// Current nesting depth, bounded by `options.max_nesting_depth`.
    depth: usize,
    options: ParseOptions,
    /// Errors recorded while recovering inside delimited lists.
    errors: Vec<ParseError>,
    source_len: usize,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>, options: ParseOptions, source_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            next_id: 1,
            depth: 0,
            options,
            errors: Vec::new(),
            source_len,
        }
    }

    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| s.clone())
            .unwrap_or_else(|| self.eof_span())
    }

    fn eof_span(&self) -> Span {
        self.source_len..self.source_len
    }

    fn prev_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |(_, s)| s.end)
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn found(&self) -> String {
        match self.peek() {
            Some(token) => format!("'{token}'"),
            None => "end of input".to_string(),
        }
    }

    fn expect(&mut self, token: &Token) -> Result<Span, ParseError> {
        if self.check(token) {
            let span = self.peek_span();
            self.pos += 1;
            Ok(span)
        } else {
            Err(ParseError::syntax(
                format!("expected '{token}', found {}", self.found()),
                self.peek_span(),
            ))
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Enters one nesting level, failing once the configured limit is reached.
    fn descend(&mut self) -> Result<(), ParseError> {
        if self.depth >= self.options.max_nesting_depth {
            return Err(ParseError::syntax(
                format!(
                    "expression nested too deeply (limit {})",
                    self.options.max_nesting_depth
                ),
                self.peek_span(),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn binary(&mut self, op: BinaryOp, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        let span = left.span.start..right.span.end;
        Spanned::new(
            self.next_id(),
            Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    // === Expression Parsing ===

    /// Parses a full expression, including `cond ? then : else`.
    ///
    /// The conditional is right-associative: both branches recurse here.
    fn parse_expr(&mut self) -> Result<SpannedExpr, ParseError> {
        self.descend()?;
        let cond = self.parse_or()?;

        if !self.match_token(&Token::Question) {
            self.depth -= 1;
            return Ok(cond);
        }
        let then_expr = self.parse_expr()?;
        self.expect(&Token::Colon)?;
        let else_expr = self.parse_expr()?;
        self.depth -= 1;
        let span = cond.span.start..else_expr.span.end;

        Ok(Spanned::new(
            self.next_id(),
            Expr::Ternary {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        ))
    }

    fn parse_or(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_logical(&Token::Or, BinaryOp::Or, Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_logical(&Token::And, BinaryOp::And, Self::parse_operators)
    }

    /// Parses a chain of one short-circuit operator into a balanced tree.
    ///
    /// The operators are associative and evaluation stays left to right, so
    /// only the height of the tree counts against the nesting limit.
    fn parse_logical(
        &mut self,
        token: &Token,
        op: BinaryOp,
        operand: fn(&mut Self) -> Result<SpannedExpr, ParseError>,
    ) -> Result<SpannedExpr, ParseError> {
        let saved = self.depth;
        let mut operands = vec![operand(self)?];

        while self.match_token(token) {
            // n leaves stand ceil(log2 n) high.
            if operands.len().is_power_of_two() {
                self.descend()?;
            }
            operands.push(operand(self)?);
        }

        self.depth = saved;
        let span = self.peek_span();
        self.balance(op, operands)
            .ok_or_else(|| ParseError::syntax("expected an operand", span))
    }

    fn balance(&mut self, op: BinaryOp, mut operands: Vec<SpannedExpr>) -> Option<SpannedExpr> {
        if operands.len() <= 1 {
            return operands.pop();
        }
        let right = operands.split_off(operands.len() / 2);
        let left = self.balance(op, operands)?;
        let right = self.balance(op, right)?;
        Some(self.binary(op, left, right))
    }

    /// Relational, additive and multiplicative operators.
    ///
    /// Operators wait on an explicit stack until an operator of lower or
    /// equal precedence arrives, so mixing levels costs no extra recursion.
    /// The resulting trees are left-deep: every operator counts against the
    /// nesting limit.
    fn parse_operators(&mut self) -> Result<SpannedExpr, ParseError> {
        let saved = self.depth;
        let mut pending: Vec<(SpannedExpr, BinaryOp)> = Vec::new();
        let mut current = self.parse_unary()?;

        while let Some(op) = self.peek().and_then(binary_operator) {
            self.pos += 1;
            self.descend()?;
            while pending
                .last()
                .is_some_and(|(_, top)| precedence(*top) >= precedence(op))
            {
                if let Some((left, top)) = pending.pop() {
                    current = self.binary(top, left, current);
                }
            }
            pending.push((current, op));
            current = self.parse_unary()?;
        }

        while let Some((left, op)) = pending.pop() {
            current = self.binary(op, left, current);
        }
        self.depth = saved;
        Ok(current)
    }

    fn parse_unary(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.peek_span().start;
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Not) => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        self.pos += 1;

        if op == UnaryOp::Neg {
            if let Some(literal) = self.negative_literal(start) {
                return literal;
            }
        }

        self.descend()?;
        let expr = self.parse_unary()?;
        self.depth -= 1;

        let span = start..expr.span.end;
        Ok(Spanned::new(
            self.next_id(),
            Expr::Unary {
                op,
                expr: Box::new(expr),
            },
            span,
        ))
    }

    /// Folds `-` and a directly following numeric literal into one literal.
    ///
    /// `-9223372036854775808` can only be written this way: its magnitude
    /// alone does not fit an `int`.
    fn negative_literal(&mut self, start: usize) -> Option<Result<SpannedExpr, ParseError>> {
        let (token, span) = self.tokens.get(self.pos)?;
        let has_postfix = matches!(
            self.tokens.get(self.pos + 1),
            Some((Token::Dot | Token::LBracket | Token::LParen, _))
        );
        if has_postfix {
            return None;
        }

        let span = start..span.end;
        let node = match token {
            Token::Int(magnitude) => match 0i64.checked_sub_unsigned(*magnitude) {
                Some(value) => Expr::Int(value),
                None => {
                    return Some(Err(ParseError::syntax(
                        format!("integer literal -{magnitude} is out of range"),
                        span,
                    )))
                }
            },
            Token::Float(value) => Expr::Float(-value),
            _ => return None,
        };
        self.pos += 1;
        Some(Ok(Spanned::new(self.next_id(), node, span)))
    }

    /// Postfix chain: `.field`, `[index]` and `(args)`.
    fn parse_postfix(&mut self) -> Result<SpannedExpr, ParseError> {
        let saved = self.depth;
        let mut expr = self.parse_atom()?;

        loop {
            expr = match self.peek() {
                Some(Token::LParen) => self.parse_call(expr)?,
                Some(Token::LBracket) => self.parse_index(expr)?,
                Some(Token::Dot) => self.parse_member(expr)?,
                _ => break,
            };
            self.descend()?;
        }

        self.depth = saved;
        Ok(expr)
    }

    fn parse_call(&mut self, callee: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = callee.span.start;
        if !matches!(callee.node, Expr::Ident(_) | Expr::Member { .. }) {
            return Err(ParseError::syntax(
                "only named functions can be called",
                callee.span.clone(),
            ));
        }
        self.expect(&Token::LParen)?;
        let args = self.parse_elements(&Token::RParen, Self::parse_expr)?;
        let end_span = self.expect(&Token::RParen)?;
        let span = start..end_span.end;

        if matches!(&callee.node, Expr::Ident(name) if name == "has") {
            return self.expand_has(args, span);
        }

        Ok(Spanned::new(
            self.next_id(),
            Expr::Call {
                expr: Box::new(callee),
                args,
            },
            span,
        ))
    }

    /// `has(e.f)` becomes a presence test on `e`.
    fn expand_has(&mut self, mut args: Vec<SpannedExpr>, span: Span) -> Result<SpannedExpr, ParseError> {
        let invalid = || {
            ParseError::syntax(
                "has() requires a single field selection argument, e.g. has(x.field)",
                span.clone(),
            )
        };
        if args.len() != 1 {
            return Err(invalid());
        }
        match args.pop().map(|arg| arg.node) {
            Some(Expr::Member { expr, field }) => Ok(Spanned::new(
                self.next_id(),
                Expr::Has { expr, field },
                span,
            )),
            _ => Err(invalid()),
        }
    }

    fn parse_index(&mut self, base: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = base.span.start;
        self.expect(&Token::LBracket)?;
        let index = self.parse_expr()?;
        let end_span = self.expect(&Token::RBracket)?;

        Ok(Spanned::new(
            self.next_id(),
            Expr::Index {
                expr: Box::new(base),
                index: Box::new(index),
            },
            start..end_span.end,
        ))
    }

    fn parse_member(&mut self, base: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = base.span.start;
        self.expect(&Token::Dot)?;

        let (field, end) = match self.peek() {
            Some(Token::Ident(name)) => (name.clone(), self.peek_span().end),
            _ => {
                return Err(ParseError::syntax(
                    format!("expected field name after '.', found {}", self.found()),
                    self.peek_span(),
                ));
            }
        };
        self.pos += 1;

        Ok(Spanned::new(
            self.next_id(),
            Expr::Member {
                expr: Box::new(base),
                field,
            },
            start..end,
        ))
    }

    fn parse_atom(&mut self) -> Result<SpannedExpr, ParseError> {
        let span = self.peek_span();
        let Some(token) = self.peek().cloned() else {
            return Err(ParseError::syntax("unexpected end of input", span));
        };

        let node = match token {
            Token::Int(n) => match i64::try_from(n) {
                Ok(value) => Expr::Int(value),
                Err(_) => {
                    return Err(ParseError::syntax(
                        format!("integer literal {n} is out of range"),
                        span,
                    ));
                }
            },
            Token::UInt(n) => Expr::UInt(n),
            Token::Float(n) => Expr::Float(n),
            Token::String(s) => Expr::String(s),
            Token::Bytes(b) => Expr::Bytes(b),
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
            Token::Null => Expr::Null,
            Token::Ident(name) => Expr::Ident(name),
            Token::Reserved(word) => {
                return Err(ParseError::syntax(
                    format!("'{word}' is a reserved word and cannot be used as an identifier"),
                    span,
                ));
            }
            Token::LParen => {
                self.pos += 1;
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                return Ok(expr);
            }
            Token::LBracket => return self.parse_list(),
            Token::LBrace => return self.parse_map(),
            other => {
                return Err(ParseError::syntax(format!("unexpected token '{other}'"), span));
            }
        };

        self.pos += 1;
        Ok(Spanned::new(self.next_id(), node, span))
    }

    fn parse_list(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.expect(&Token::LBracket)?.start;
        let items = self.parse_elements(&Token::RBracket, Self::parse_expr)?;
        let end_span = self.expect(&Token::RBracket)?;

        Ok(Spanned::new(self.next_id(), Expr::List(items), start..end_span.end))
    }

    fn parse_map(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.expect(&Token::LBrace)?.start;
        let entries = self.parse_elements(&Token::RBrace, Self::parse_map_entry)?;
        let end_span = self.expect(&Token::RBrace)?;

        Ok(Spanned::new(self.next_id(), Expr::Map(entries), start..end_span.end))
    }

    fn parse_map_entry(&mut self) -> Result<(SpannedExpr, SpannedExpr), ParseError> {
        let key = self.parse_expr()?;
        self.expect(&Token::Colon)?;
        let value = self.parse_expr()?;
        Ok((key, value))
    }

    /// Parses comma separated elements up to (not including) `closer`.
    ///
    /// A malformed element is recorded, replaced with an error placeholder,
    /// and parsing resumes at the next separator on the same level.
    fn parse_elements<T: Recoverable>(
        &mut self,
        closer: &Token,
        element: fn(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        let mut items = Vec::new();
        if self.check(closer) {
            return Ok(items);
        }

        loop {
            let depth = self.depth;
            let start = self.pos;
            match element(self) {
                Ok(item) => items.push(item),
                Err(err) => {
                    self.depth = depth;
                    if self.errors.len() + 1 >= self.options.max_errors {
                        return Err(err);
                    }
                    let error_start = err.span.start;
                    self.errors.push(err);
                    self.synchronize(closer);
                    if self.pos == start && !self.check(&Token::Comma) {
                        // Nothing was consumed and no separator follows: give up.
                        return Ok(items);
                    }
                    let span = error_start..self.prev_end().max(error_start);
                    items.push(T::placeholder(self, span));
                }
            }

            if !self.match_token(&Token::Comma) || self.check(closer) {
                break;
            }
        }

        Ok(items)
    }

    /// Skips to the next `,` or `closer` that sits at the current nesting level.
    fn synchronize(&mut self, closer: &Token) {
        let mut open = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::LParen | Token::LBracket | Token::LBrace => open += 1,
                Token::RParen | Token::RBracket | Token::RBrace if open > 0 => open -= 1,
                Token::Comma if open == 0 => return,
                t if open == 0 && t == closer => return,
                Token::RParen | Token::RBracket | Token::RBrace => return,
                _ => {}
            }
            self.pos += 1;
        }
    }
}

fn binary_operator(token: &Token) -> Option<BinaryOp> {
    Some(match token {
        Token::EqEq => BinaryOp::Eq,
        Token::Ne => BinaryOp::Ne,
        Token::Lt => BinaryOp::Lt,
        Token::Le => BinaryOp::Le,
        Token::Gt => BinaryOp::Gt,
        Token::Ge => BinaryOp::Ge,
        Token::In => BinaryOp::In,
        Token::Plus => BinaryOp::Add,
        Token::Minus => BinaryOp::Sub,
        Token::Star => BinaryOp::Mul,
        Token::Slash => BinaryOp::Div,
        Token::Percent => BinaryOp::Mod,
        _ => return None,
    })
}

/// Binding strength of the operators handled by `parse_operators`.
fn precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 3,
        BinaryOp::Add | BinaryOp::Sub => 2,
        _ => 1,
    }
}

/// An element type that can stand in for a malformed element.
trait Recoverable {
    fn placeholder(parser: &mut Parser, span: Span) -> Self;
}

impl Recoverable for SpannedExpr {
    fn placeholder(parser: &mut Parser, span: Span) -> Self {
        Spanned::new(parser.next_id(), Expr::Error, span)
    }
}

impl Recoverable for (SpannedExpr, SpannedExpr) {
    fn placeholder(parser: &mut Parser, span: Span) -> Self {
        let key = SpannedExpr::placeholder(parser, span.clone());
        (key, SpannedExpr::placeholder(parser, span))
    }
}

/// Lexes and parses `input`, collecting every diagnostic found on the way.
pub(crate) fn parse_source(input: &str, options: ParseOptions) -> ParseResult {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    for item in tokenize(input) {
        match item {
            Ok(token) => tokens.push(token),
            Err(err) => errors.push(ParseError::lexical(err)),
        }
    }

    if tokens.is_empty() && errors.is_empty() {
        return ParseResult {
            ast: None,
            errors: vec![ParseError::syntax("empty input", 0..0)],
        };
    }

    let max_errors = options.max_errors;
    let mut parser = Parser::new(tokens, options, input.len());
    let ast = match parser.parse_expr() {
        Ok(ast) => {
            if !parser.at_end() {
                parser.errors.push(ParseError::syntax(
                    format!("unexpected {} after expression", parser.found()),
                    parser.peek_span(),
                ));
            }
            Some(ast)
        }
        Err(err) => {
            parser.errors.push(err);
            None
        }
    };

    errors.append(&mut parser.errors);
    errors.sort_by_key(|e| e.span.start);
    errors.truncate(max_errors.max(1));
    ParseResult { ast, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParseErrorKind;
    use pretty_assertions::assert_eq;

    fn parse_expr_node(input: &str) -> Expr {
        let result = parse_source(input, ParseOptions::default());
        assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
        result.ast.expect("expected AST").node
    }

    #[test]
    fn parse_literals() {
        assert_eq!(parse_expr_node("123"), Expr::Int(123));
        assert_eq!(parse_expr_node("123u"), Expr::UInt(123));
        assert_eq!(parse_expr_node("1.5"), Expr::Float(1.5));
        assert_eq!(parse_expr_node(r#""hello""#), Expr::String("hello".to_string()));
        assert_eq!(parse_expr_node("null"), Expr::Null);
    }

    #[test]
    fn parse_precedence() {
        let Expr::Binary { op, left, right } = parse_expr_node("1 + 2 * 3") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert_eq!(left.node, Expr::Int(1));
        assert!(matches!(right.node, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn parse_associativity() {
        let Expr::Binary { op, left, right } = parse_expr_node("1 - 2 - 3") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Sub);
        assert_eq!(right.node, Expr::Int(3));
        assert!(matches!(left.node, Expr::Binary { op: BinaryOp::Sub, .. }));
    }

    #[test]
    fn ternary_is_right_associative() {
        let Expr::Ternary { else_expr, .. } = parse_expr_node("a ? b : c ? d : e") else {
            panic!("expected ternary");
        };
        assert!(matches!(else_expr.node, Expr::Ternary { .. }));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let Expr::Binary { op, right, .. } = parse_expr_node("a || b && c") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Or);
        assert!(matches!(right.node, Expr::Binary { op: BinaryOp::And, .. }));
    }

    #[test]
    fn method_call_keeps_receiver() {
        let Expr::Call { expr, args } = parse_expr_node("name.startsWith('/groups/')") else {
            panic!("expected call");
        };
        let (function, receiver) = expr.node.call_target().expect("call target");
        assert_eq!(function, "startsWith");
        assert_eq!(receiver.map(|r| &r.node), Some(&Expr::Ident("name".to_string())));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn has_macro_expands() {
        let Expr::Has { expr, field } = parse_expr_node("has(request.method)") else {
            panic!("expected has");
        };
        assert_eq!(field, "method");
        assert_eq!(expr.node, Expr::Ident("request".to_string()));
    }

    #[test]
    fn has_without_select_is_rejected() {
        let result = parse_source("has(x)", ParseOptions::default());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ParseErrorKind::Syntax);
    }

    #[test]
    fn node_ids_are_unique() {
        let result = parse_source("a.b + [1, 2][0] * f(x, y)", ParseOptions::default());
        let mut ids = Vec::new();
        collect_ids(&result.ast.expect("ast"), &mut ids);
        let count = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), count);
        assert!(ids.iter().all(|id| *id >= 1));
    }

    fn collect_ids(expr: &SpannedExpr, ids: &mut Vec<i64>) {
        ids.push(expr.id);
        match &expr.node {
            Expr::List(items) => items.iter().for_each(|e| collect_ids(e, ids)),
            Expr::Map(entries) => entries.iter().for_each(|(k, v)| {
                collect_ids(k, ids);
                collect_ids(v, ids);
            }),
            Expr::Unary { expr, .. } | Expr::Member { expr, .. } | Expr::Has { expr, .. } => {
                collect_ids(expr, ids)
            }
            Expr::Binary { left, right, .. } => {
                collect_ids(left, ids);
                collect_ids(right, ids);
            }
            Expr::Index { expr, index } => {
                collect_ids(expr, ids);
                collect_ids(index, ids);
            }
            Expr::Call { expr, args } => {
                collect_ids(expr, ids);
                args.iter().for_each(|a| collect_ids(a, ids));
            }
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                collect_ids(cond, ids);
                collect_ids(then_expr, ids);
                collect_ids(else_expr, ids);
            }
            _ => {}
        }
    }

    #[test]
    fn recovery_inside_list_collects_multiple_errors() {
        let result = parse_source("[1, +, 3, *]", ParseOptions::default());
        assert_eq!(result.errors.len(), 2);
        let Some(Expr::List(items)) = result.ast.map(|a| a.node) else {
            panic!("expected partial list");
        };
        assert_eq!(items.len(), 4);
        assert_eq!(items[1].node, Expr::Error);
        assert_eq!(items[2].node, Expr::Int(3));
    }

    #[test]
    fn nesting_limit_is_a_syntax_error() {
        let options = ParseOptions {
            max_nesting_depth: 8,
            ..ParseOptions::default()
        };
        let input = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        let result = parse_source(&input, options);
        assert!(result.ast.is_none());
        assert!(result.errors[0].message.contains("nested too deeply"));
    }

    #[test]
    fn long_chains_count_against_nesting_limit() {
        let options = ParseOptions {
            max_nesting_depth: 16,
            ..ParseOptions::default()
        };
        let input = vec!["1"; 40].join(" + ");
        let result = parse_source(&input, options);
        assert!(!result.errors.is_empty());
    }

    fn height(expr: &SpannedExpr) -> usize {
        match &expr.node {
            Expr::Binary { left, right, .. } => 1 + height(left).max(height(right)),
            _ => 0,
        }
    }

    fn leaves<'a>(expr: &'a SpannedExpr, out: &mut Vec<&'a Expr>) {
        match &expr.node {
            Expr::Binary {
                op: BinaryOp::Or,
                left,
                right,
            } => {
                leaves(left, out);
                leaves(right, out);
            }
            node => out.push(node),
        }
    }

    #[test]
    fn logical_chains_are_balanced() {
        let options = ParseOptions {
            max_nesting_depth: 16,
            ..ParseOptions::default()
        };
        let input = (0..300).map(|i| format!("x{i}")).collect::<Vec<_>>().join(" || ");
        let result = parse_source(&input, options);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let ast = result.ast.expect("ast");
        assert_eq!(height(&ast), 9);

        let mut order = Vec::new();
        leaves(&ast, &mut order);
        let expected: Vec<Expr> = (0..300).map(|i| Expr::Ident(format!("x{i}"))).collect();
        assert_eq!(order, expected.iter().collect::<Vec<_>>());
        assert_eq!(ast.span, 0..input.len());
    }

    #[test]
    fn mixed_precedence_without_parentheses() {
        let Expr::Binary { op, left, right } = parse_expr_node("a < b + c * d - e") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Lt);
        assert_eq!(left.node, Expr::Ident("a".to_string()));
        let Expr::Binary { op, left, .. } = &right.node else {
            panic!("expected subtraction");
        };
        assert_eq!(*op, BinaryOp::Sub);
        let Expr::Binary { op, right, .. } = &left.node else {
            panic!("expected addition");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(right.node, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn negative_literals_fold() {
        assert_eq!(parse_expr_node("-9223372036854775808"), Expr::Int(i64::MIN));
        assert_eq!(parse_expr_node("-0x10"), Expr::Int(-16));
        assert_eq!(parse_expr_node("- 2.5"), Expr::Float(-2.5));
        assert!(matches!(
            parse_expr_node("-1u"),
            Expr::Unary { op: UnaryOp::Neg, .. }
        ));
        assert!(matches!(
            parse_expr_node("-(1)"),
            Expr::Unary { op: UnaryOp::Neg, .. }
        ));
    }

    #[test]
    fn int_literal_out_of_range() {
        for input in ["9223372036854775808", "-9223372036854775809"] {
            let result = parse_source(input, ParseOptions::default());
            assert_eq!(result.errors.len(), 1, "{input}");
            assert!(result.errors[0].message.contains("out of range"), "{input}");
        }
    }
}
