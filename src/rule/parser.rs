//! Rule recursive descent parser.
//!
//! Precedence, loosest first:
//! `or` < `and` < `not` < comparison < `|` < `&` < `+ -` < `* / %` < unary `- ~` < `**`.

use crate::{Error, Result};
use super::ast::*;
use super::lexer::{Token, TokenKind};

/// Deepest nesting of parentheses, calls and prefix operators accepted in a rule.
pub const MAX_DEPTH: usize = 64;

/// Parser state: wraps a token slice with cursor.
struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0, depth: 0 }
    }

    /// Run `f` one nesting level deeper, failing past [`MAX_DEPTH`].
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(format!("Rule nests deeper than {MAX_DEPTH} levels")));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token> {
        let tok = self.peek();
        if tok.kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error(format!("Expected {:?}, got {:?} '{}'", kind, tok.kind, tok.text)))
        }
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, msg: String) -> Error {
        Error::SyntaxError {
            position: self.peek().span.start,
            message: msg,
        }
    }
}

/// Parse a complete rule expression from tokens.
pub fn parse_rule(tokens: &[Token]) -> Result<Expr> {
    if tokens.is_empty() {
        return Err(Error::SyntaxError { position: 0, message: "Empty rule".into() });
    }
    let mut p = Parser::new(tokens);
    if p.at(TokenKind::Eof) {
        return Err(p.error("Empty rule".into()));
    }
    let expr = parse_expr(&mut p)?;
    if !p.at(TokenKind::Eof) {
        return Err(p.error(format!("Unexpected token after expression: {:?} '{}'", p.peek_kind(), p.peek().text)));
    }
    Ok(expr)
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    Expr::BinaryOp { left: Box::new(left), op, right: Box::new(right) }
}

// ============================================================================
// Expression parsing (precedence climbing)
// ============================================================================

fn parse_expr(p: &mut Parser) -> Result<Expr> {
    p.nested(parse_or_expr)
}

fn parse_or_expr(p: &mut Parser) -> Result<Expr> {
    let mut left = parse_and_expr(p)?;
    while p.eat(TokenKind::Or) {
        let right = parse_and_expr(p)?;
        left = binary(left, BinaryOp::Or, right);
    }
    Ok(left)
}

fn parse_and_expr(p: &mut Parser) -> Result<Expr> {
    let mut left = parse_not_expr(p)?;
    while p.eat(TokenKind::And) {
        let right = parse_not_expr(p)?;
        left = binary(left, BinaryOp::And, right);
    }
    Ok(left)
}

fn parse_not_expr(p: &mut Parser) -> Result<Expr> {
    if p.eat(TokenKind::Not) {
        let expr = p.nested(parse_not_expr)?;
        Ok(Expr::UnaryOp { op: UnaryOp::Not, expr: Box::new(expr) })
    } else {
        parse_comparison(p)
    }
}

fn comparison_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Eq => Some(BinaryOp::Eq),
        TokenKind::Neq => Some(BinaryOp::Neq),
        TokenKind::Lt => Some(BinaryOp::Lt),
        TokenKind::Lte => Some(BinaryOp::Lte),
        TokenKind::Gt => Some(BinaryOp::Gt),
        TokenKind::Gte => Some(BinaryOp::Gte),
        _ => None,
    }
}

fn parse_comparison(p: &mut Parser) -> Result<Expr> {
    let left = parse_bit_or(p)?;
    let Some(op) = comparison_op(p.peek_kind()) else {
        return Ok(left);
    };
    p.advance();
    let right = parse_bit_or(p)?;
    // Chained comparisons are ambiguous on grids.
    if comparison_op(p.peek_kind()).is_some() {
        return Err(p.error("Chained comparisons are not supported; combine with 'and'".into()));
    }
    Ok(binary(left, op, right))
}

fn parse_bit_or(p: &mut Parser) -> Result<Expr> {
    let mut left = parse_bit_and(p)?;
    while p.eat(TokenKind::Pipe) {
        let right = parse_bit_and(p)?;
        left = binary(left, BinaryOp::Or, right);
    }
    Ok(left)
}

fn parse_bit_and(p: &mut Parser) -> Result<Expr> {
    let mut left = parse_addition(p)?;
    while p.eat(TokenKind::Amp) {
        let right = parse_addition(p)?;
        left = binary(left, BinaryOp::And, right);
    }
    Ok(left)
}

fn parse_addition(p: &mut Parser) -> Result<Expr> {
    let mut left = parse_multiplication(p)?;
    loop {
        let op = match p.peek_kind() {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            _ => break,
        };
        p.advance();
        let right = parse_multiplication(p)?;
        left = binary(left, op, right);
    }
    Ok(left)
}

fn parse_multiplication(p: &mut Parser) -> Result<Expr> {
    let mut left = parse_unary(p)?;
    loop {
        let op = match p.peek_kind() {
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            _ => break,
        };
        p.advance();
        let right = parse_unary(p)?;
        left = binary(left, op, right);
    }
    Ok(left)
}

fn parse_unary(p: &mut Parser) -> Result<Expr> {
    match p.peek_kind() {
        TokenKind::Minus => {
            p.advance();
            let expr = p.nested(parse_unary)?;
            Ok(Expr::UnaryOp { op: UnaryOp::Negate, expr: Box::new(expr) })
        }
        TokenKind::Tilde => {
            p.advance();
            let expr = p.nested(parse_unary)?;
            Ok(Expr::UnaryOp { op: UnaryOp::Not, expr: Box::new(expr) })
        }
        TokenKind::Plus => {
            p.advance();
            p.nested(parse_unary)
        }
        _ => parse_power(p),
    }
}

fn parse_power(p: &mut Parser) -> Result<Expr> {
    let left = parse_primary(p)?;
    if p.eat(TokenKind::StarStar) {
        let right = p.nested(parse_unary)?; // right-associative, binds tighter than a unary on its left
        Ok(binary(left, BinaryOp::Pow, right))
    } else {
        Ok(left)
    }
}

fn parse_primary(p: &mut Parser) -> Result<Expr> {
    match p.peek_kind() {
        TokenKind::Number => {
            let tok = p.advance();
            let val = tok.text.parse::<f64>().map_err(|_| {
                Error::SyntaxError { position: tok.span.start, message: "Invalid number".into() }
            })?;
            Ok(Expr::Number(val))
        }
        TokenKind::True => {
            p.advance();
            Ok(Expr::Bool(true))
        }
        TokenKind::False => {
            p.advance();
            Ok(Expr::Bool(false))
        }
        TokenKind::Placeholder => {
            let tok = p.advance();
            Ok(Expr::Placeholder(tok.text.clone()))
        }

        // Parenthesized expression
        TokenKind::LParen => {
            p.advance();
            let expr = parse_expr(p)?;
            p.expect(TokenKind::RParen)?;
            Ok(expr)
        }

        // Function call: name(args)
        TokenKind::Identifier => {
            let tok = p.advance().clone();
            let function = Function::from_name(&tok.text).ok_or_else(|| Error::SyntaxError {
                position: tok.span.start,
                message: format!("Unknown function or name '{}'", tok.text),
            })?;
            p.expect(TokenKind::LParen)?;
            let mut args = Vec::new();
            if !p.at(TokenKind::RParen) {
                args.push(parse_expr(p)?);
                while p.eat(TokenKind::Comma) {
                    args.push(parse_expr(p)?);
                }
            }
            p.expect(TokenKind::RParen)?;

            let (min, max) = function.arity();
            if args.len() < min || max.is_some_and(|m| args.len() > m) {
                return Err(Error::SyntaxError {
                    position: tok.span.start,
                    message: format!("'{}' takes {} argument(s), got {}", tok.text, describe_arity(min, max), args.len()),
                });
            }
            Ok(Expr::Call { function, args })
        }

        _ => Err(p.error(format!("Unexpected token in expression: {:?} '{}'", p.peek_kind(), p.peek().text))),
    }
}

fn describe_arity(min: usize, max: Option<usize>) -> String {
    match max {
        Some(max) if max == min => min.to_string(),
        Some(max) => format!("{min}..{max}"),
        None => format!("at least {min}"),
    }
}

// ============================================================================
// Tests
// ============================================================================
