//! Rule lexer: tokenizes a subset rule string.

use crate::{Error, Result};

/// A token from the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

/// Source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    And, Or, Not, True, False,

    // Literals
    Number,

    // `[31.00]`: text holds the trimmed element id
    Placeholder,

    // Function names
    Identifier,

    // Punctuation
    LParen, RParen, Comma,

    // Operators
    Eq, Neq, Lt, Lte, Gt, Gte,
    Plus, Minus, Star, Slash, Percent,
    StarStar,   // **
    Amp,        // &
    Pipe,       // |
    Tilde,      // ~

    Eof,
}

/// Tokenize a rule string.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => { chars.next(); }

            // Placeholders: [elementid]
            '[' => {
                chars.next();
                let mut id = String::new();
                loop {
                    match chars.next() {
                        Some((end, ']')) => {
                            let id = id.trim();
                            if id.is_empty() {
                                return Err(Error::SyntaxError {
                                    position: pos,
                                    message: "Empty placeholder".into(),
                                });
                            }
                            tokens.push(Token {
                                kind: TokenKind::Placeholder,
                                span: Span { start: pos, end: end + 1 },
                                text: id.to_string(),
                            });
                            break;
                        }
                        Some((_, '[')) => {
                            return Err(Error::SyntaxError {
                                position: pos,
                                message: "Nested '[' in placeholder".into(),
                            });
                        }
                        Some((_, c)) => id.push(c),
                        None => {
                            return Err(Error::SyntaxError {
                                position: pos,
                                message: "Unterminated placeholder".into(),
                            });
                        }
                    }
                }
            }

            // Numbers: 12, 0.5, .5, 1e-3
            c if c.is_ascii_digit() || (c == '.' && matches!(chars.clone().nth(1), Some((_, d)) if d.is_ascii_digit())) => {
                let start = pos;
                let mut num = String::new();
                let mut seen_dot = false;
                let mut seen_exp = false;
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_digit() {
                        num.push(c);
                        chars.next();
                    } else if c == '.' && !seen_dot && !seen_exp {
                        seen_dot = true;
                        num.push(c);
                        chars.next();
                    } else if (c == 'e' || c == 'E') && !seen_exp {
                        seen_exp = true;
                        num.push(c);
                        chars.next();
                        if let Some(&(_, sign @ ('+' | '-'))) = chars.peek() {
                            num.push(sign);
                            chars.next();
                        }
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Number,
                    span: Span { start, end: start + num.len() },
                    text: num,
                });
            }

            // Identifiers and keywords
            c if c.is_alphabetic() || c == '_' => {
                let start = pos;
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let kind = keyword_or_ident(&ident);
                tokens.push(Token {
                    kind,
                    span: Span { start, end: start + ident.len() },
                    text: ident,
                });
            }

            '(' => { chars.next(); tokens.push(punct(TokenKind::LParen, pos, "(")); }
            ')' => { chars.next(); tokens.push(punct(TokenKind::RParen, pos, ")")); }
            ',' => { chars.next(); tokens.push(punct(TokenKind::Comma, pos, ",")); }
            '+' => { chars.next(); tokens.push(punct(TokenKind::Plus, pos, "+")); }
            '-' => { chars.next(); tokens.push(punct(TokenKind::Minus, pos, "-")); }
            '/' => { chars.next(); tokens.push(punct(TokenKind::Slash, pos, "/")); }
            '%' => { chars.next(); tokens.push(punct(TokenKind::Percent, pos, "%")); }
            '&' => { chars.next(); tokens.push(punct(TokenKind::Amp, pos, "&")); }
            '|' => { chars.next(); tokens.push(punct(TokenKind::Pipe, pos, "|")); }
            '~' => { chars.next(); tokens.push(punct(TokenKind::Tilde, pos, "~")); }
            '*' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '*'))) {
                    chars.next();
                    tokens.push(punct(TokenKind::StarStar, pos, "**"));
                } else {
                    tokens.push(punct(TokenKind::Star, pos, "*"));
                }
            }
            '=' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    tokens.push(punct(TokenKind::Eq, pos, "=="));
                } else {
                    return Err(Error::SyntaxError {
                        position: pos,
                        message: "Assignment is not allowed; use '==' to compare".into(),
                    });
                }
            }
            '!' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    tokens.push(punct(TokenKind::Neq, pos, "!="));
                } else {
                    return Err(Error::SyntaxError {
                        position: pos,
                        message: "Unexpected character: '!'".into(),
                    });
                }
            }
            '<' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    tokens.push(punct(TokenKind::Lte, pos, "<="));
                } else {
                    tokens.push(punct(TokenKind::Lt, pos, "<"));
                }
            }
            '>' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    tokens.push(punct(TokenKind::Gte, pos, ">="));
                } else {
                    tokens.push(punct(TokenKind::Gt, pos, ">"));
                }
            }

            other => {
                return Err(Error::SyntaxError {
                    position: pos,
                    message: format!("Unexpected character: '{other}'"),
                });
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span { start: input.len(), end: input.len() },
        text: String::new(),
    });

    Ok(tokens)
}

fn punct(kind: TokenKind, pos: usize, text: &str) -> Token {
    Token {
        kind,
        span: Span { start: pos, end: pos + text.len() },
        text: text.to_string(),
    }
}

fn keyword_or_ident(s: &str) -> TokenKind {
    match s.to_lowercase().as_str() {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => TokenKind::Identifier,
    }
}
