//! Formula tokenizer.
//!
//! Splits an infix expression into numbers, variables, the four arithmetic
//! operators, and parentheses. Whitespace separates tokens and is never a
//! token itself; any other character run is an invalid-token error.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use ordered_float::OrderedFloat;

use super::FormatError;

/// One of the four binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    pub(crate) fn symbol(self) -> char {
        match self {
            Op::Add => '+',
            Op::Sub => '-',
            Op::Mul => '*',
            Op::Div => '/',
        }
    }
}

/// An atomic lexical unit of a formula.
///
/// Numbers compare by parsed value, so `2.0` and `2.000` are the same token.
/// Variables compare by their stored (normalized) spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Number(OrderedFloat<f64>),
    Variable(String),
    Operator(Op),
    OpenParen,
    CloseParen,
}

impl Token {
    /// Numbers and variables: the operand positions of the grammar.
    pub(crate) fn is_value(&self) -> bool {
        matches!(self, Token::Number(_) | Token::Variable(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n.into_inner()),
            Token::Variable(name) => f.write_str(name),
            Token::Operator(op) => write!(f, "{}", op.symbol()),
            Token::OpenParen => f.write_str("("),
            Token::CloseParen => f.write_str(")"),
        }
    }
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/' | '(' | ')')
}

pub(super) fn tokenize(input: &str) -> Result<Vec<Token>, FormatError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => {
                tokens.push(Token::Operator(Op::Add));
                chars.next();
            }
            '-' => {
                tokens.push(Token::Operator(Op::Sub));
                chars.next();
            }
            '*' => {
                tokens.push(Token::Operator(Op::Mul));
                chars.next();
            }
            '/' => {
                tokens.push(Token::Operator(Op::Div));
                chars.next();
            }
            '(' => {
                tokens.push(Token::OpenParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::CloseParen);
                chars.next();
            }
            'A'..='Z' | 'a'..='z' | '_' => {
                let mut name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Variable(name));
            }
            '0'..='9' | '.' => {
                let raw = scan_number(&mut chars);
                let number: f64 = raw
                    .parse()
                    .map_err(|_| FormatError::InvalidToken(raw.clone()))?;
                tokens.push(Token::Number(OrderedFloat(number)));
            }
            _ => {
                // A run the grammar has no use for; reported as scanned so
                // the error names what was seen.
                let mut run = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace()
                        || is_delimiter(ch)
                        || ch.is_ascii_alphanumeric()
                        || ch == '_'
                        || ch == '.'
                    {
                        break;
                    }
                    run.push(ch);
                    chars.next();
                }
                return Err(FormatError::InvalidToken(run));
            }
        }
    }

    Ok(tokens)
}

/// Scans digits and dots, then an exponent suffix — but only when the `e`/`E`
/// marker is followed by an optional sign and at least one digit. A bare
/// marker is left in place to lex as a variable, which sequence validation
/// then rejects.
fn scan_number(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut raw = String::new();
    while let Some(&ch) = chars.peek() {
        if ch.is_ascii_digit() || ch == '.' {
            raw.push(ch);
            chars.next();
        } else {
            break;
        }
    }

    if let Some(&marker) = chars.peek() {
        if marker == 'e' || marker == 'E' {
            let mut lookahead = chars.clone();
            lookahead.next(); // the marker
            let signed = matches!(lookahead.peek(), Some('+') | Some('-'));
            if signed {
                lookahead.next();
            }
            if lookahead.peek().map_or(false, |d| d.is_ascii_digit()) {
                raw.push(marker);
                chars.next();
                if signed {
                    if let Some(sign) = chars.next() {
                        raw.push(sign);
                    }
                }
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        raw.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
            }
        }
    }

    raw
}
