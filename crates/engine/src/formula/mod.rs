//! Infix arithmetic formulas over named cells.
//!
//! A [`Formula`] is an immutable sequence of validated, normalized tokens:
//! non-negative numbers, variables (`[A-Za-z_][A-Za-z0-9_]*`), the four
//! arithmetic operators, and parentheses. All validation happens once at
//! construction; evaluation runs on demand against a caller-supplied
//! variable lookup and reports failures as values, never as panics.
//!
//! Construction takes two rules: a *normalizer* rewriting every variable
//! into canonical form, and a *validation predicate* that may reject a
//! normalized variable. The stored token sequence carries only normalized
//! variables, so lookups during evaluation always see canonical names.

mod eval;
mod tokenizer;

pub use eval::FormulaError;
pub use tokenizer::{Op, Token};

use std::fmt;

use rustc_hash::FxHashSet;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use tokenizer::tokenize;

/// Reasons a formula string fails to parse or validate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("formula is empty")]
    Empty,

    #[error("invalid token `{0}`")]
    InvalidToken(String),

    #[error("unbalanced parentheses")]
    UnbalancedParens,

    #[error("formula cannot start with `{0}`")]
    BadStart(String),

    #[error("formula cannot end with `{0}`")]
    BadEnd(String),

    #[error("`{0}` cannot be followed by `{1}`")]
    BadSequence(String, String),

    #[error("`{0}` is not a valid variable here")]
    InvalidVariable(String),
}

/// An immutable, validated arithmetic formula.
///
/// Two formulas are equal iff their token sequences are equal element-wise:
/// numeric tokens compare by parsed value (`2.0` equals `2.000`) and
/// variable tokens compare by their normalized spelling. Hashing is
/// consistent with that equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Formula {
    tokens: Vec<Token>,
}

impl Formula {
    /// Parses `expr` with the identity normalizer and an always-true
    /// validation predicate.
    pub fn new(expr: &str) -> Result<Self, FormatError> {
        Self::with_rules(expr, |v| v.to_string(), |_| true)
    }

    /// Parses `expr`, replacing every variable with `normalize(variable)`
    /// and failing with [`FormatError::InvalidVariable`] if `is_valid`
    /// rejects any normalized variable.
    pub fn with_rules(
        expr: &str,
        normalize: impl Fn(&str) -> String,
        is_valid: impl Fn(&str) -> bool,
    ) -> Result<Self, FormatError> {
        let mut tokens = tokenize(expr)?;
        validate_structure(&tokens)?;
        for token in &mut tokens {
            if let Token::Variable(name) = token {
                let normalized = normalize(name);
                if !is_valid(&normalized) {
                    return Err(FormatError::InvalidVariable(normalized));
                }
                *name = normalized;
            }
        }
        Ok(Self { tokens })
    }

    /// Evaluates this formula. Variables resolve through `lookup`, which
    /// receives normalized names; a lookup failure or a division by zero
    /// comes back as the `Err` value. Never panics.
    pub fn evaluate<L>(&self, lookup: L) -> Result<f64, FormulaError>
    where
        L: Fn(&str) -> Result<f64, FormulaError>,
    {
        eval::evaluate(&self.tokens, lookup)
    }

    /// The normalized variables of this formula in first-occurrence order,
    /// without duplicates. Each call starts a fresh pass over the tokens.
    pub fn variables(&self) -> impl Iterator<Item = &str> + '_ {
        let mut seen = FxHashSet::default();
        self.tokens.iter().filter_map(move |token| match token {
            Token::Variable(name) => {
                if seen.insert(name.as_str()) {
                    Some(name.as_str())
                } else {
                    None
                }
            }
            _ => None,
        })
    }
}

/// Structural validation: token adjacency, parenthesis balance, and the
/// legal first/last tokens of an infix expression.
fn validate_structure(tokens: &[Token]) -> Result<(), FormatError> {
    let Some(first) = tokens.first() else {
        return Err(FormatError::Empty);
    };
    if !(first.is_value() || matches!(first, Token::OpenParen)) {
        return Err(FormatError::BadStart(first.to_string()));
    }
    if let Some(last) = tokens.last() {
        if !(last.is_value() || matches!(last, Token::CloseParen)) {
            return Err(FormatError::BadEnd(last.to_string()));
        }
    }

    let mut open = 0usize;
    let mut previous: Option<&Token> = None;
    for token in tokens {
        match token {
            Token::OpenParen => open += 1,
            Token::CloseParen => {
                // A closing parenthesis may never outrun the opens.
                open = open.checked_sub(1).ok_or(FormatError::UnbalancedParens)?;
            }
            _ => {}
        }

        if let Some(prev) = previous {
            let after_opening = matches!(prev, Token::Operator(_) | Token::OpenParen);
            let ok = if after_opening {
                token.is_value() || matches!(token, Token::OpenParen)
            } else {
                // prev is a value or a closing parenthesis
                matches!(token, Token::Operator(_) | Token::CloseParen)
            };
            if !ok {
                return Err(FormatError::BadSequence(
                    prev.to_string(),
                    token.to_string(),
                ));
            }
        }
        previous = Some(token);
    }

    if open != 0 {
        return Err(FormatError::UnbalancedParens);
    }
    Ok(())
}

impl fmt::Display for Formula {
    /// Whitespace-free rendering that re-parses to an equal formula.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

impl Serialize for Formula {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Formula {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Formula::new(&source).map_err(de::Error::custom)
    }
}
