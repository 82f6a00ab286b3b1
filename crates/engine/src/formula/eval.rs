//! Two-stack infix evaluation.
//!
//! Left-to-right scan with standard precedence: `*` and `/` bind tighter
//! than `+` and `-`, parentheses bracket sub-expressions. A value arriving
//! with a multiplicative operator on top of the operator stack is combined
//! with it immediately; an additive operator first flushes any pending
//! additive work. A closed parenthesis feeds its sub-expression result back
//! through the same value path, so `2*(3+4)` resolves the waiting `*` as
//! soon as the `)` is seen.

use std::fmt;

use super::tokenizer::{Op, Token};

/// Evaluation failure, returned as a value rather than raised: a cell whose
/// formula cannot be evaluated keeps the formula as its contents and shows
/// the reason as its value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormulaError {
    reason: String,
}

impl FormulaError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The human-readable reason this error was produced.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Operator-stack entries: the four operators plus the open-parenthesis
/// bracket marking a sub-expression boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Pending {
    Op(Op),
    Bracket,
}

/// Evaluates a validated token sequence. Variables resolve through `lookup`;
/// a lookup failure or a division by zero short-circuits into an error value.
/// Never panics.
pub(super) fn evaluate<L>(tokens: &[Token], lookup: L) -> Result<f64, FormulaError>
where
    L: Fn(&str) -> Result<f64, FormulaError>,
{
    let mut values: Vec<f64> = Vec::new();
    let mut pending: Vec<Pending> = Vec::new();

    for token in tokens {
        match token {
            Token::Number(n) => push_value(n.into_inner(), &mut values, &mut pending)?,
            Token::Variable(name) => push_value(lookup(name)?, &mut values, &mut pending)?,
            Token::Operator(op) => match op {
                Op::Add | Op::Sub => {
                    while matches!(pending.last(), Some(Pending::Op(Op::Add | Op::Sub))) {
                        resolve_top(&mut values, &mut pending)?;
                    }
                    pending.push(Pending::Op(*op));
                }
                Op::Mul | Op::Div => pending.push(Pending::Op(*op)),
            },
            Token::OpenParen => pending.push(Pending::Bracket),
            Token::CloseParen => {
                while !matches!(pending.last(), Some(Pending::Bracket)) {
                    resolve_top(&mut values, &mut pending)?;
                }
                pending.pop();
                // The sub-expression result re-enters through the value path
                // so a multiplicative operator waiting outside the
                // parentheses is consumed now.
                let inner = pop_value(&mut values)?;
                push_value(inner, &mut values, &mut pending)?;
            }
        }
    }

    while !pending.is_empty() {
        resolve_top(&mut values, &mut pending)?;
    }

    match values.pop() {
        Some(result) if values.is_empty() => Ok(result),
        // Unreachable for token streams that passed construction validation.
        _ => Err(FormulaError::new("malformed expression")),
    }
}

/// Pushes a value, first consuming one pending `*`/`/` if it sits on top.
fn push_value(
    value: f64,
    values: &mut Vec<f64>,
    pending: &mut Vec<Pending>,
) -> Result<(), FormulaError> {
    if let Some(Pending::Op(op @ (Op::Mul | Op::Div))) = pending.last().copied() {
        pending.pop();
        let left = pop_value(values)?;
        values.push(apply(op, left, value)?);
    } else {
        values.push(value);
    }
    Ok(())
}

/// Pops and applies the operator on top of the stack.
fn resolve_top(values: &mut Vec<f64>, pending: &mut Vec<Pending>) -> Result<(), FormulaError> {
    match pending.pop() {
        Some(Pending::Op(op)) => {
            let right = pop_value(values)?;
            let left = pop_value(values)?;
            values.push(apply(op, left, right)?);
            Ok(())
        }
        // Unreachable for validated streams: brackets are consumed by their
        // closing parenthesis before any drain reaches them.
        _ => Err(FormulaError::new("malformed expression")),
    }
}

fn pop_value(values: &mut Vec<f64>) -> Result<f64, FormulaError> {
    values
        .pop()
        .ok_or_else(|| FormulaError::new("malformed expression"))
}

fn apply(op: Op, left: f64, right: f64) -> Result<f64, FormulaError> {
    match op {
        Op::Add => Ok(left + right),
        Op::Sub => Ok(left - right),
        Op::Mul => Ok(left * right),
        Op::Div => {
            if right == 0.0 {
                Err(FormulaError::new("division by zero"))
            } else {
                Ok(left / right)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Formula;
    use super::*;

    fn no_vars(_: &str) -> Result<f64, FormulaError> {
        Err(FormulaError::new("no variables in this test"))
    }

    fn eval(expr: &str) -> Result<f64, FormulaError> {
        Formula::new(expr).unwrap().evaluate(no_vars)
    }

    #[test]
    fn test_single_number() {
        assert_eq!(eval("5"), Ok(5.0));
        assert_eq!(eval("5e-5"), Ok(0.00005));
    }

    #[test]
    fn test_left_to_right_additive() {
        assert_eq!(eval("10-3-4"), Ok(3.0));
        assert_eq!(eval("1+2+3+4"), Ok(10.0));
    }

    #[test]
    fn test_left_to_right_multiplicative() {
        assert_eq!(eval("2/3/4"), Ok(2.0 / 3.0 / 4.0));
        assert_eq!(eval("2*3*4"), Ok(24.0));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("2+3*4"), Ok(14.0));
        assert_eq!(eval("2*3+4"), Ok(10.0));
        assert_eq!(eval("2 + 3 - 4 * 5 / 2"), Ok(-5.0));
    }

    #[test]
    fn test_parentheses() {
        assert_eq!(eval("(5 + 10) * 2"), Ok(30.0));
        assert_eq!(eval("2*(3+4)"), Ok(14.0));
        assert_eq!(eval("2*(3+4)+5"), Ok(19.0));
        assert_eq!(eval("2*(3+4)*5"), Ok(70.0));
        assert_eq!(eval("((((7))))"), Ok(7.0));
        assert_eq!(eval("6/(1+2)"), Ok(2.0));
    }

    #[test]
    fn test_division_by_zero_is_a_value() {
        let result = eval("1/0");
        assert_eq!(result, Err(FormulaError::new("division by zero")));

        // Also when the zero comes out of a sub-expression.
        assert!(eval("1/(2-2)").is_err());
    }

    #[test]
    fn test_variable_lookup() {
        let formula = Formula::new("x+7").unwrap();
        let result = formula.evaluate(|name| {
            if name == "x" {
                Ok(2.0)
            } else {
                Err(FormulaError::new(format!("{name} has no value")))
            }
        });
        assert_eq!(result, Ok(9.0));
    }

    #[test]
    fn test_failed_lookup_short_circuits() {
        let formula = Formula::new("a + b * c").unwrap();
        let result = formula.evaluate(|name| {
            if name == "a" {
                Ok(1.0)
            } else {
                Err(FormulaError::new(format!("{name} has no value")))
            }
        });
        assert_eq!(result, Err(FormulaError::new("b has no value")));
    }

    #[test]
    fn test_lookup_receives_normalized_names() {
        let upper = |v: &str| v.to_uppercase();
        let formula = Formula::with_rules("x+7", upper, |_| true).unwrap();
        let result = formula.evaluate(|name| {
            assert_eq!(name, "X");
            Ok(4.0)
        });
        assert_eq!(result, Ok(11.0));
    }
}
