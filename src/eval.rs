use miette::Diagnostic;
use thiserror::Error;

use crate::lex::{Op, Token};

/// Defect-class failure: the evaluator was handed a sequence that violates
/// the tokenizer's invariants. Never producible from text input through the
/// public pipeline, and kept as a distinct type so tests can tell a parser
/// bug apart from bad input.
#[derive(Error, Debug, Diagnostic)]
pub enum Fault {
    #[error("execution error: unexpected token type encountered during evaluation")]
    #[diagnostic(help("the token sequence violates the tokenizer's invariants"))]
    UnexpectedToken { pos: usize, found: Token },

    #[error("execution error: token position out of range during evaluation")]
    #[diagnostic(help("the token sequence violates the tokenizer's invariants"))]
    OutOfRange { pos: usize },

    #[error("execution error: invalid numeric literal `{literal}` encountered while parsing expression")]
    BadLiteral { literal: String },
}

/// Precedence-aware resolver over a finished token sequence.
///
/// No tree is built: `resolve_terms` and `resolve_value` recurse over
/// `[start, end]` index ranges of the borrowed slice. Only ranges produced
/// by the tokenizer's success path are meaningful; anything else surfaces
/// as a [`Fault`].
pub struct Resolver<'t> {
    tokens: &'t [Token],
}

impl<'t> Resolver<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Resolver { tokens }
    }

    /// Resolves the entire sequence to a single value.
    pub fn resolve(&self) -> Result<f64, Fault> {
        if self.tokens.is_empty() {
            return Err(Fault::OutOfRange { pos: 0 });
        }
        self.resolve_range(0, self.tokens.len() - 1)
    }

    /// Evaluates the sub-expression occupying exactly `[start, end]`.
    pub fn resolve_range(&self, start: usize, end: usize) -> Result<f64, Fault> {
        self.resolve_terms(start, end, false)
    }

    fn resolve_terms(&self, start: usize, end: usize, negate_head: bool) -> Result<f64, Fault> {
        let mut result = self.resolve_value(start)?;
        if negate_head {
            result = -result;
        }
        let mut pos = self.group_end(start)? + 1;

        // Everything at this level between operands is an operator; values
        // and groups were consumed by resolve_value above.
        while pos <= end {
            let found = self.token_at(pos)?;
            let Token::Operator(op) = found else {
                return Err(Fault::UnexpectedToken { pos, found });
            };
            let next = pos + 1;

            match op {
                // Addition and subtraction are lowest precedence, so the
                // entire remainder resolves as one sub-value. Subtraction
                // folds into the sign of the remainder's leading operand;
                // subtracting the resolved remainder instead would regroup
                // `10 - 2 - 3` to the right and yield 11.
                Op::Add => {
                    result += self.resolve_terms(next, end, false)?;
                    pos = end + 1;
                }
                Op::Sub => {
                    result += self.resolve_terms(next, end, true)?;
                    pos = end + 1;
                }
                // Multiplication and division bind tightest: take only the
                // next operand and keep scanning.
                Op::Mul => {
                    result *= self.resolve_value(next)?;
                    pos = self.group_end(next)? + 1;
                }
                Op::Div => {
                    result /= self.resolve_value(next)?;
                    pos = self.group_end(next)? + 1;
                }
            }
        }

        Ok(result)
    }

    /// Resolves the atomic unit at `pos`: a value is returned as-is, an
    /// open paren resolves the interior of its group.
    fn resolve_value(&self, pos: usize) -> Result<f64, Fault> {
        match self.token_at(pos)? {
            Token::Value(value) => Ok(value),
            Token::OpenParen => {
                let close = self.group_end(pos)?;
                self.resolve_range(pos + 1, close - 1)
            }
            found => Err(Fault::UnexpectedToken { pos, found }),
        }
    }

    /// For an open paren at `pos`, the index of its matching close paren;
    /// for any other token, `pos` itself (the end of that atomic unit).
    fn group_end(&self, pos: usize) -> Result<usize, Fault> {
        if !matches!(self.token_at(pos)?, Token::OpenParen) {
            return Ok(pos);
        }

        let mut balance = 1i64;
        let mut current = pos;
        while balance != 0 {
            current += 1;
            match self.token_at(current)? {
                Token::OpenParen => balance += 1,
                Token::CloseParen => balance -= 1,
                _ => {}
            }
        }
        Ok(current)
    }

    fn token_at(&self, pos: usize) -> Result<Token, Fault> {
        self.tokens.get(pos).copied().ok_or(Fault::OutOfRange { pos })
    }
}
