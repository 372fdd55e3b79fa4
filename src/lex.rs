use std::fmt::Display;

use miette::{Diagnostic, Error, NamedSource, SourceSpan};
use thiserror::Error;

use crate::eval::Fault;

#[derive(Error, Debug, Diagnostic)]
#[error("expected value or open parentheses not found")]
#[diagnostic(help("a number or a parenthesized group must appear at this position"))]
pub struct ValueExpectedError {
    #[source_code]
    src: NamedSource<String>,

    #[label("expected a value here")]
    bad_bit: SourceSpan,
}

#[derive(Error, Debug, Diagnostic)]
#[error("expected arithmetic operator not found")]
#[diagnostic(help("separate values and groups with one of `+ - * /`"))]
pub struct OperatorExpectedError {
    #[source_code]
    src: NamedSource<String>,

    #[label("expected an operator before this")]
    bad_bit: SourceSpan,
}

#[derive(Error, Debug, Diagnostic)]
#[error("unmatched parentheses in expression")]
#[diagnostic(help("every `(` must have a matching `)`"))]
pub struct UnbalancedParensError {
    #[source_code]
    src: NamedSource<String>,

    #[label("parentheses are unbalanced in this expression")]
    bad_bit: SourceSpan,
}

/// One indivisible lexical unit of an arithmetic expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    OpenParen,
    CloseParen,
    Value(f64),
    Operator(Op),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::OpenParen => write!(f, "OPEN_PAREN ("),
            Token::CloseParen => write!(f, "CLOSE_PAREN )"),
            Token::Value(n) => write!(f, "VALUE {n}"),
            Token::Operator(op) => write!(f, "OPERATOR {op}"),
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Op::Add => write!(f, "+"),
            Op::Sub => write!(f, "-"),
            Op::Mul => write!(f, "*"),
            Op::Div => write!(f, "/"),
        }
    }
}

/// A one-shot lexing state machine over a borrowed expression string.
///
/// Values and operators must strictly alternate, with parenthesis runs
/// folded in wherever they occur; the machine refuses to append a token
/// that would break that shape, so a returned sequence always satisfies
/// the invariants the [`crate::eval::Resolver`] relies on.
pub struct Tokenizer<'de> {
    whole: &'de str,
    rest: &'de str,
    byte: usize,
}

impl<'de> Tokenizer<'de> {
    pub fn new(input: &'de str) -> Self {
        Tokenizer {
            whole: input,
            rest: input,
            byte: 0,
        }
    }

    /// Runs the state machine to completion, producing the token sequence
    /// or the first classified syntax error.
    pub fn tokenize(mut self) -> Result<Vec<Token>, Error> {
        let mut tokens = Vec::new();
        let mut balance = 0i64;

        loop {
            // An open-paren run may repeat, e.g. `-(-(`. A minus sign on the
            // group multiplies the whole parenthetical by -1; queueing the
            // `-1 *` pair up front is safe since multiplication is highest
            // precedence and the synthetic value is pure.
            while let Some(negated) = self.take_open_paren() {
                if negated {
                    tokens.push(Token::Value(-1.0));
                    tokens.push(Token::Operator(Op::Mul));
                }
                tokens.push(Token::OpenParen);
                balance += 1;
            }

            match self.take_value() {
                Some(literal) => {
                    let n = literal.parse().map_err(|_| Fault::BadLiteral {
                        literal: literal.to_string(),
                    })?;
                    tokens.push(Token::Value(n));
                }
                None => {
                    return Err(ValueExpectedError {
                        src: self.source(),
                        bad_bit: self.remainder_span(),
                    }
                    .into());
                }
            }

            while self.take_close_paren() {
                tokens.push(Token::CloseParen);
                balance -= 1;
            }

            match self.take_operator() {
                Some(op) => tokens.push(Token::Operator(op)),
                None => break,
            }
        }

        if !self.at_end() {
            return Err(OperatorExpectedError {
                src: self.source(),
                bad_bit: self.remainder_span(),
            }
            .into());
        }
        if balance != 0 {
            return Err(UnbalancedParensError {
                src: self.source(),
                bad_bit: SourceSpan::from(0..self.whole.len()),
            }
            .into());
        }

        Ok(tokens)
    }

    /// Matches optional whitespace, an optional single sign, then `(`.
    /// Returns whether the sign was a minus. The sign must sit directly
    /// against the paren; `- (` is not an open-paren match.
    fn take_open_paren(&mut self) -> Option<bool> {
        let (rest, byte) = (self.rest, self.byte);
        self.skip_whitespace();

        let bytes = self.rest.as_bytes();
        let (negated, len) = match (bytes.first(), bytes.get(1)) {
            (Some(b'('), _) => (false, 1),
            (Some(b'-'), Some(b'(')) => (true, 2),
            (Some(b'+'), Some(b'(')) => (false, 2),
            _ => {
                self.rest = rest;
                self.byte = byte;
                return None;
            }
        };

        self.advance(len);
        Some(negated)
    }

    /// Matches optional whitespace then a signed decimal literal:
    /// `[-+]?digits(.digits)?`, maximal and anchored. `7.8.9` matches
    /// `7.8` and leaves `.9` unconsumed.
    fn take_value(&mut self) -> Option<&'de str> {
        let (rest, byte) = (self.rest, self.byte);
        self.skip_whitespace();

        let bytes = self.rest.as_bytes();
        let mut len = 0;
        if matches!(bytes.first(), Some(b'-' | b'+')) {
            len += 1;
        }
        let digits_start = len;
        while matches!(bytes.get(len), Some(b'0'..=b'9')) {
            len += 1;
        }
        if len == digits_start {
            self.rest = rest;
            self.byte = byte;
            return None;
        }
        if bytes.get(len) == Some(&b'.') && matches!(bytes.get(len + 1), Some(b'0'..=b'9')) {
            len += 2;
            while matches!(bytes.get(len), Some(b'0'..=b'9')) {
                len += 1;
            }
        }

        let literal = &self.rest[..len];
        self.advance(len);
        Some(literal)
    }

    fn take_close_paren(&mut self) -> bool {
        let (rest, byte) = (self.rest, self.byte);
        self.skip_whitespace();

        if self.rest.as_bytes().first() == Some(&b')') {
            self.advance(1);
            true
        } else {
            self.rest = rest;
            self.byte = byte;
            false
        }
    }

    fn take_operator(&mut self) -> Option<Op> {
        let (rest, byte) = (self.rest, self.byte);
        self.skip_whitespace();

        let op = match self.rest.as_bytes().first() {
            Some(b'+') => Op::Add,
            Some(b'-') => Op::Sub,
            Some(b'*') => Op::Mul,
            Some(b'/') => Op::Div,
            _ => {
                self.rest = rest;
                self.byte = byte;
                return None;
            }
        };

        self.advance(1);
        Some(op)
    }

    fn at_end(&self) -> bool {
        self.rest.trim_start().is_empty()
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest.trim_start();
        self.byte += self.rest.len() - trimmed.len();
        self.rest = trimmed;
    }

    fn advance(&mut self, len: usize) {
        self.rest = &self.rest[len..];
        self.byte += len;
    }

    fn source(&self) -> NamedSource<String> {
        NamedSource::new("<expression>", self.whole.to_string())
    }

    /// Span over the unconsumed remainder, or the final byte when the
    /// machine ran out of input.
    fn remainder_span(&self) -> SourceSpan {
        if self.rest.is_empty() {
            SourceSpan::from(self.whole.len().saturating_sub(1)..self.whole.len())
        } else {
            SourceSpan::from(self.byte..self.whole.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Tokenizer::new(input)
            .tokenize()
            .expect("expression should tokenize")
    }

    fn lex_error(input: &str) -> String {
        Tokenizer::new(input)
            .tokenize()
            .expect_err("expression should be rejected")
            .to_string()
    }

    #[test]
    fn single_value() {
        assert_eq!(tokens("5"), vec![Token::Value(5.0)]);
    }

    #[test]
    fn signed_values() {
        assert_eq!(
            tokens("2 * -3"),
            vec![
                Token::Value(2.0),
                Token::Operator(Op::Mul),
                Token::Value(-3.0),
            ]
        );
        assert_eq!(tokens("+4.5"), vec![Token::Value(4.5)]);
    }

    #[test]
    fn negated_group_folds_into_multiplication() {
        assert_eq!(
            tokens("-(2 + 3)"),
            vec![
                Token::Value(-1.0),
                Token::Operator(Op::Mul),
                Token::OpenParen,
                Token::Value(2.0),
                Token::Operator(Op::Add),
                Token::Value(3.0),
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn plus_signed_group_adds_no_synthetic_tokens() {
        assert_eq!(
            tokens("+(2)"),
            vec![Token::OpenParen, Token::Value(2.0), Token::CloseParen]
        );
    }

    #[test]
    fn nested_negated_groups() {
        assert_eq!(
            tokens("-(-(5))"),
            vec![
                Token::Value(-1.0),
                Token::Operator(Op::Mul),
                Token::OpenParen,
                Token::Value(-1.0),
                Token::Operator(Op::Mul),
                Token::OpenParen,
                Token::Value(5.0),
                Token::CloseParen,
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn whitespace_is_consumed_before_each_token() {
        assert_eq!(
            tokens("  1 +  ( 2 ) "),
            vec![
                Token::Value(1.0),
                Token::Operator(Op::Add),
                Token::OpenParen,
                Token::Value(2.0),
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn sign_detached_from_its_number_is_rejected() {
        assert_eq!(
            lex_error("- 5"),
            "expected value or open parentheses not found"
        );
    }

    #[test]
    fn operator_cannot_end_the_expression() {
        assert_eq!(
            lex_error("5 -"),
            "expected value or open parentheses not found"
        );
    }

    #[test]
    fn empty_group_is_rejected() {
        assert_eq!(lex_error("()"), "expected value or open parentheses not found");
    }

    #[test]
    fn consecutive_operators_are_rejected() {
        assert_eq!(
            lex_error("6 + * 5"),
            "expected value or open parentheses not found"
        );
    }

    #[test]
    fn adjacent_values_need_an_operator() {
        assert_eq!(
            lex_error("7 + 8 9"),
            "expected arithmetic operator not found"
        );
    }

    #[test]
    fn second_decimal_point_splits_the_literal() {
        // `7.8.9` lexes as the value `7.8`, leaving `.9` where an
        // operator was expected.
        assert_eq!(lex_error("7.8.9"), "expected arithmetic operator not found");
    }

    #[test]
    fn value_adjacent_to_group_needs_an_operator() {
        assert_eq!(
            lex_error("4(3 + 2)"),
            "expected arithmetic operator not found"
        );
    }

    #[test]
    fn unmatched_parentheses_are_rejected() {
        assert_eq!(lex_error("(1 + 1"), "unmatched parentheses in expression");
        assert_eq!(lex_error("1 + 1)"), "unmatched parentheses in expression");
    }

    #[test]
    fn oversized_literal_saturates_to_infinity() {
        let literal = "9".repeat(400);
        assert_eq!(tokens(&literal), vec![Token::Value(f64::INFINITY)]);
    }
}
