use miette::{Diagnostic, Error, NamedSource, SourceSpan};
use thiserror::Error;

use crate::eval::Resolver;
use crate::lex::{Token, Tokenizer};

#[derive(Error, Debug, Diagnostic)]
#[error("no expression was provided")]
#[diagnostic(help("provide a non-empty arithmetic expression"))]
pub struct EmptyExpressionError;

#[derive(Error, Debug, Diagnostic)]
#[error("infinite result encountered: possible division by zero")]
#[diagnostic(help(
    "check for division by zero, or for values beyond the finite range of a double"
))]
pub struct InfiniteResultError {
    #[source_code]
    src: NamedSource<String>,

    #[label("this expression does not resolve to a finite value")]
    bad_bit: SourceSpan,
}

/// An arithmetic expression together with its evaluation outcome.
///
/// Assigning a string fully re-evaluates it: tokenize, resolve, classify.
/// Results are queried afterward through [`is_valid`](Expression::is_valid),
/// [`error_message`](Expression::error_message) and
/// [`value`](Expression::value); no error crosses this boundary by unwind.
pub struct Expression {
    text: String,
    tokens: Vec<Token>,
    valid: bool,
    value: f64,
    error: Option<Error>,
}

impl Expression {
    pub fn new(expression: impl Into<String>) -> Self {
        let mut this = Expression {
            text: expression.into(),
            tokens: Vec::new(),
            valid: false,
            value: 0.0,
            error: None,
        };
        this.evaluate();
        this
    }

    /// Replaces the expression text and re-evaluates from scratch. Each
    /// assignment is an independent run; nothing is carried over.
    pub fn set_expression(&mut self, expression: impl Into<String>) {
        self.text = expression.into();
        self.evaluate();
    }

    /// The original text, exactly as last set.
    pub fn expression(&self) -> &str {
        &self.text
    }

    /// True iff the last set expression parsed and evaluated to a finite
    /// number.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The diagnostic message for the last evaluation; empty iff valid.
    pub fn error_message(&self) -> String {
        self.error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// The captured diagnostic, for callers that want the full report.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// The numeric result; contractually meaningless when invalid.
    pub fn value(&self) -> f64 {
        self.value
    }

    fn evaluate(&mut self) {
        self.tokens.clear();
        self.valid = false;
        self.value = 0.0;
        self.error = None;

        // Only the exact empty string short-circuits here; whitespace-only
        // input runs the tokenizer and fails there instead.
        if self.text.is_empty() {
            self.error = Some(EmptyExpressionError.into());
            return;
        }

        match Tokenizer::new(&self.text).tokenize() {
            Ok(tokens) => self.tokens = tokens,
            Err(e) => {
                self.error = Some(e);
                return;
            }
        }

        let result = match Resolver::new(&self.tokens).resolve() {
            Ok(result) => result,
            Err(fault) => {
                self.tokens.clear();
                self.error = Some(fault.into());
                return;
            }
        };

        // Overflow and division by zero both surface as an infinity, which
        // overrides an otherwise successful parse.
        if !result.is_finite() {
            self.tokens.clear();
            self.error = Some(
                InfiniteResultError {
                    src: NamedSource::new("<expression>", self.text.clone()),
                    bad_bit: SourceSpan::from(0..self.text.len()),
                }
                .into(),
            );
            return;
        }

        self.valid = true;
        self.value = result;
    }
}

impl Default for Expression {
    fn default() -> Self {
        Expression::new(String::new())
    }
}
