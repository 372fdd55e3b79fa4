//! Evaluator for arithmetic expressions supplied as text: signed decimal
//! numbers, `+ - * /`, nested (optionally negated) parentheses and
//! whitespace. The lexer is a small state machine that validates shape
//! while it tokenizes; the resolver applies operator precedence directly
//! over the flat token sequence, with no tree in between.

pub mod eval;
pub mod expr;
pub mod lex;

pub use eval::Resolver;
pub use expr::Expression;
pub use lex::{Op, Token, Tokenizer};
