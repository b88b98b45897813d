//! Lexical grammar for step scripts.

mod lexer;
mod token;

pub use lexer::Grammar;
pub use token::{LineState, LineTokens, Mode, Token, TokenClass};
