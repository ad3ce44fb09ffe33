//! Compiler frontend: tokenization and parsing.

pub mod lexer;
pub mod parser;

pub use lexer::{lex, Token, TokenKind, TokenStream};
pub use parser::parse;
