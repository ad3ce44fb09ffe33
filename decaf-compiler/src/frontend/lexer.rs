//! Tokenizer for the Decaf language.
//!
//! Produces an ordered stream of typed, positioned tokens. Keywords are a
//! fixed set; a second fixed set of reserved-but-unsupported words is
//! rejected outright. Multi-character symbols are matched greedily before
//! single-character ones (logos always prefers the longest match).

use crate::CompileError;
use logos::Logos;
use std::collections::VecDeque;
use std::fmt;

/// Raw lexeme classes recognized by the logos scanner. Identifier-shaped
/// words are classified into keyword / reserved / identifier afterwards.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
enum RawToken {
    #[regex(r"[a-zA-Z][a-zA-Z0-9_]*")]
    Word,

    #[regex(r"0x[0-9a-fA-F]+")]
    HexLit,

    #[regex(r"0|[1-9][0-9]*")]
    DecLit,

    #[regex(r#""([^"\\\r\n]|\\[^\r\n])*""#)]
    StrLit,

    #[regex(r"<=|>=|==|!=|&&|\|\|")]
    MultiSym,

    #[regex(r"[(){}\[\]+\-*/%<>=!;,.]")]
    Sym,
}

const KEYWORDS: [&str; 12] = [
    "def", "if", "else", "while", "return", "break", "continue", "int", "bool", "void", "true",
    "false",
];

const RESERVED: [&str; 12] = [
    "for", "callout", "class", "interface", "extends", "implements", "new", "this", "string",
    "float", "double", "null",
];

/// Token kind as seen by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Language keyword
    Key,
    /// Identifier
    Id,
    /// Decimal integer literal
    DecLit,
    /// Hexadecimal integer literal (`0x...`)
    HexLit,
    /// String literal, still quoted and escaped
    StrLit,
    /// Symbol or operator
    Sym,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Key => "keyword",
            TokenKind::Id => "identifier",
            TokenKind::DecLit => "decimal literal",
            TokenKind::HexLit => "hex literal",
            TokenKind::StrLit => "string literal",
            TokenKind::Sym => "symbol",
        };
        write!(f, "{s}")
    }
}

/// A single token: kind, verbatim text, and 1-indexed source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

/// FIFO queue of tokens. The parser peeks one token ahead and consumes
/// tokens destructively; a successful parse drains the stream completely.
#[derive(Debug, Default)]
pub struct TokenStream {
    tokens: VecDeque<Token>,
}

impl TokenStream {
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.front()
    }

    pub fn next(&mut self) -> Option<Token> {
        self.tokens.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

impl FromIterator<Token> for TokenStream {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

/// Byte-offset to 1-indexed line lookup, built once per source text.
struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        for (i, ch) in source.char_indices() {
            if ch == '\n' {
                starts.push(i + 1);
            }
        }
        Self { line_starts: starts }
    }

    fn line_of(&self, byte: usize) -> usize {
        match self.line_starts.binary_search(&byte) {
            Ok(idx) => idx + 1,
            Err(insert) => insert,
        }
    }
}

/// Tokenize the whole source text.
///
/// Any unrecognized character or use of a reserved word is a fatal lexical
/// error carrying the 1-indexed line where it occurred.
pub fn lex(source: &str) -> Result<TokenStream, CompileError> {
    let index = LineIndex::new(source);
    let mut lexer = RawToken::lexer(source);
    let mut tokens = VecDeque::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let text = lexer.slice();
        let line = index.line_of(span.start);

        let raw = result.map_err(|_| CompileError::Lexical {
            line,
            message: format!("invalid token starting at '{}'", error_context(source, span.start)),
        })?;

        let kind = match raw {
            RawToken::Word => {
                if KEYWORDS.contains(&text) {
                    TokenKind::Key
                } else if RESERVED.contains(&text) {
                    return Err(CompileError::Lexical {
                        line,
                        message: format!("invalid use of reserved word '{text}'"),
                    });
                } else {
                    TokenKind::Id
                }
            }
            RawToken::DecLit => TokenKind::DecLit,
            RawToken::HexLit => TokenKind::HexLit,
            RawToken::StrLit => TokenKind::StrLit,
            RawToken::MultiSym | RawToken::Sym => TokenKind::Sym,
        };

        tokens.push_back(Token {
            kind,
            text: text.to_string(),
            line,
        });
    }

    Ok(TokenStream { tokens })
}

/// The offending text fragment for a lexical error message (rest of the line,
/// clipped to a few characters).
fn error_context(source: &str, position: usize) -> &str {
    let rest = &source[position..];
    let end = rest
        .char_indices()
        .take_while(|(i, c)| *i < 16 && *c != '\n')
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    &rest[..end]
}
