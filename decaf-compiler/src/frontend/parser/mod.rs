//! Recursive-descent parser: one mutually recursive procedure per
//! nonterminal, LL(1) with a single token of lookahead.
//!
//! Grammar (expressions in `expr.rs`):
//!
//! ```text
//! Program  -> (VarDecl | FuncDecl)*
//! VarDecl  -> Type ID ('[' DEC ']')? ';'
//! FuncDecl -> def Type ID '(' Params? ')' Block
//! Params   -> Type ID (',' Type ID)*
//! Block    -> '{' VarDecl* Stmt* '}'
//! Stmt     -> Loc '=' Expr ';'
//!           | FuncCall ';'
//!           | if '(' Expr ')' Block (else Block)?
//!           | while '(' Expr ')' Block
//!           | return Expr? ';'
//!           | break ';'
//!           | continue ';'
//! ```
//!
//! Failure is fail-fast: the first structural mismatch aborts the parse with
//! the expected construct, the offending token text, and its source line.

mod expr;

use crate::ast::{Ast, NodeId, NodeKind, Param, Type};
use crate::frontend::lexer::{Token, TokenKind, TokenStream};
use crate::CompileError;

/// Parse a full token stream into an AST. The stream is completely drained
/// on success; trailing tokens that fit no declaration are an error.
pub fn parse(tokens: TokenStream) -> Result<Ast, CompileError> {
    let mut parser = Parser::new(tokens);
    let root = parser.parse_program()?;
    let mut ast = parser.into_ast();
    ast.set_root(root);
    Ok(ast)
}

pub(crate) struct Parser {
    tokens: TokenStream,
    ast: Ast,
    /// Line of the most recently consumed token, for end-of-input errors.
    last_line: usize,
}

impl Parser {
    fn new(tokens: TokenStream) -> Self {
        Self {
            tokens,
            ast: Ast::new(),
            last_line: 1,
        }
    }

    fn into_ast(self) -> Ast {
        self.ast
    }

    // ── Token-queue helpers ─────────────────────────────────────────────

    pub(crate) fn eof_error(&self, expected: impl Into<String>) -> CompileError {
        CompileError::Parse {
            expected: expected.into(),
            found: "end of input".to_string(),
            line: self.last_line,
        }
    }

    /// Source line of the next token, or an end-of-input error naming the
    /// construct we were looking for.
    pub(crate) fn next_line(&self, expected: &str) -> Result<usize, CompileError> {
        self.tokens
            .peek()
            .map(|t| t.line)
            .ok_or_else(|| self.eof_error(expected))
    }

    pub(crate) fn advance(&mut self, expected: &str) -> Result<Token, CompileError> {
        let token = self.tokens.next().ok_or_else(|| self.eof_error(expected))?;
        self.last_line = token.line;
        Ok(token)
    }

    /// Consume the next token, requiring an exact kind + text match.
    pub(crate) fn expect(&mut self, kind: TokenKind, text: &str) -> Result<(), CompileError> {
        let token = self.advance(&format!("'{text}'"))?;
        if token.kind != kind || token.text != text {
            return Err(CompileError::Parse {
                expected: format!("'{text}'"),
                found: token.text,
                line: token.line,
            });
        }
        Ok(())
    }

    /// True if the next token matches the given kind and text.
    pub(crate) fn check(&self, kind: TokenKind, text: &str) -> bool {
        self.tokens
            .peek()
            .is_some_and(|t| t.kind == kind && t.text == text)
    }

    /// True if the next token has the given kind.
    pub(crate) fn check_kind(&self, kind: TokenKind) -> bool {
        self.tokens.peek().is_some_and(|t| t.kind == kind)
    }

    pub(crate) fn peek_text(&self) -> Option<&str> {
        self.tokens.peek().map(|t| t.text.as_str())
    }

    pub(crate) fn at_end(&self) -> bool {
        self.tokens.is_empty()
    }

    pub(crate) fn ast_mut(&mut self) -> &mut Ast {
        &mut self.ast
    }

    // ── Shared terminals ────────────────────────────────────────────────

    fn parse_type(&mut self) -> Result<Type, CompileError> {
        let token = self.advance("a type")?;
        if token.kind == TokenKind::Key {
            match token.text.as_str() {
                "int" => return Ok(Type::Int),
                "bool" => return Ok(Type::Bool),
                "void" => return Ok(Type::Void),
                _ => {}
            }
        }
        Err(CompileError::Parse {
            expected: "a type ('int', 'bool', or 'void')".to_string(),
            found: token.text,
            line: token.line,
        })
    }

    pub(crate) fn parse_id(&mut self) -> Result<String, CompileError> {
        let token = self.advance("an identifier")?;
        if token.kind != TokenKind::Id {
            return Err(CompileError::Parse {
                expected: "an identifier".to_string(),
                found: token.text,
                line: token.line,
            });
        }
        Ok(token.text)
    }

    // ── Nonterminals ────────────────────────────────────────────────────

    fn parse_program(&mut self) -> Result<NodeId, CompileError> {
        let mut variables = Vec::new();
        let mut functions = Vec::new();

        while !self.at_end() {
            // "def" is a keyword too, so functions are checked first.
            if self.check(TokenKind::Key, "def") {
                functions.push(self.parse_function_declaration()?);
            } else if self.check_kind(TokenKind::Key) {
                variables.push(self.parse_variable_declaration()?);
            } else {
                let line = self.next_line("a declaration")?;
                return Err(CompileError::Parse {
                    expected: "a function or variable declaration".to_string(),
                    found: self.peek_text().unwrap_or_default().to_string(),
                    line,
                });
            }
        }

        Ok(self.ast.add(
            NodeKind::Program {
                variables,
                functions,
            },
            1,
        ))
    }

    fn parse_variable_declaration(&mut self) -> Result<NodeId, CompileError> {
        let line = self.next_line("a variable declaration")?;
        let ty = self.parse_type()?;
        let name = self.parse_id()?;

        let mut is_array = false;
        let mut array_length = 1;
        if self.check(TokenKind::Sym, "[") {
            is_array = true;
            self.expect(TokenKind::Sym, "[")?;
            let len_token = self.advance("an array length")?;
            if len_token.kind != TokenKind::DecLit {
                return Err(CompileError::Parse {
                    expected: "an array length (decimal literal)".to_string(),
                    found: len_token.text,
                    line: len_token.line,
                });
            }
            array_length = len_token.text.parse().map_err(|_| CompileError::Parse {
                expected: "an array length in range".to_string(),
                found: len_token.text.clone(),
                line: len_token.line,
            })?;
            self.expect(TokenKind::Sym, "]")?;
        }

        self.expect(TokenKind::Sym, ";")?;
        Ok(self.ast.add(
            NodeKind::VarDecl {
                name,
                ty,
                is_array,
                array_length,
            },
            line,
        ))
    }

    fn parse_function_declaration(&mut self) -> Result<NodeId, CompileError> {
        let line = self.next_line("a function declaration")?;
        self.expect(TokenKind::Key, "def")?;
        let return_type = self.parse_type()?;
        let name = self.parse_id()?;

        self.expect(TokenKind::Sym, "(")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::Sym, ")") {
            loop {
                let ty = self.parse_type()?;
                let name = self.parse_id()?;
                params.push(Param { name, ty });
                if self.check(TokenKind::Sym, ",") {
                    self.expect(TokenKind::Sym, ",")?;
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::Sym, ")")?;

        let body = self.parse_block()?;
        Ok(self.ast.add(
            NodeKind::FuncDecl {
                name,
                return_type,
                params,
                body,
            },
            line,
        ))
    }

    /// Block-local declarations must all precede statements; the grammar
    /// enforces it here, with no backtracking.
    fn parse_block(&mut self) -> Result<NodeId, CompileError> {
        let line = self.next_line("a block")?;
        self.expect(TokenKind::Sym, "{")?;

        let mut variables = Vec::new();
        while self.check(TokenKind::Key, "int")
            || self.check(TokenKind::Key, "bool")
            || self.check(TokenKind::Key, "void")
        {
            variables.push(self.parse_variable_declaration()?);
        }

        let mut statements = Vec::new();
        while !self.check(TokenKind::Sym, "}") {
            if self.at_end() {
                return Err(self.eof_error("'}'"));
            }
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::Sym, "}")?;

        Ok(self.ast.add(
            NodeKind::Block {
                variables,
                statements,
            },
            line,
        ))
    }

    fn parse_statement(&mut self) -> Result<NodeId, CompileError> {
        let line = self.next_line("a statement")?;

        if self.check(TokenKind::Key, "if") {
            self.expect(TokenKind::Key, "if")?;
            self.expect(TokenKind::Sym, "(")?;
            let condition = self.parse_expression()?;
            self.expect(TokenKind::Sym, ")")?;
            let if_block = self.parse_block()?;

            let else_block = if self.check(TokenKind::Key, "else") {
                self.expect(TokenKind::Key, "else")?;
                Some(self.parse_block()?)
            } else {
                None
            };

            return Ok(self.ast.add(
                NodeKind::Conditional {
                    condition,
                    if_block,
                    else_block,
                },
                line,
            ));
        }

        if self.check(TokenKind::Key, "while") {
            self.expect(TokenKind::Key, "while")?;
            self.expect(TokenKind::Sym, "(")?;
            let condition = self.parse_expression()?;
            self.expect(TokenKind::Sym, ")")?;
            let body = self.parse_block()?;
            return Ok(self.ast.add(NodeKind::WhileLoop { condition, body }, line));
        }

        if self.check(TokenKind::Key, "return") {
            self.expect(TokenKind::Key, "return")?;
            let value = if self.check(TokenKind::Sym, ";") {
                None
            } else {
                Some(self.parse_expression()?)
            };
            self.expect(TokenKind::Sym, ";")?;
            return Ok(self.ast.add(NodeKind::Return { value }, line));
        }

        if self.check(TokenKind::Key, "break") {
            self.expect(TokenKind::Key, "break")?;
            self.expect(TokenKind::Sym, ";")?;
            return Ok(self.ast.add(NodeKind::Break, line));
        }

        if self.check(TokenKind::Key, "continue") {
            self.expect(TokenKind::Key, "continue")?;
            self.expect(TokenKind::Sym, ";")?;
            return Ok(self.ast.add(NodeKind::Continue, line));
        }

        // An identifier starts either a call statement or an assignment;
        // the following '(' disambiguates.
        if self.check_kind(TokenKind::Id) {
            let name = self.parse_id()?;

            if self.check(TokenKind::Sym, "(") {
                let args = self.parse_call_args()?;
                self.expect(TokenKind::Sym, ";")?;
                return Ok(self.ast.add(NodeKind::FuncCall { name, args }, line));
            }

            let index = if self.check(TokenKind::Sym, "[") {
                self.expect(TokenKind::Sym, "[")?;
                let idx = self.parse_expression()?;
                self.expect(TokenKind::Sym, "]")?;
                Some(idx)
            } else {
                None
            };
            let location = self.ast.add(NodeKind::Location { name, index }, line);

            self.expect(TokenKind::Sym, "=")?;
            let value = self.parse_expression()?;
            self.expect(TokenKind::Sym, ";")?;
            return Ok(self.ast.add(NodeKind::Assignment { location, value }, line));
        }

        Err(CompileError::Parse {
            expected: "a statement".to_string(),
            found: self.peek_text().unwrap_or_default().to_string(),
            line,
        })
    }
}
