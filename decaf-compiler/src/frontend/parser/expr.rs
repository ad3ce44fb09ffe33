//! Expression sub-grammar: precedence climbing over six binary levels.
//!
//! ```text
//! level 0  ||
//! level 1  &&
//! level 2  ==  !=
//! level 3  <  <=  >  >=
//! level 4  +  -
//! level 5  *  /  %
//! level 6  unary / base
//! ```
//!
//! Every level is left-associative: it recurses into level+1 for the left
//! operand, then loops while operators at its own level keep appearing.
//! Unary operators bind tighter than all binary operators, and a
//! parenthesized sub-expression resets to level 0.

use super::Parser;
use crate::ast::{BinaryOp, Literal, NodeId, NodeKind, UnaryOp};
use crate::frontend::lexer::TokenKind;
use crate::CompileError;

/// Binary precedence level at which unary/base expressions take over.
const UNARY_LEVEL: u8 = 6;

impl Parser {
    pub(crate) fn parse_expression(&mut self) -> Result<NodeId, CompileError> {
        if self.at_end() {
            return Err(self.eof_error("an expression"));
        }
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, level: u8) -> Result<NodeId, CompileError> {
        if level == UNARY_LEVEL {
            return self.parse_unary();
        }

        let line = self.next_line("an expression")?;
        let mut left = self.parse_binary(level + 1)?;

        while let Some(op) = self.peek_text().and_then(|text| op_at_level(level, text)) {
            self.advance("an operator")?;
            let right = self.parse_binary(level + 1)?;
            left = self
                .ast_mut()
                .add(NodeKind::BinaryOp { op, left, right }, line);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<NodeId, CompileError> {
        let line = self.next_line("an expression")?;

        let op = if self.check(TokenKind::Sym, "-") {
            Some(UnaryOp::Neg)
        } else if self.check(TokenKind::Sym, "!") {
            Some(UnaryOp::Not)
        } else {
            None
        };

        match op {
            Some(op) => {
                self.advance("an operator")?;
                let operand = self.parse_base()?;
                Ok(self.ast_mut().add(NodeKind::UnaryOp { op, operand }, line))
            }
            None => self.parse_base(),
        }
    }

    fn parse_base(&mut self) -> Result<NodeId, CompileError> {
        let line = self.next_line("an expression")?;

        if self.check(TokenKind::Sym, "(") {
            self.expect(TokenKind::Sym, "(")?;
            let expr = self.parse_expression()?;
            self.expect(TokenKind::Sym, ")")?;
            return Ok(expr);
        }

        if self.check_kind(TokenKind::DecLit)
            || self.check_kind(TokenKind::HexLit)
            || self.check_kind(TokenKind::StrLit)
            || self.check(TokenKind::Key, "true")
            || self.check(TokenKind::Key, "false")
        {
            return self.parse_literal();
        }

        if self.check_kind(TokenKind::Id) {
            let name = self.parse_id()?;

            if self.check(TokenKind::Sym, "(") {
                let args = self.parse_call_args()?;
                return Ok(self.ast_mut().add(NodeKind::FuncCall { name, args }, line));
            }

            let index = if self.check(TokenKind::Sym, "[") {
                self.expect(TokenKind::Sym, "[")?;
                let idx = self.parse_expression()?;
                self.expect(TokenKind::Sym, "]")?;
                Some(idx)
            } else {
                None
            };
            return Ok(self.ast_mut().add(NodeKind::Location { name, index }, line));
        }

        Err(CompileError::Parse {
            expected: "an expression".to_string(),
            found: self.peek_text().unwrap_or_default().to_string(),
            line,
        })
    }

    /// `'(' (Expr (',' Expr)*)? ')'` — shared by call statements and call
    /// expressions.
    pub(crate) fn parse_call_args(&mut self) -> Result<Vec<NodeId>, CompileError> {
        self.expect(TokenKind::Sym, "(")?;
        let mut args = Vec::new();
        if !self.check(TokenKind::Sym, ")") {
            loop {
                args.push(self.parse_expression()?);
                if self.check(TokenKind::Sym, ",") {
                    self.expect(TokenKind::Sym, ",")?;
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::Sym, ")")?;
        Ok(args)
    }

    fn parse_literal(&mut self) -> Result<NodeId, CompileError> {
        let token = self.advance("a literal")?;
        let line = token.line;

        let literal = match token.kind {
            TokenKind::DecLit => {
                let value = token.text.parse().map_err(|_| CompileError::Parse {
                    expected: "an integer literal in range".to_string(),
                    found: token.text.clone(),
                    line,
                })?;
                Literal::Int(value)
            }
            TokenKind::HexLit => {
                let value = i64::from_str_radix(&token.text[2..], 16).map_err(|_| {
                    CompileError::Parse {
                        expected: "an integer literal in range".to_string(),
                        found: token.text.clone(),
                        line,
                    }
                })?;
                Literal::Int(value)
            }
            TokenKind::StrLit => Literal::Str(unescape_string(&token.text)),
            TokenKind::Key if token.text == "true" => Literal::Bool(true),
            TokenKind::Key if token.text == "false" => Literal::Bool(false),
            _ => {
                return Err(CompileError::Parse {
                    expected: "a literal".to_string(),
                    found: token.text,
                    line,
                })
            }
        };

        Ok(self.ast_mut().add(NodeKind::Literal(literal), line))
    }
}

fn op_at_level(level: u8, text: &str) -> Option<BinaryOp> {
    let op = match (level, text) {
        (0, "||") => BinaryOp::Or,
        (1, "&&") => BinaryOp::And,
        (2, "==") => BinaryOp::Eq,
        (2, "!=") => BinaryOp::Neq,
        (3, "<") => BinaryOp::Lt,
        (3, "<=") => BinaryOp::Le,
        (3, ">") => BinaryOp::Gt,
        (3, ">=") => BinaryOp::Ge,
        (4, "+") => BinaryOp::Add,
        (4, "-") => BinaryOp::Sub,
        (5, "*") => BinaryOp::Mul,
        (5, "/") => BinaryOp::Div,
        (5, "%") => BinaryOp::Mod,
        _ => return None,
    };
    Some(op)
}

/// Strip the surrounding quotes and interpret `\n`, `\t`, `\"`, and `\\`.
/// Any other backslash sequence is preserved literally.
fn unescape_string(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}
